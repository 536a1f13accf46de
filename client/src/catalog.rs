//! Immutable character catalog snapshot.
//!
//! Synced once per session. Cloning shares the underlying storage, so deck
//! decoding can take the snapshot by value without copying characters.

use shared::Character;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Catalog {
    characters: Arc<[Character]>,
    index: Arc<HashMap<String, usize>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Catalog {
    pub fn new(characters: Vec<Character>) -> Self {
        let index = characters
            .iter()
            .enumerate()
            .map(|(position, character)| (character.name.clone(), position))
            .collect();

        Self {
            characters: characters.into(),
            index: Arc::new(index),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        self.index
            .get(name)
            .and_then(|&position| self.characters.get(position))
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}
