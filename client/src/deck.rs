//! Per-player decks, decoded against the catalog snapshot.

use crate::catalog::Catalog;
use crate::error::ClientError;
use shared::{Character, Player};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub owner: String,
    pub cards: Vec<Character>,
}

impl Deck {
    pub fn empty(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            cards: Vec::new(),
        }
    }
}

/// Resolves each encoded entry to a catalog character, in order.
///
/// A name missing from the catalog means the client and server catalogs
/// have diverged; no partial deck is produced.
pub fn decode_deck(
    owner: &str,
    encoded: &[String],
    catalog: &Catalog,
) -> Result<Deck, ClientError> {
    let cards = encoded
        .iter()
        .map(|name| {
            catalog
                .get(name)
                .cloned()
                .ok_or_else(|| ClientError::UnknownCharacter {
                    owner: owner.to_string(),
                    name: name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Deck {
        owner: owner.to_string(),
        cards,
    })
}

#[derive(Debug, Clone, Default)]
pub struct DeckStore {
    decks: BTreeMap<String, Deck>,
}

impl DeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One empty deck per player, replacing whatever was there.
    pub fn materialize_empty(&mut self, players: &[Player]) {
        self.decks = players
            .iter()
            .map(|player| (player.name.clone(), Deck::empty(player.name.clone())))
            .collect();
    }

    /// Replaces the owner's deck entirely.
    pub fn replace(&mut self, deck: Deck) {
        self.decks.insert(deck.owner.clone(), deck);
    }

    pub fn get(&self, owner: &str) -> Option<&Deck> {
        self.decks.get(owner)
    }

    pub fn clear(&mut self) {
        self.decks.clear();
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }
}
