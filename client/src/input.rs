//! Console command parsing for the terminal front end.

use shared::ClientAction;
use thiserror::Error;

/// What a console line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(ClientAction),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command /{0}")]
    UnknownCommand(String),

    #[error("/{command} needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("/{command}: expected yes or no, got {value:?}")]
    InvalidChoice { command: &'static str, value: String },
}

/// Parses one line. Empty lines yield `Ok(None)`; anything not starting
/// with `/` is a chat message.
pub fn parse_line(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(ClientAction::ChatMessage {
            message: line.to_string(),
        })));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let action = match name {
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        "ready" => ClientAction::Ready,
        "unhover" => ClientAction::Unhover,
        "initdiscard" => ClientAction::InitDiscard,
        "characters" => ClientAction::RequestCharacters,
        "hover" => ClientAction::Hover {
            hovering: joined(&args, "hover", "a card name")?,
        },
        "select" => ClientAction::Select {
            selected: joined(&args, "select", "a card name")?,
        },
        "pick" => ClientAction::CardSelect {
            selected: joined(&args, "pick", "a card name")?,
        },
        "discard" => ClientAction::DecidePassiveDiscard {
            discard: yes_no(args.first().copied(), "discard")?,
        },
        "swap" => match args.as_slice() {
            [source, target] => ClientAction::SwapPosition {
                source_pos: source.to_string(),
                target_pos: target.to_string(),
            },
            _ => {
                return Err(InputError::MissingArgument {
                    command: "swap",
                    expected: "two positions",
                })
            }
        },
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };

    Ok(Some(Command::Send(action)))
}

fn joined(
    args: &[&str],
    command: &'static str,
    expected: &'static str,
) -> Result<String, InputError> {
    if args.is_empty() {
        return Err(InputError::MissingArgument { command, expected });
    }
    Ok(args.join(" "))
}

fn yes_no(value: Option<&str>, command: &'static str) -> Result<bool, InputError> {
    match value {
        Some("yes" | "y") => Ok(true),
        Some("no" | "n") => Ok(false),
        Some(other) => Err(InputError::InvalidChoice {
            command,
            value: other.to_string(),
        }),
        None => Err(InputError::MissingArgument {
            command,
            expected: "yes or no",
        }),
    }
}
