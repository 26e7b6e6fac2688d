//! Line-oriented commands read from stdin.

use note_sync::{NoteId, NoteIdError};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "commands: new | load <id-or-url> | id | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Start a fresh, empty note.
    New,
    /// Switch to an existing note.
    Load(NoteId),
    /// Print the current note id.
    ShowId,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: load <id-or-url>")]
    MissingNote,

    #[error(transparent)]
    InvalidNote(#[from] NoteIdError),
}

impl UserCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        line.parse().map(Some)
    }
}

impl FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default();

        match verb.to_ascii_lowercase().as_str() {
            "new" => Ok(UserCommand::New),
            "load" | "open" => {
                let target = parts.next().ok_or(CommandError::MissingNote)?;
                Ok(UserCommand::Load(NoteId::find_in_path(target)?))
            }
            "id" => Ok(UserCommand::ShowId),
            "help" | "?" => Ok(UserCommand::Help),
            "quit" | "exit" | "q" => Ok(UserCommand::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}
