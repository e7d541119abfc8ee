//! Interactive command grammar.
//!
//! The only recognized command is `set <integer-channel>`.

use thiserror::Error;

use afc_protocol::Cfi;

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move the AP to the 5GHz partner of this CFI.
    SetChannel(Cfi),
}

/// Why a line is not a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: set <channel>")]
    MissingChannel,

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("unexpected arguments after channel: {0}")]
    TrailingArguments(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();

        let verb = words.next().ok_or(CommandError::Empty)?;
        if verb != "set" {
            return Err(CommandError::Unknown(verb.to_string()));
        }

        let channel = words.next().ok_or(CommandError::MissingChannel)?;
        let channel: Cfi = channel
            .parse()
            .map_err(|_| CommandError::InvalidChannel(channel.to_string()))?;

        let rest: Vec<&str> = words.collect();
        if !rest.is_empty() {
            return Err(CommandError::TrailingArguments(rest.join(" ")));
        }

        Ok(Command::SetChannel(channel))
    }
}
