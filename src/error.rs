//! Error types for the game server
//!
//! Defines protocol errors, session-state errors and channel send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Protocol errors produced while parsing a command line
///
/// The `Display` text is sent verbatim to the client after `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Line has no arguments after the command type
    #[error("a command should consist of type+arguments")]
    MissingArguments,

    /// First word is not a known command
    #[error("{0} is not a command server understands")]
    Unknown(String),

    /// Known command with the wrong shape
    #[error("expected format for {command} command is '{usage}'")]
    InvalidFormat {
        command: &'static str,
        usage: &'static str,
    },

    /// Shot coordinate is not an integer
    #[error("could not parse coordinate {0}")]
    InvalidCoordinate(char),

    /// Line exceeded the framing limit and was dropped unread
    #[error("command longer than {0} bytes")]
    LineTooLong(usize),
}

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (fatal)
    #[error("line codec error: {0}")]
    Codec(#[from] tokio_util::codec::AnyDelimiterCodecError),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Malformed or unrecognized command
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Command requires a joined player but the session has none
    #[error("no session")]
    NoSession,

    /// Session already joined the server
    #[error("already have a session")]
    HaveSession,

    /// Shot fired while not in a game
    #[error("not in a game")]
    NotInGame,

    /// Another active player already holds the name
    #[error("name taken")]
    NameTaken,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds a value that cannot be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
