//! Basic type definitions for the game server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `GameName`: name of a game instance, chosen by players

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 issued once per accepted connection.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game name
///
/// Key of a game instance. Any number of players may join the same name;
/// the first join creates the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameName(pub String);

impl From<String> for GameName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for GameName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for GameName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_game_name_is_case_sensitive() {
        assert_ne!(GameName::from("arena"), GameName::from("Arena"));
        assert_eq!(GameName::from("arena").to_string(), "arena");
    }
}
