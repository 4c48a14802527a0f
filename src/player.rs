//! Player struct definition
//!
//! A session that has joined the lobby, with its outbound channel.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::Response;
use crate::types::GameName;

/// Player in the lobby or in a game
///
/// Owned by the `GameKeeper`; one per session that joined the server.
#[derive(Debug)]
pub struct Player {
    /// Unique name among active players
    pub name: String,
    /// Game the player is currently in, if any
    pub current_game: Option<GameName>,
    /// Server → Client response channel
    pub sender: mpsc::Sender<Response>,
}

impl Player {
    /// Create a new player in the lobby
    pub fn new(name: String, sender: mpsc::Sender<Response>) -> Self {
        Self {
            name,
            current_game: None,
            sender,
        }
    }

    /// Send a response to this player
    ///
    /// Returns an error if the channel is closed (session gone).
    pub async fn send(&self, resp: Response) -> Result<(), SendError> {
        self.sender
            .send(resp)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    pub fn is_in(&self, game: &GameName) -> bool {
        self.current_game.as_ref() == Some(game)
    }

    pub fn join_game(&mut self, game: GameName) {
        self.current_game = Some(game);
    }

    /// Return to the lobby
    pub fn leave_game(&mut self) {
        self.current_game = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_player_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let player = Player::new("alice".to_string(), tx);

        assert_eq!(player.name, "alice");
        assert!(player.current_game.is_none());
    }

    #[tokio::test]
    async fn test_player_game_membership() {
        let (tx, _rx) = mpsc::channel(32);
        let mut player = Player::new("alice".to_string(), tx);
        let arena = GameName::from("arena");

        player.join_game(arena.clone());
        assert!(player.is_in(&arena));
        assert!(!player.is_in(&GameName::from("other")));

        player.leave_game();
        assert!(!player.is_in(&arena));
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let player = Player::new("alice".to_string(), tx);
        drop(rx);

        assert!(player.send(Response::Finish { won: true }).await.is_err());
    }
}
