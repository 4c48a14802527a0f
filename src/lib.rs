//! Multiplayer Monster Game Server Library
//!
//! Clients connect over TCP, join the lobby under a unique name, join a
//! named game, and cooperatively shoot the monster wandering through it.
//!
//! # Protocol
//! Newline-terminated text lines:
//! - `JOINSERVER {name}`, `JOINGAME {name}`, `SHOOT {x} {y}` from clients
//! - `WALK {monster} {x} {y}`, `BOOM {player} {hits} {monster}`,
//!   `FINISH {WON|LOST}`, `ERROR {message}` from the server
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `GameKeeper` is the central actor owning all players and games
//! - Each game runs as its own `GameInstance` task owning its monster
//! - Each connection talks to the keeper through a `Messenger`
//! - A single `CancellationToken` stops the keeper and every game
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use monster_server::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     let server = Server::new(listener, config);
//!     let stop = server.stop_token();
//!
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         stop.cancel();
//!     });
//!     server.run().await;
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod game;
pub mod handler;
pub mod keeper;
pub mod message;
pub mod messenger;
pub mod monster;
pub mod player;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use codec::{CommandCodec, Line};
pub use config::Config;
pub use error::{AppError, CommandError, ConfigError, SendError};
pub use game::{GameHandle, GameInstance, Lifecycle, Shot, StatusEnvelope};
pub use handler::{handle_connection, Timeouts};
pub use keeper::{GameKeeper, KeeperHandle};
pub use message::{CommandType, Response};
pub use messenger::{Inbound, Messenger, Responses};
pub use monster::Monster;
pub use player::Player;
pub use registry::ConnectionRegistry;
pub use server::Server;
pub use types::{GameName, SessionId};
