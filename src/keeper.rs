//! GameKeeper Actor implementation
//!
//! The central actor that owns the player directory and the game directory.
//! Every mutation of either goes through its single event loop, so neither
//! needs a lock. Games run as their own tasks and report back over a
//! status queue; the keeper fans those reports out to the players in the game.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::game::{GameHandle, GameInstance, Shot, StatusEnvelope};
use crate::message::{self, CommandType, Response};
use crate::messenger::{Inbound, Messenger};
use crate::monster::Monster;
use crate::player::Player;
use crate::types::{GameName, SessionId};

/// Buffer size of the inbound and status queues
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Cloneable entry point for sessions
#[derive(Debug, Clone)]
pub struct KeeperHandle {
    inbound: mpsc::Sender<Inbound>,
}

impl KeeperHandle {
    /// Open a session bridge for a new connection
    ///
    /// `session_id` must be unique among live sessions.
    pub fn connect(&self, session_id: SessionId) -> Messenger {
        Messenger::new(session_id, self.inbound.clone())
    }
}

/// The main GameKeeper actor
///
/// Manages players and game instances and processes messages from sessions
/// and status reports from games.
pub struct GameKeeper {
    /// Joined players: SessionId -> Player
    players: HashMap<SessionId, Player>,
    /// Running games: GameName -> handle
    games: HashMap<GameName, GameHandle>,
    /// Session message receiver
    inbound: mpsc::Receiver<Inbound>,
    /// Status report receiver, shared by all games
    status_rx: mpsc::Receiver<StatusEnvelope>,
    /// Cloned into every spawned game
    status_tx: mpsc::Sender<StatusEnvelope>,
    /// Server-wide shutdown, shared with every game
    shutdown: CancellationToken,
    /// Tasks of spawned games
    game_tasks: TaskTracker,
    tick: Duration,
}

impl GameKeeper {
    /// Create a new GameKeeper and the handle sessions connect through
    pub fn new(shutdown: CancellationToken, tick: Duration) -> (Self, KeeperHandle) {
        let (inbound_tx, inbound) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (status_tx, status_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let keeper = Self {
            players: HashMap::new(),
            games: HashMap::new(),
            inbound,
            status_rx,
            status_tx,
            shutdown,
            game_tasks: TaskTracker::new(),
            tick,
        };
        (keeper, KeeperHandle { inbound: inbound_tx })
    }

    /// Run the GameKeeper event loop
    ///
    /// Stops when the shutdown token is cancelled or every session handle is
    /// gone, then waits for all game tasks to finish.
    pub async fn run(mut self) {
        info!("GameKeeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                Some(status) = self.status_rx.recv() => {
                    self.handle_status(status).await;
                }
                inbound = self.inbound.recv() => match inbound {
                    Some(inbound) => self.handle_inbound(inbound).await,
                    None => {
                        debug!("All session handles dropped");
                        self.shutdown.cancel();
                        break;
                    }
                },
            }
        }

        info!("GameKeeper stopping, waiting for {} games", self.game_tasks.len());
        self.game_tasks.close();
        self.game_tasks.wait().await;
        info!("GameKeeper stopped");
    }

    /// Process a single session message
    async fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Disconnect { session_id } => self.handle_disconnect(session_id),
            Inbound::Rejected {
                session_id,
                error,
                reply,
            } => {
                debug!("Rejected line from {}: {}", session_id, error);
                let _ = reply.send(error.into()).await;
            }
            Inbound::Message {
                session_id,
                text,
                reply,
            } => {
                debug!("Message from {}: {:?}", session_id, text);

                let kind = match CommandType::parse(&text) {
                    Ok(kind) => kind,
                    Err(e) => {
                        // Only the sender learns about it; the message is otherwise ignored.
                        let _ = reply.send(e.into()).await;
                        return;
                    }
                };

                let result = match kind {
                    CommandType::JoinServer => self.handle_join_server(session_id, &text, &reply),
                    CommandType::JoinGame => self.handle_join_game(session_id, &text),
                    CommandType::Shoot => self.handle_shoot(session_id, &text),
                };

                if let Err(e) = result {
                    debug!("Rejected {:?} from {}: {}", kind, session_id, e);
                    let _ = reply.send(e.into()).await;
                }
            }
        }
    }

    /// Handle session disconnection
    ///
    /// Any game the player was in keeps running.
    fn handle_disconnect(&mut self, session_id: SessionId) {
        if let Some(player) = self.players.remove(&session_id) {
            info!("Player {} ({}) left", player.name, session_id);
        }
        debug!(
            "Total players: {}, Total games: {}",
            self.players.len(),
            self.games.len()
        );
    }

    /// Handle lobby join
    fn handle_join_server(
        &mut self,
        session_id: SessionId,
        text: &str,
        reply: &mpsc::Sender<Response>,
    ) -> Result<(), AppError> {
        if self.players.contains_key(&session_id) {
            return Err(AppError::HaveSession);
        }

        let cmd = message::parse_join_server(text)?;
        if self.players.values().any(|p| p.name == cmd.name) {
            return Err(AppError::NameTaken);
        }

        info!("Player {} joined as {}", session_id, cmd.name);
        self.players
            .insert(session_id, Player::new(cmd.name, reply.clone()));
        Ok(())
    }

    /// Handle game join, spawning the game on first use of its name
    fn handle_join_game(&mut self, session_id: SessionId, text: &str) -> Result<(), AppError> {
        let player = self
            .players
            .get_mut(&session_id)
            .ok_or(AppError::NoSession)?;

        let cmd = message::parse_join_game(text)?;
        let game = GameName::from(cmd.game);
        info!("Player {} joined game {}", player.name, game);
        player.join_game(game.clone());

        if !self.games.contains_key(&game) {
            self.spawn_game(game);
        }
        Ok(())
    }

    /// Handle shot, forwarding it to the player's game
    fn handle_shoot(&mut self, session_id: SessionId, text: &str) -> Result<(), AppError> {
        let player = self.players.get(&session_id).ok_or(AppError::NoSession)?;
        let game = player.current_game.as_ref().ok_or(AppError::NotInGame)?;

        let cmd = message::parse_shoot(text)?;
        match self.games.get(game) {
            Some(handle) => handle.shoot(Shot {
                player: player.name.clone(),
                x: cmd.x,
                y: cmd.y,
            }),
            None => debug!("Shot from {} for finished game {}", player.name, game),
        }
        Ok(())
    }

    /// Deliver a game status to every player in that game
    async fn handle_status(&mut self, status: StatusEnvelope) {
        debug!("Game {}: {}", status.game, status.event);

        for player in self.players.values_mut() {
            if !player.is_in(&status.game) {
                continue;
            }

            if player.send(status.event.clone()).await.is_err() {
                debug!("Player {} no longer reading", player.name);
            }
            if status.is_over {
                player.leave_game();
            }
        }

        if status.is_over {
            self.games.remove(&status.game);
            info!("Game {} removed", status.game);
        }
    }

    /// Helper: Start a game task and register its handle
    fn spawn_game(&mut self, game: GameName) {
        let (instance, handle) = GameInstance::new(
            game.clone(),
            Monster::new(),
            self.tick,
            self.status_tx.clone(),
            self.shutdown.clone(),
        );
        self.games.insert(game.clone(), handle);
        self.supervise(game, instance.run());
    }

    /// Run a game task, turning a panic into a final `game aborted` status
    ///
    /// The status waits for room in the queue like any other, so the keeper
    /// always gets to clean up after the game unless the server is stopping.
    fn supervise<F>(&self, game: GameName, run: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let status_tx = self.status_tx.clone();
        let shutdown = self.shutdown.clone();
        self.game_tasks.spawn(async move {
            if AssertUnwindSafe(run).catch_unwind().await.is_ok() {
                return;
            }

            error!("Game {} panicked", game);
            tokio::select! {
                _ = shutdown.cancelled() => {}
                res = status_tx.send(StatusEnvelope::aborted(game.clone())) => {
                    if res.is_err() {
                        debug!("Keeper gone before abort of {}", game);
                    }
                }
            }
        });
    }
}
