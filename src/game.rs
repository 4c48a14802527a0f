//! Game instance actor
//!
//! One task per active game. The task owns its monster, moves it on a fixed
//! tick, applies shots as they arrive and reports every change to the
//! `GameKeeper` over the shared status queue.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::message::Response;
use crate::monster::Monster;
use crate::types::GameName;

/// Buffer size of a game's shot queue
const SHOT_BUFFER_SIZE: usize = 16;

/// Default time between two monster steps
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(4);

/// Shot forwarded from the keeper to a game
#[derive(Debug, Clone)]
pub struct Shot {
    pub player: String,
    pub x: i32,
    pub y: i32,
}

/// Event reported by a game to the keeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEnvelope {
    pub game: GameName,
    /// The game has ended and its players return to the lobby
    pub is_over: bool,
    pub event: Response,
}

impl StatusEnvelope {
    /// Final status for a game whose task died unexpectedly
    pub fn aborted(game: GameName) -> Self {
        Self {
            game,
            is_over: true,
            event: Response::Error {
                message: "game aborted".to_string(),
            },
        }
    }
}

/// Lifecycle of a game instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Terminated,
}

/// Keeper-side handle to a running game
#[derive(Debug, Clone)]
pub struct GameHandle {
    name: GameName,
    shots: mpsc::Sender<Shot>,
}

impl GameHandle {
    /// Forward a shot without waiting
    ///
    /// The keeper must never wait on a game, so a shot that does not fit in
    /// the queue, or reaches a game that already ended, is dropped.
    pub fn shoot(&self, shot: Shot) {
        match self.shots.try_send(shot) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(shot)) => {
                error!("Shot from {} lost: game {} queue full", shot.player, self.name);
            }
            Err(mpsc::error::TrySendError::Closed(shot)) => {
                debug!("Shot from {} dropped: game already over", shot.player);
            }
        }
    }
}

/// A running game and its monster
pub struct GameInstance {
    name: GameName,
    monster: Monster,
    lifecycle: Lifecycle,
    started: bool,
    tick: Duration,
    shots: mpsc::Receiver<Shot>,
    status: mpsc::Sender<StatusEnvelope>,
    shutdown: CancellationToken,
}

impl GameInstance {
    /// Create a game and the handle used to shoot at it
    ///
    /// `shutdown` is the server-wide token; cancelling it stops every game.
    pub fn new(
        name: GameName,
        monster: Monster,
        tick: Duration,
        status: mpsc::Sender<StatusEnvelope>,
        shutdown: CancellationToken,
    ) -> (Self, GameHandle) {
        let (shots_tx, shots) = mpsc::channel(SHOT_BUFFER_SIZE);
        let instance = Self {
            name,
            monster,
            lifecycle: Lifecycle::Running,
            started: false,
            tick,
            shots,
            status,
            shutdown,
        };
        let handle = GameHandle {
            name: instance.name.clone(),
            shots: shots_tx,
        };
        (instance, handle)
    }

    #[cfg(test)]
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Make the opening step and announce it
    ///
    /// Only the first call does anything.
    pub async fn start(&mut self) -> Lifecycle {
        if self.started {
            return self.lifecycle;
        }
        self.started = true;

        let (x, y) = self.monster.walk();
        let walk = self.walk_event(x, y);
        self.emit(false, walk).await
    }

    /// Run the game until the monster dies, reaches the wall, or the server stops
    pub async fn run(mut self) {
        info!("Game {} started with {}", self.name, self.monster.name);

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut state = self.start().await;
        while state == Lifecycle::Running {
            state = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Game {} stopped by shutdown", self.name);
                    self.terminate()
                }
                Some(shot) = self.shots.recv() => self.on_shot(shot).await,
                _ = ticker.tick() => self.on_tick().await,
            };
        }

        info!("Game {} finished", self.name);
    }

    async fn on_shot(&mut self, shot: Shot) -> Lifecycle {
        if !self.monster.hit(shot.x, shot.y) {
            return Lifecycle::Running;
        }

        debug!("{} hit {} in game {}", shot.player, self.monster.name, self.name);
        let boom = Response::Boom {
            player: shot.player,
            hits: self.monster.hits(),
            monster: self.monster.name.clone(),
        };
        if self.emit(false, boom).await == Lifecycle::Terminated {
            return Lifecycle::Terminated;
        }

        if self.monster.is_dead() {
            self.emit(true, Response::Finish { won: true }).await;
            return self.terminate();
        }
        Lifecycle::Running
    }

    async fn on_tick(&mut self) -> Lifecycle {
        let (x, y) = self.monster.walk();
        let walk = self.walk_event(x, y);
        if self.emit(false, walk).await == Lifecycle::Terminated {
            return Lifecycle::Terminated;
        }

        if self.monster.reached_wall() {
            self.emit(true, Response::Finish { won: false }).await;
            return self.terminate();
        }
        Lifecycle::Running
    }

    fn walk_event(&self, x: i32, y: i32) -> Response {
        Response::Walk {
            monster: self.monster.name.clone(),
            x,
            y,
        }
    }

    /// Report an event to the keeper
    ///
    /// Gives up when the server shuts down or the keeper is gone, in which
    /// case the game is over.
    async fn emit(&mut self, is_over: bool, event: Response) -> Lifecycle {
        let status = StatusEnvelope {
            game: self.name.clone(),
            is_over,
            event,
        };

        let delivered = tokio::select! {
            _ = self.shutdown.cancelled() => false,
            res = self.status.send(status) => res.is_ok(),
        };
        if delivered {
            self.lifecycle
        } else {
            self.terminate()
        }
    }

    fn terminate(&mut self) -> Lifecycle {
        self.lifecycle = Lifecycle::Terminated;
        self.shots.close();
        self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::{MAX_X, MAX_Y};

    const LONG_TICK: Duration = Duration::from_secs(3600);

    fn spawn_game(
        monster: Monster,
        tick: Duration,
    ) -> (
        GameHandle,
        mpsc::Receiver<StatusEnvelope>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let (status_tx, status_rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let (instance, handle) = GameInstance::new(
            GameName::from("arena"),
            monster,
            tick,
            status_tx,
            shutdown.clone(),
        );
        let task = tokio::spawn(instance.run());
        (handle, status_rx, shutdown, task)
    }

    fn walk_position(status: &StatusEnvelope) -> (i32, i32) {
        match &status.event {
            Response::Walk { x, y, .. } => (*x, *y),
            other => panic!("Expected walk, got {:?}", other),
        }
    }

    fn shot(x: i32, y: i32) -> Shot {
        Shot {
            player: "alice".to_string(),
            x,
            y,
        }
    }

    #[tokio::test]
    async fn test_start_walks_once() {
        let (status_tx, mut status_rx) = mpsc::channel(16);
        let (mut instance, _handle) = GameInstance::new(
            GameName::from("arena"),
            Monster::at(0, 0),
            LONG_TICK,
            status_tx,
            CancellationToken::new(),
        );

        assert_eq!(instance.start().await, Lifecycle::Running);
        assert_eq!(instance.start().await, Lifecycle::Running);
        assert_eq!(instance.lifecycle(), Lifecycle::Running);

        let first = status_rx.recv().await.unwrap();
        let (x, y) = walk_position(&first);
        assert_eq!(x + y, 1);
        assert!(!first.is_over);
        assert!(status_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_three_hits_win() {
        let (handle, mut status_rx, _shutdown, task) = spawn_game(Monster::at(0, 0), LONG_TICK);
        let (x, y) = walk_position(&status_rx.recv().await.unwrap());

        for hits in 1..=3 {
            handle.shoot(shot(x, y));
            let status = status_rx.recv().await.unwrap();
            assert_eq!(
                status.event,
                Response::Boom {
                    player: "alice".to_string(),
                    hits,
                    monster: "test-monster".to_string(),
                }
            );
            assert!(!status.is_over);
        }

        let finish = status_rx.recv().await.unwrap();
        assert_eq!(finish.event, Response::Finish { won: true });
        assert!(finish.is_over);

        task.await.unwrap();
        assert!(status_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_miss_emits_nothing() {
        let (handle, mut status_rx, shutdown, task) = spawn_game(Monster::at(0, 0), LONG_TICK);
        let (x, y) = walk_position(&status_rx.recv().await.unwrap());

        handle.shoot(shot(x + 5, y + 5));
        handle.shoot(shot(x, y));

        let status = status_rx.recv().await.unwrap();
        assert!(matches!(status.event, Response::Boom { hits: 1, .. }));

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_loses() {
        let (_handle, mut status_rx, _shutdown, task) =
            spawn_game(Monster::at(MAX_X - 1, MAX_Y), DEFAULT_TICK_INTERVAL);

        let mut last = None;
        while let Some(status) = status_rx.recv().await {
            if let Response::Walk { x, y, .. } = status.event {
                assert!(x == MAX_X - 1 || x == MAX_X);
                assert_eq!(y, MAX_Y);
            }
            last = Some(status);
        }

        let last = last.unwrap();
        assert_eq!(last.event, Response::Finish { won: false });
        assert!(last.is_over);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_walks() {
        let (_handle, mut status_rx, shutdown, task) =
            spawn_game(Monster::at(0, 0), DEFAULT_TICK_INTERVAL);

        let (x0, y0) = walk_position(&status_rx.recv().await.unwrap());
        let (x1, y1) = walk_position(&status_rx.recv().await.unwrap());
        assert_eq!((x1 + y1) - (x0 + y0), 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_exits_silently() {
        let (handle, mut status_rx, shutdown, task) = spawn_game(Monster::at(0, 0), LONG_TICK);
        let _ = status_rx.recv().await.unwrap();

        shutdown.cancel();
        task.await.unwrap();

        assert!(status_rx.recv().await.is_none());
        handle.shoot(shot(0, 0));
    }

    #[tokio::test]
    async fn test_shots_after_finish_are_dropped() {
        let (handle, mut status_rx, _shutdown, task) = spawn_game(Monster::at(0, 0), LONG_TICK);
        let (x, y) = walk_position(&status_rx.recv().await.unwrap());

        for _ in 0..3 {
            handle.shoot(shot(x, y));
        }
        task.await.unwrap();

        handle.shoot(shot(x, y));
        let mut events = Vec::new();
        while let Some(status) = status_rx.recv().await {
            events.push(status.event);
        }
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&Response::Finish { won: true }));
    }
}
