//! Monster rules
//!
//! Movement, hit detection and death condition. Pure state with no
//! synchronization: a monster is owned by exactly one game actor.

use rand::seq::SliceRandom;
use rand::Rng;

/// Largest reachable x; reaching it means the monster got through
pub const MAX_X: i32 = 10;
/// Largest reachable y
pub const MAX_Y: i32 = 30;
/// Hits needed to kill a monster
pub const LETHAL_HITS: u32 = 3;

const NAMES: &[&str] = &["night-king", "snow-prince", "ice-face", "coldy-mcold"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// The monster players fight inside a game
#[derive(Debug, Clone)]
pub struct Monster {
    /// Name shown in WALK and BOOM responses
    pub name: String,
    x: i32,
    y: i32,
    hits: u32,
}

impl Monster {
    /// Spawn a monster with a random name at the origin
    pub fn new() -> Self {
        let name = NAMES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(NAMES[0]);
        Self::named(name)
    }

    /// Spawn a monster with the given name at the origin
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: 0,
            y: 0,
            hits: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Self::named("test-monster")
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Step one unit along a random axis
    ///
    /// Picks X or Y with equal probability. If the chosen axis is already at
    /// its bound the monster stays put; the other axis is not tried.
    pub fn walk(&mut self) -> (i32, i32) {
        let axis = if rand::thread_rng().gen_bool(0.5) {
            Axis::X
        } else {
            Axis::Y
        };
        self.step(axis)
    }

    fn step(&mut self, axis: Axis) -> (i32, i32) {
        match axis {
            Axis::X if self.x < MAX_X => self.x += 1,
            Axis::Y if self.y < MAX_Y => self.y += 1,
            _ => {}
        }
        self.position()
    }

    /// Whether the monster has reached the far wall
    pub fn reached_wall(&self) -> bool {
        self.x == MAX_X
    }

    /// Shoot at `(x, y)`; a hit on the current position is counted
    pub fn hit(&mut self, x: i32, y: i32) -> bool {
        if (x, y) != self.position() {
            return false;
        }
        self.hits += 1;
        true
    }

    pub fn is_dead(&self) -> bool {
        self.hits >= LETHAL_HITS
    }
}

impl Default for Monster {
    fn default() -> Self {
        Self::new()
    }
}
