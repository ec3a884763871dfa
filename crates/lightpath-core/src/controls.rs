use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::KeyBinding;
use crate::keys::{HeldKeys, KeyCode};
use crate::state::{PLAYER_COUNT, Player, PlayerIndex};

/// Direction a held control key pushes the player's horizontal velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acceleration {
    Left,
    Right,
}

impl Acceleration {
    /// Apply this push to `player`, returning the accelerated snapshot.
    pub fn apply(self, player: Player, amount: f32) -> Player {
        let vx = match self {
            Self::Left => player.vx - amount,
            Self::Right => player.vx + amount,
        };
        Player { vx, ..player }
    }
}

/// Acceleration effects for each player, derived from one held-key set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerMoves {
    moves: [Vec<Acceleration>; PLAYER_COUNT],
}

impl PlayerMoves {
    /// Effects for `player`, in the order their keys were pressed.
    pub fn for_player(&self, player: PlayerIndex) -> &[Acceleration] {
        &self.moves[player.index()]
    }

    pub fn is_idle(&self, player: PlayerIndex) -> bool {
        self.moves[player.index()].is_empty()
    }
}

/// Static mapping from control key codes to the player and push they drive.
#[derive(Debug, Clone)]
pub struct ControlScheme {
    bindings: HashMap<KeyCode, (PlayerIndex, Acceleration)>,
}

impl ControlScheme {
    pub fn new(controls: &[KeyBinding; PLAYER_COUNT]) -> Self {
        let mut bindings = HashMap::with_capacity(PLAYER_COUNT * 2);
        for (player, binding) in PlayerIndex::ALL.into_iter().zip(controls) {
            bindings.insert(binding.left, (player, Acceleration::Left));
            bindings.insert(binding.right, (player, Acceleration::Right));
        }
        Self { bindings }
    }

    pub fn lookup(&self, code: KeyCode) -> Option<(PlayerIndex, Acceleration)> {
        self.bindings.get(&code).copied()
    }

    /// Split the held set into per-player effects. Codes that are not
    /// control keys are ignored.
    pub fn map(&self, held: &HeldKeys) -> PlayerMoves {
        let mut moves = PlayerMoves::default();
        for (player, accel) in held.iter().filter_map(|code| self.lookup(code)) {
            moves.moves[player.index()].push(accel);
        }
        moves
    }
}
