pub mod combine;
pub mod config;
pub mod controls;
pub mod keys;
pub mod physics;
pub mod publisher;
pub mod state;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::config::SimConfig;
    use crate::controls::{ControlScheme, PlayerMoves};
    use crate::keys::{HeldKeys, KeyCode, KeyEvent, KeyTracker};
    use crate::physics::step;
    use crate::state::{CollisionSample, GameState};

    /// Held-key set produced by pressing `codes` in order.
    pub fn held_keys(codes: &[KeyCode]) -> HeldKeys {
        let mut tracker = KeyTracker::new();
        for &code in codes {
            tracker.apply(KeyEvent::down(code));
        }
        tracker.held().clone()
    }

    /// Player moves for `codes` under the config's control scheme.
    pub fn moves_for(config: &SimConfig, codes: &[KeyCode]) -> PlayerMoves {
        ControlScheme::new(&config.controls).map(&held_keys(codes))
    }

    /// Initial state for `config`.
    pub fn initial_state(config: &SimConfig) -> GameState {
        GameState::new(config.spawn_players())
    }

    /// Run `n` collision-free steps with the same moves.
    pub fn run_steps(
        state: &GameState,
        moves: &PlayerMoves,
        n: usize,
        config: &SimConfig,
    ) -> GameState {
        (0..n).fold(state.clone(), |s, _| {
            step(&s, moves, CollisionSample::None, config)
        })
    }

    /// Assert that `next` is a legal successor of `prev`: every trajectory
    /// grew by exactly one and at most one collision count rose by one.
    pub fn assert_successor(prev: &GameState, next: &GameState) {
        for (i, (a, b)) in prev.trajectories.iter().zip(&next.trajectories).enumerate() {
            assert_eq!(
                b.len(),
                a.len() + 1,
                "trajectory {i} should grow by one point per step"
            );
            assert!(
                b.iter().take(a.len()).eq(a.iter()),
                "trajectory {i} history must not change"
            );
        }
        let increments: u32 = prev
            .collision_counts
            .iter()
            .zip(&next.collision_counts)
            .map(|(a, b)| {
                assert!(b >= a, "collision counts must not decrease");
                b - a
            })
            .sum();
        assert!(increments <= 1, "at most one collision per step, got {increments}");
    }
}
