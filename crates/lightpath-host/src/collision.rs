use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use lightpath_core::state::{CollisionSample, PlayerIndex};

/// Collision report from the external detector: the trajectories of
/// `player_index` and another player intersected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    #[serde(rename = "playerIndex")]
    pub player_index: usize,
}

/// Normalizes raw collision reports into samples for the reducer.
///
/// The signal reads neutral until a report arrives, carries the colliding
/// player for exactly one combined sample, then returns to neutral. Reports
/// arriving within one window of the last accepted report are coalesced.
#[derive(Debug)]
pub struct CollisionSignal {
    window: Duration,
    last_accepted: Option<Instant>,
    coalesced: u64,
    rejected: u64,
}

impl CollisionSignal {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
            coalesced: 0,
            rejected: 0,
        }
    }

    /// The value every subscriber sees first, and the value the signal
    /// returns to after each collision.
    pub fn neutral(&self) -> CollisionSample {
        CollisionSample::None
    }

    /// Accept or drop a report received at `now`.
    pub fn on_event(&mut self, event: CollisionEvent, now: Instant) -> Option<CollisionSample> {
        let Some(player) = PlayerIndex::from_index(event.player_index) else {
            self.rejected += 1;
            tracing::warn!(
                player_index = event.player_index,
                "Collision for unknown player ignored"
            );
            return None;
        };

        if let Some(last) = self.last_accepted
            && now.saturating_duration_since(last) < self.window
        {
            self.coalesced += 1;
            tracing::debug!(%player, "Collision coalesced into current window");
            return None;
        }

        self.last_accepted = Some(now);
        Some(CollisionSample::Player(player))
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
