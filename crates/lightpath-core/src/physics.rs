use crate::config::{FrictionPolicy, SimConfig, TrailPolicy};
use crate::controls::{Acceleration, PlayerMoves};
use crate::state::{CollisionSample, GameState, Player, PlayerIndex};

/// Fold a player's held-key effects onto their last snapshot, in press order.
pub fn accelerate(player: Player, moves: &[Acceleration], amount: f32) -> Player {
    moves
        .iter()
        .fold(player, |p, accel| accel.apply(p, amount))
}

/// Move `v` toward zero by `amount`, stopping at zero.
pub fn decelerate_axis(v: f32, amount: f32) -> f32 {
    if v > 0.0 {
        (v - amount).max(0.0)
    } else if v < 0.0 {
        (v + amount).min(0.0)
    } else {
        v
    }
}

pub fn decelerate(player: Player, amount: f32) -> Player {
    Player {
        vx: decelerate_axis(player.vx, amount),
        vy: decelerate_axis(player.vy, amount),
        ..player
    }
}

/// Move by one step of velocity. An axis whose candidate falls outside
/// `[0, max]` keeps its previous coordinate; velocity is left untouched.
pub fn move_bounded(player: Player, arena_width: f32, arena_height: f32) -> Player {
    let clip = |pos: f32, v: f32, max: f32| {
        let candidate = pos + v;
        if (0.0..=max).contains(&candidate) {
            candidate
        } else {
            pos
        }
    };
    Player {
        x: clip(player.x, player.vx, arena_width),
        y: clip(player.y, player.vy, arena_height),
        ..player
    }
}

/// Compute one player's next snapshot from their previous one.
pub fn advance_player(head: Player, moves: &[Acceleration], config: &SimConfig) -> Player {
    let accelerated = accelerate(head, moves, config.acceleration);
    let apply_friction = match config.friction_policy {
        FrictionPolicy::Always => true,
        FrictionPolicy::WhenIdle => moves.is_empty(),
    };
    let slowed = if apply_friction {
        decelerate(accelerated, config.deceleration)
    } else {
        accelerated
    };
    move_bounded(slowed, config.arena_width, config.arena_height)
}

/// The state transition: produce the successor of `prev` for one combined
/// sample of held moves and collision reading.
///
/// Sub-step order:
///  1. Copy collision counts, increment the named player's (if any)
///  2. Accelerate each player from their trajectory head
///  3. Apply friction per the configured policy
///  4. Move, clipping each axis to the arena
///  5. Append the new snapshot per the configured trail policy
///
/// The two players are computed independently. Total over all inputs.
/// The successor shares `prev`'s trail history, so a step costs the same
/// at any trail length.
pub fn step(
    prev: &GameState,
    moves: &PlayerMoves,
    collision: CollisionSample,
    config: &SimConfig,
) -> GameState {
    let mut next = prev.clone();

    if let Some(player) = collision.player() {
        let count = &mut next.collision_counts[player.index()];
        *count = count.saturating_add(1);
    }

    for player in PlayerIndex::ALL {
        let head = *prev.trajectory(player).head();
        let point = advance_player(head, moves.for_player(player), config);
        let append = match config.trail_policy {
            TrailPolicy::Always => true,
            TrailPolicy::OnMove => !point.same_position(&head),
        };
        if append {
            next.trajectories[player.index()].push(point);
        }
    }

    next
}
