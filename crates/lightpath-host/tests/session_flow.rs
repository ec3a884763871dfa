//! End-to-end session tests: key events, clock ticks, and collision reports
//! flow through the session task and out of the render sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use lightpath_core::config::{SimConfig, SpawnPoint, TrailPolicy};
use lightpath_core::keys::KeyEvent;
use lightpath_core::state::{GameState, Player, PlayerIndex};
use lightpath_core::test_helpers::assert_successor;
use lightpath_host::collision::CollisionEvent;
use lightpath_host::sink::ChannelSink;
use lightpath_host::{SessionHandle, SessionStats, spawn_session};

const P1_RIGHT: u32 = 39;

fn start(config: SimConfig) -> (
    SessionHandle,
    mpsc::UnboundedReceiver<Arc<GameState>>,
    tokio::task::JoinHandle<SessionStats>,
) {
    let (sink, rx) = ChannelSink::channel();
    let (handle, task) = spawn_session(config, sink);
    (handle, rx, task)
}

async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Arc<GameState>>) -> Arc<GameState> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("frame within timeout")
        .expect("session still running")
}

#[tokio::test(start_paused = true)]
async fn idle_players_hold_position() {
    let (handle, mut rx, task) = start(SimConfig::default());

    let mut last = None;
    for _ in 0..5 {
        last = Some(next_frame(&mut rx).await);
    }
    let state = last.unwrap();
    for p in PlayerIndex::ALL {
        assert_eq!(*state.trajectory(p).head(), Player::at(400.0, 400.0));
        assert_eq!(state.trajectory(p).len(), 6);
    }
    assert_eq!(state.collision_counts, [0, 0]);

    handle.stop();
    let stats = task.await.unwrap();
    assert_eq!(stats.steps, 5);
    assert_eq!(stats.published, 5);
}

#[tokio::test(start_paused = true)]
async fn held_key_accelerates_until_release() {
    let (handle, mut rx, task) = start(SimConfig::default());
    handle.key(KeyEvent::down(P1_RIGHT)).unwrap();

    let mut x = 400.0;
    for expected_vx in [2.0, 4.0, 6.0] {
        let frame = next_frame(&mut rx).await;
        let head = frame.trajectory(PlayerIndex::One).head();
        x += expected_vx;
        assert_eq!(head.vx, expected_vx);
        assert_eq!(head.x, x);
    }

    // The release itself is a new combined sample and steps immediately.
    handle.key(KeyEvent::up(P1_RIGHT)).unwrap();
    for expected_vx in [5.0, 4.0, 3.0, 2.0, 1.0, 0.0] {
        let frame = next_frame(&mut rx).await;
        assert_eq!(frame.trajectory(PlayerIndex::One).head().vx, expected_vx);
    }

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn collision_counts_once_for_named_player() {
    let (handle, mut rx, task) = start(SimConfig::default());
    next_frame(&mut rx).await;
    next_frame(&mut rx).await;

    handle.collision(CollisionEvent { player_index: 0 }).unwrap();
    let hit = next_frame(&mut rx).await;
    assert_eq!(hit.collision_counts, [1, 0]);

    for _ in 0..5 {
        let frame = next_frame(&mut rx).await;
        assert_eq!(frame.collision_counts, [1, 0], "collision must not be re-applied");
    }

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn burst_of_collisions_is_coalesced() {
    let (handle, mut rx, task) = start(SimConfig::default());
    next_frame(&mut rx).await;

    handle.collision(CollisionEvent { player_index: 1 }).unwrap();
    handle.collision(CollisionEvent { player_index: 1 }).unwrap();
    handle.collision(CollisionEvent { player_index: 0 }).unwrap();
    let hit = next_frame(&mut rx).await;
    assert_eq!(hit.collision_counts, [0, 1]);

    // Next window: accepted again.
    tokio::time::sleep(Duration::from_millis(15)).await;
    handle.collision(CollisionEvent { player_index: 0 }).unwrap();
    handle.stop();
    let stats = task.await.unwrap();

    assert_eq!(handle.snapshot().collision_counts, [1, 1]);
    assert_eq!(stats.collisions_coalesced, 2);
}

#[tokio::test(start_paused = true)]
async fn collision_before_first_tick_is_dropped() {
    let (handle, mut rx, task) = start(SimConfig::default());
    handle.collision(CollisionEvent { player_index: 0 }).unwrap();

    let first = next_frame(&mut rx).await;
    assert_eq!(first.collision_counts, [0, 0]);

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn early_collision_does_not_swallow_the_next_one() {
    let (handle, mut rx, task) = start(SimConfig::default());

    tokio::time::sleep(Duration::from_millis(5)).await;
    handle.collision(CollisionEvent { player_index: 0 }).unwrap();

    let first = next_frame(&mut rx).await;
    assert_eq!(first.collision_counts, [0, 0]);

    // Inside one tick window of the dropped report, but it was never counted.
    tokio::time::sleep(Duration::from_millis(2)).await;
    handle.collision(CollisionEvent { player_index: 1 }).unwrap();
    let frame = next_frame(&mut rx).await;
    assert_eq!(frame.collision_counts, [0, 1]);

    handle.stop();
    let stats = task.await.unwrap();
    assert_eq!(stats.collisions_coalesced, 0);
}

#[tokio::test(start_paused = true)]
async fn wall_pins_position_but_not_velocity() {
    let config = SimConfig {
        spawns: [
            SpawnPoint { x: 1380.0, y: 10.0 },
            SpawnPoint { x: 400.0, y: 400.0 },
        ],
        ..SimConfig::default()
    };
    let (handle, mut rx, task) = start(config);
    handle.key(KeyEvent::down(P1_RIGHT)).unwrap();

    for expected_vx in [2.0, 4.0, 6.0, 8.0] {
        let frame = next_frame(&mut rx).await;
        let head = frame.trajectory(PlayerIndex::One).head();
        assert_eq!(head.x, 1380.0);
        assert_eq!(head.vx, expected_vx);
    }

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn identical_states_are_not_republished() {
    let config = SimConfig {
        trail_policy: TrailPolicy::OnMove,
        ..SimConfig::default()
    };
    let (handle, mut rx, task) = start(config);

    tokio::time::sleep(Duration::from_millis(55)).await;
    handle.stop();
    let stats = task.await.unwrap();

    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.steps, 5);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.suppressed, 4);
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn unmapped_keys_still_step_without_moving() {
    let (handle, mut rx, task) = start(SimConfig::default());
    next_frame(&mut rx).await;

    handle.key(KeyEvent::down(13)).unwrap();
    let frame = next_frame(&mut rx).await;
    assert_eq!(frame.trajectory(PlayerIndex::One).len(), 3);
    assert_eq!(*frame.trajectory(PlayerIndex::One).head(), Player::at(400.0, 400.0));

    handle.stop();
    task.await.unwrap();
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Down(u32),
        Up(u32),
        Collide(usize),
        Wait(u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        let code = proptest::sample::select(vec![37u32, 39, 65, 68, 13]);
        prop_oneof![
            code.clone().prop_map(Op::Down),
            code.prop_map(Op::Up),
            (0usize..3).prop_map(Op::Collide),
            (1u64..40).prop_map(Op::Wait),
        ]
    }

    fn run(ops: Vec<Op>) -> (Vec<Arc<GameState>>, SessionStats) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async move {
            let (handle, mut rx, task) = start(SimConfig::default());
            for op in ops {
                match op {
                    Op::Down(code) => handle.key(KeyEvent::down(code)).unwrap(),
                    Op::Up(code) => handle.key(KeyEvent::up(code)).unwrap(),
                    Op::Collide(idx) => handle
                        .collision(CollisionEvent { player_index: idx })
                        .unwrap(),
                    Op::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                }
            }
            handle.stop();
            let stats = task.await.unwrap();
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            (frames, stats)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn published_frames_are_distinct_legal_successors(
            ops in proptest::collection::vec(arb_op(), 1..60)
        ) {
            let config = SimConfig::default();
            let (frames, stats) = run(ops);
            prop_assert_eq!(frames.len() as u64, stats.published);

            for pair in frames.windows(2) {
                prop_assert_ne!(&*pair[0], &*pair[1]);
                assert_successor(&pair[0], &pair[1]);
            }
            for frame in &frames {
                for head in frame.heads() {
                    prop_assert!((0.0..=config.arena_width).contains(&head.x));
                    prop_assert!((0.0..=config.arena_height).contains(&head.y));
                }
            }
        }
    }
}
