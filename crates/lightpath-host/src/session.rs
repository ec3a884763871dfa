use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::StreamExt;

use lightpath_core::combine::CombineLatest;
use lightpath_core::config::SimConfig;
use lightpath_core::controls::{ControlScheme, PlayerMoves};
use lightpath_core::keys::{KeyEvent, KeyTracker};
use lightpath_core::physics::step;
use lightpath_core::publisher::{RenderSink, StatePublisher};
use lightpath_core::state::{CollisionSample, GameState};

use crate::clock::{SimulationClock, Tick};
use crate::collision::{CollisionEvent, CollisionSignal};

/// Commands sent from the host to the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Key(KeyEvent),
    Collision(CollisionEvent),
    Stop,
}

/// Returned when sending to a session whose task has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl std::fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "simulation session has stopped")
    }
}

impl std::error::Error for SessionClosed {}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: Tick,
    pub steps: u64,
    pub published: u64,
    pub suppressed: u64,
    pub collisions_coalesced: u64,
    pub collisions_rejected: u64,
}

/// Host-side handle to a running session.
///
/// The session task is the only writer of game state; the handle feeds it
/// input and reads the latest published snapshot.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    state_rx: watch::Receiver<Arc<GameState>>,
}

impl SessionHandle {
    pub fn key(&self, event: KeyEvent) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Key(event))
    }

    pub fn collision(&self, event: CollisionEvent) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Collision(event))
    }

    /// Ask the session to exit after processing already-queued commands.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Stop);
    }

    pub fn send(&self, cmd: SessionCommand) -> Result<(), SessionClosed> {
        self.cmd_tx.send(cmd).map_err(|_| SessionClosed)
    }

    /// Latest state produced by the reducer.
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.state_rx.borrow())
    }

    /// Receiver notified on every new state.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameState>> {
        self.state_rx.clone()
    }
}

/// Spawn the simulation as a tokio task.
/// Returns the handle and the task, which yields its counters on exit.
pub fn spawn_session<S>(config: SimConfig, sink: S) -> (SessionHandle, JoinHandle<SessionStats>)
where
    S: RenderSink + Send + 'static,
{
    let initial = Arc::new(GameState::new(config.spawn_players()));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(Arc::clone(&initial));

    let handle = tokio::spawn(async move {
        let mut session = Session::new(config, initial, sink, state_tx);
        session.run(cmd_rx).await
    });

    (SessionHandle { cmd_tx, state_rx }, handle)
}

/// Owns the authoritative state and everything that feeds it.
struct Session<S> {
    config: SimConfig,
    controls: ControlScheme,
    keys: KeyTracker,
    collisions: CollisionSignal,
    join: CombineLatest<PlayerMoves, Tick, CollisionSample>,
    state: Arc<GameState>,
    publisher: StatePublisher<S>,
    state_tx: watch::Sender<Arc<GameState>>,
    steps: u64,
}

impl<S: RenderSink> Session<S> {
    fn new(
        config: SimConfig,
        initial: Arc<GameState>,
        sink: S,
        state_tx: watch::Sender<Arc<GameState>>,
    ) -> Self {
        let controls = ControlScheme::new(&config.controls);
        let keys = KeyTracker::new();
        let collisions = CollisionSignal::new(config.tick_period());

        // Keys and collisions both read neutral before their first event, so
        // the first clock tick is what starts the simulation.
        let mut join = CombineLatest::new();
        join.push_a(controls.map(keys.held()));
        join.push_c(collisions.neutral());

        Self {
            config,
            controls,
            keys,
            collisions,
            join,
            state: initial,
            publisher: StatePublisher::new(sink),
            state_tx,
            steps: 0,
        }
    }

    async fn run(&mut self, mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>) -> SessionStats {
        let mut clock = SimulationClock::new(self.config.tick_period());
        tracing::info!(
            tick_ms = self.config.tick_ms,
            trail_policy = ?self.config.trail_policy,
            friction_policy = ?self.config.friction_policy,
            "Simulation session started"
        );

        loop {
            tokio::select! {
                // Queued input is drained before a tick that became ready
                // at the same time.
                biased;
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Key(event)) => self.on_key(event),
                        Some(SessionCommand::Collision(event)) => self.on_collision(event),
                        Some(SessionCommand::Stop) | None => break,
                    }
                }
                Some(tick) = clock.next() => self.on_tick(tick),
            }
        }

        let stats = SessionStats {
            ticks: clock.elapsed_ticks(),
            steps: self.steps,
            published: self.publisher.published(),
            suppressed: self.publisher.suppressed(),
            collisions_coalesced: self.collisions.coalesced(),
            collisions_rejected: self.collisions.rejected(),
        };
        tracing::info!(?stats, "Simulation session stopped");
        stats
    }

    fn on_key(&mut self, event: KeyEvent) {
        let moves = self.controls.map(self.keys.apply(event));
        if let Some((moves, _, collision)) = self.join.push_a(moves) {
            let next = step(&self.state, moves, *collision, &self.config);
            self.commit(next);
        }
    }

    fn on_tick(&mut self, tick: Tick) {
        if let Some((moves, _, collision)) = self.join.push_b(tick) {
            let next = step(&self.state, moves, *collision, &self.config);
            self.commit(next);
        }
    }

    fn on_collision(&mut self, event: CollisionEvent) {
        // A report that can't reach a step must not open a coalescing window.
        if !self.join.is_ready() {
            tracing::debug!(
                player_index = event.player_index,
                "Collision before first tick dropped"
            );
            return;
        }
        let Some(sample) = self.collisions.on_event(event, Instant::now()) else {
            return;
        };
        if let Some((moves, _, collision)) = self.join.push_c(sample) {
            let next = step(&self.state, moves, *collision, &self.config);
            self.commit(next);
        }
        self.join.reset_c(self.collisions.neutral());
    }

    fn commit(&mut self, next: GameState) {
        self.steps += 1;
        self.state = Arc::new(next);
        self.publisher.publish(&self.state);
        self.state_tx.send_replace(Arc::clone(&self.state));
    }
}
