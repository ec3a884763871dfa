use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lightpath_core::publisher::RenderSink;
use lightpath_core::state::{GameState, PLAYER_COUNT, Player};

/// Forwards every published state over an unbounded channel. A dropped
/// receiver is ignored; the simulation keeps running.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Arc<GameState>>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Arc<GameState>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RenderSink for ChannelSink {
    fn render(&mut self, state: &Arc<GameState>) {
        let _ = self.tx.send(Arc::clone(state));
    }
}

/// Compact per-frame view: where each player is now, without the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub heads: [Player; PLAYER_COUNT],
    pub trail_lengths: [usize; PLAYER_COUNT],
    pub collisions: [u32; PLAYER_COUNT],
}

impl From<&GameState> for FrameSummary {
    fn from(state: &GameState) -> Self {
        Self {
            heads: state.heads(),
            trail_lengths: [state.trajectories[0].len(), state.trajectories[1].len()],
            collisions: state.collision_counts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// Entire state, including full trajectories.
    Full,
    #[default]
    Summary,
}

/// Writes one JSON document per published state.
pub struct JsonLinesSink<W> {
    writer: W,
    format: FrameFormat,
    write_errors: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, format: FrameFormat) -> Self {
        Self {
            writer,
            format,
            write_errors: 0,
        }
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, state: &GameState) -> std::io::Result<()> {
        match self.format {
            FrameFormat::Full => serde_json::to_writer(&mut self.writer, state)?,
            FrameFormat::Summary => {
                serde_json::to_writer(&mut self.writer, &FrameSummary::from(state))?
            },
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, state: &Arc<GameState>) {
        if let Err(e) = self.write_frame(state) {
            self.write_errors += 1;
            tracing::error!(error = %e, errors = self.write_errors, "Failed to write frame");
        }
    }
}

/// Move frame writing off the session task. Returns a sink for the session
/// and the blocking writer task, which drains frames into `writer` until the
/// sink is dropped and then hands the writer back.
pub fn spawn_frame_writer<W>(
    writer: W,
    format: FrameFormat,
) -> (ChannelSink, JoinHandle<JsonLinesSink<W>>)
where
    W: Write + Send + 'static,
{
    let (sink, mut frames) = ChannelSink::channel();
    let task = tokio::task::spawn_blocking(move || {
        let mut out = JsonLinesSink::new(writer, format);
        while let Some(state) = frames.blocking_recv() {
            out.render(&state);
        }
        out
    });
    (sink, task)
}
