use std::sync::Arc;

use crate::state::GameState;

/// Consumer of published game states, typically a renderer.
pub trait RenderSink {
    fn render(&mut self, state: &Arc<GameState>);
}

impl<F> RenderSink for F
where
    F: FnMut(&Arc<GameState>),
{
    fn render(&mut self, state: &Arc<GameState>) {
        self(state)
    }
}

/// Forwards states to a sink, suppressing any state structurally equal to
/// the one forwarded immediately before it.
pub struct StatePublisher<S> {
    sink: S,
    last: Option<Arc<GameState>>,
    published: u64,
    suppressed: u64,
}

impl<S: RenderSink> StatePublisher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last: None,
            published: 0,
            suppressed: 0,
        }
    }

    /// Returns `true` if the state was forwarded.
    pub fn publish(&mut self, state: &Arc<GameState>) -> bool {
        if let Some(last) = &self.last
            && (Arc::ptr_eq(last, state) || **last == **state)
        {
            self.suppressed += 1;
            tracing::trace!(suppressed = self.suppressed, "Duplicate state not forwarded");
            return false;
        }
        self.sink.render(state);
        self.last = Some(Arc::clone(state));
        self.published += 1;
        true
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
