use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::Stream;
use tokio_stream::wrappers::IntervalStream;

/// Logical simulation time: the number of clock ticks elapsed, starting at 1.
pub type Tick = u64;

/// Fixed-period tick source. The first tick fires one full period after
/// creation; late ticks are skipped rather than burst.
pub struct SimulationClock {
    ticks: IntervalStream,
    count: Tick,
}

impl SimulationClock {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticks: IntervalStream::new(interval),
            count: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.ticks.as_ref().period()
    }

    /// Ticks emitted so far.
    pub fn elapsed_ticks(&self) -> Tick {
        self.count
    }
}

impl Stream for SimulationClock {
    type Item = Tick;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Tick>> {
        match Pin::new(&mut self.ticks).poll_next(cx) {
            Poll::Ready(Some(_)) => {
                self.count += 1;
                Poll::Ready(Some(self.count))
            },
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
