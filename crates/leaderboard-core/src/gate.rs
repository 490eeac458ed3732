//! Ordering chain for concurrent publish workers.
//!
//! `chain(n)` hands out one [`Turn`] per position. Turn `i` may only
//! proceed once turn `i - 1` has been dropped. Dropping a turn always
//! signals its successor, so a worker that returns early, errors or panics
//! can never stall the positions behind it.
//!
//! ```text
//! turn 0 ──drop──▶ turn 1 ──drop──▶ turn 2 ──drop──▶ …
//! ```
//!
//! A turn that never got its go-ahead (timed out, cancelled, or its own
//! predecessor gave up) signals `Abandoned` instead of `Released`, and the
//! abandonment propagates down the rest of the chain. That keeps a late
//! position from publishing while an earlier one may still be in flight.

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Pending,
    Released,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("timed out waiting for the previous position")]
    TimedOut,
    #[error("cancelled while waiting for the previous position")]
    Cancelled,
    #[error("an earlier position was abandoned")]
    Abandoned,
}

/// One position in the chain. Signals the next position on drop.
#[derive(Debug)]
pub struct Turn {
    position: usize,
    prev: Option<watch::Receiver<Signal>>,
    done: watch::Sender<Signal>,
    outcome: Signal,
}

/// Build a chain of `n` linked turns, in position order.
pub fn chain(n: usize) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(n);
    let mut prev: Option<watch::Receiver<Signal>> = None;
    for position in 0..n {
        let (tx, rx) = watch::channel(Signal::Pending);
        turns.push(Turn {
            position,
            prev: prev.take(),
            done: tx,
            outcome: Signal::Abandoned,
        });
        prev = Some(rx);
    }
    turns
}

impl Turn {
    pub fn position(&self) -> usize {
        self.position
    }

    /// Wait until the previous position has finished, the deadline passes,
    /// or `cancel` fires. Position 0 never waits.
    pub async fn wait(&mut self, deadline: Instant, cancel: &CancellationToken) -> Result<(), TurnError> {
        let Some(rx) = self.prev.as_mut() else {
            self.outcome = Signal::Released;
            return Ok(());
        };

        let signal = tokio::select! {
            r = tokio::time::timeout_at(deadline, rx.wait_for(|s| *s != Signal::Pending)) => match r {
                Ok(Ok(s)) => *s,
                Ok(Err(_)) => Signal::Abandoned,
                Err(_) => return Err(TurnError::TimedOut),
            },
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
        };

        match signal {
            Signal::Released => {
                self.outcome = Signal::Released;
                Ok(())
            }
            _ => Err(TurnError::Abandoned),
        }
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.done.send_replace(self.outcome);
    }
}
