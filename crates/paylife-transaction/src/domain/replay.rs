//! Replay engine: folds an ordered history over the transition function.

use std::borrow::Borrow;

use paylife_core::error::RejectionReason;
use thiserror::Error;

use super::events::TransactionEvent;
use super::status::TransactionStatus;
use super::transition;

/// A history event could not be applied. The log is corrupted or tampered
/// with; rehydration of that transaction must not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("replay rejected event at sequence {sequence}: {reason}")]
pub struct ReplayError {
    /// Sequence number of the offending event.
    pub sequence: i64,
    /// Why the event was rejected.
    pub reason: RejectionReason,
}

/// Lazy, step-wise fold of events over [`transition::apply`].
///
/// Yields the status after each applied event. After the first rejection it
/// yields the error once and then stops; [`Replay::status`] keeps the last
/// good status so a caller can inspect where replay halted, and
/// [`Replay::resume`] can continue from any known status.
#[derive(Debug, Clone)]
pub struct Replay<I> {
    status: TransactionStatus,
    events: I,
    halted: bool,
}

impl<I> Replay<I>
where
    I: Iterator,
    I::Item: Borrow<TransactionEvent>,
{
    /// Starts a replay from [`TransactionStatus::Empty`].
    pub fn new(events: impl IntoIterator<IntoIter = I>) -> Self {
        Self::resume(TransactionStatus::Empty, events)
    }

    /// Continues a replay from an already known status.
    pub fn resume(status: TransactionStatus, events: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            status,
            events: events.into_iter(),
            halted: false,
        }
    }

    /// The status after the last successfully applied event.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Drives the replay to the end of the history.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReplayError`] encountered.
    pub fn finish(mut self) -> Result<TransactionStatus, ReplayError> {
        for step in self.by_ref() {
            step?;
        }
        Ok(self.status)
    }
}

impl<I> Iterator for Replay<I>
where
    I: Iterator,
    I::Item: Borrow<TransactionEvent>,
{
    type Item = Result<TransactionStatus, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let item = self.events.next()?;
        let event = item.borrow();
        match transition::apply(self.status, event) {
            Ok(next) => {
                self.status = next;
                Some(Ok(next))
            }
            Err(reason) => {
                self.halted = true;
                Some(Err(ReplayError {
                    sequence: event.sequence(),
                    reason,
                }))
            }
        }
    }
}

/// Rebuilds the current status from a transaction's full history. An empty
/// history yields [`TransactionStatus::Empty`].
///
/// # Errors
///
/// Returns a [`ReplayError`] naming the first event that cannot be applied.
pub fn rehydrate<H>(history: H) -> Result<TransactionStatus, ReplayError>
where
    H: IntoIterator,
    H::Item: Borrow<TransactionEvent>,
{
    Replay::new(history).finish()
}
