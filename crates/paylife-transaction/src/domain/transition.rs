//! The transition function: `(status, event) -> next status | rejection`.
//!
//! Pure and deterministic. Every (status, event kind) pair is either listed
//! below or rejected as an illegal transition; nothing is guessed.

use paylife_core::error::RejectionReason;

use super::events::{TransactionEvent, TransactionEventKind};
use super::status::{AuthorizationOutcome, ClosureOutcome, StreamPosition, TransactionStatus};

/// Applies one event to a status, producing the next status.
///
/// Checks run in a fixed order: a closed transaction rejects everything,
/// then the sequence number must be exactly `last_sequence + 1`, then the
/// event must belong to the same transaction, and finally the kind must be
/// legal for the current status.
///
/// # Errors
///
/// Returns the [`RejectionReason`] for the first failed check.
pub fn apply(
    current: TransactionStatus,
    event: &TransactionEvent,
) -> Result<TransactionStatus, RejectionReason> {
    use TransactionEventKind as Kind;
    use TransactionStatus as Status;

    if current.is_terminal() {
        return Err(RejectionReason::TerminalState);
    }

    let found = event.sequence();
    if current.last_sequence().checked_add(1) != Some(found) {
        return Err(RejectionReason::SequenceGap {
            expected: current.next_sequence(),
            found,
        });
    }

    if let Some(own) = current.transaction_id()
        && own != event.transaction_id()
    {
        return Err(RejectionReason::TransactionMismatch {
            expected: own.as_uuid(),
            found: event.transaction_id().as_uuid(),
        });
    }

    let position = StreamPosition {
        transaction_id: event.transaction_id(),
        last_sequence: found,
    };
    let closed = |outcome| Status::Closed { position, outcome };

    match (current, event.kind) {
        (Status::Empty, Kind::ActivationRequested) => Ok(Status::ActivationRequested(position)),
        (Status::ActivationRequested(_), Kind::Activated) => Ok(Status::Activated(position)),
        (Status::ActivationRequested(_), Kind::ActivationExpired) => {
            Ok(closed(ClosureOutcome::Expired))
        }
        (Status::Activated(_), Kind::AuthorizationRequested) => {
            Ok(Status::AuthorizationRequested(position))
        }
        (Status::AuthorizationRequested(_), Kind::AuthorizationOutcome { outcome }) => {
            Ok(Status::AuthorizationCompleted { position, outcome })
        }
        (
            Status::AuthorizationCompleted {
                outcome: AuthorizationOutcome::Approved,
                ..
            },
            Kind::Settlement,
        ) => Ok(closed(ClosureOutcome::Settled)),
        (
            Status::AuthorizationCompleted {
                outcome: AuthorizationOutcome::Approved,
                ..
            },
            Kind::Refund,
        ) => Ok(closed(ClosureOutcome::Refunded)),
        (
            Status::AuthorizationCompleted {
                outcome: AuthorizationOutcome::Denied,
                ..
            },
            Kind::Close,
        ) => Ok(closed(ClosureOutcome::AuthorizationDenied)),
        // Cancellation is refused only while the provider holds an
        // authorization attempt.
        (
            Status::Empty
            | Status::ActivationRequested(_)
            | Status::Activated(_)
            | Status::AuthorizationCompleted { .. },
            Kind::Cancel,
        ) => Ok(closed(ClosureOutcome::Cancelled)),
        (Status::Closed { .. }, _) => Err(RejectionReason::TerminalState),
        (status, kind) => Err(RejectionReason::IllegalTransition {
            status: status.status_code(),
            kind: kind.event_type(),
        }),
    }
}
