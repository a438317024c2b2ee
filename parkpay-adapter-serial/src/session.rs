//! Payment session state machine
//!
//! One session per inbound gate event:
//!
//! ```text
//! event ─ lookup ──► no open entry        (UnknownPlate, no-op)
//!            │
//!            ▼
//!          tariff ──► entry in the future (InvalidInterval, no-op)
//!            │
//!            ▼
//!        balance? ──► short               (InsufficientBalance, nothing sent)
//!            │
//!            ▼
//!        PAY:<due> ── wait one line ──► DONE   commit: mark paid + append
//!                          │
//!                          └──► timeout / anything else
//!                               (ProtocolFailure, no ledger mutation)
//! ```
//!
//! The ledger commit happens strictly after the device confirms: the stores
//! never record a deduction the device did not perform. The converse crash
//! window (device confirmed, host died before the write) is inherent to a
//! two-phase exchange over a physical link and is reported, never retried —
//! a second `PAY` could double-deduct.

use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

use parkpay_core::fee::{self, FeeError};
use parkpay_core::ledger::{LedgerStore, StorageError};
use parkpay_core::types::{PaymentStatus, TransactionRecord};

use crate::channel::{DeviceChannel, TransportError};
use crate::wire::{self, PlateEvent};

/// Terminal result of one session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Device confirmed the deduction; both ledgers updated.
    Paid(TransactionRecord),
    /// No open entry for the plate; nothing sent, nothing written.
    UnknownPlate,
    /// The entry timestamp lies in the future; event dropped.
    InvalidInterval,
    /// Balance below the amount due; nothing sent, nothing written.
    InsufficientBalance { amount_due: i64, balance: i64 },
    /// Request sent but not confirmed; no ledger mutation, no retry.
    ProtocolFailure(ProtocolFailure),
}

/// Ways the request/acknowledge exchange can fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolFailure {
    /// No acknowledgment line within the window.
    AckTimeout,
    /// The device answered something other than the confirmation token.
    AckMismatch(String),
}

/// Failures that end the session abnormally
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Protocol orchestrator: correlates events with the entry ledger and
/// drives the deduction exchange
///
/// Holds no per-event state; the channel is borrowed for the duration of
/// each settlement, which is what keeps the request/acknowledge exchange
/// exclusive on the shared link.
pub struct PaymentSession<L> {
    ledger: L,
    rate_per_hour: i64,
    ack_timeout: Duration,
}

impl<L: LedgerStore> PaymentSession<L> {
    pub fn new(ledger: L, rate_per_hour: i64, ack_timeout: Duration) -> Self {
        Self {
            ledger,
            rate_per_hour,
            ack_timeout,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Settle one gate event end to end
    pub async fn settle<C: DeviceChannel>(
        &mut self,
        channel: &mut C,
        event: &PlateEvent,
    ) -> Result<SessionOutcome, SessionError> {
        let Some(entry) = self.ledger.lookup_open_entry(&event.plate)? else {
            return Ok(SessionOutcome::UnknownPlate);
        };

        let now = Local::now().naive_local();
        let fee = match fee::compute(entry.entered_at, now, self.rate_per_hour) {
            Ok(fee) => fee,
            Err(FeeError::InvalidInterval { .. }) => {
                warn!(
                    "entry for plate {} is in the future ({})",
                    event.plate, entry.entered_at
                );
                return Ok(SessionOutcome::InvalidInterval);
            }
        };
        debug!(
            "plate {}: {} h parked, {} due, {} on account",
            event.plate, fee.duration_hours, fee.amount_due, event.balance
        );

        if event.balance < fee.amount_due {
            return Ok(SessionOutcome::InsufficientBalance {
                amount_due: fee.amount_due,
                balance: event.balance,
            });
        }

        channel.send_line(&wire::pay_request(fee.amount_due)).await?;

        // Exactly one acknowledgment line decides the event.
        match channel.recv_line(self.ack_timeout).await? {
            None => Ok(SessionOutcome::ProtocolFailure(ProtocolFailure::AckTimeout)),
            Some(line) if wire::is_ack(&line) => {
                // The device has deducted; make it durable.
                self.ledger.mark_paid(&event.plate)?;
                let record = TransactionRecord {
                    plate_number: event.plate.clone(),
                    entry_time: entry.entered_at,
                    exit_time: now,
                    duration_hr: fee.duration_hours,
                    amount: fee.amount_due,
                    payment_status: PaymentStatus::Paid,
                };
                self.ledger.append_transaction(&record)?;
                info!(
                    "payment committed: plate {} amount {}",
                    record.plate_number, record.amount
                );
                Ok(SessionOutcome::Paid(record))
            }
            Some(other) => Ok(SessionOutcome::ProtocolFailure(ProtocolFailure::AckMismatch(
                other,
            ))),
        }
    }
}
