//! Gate event listener
//!
//! Unbounded read loop over the device channel: one line per iteration,
//! idle timeouts tolerated, malformed lines logged and dropped. A
//! well-formed event runs a payment session to completion before the next
//! line is read, so the single physical link never carries two interleaved
//! request/acknowledge exchanges.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use parkpay_core::ledger::LedgerStore;

use crate::channel::{DeviceChannel, TransportError};
use crate::session::{PaymentSession, ProtocolFailure, SessionError, SessionOutcome};
use crate::wire;

/// Outer loop owning the channel and the session
pub struct Listener<C, L> {
    channel: C,
    session: PaymentSession<L>,
    read_timeout: Duration,
}

impl<C: DeviceChannel, L: LedgerStore> Listener<C, L> {
    pub fn new(channel: C, session: PaymentSession<L>, read_timeout: Duration) -> Self {
        Self {
            channel,
            session,
            read_timeout,
        }
    }

    pub fn session(&self) -> &PaymentSession<L> {
        &self.session
    }

    /// Run until the transport fails
    ///
    /// Ledger failures are reported per event and the loop continues;
    /// transport failures propagate so the caller can decide whether to
    /// reopen the link. The channel is released when the listener is
    /// dropped, on every exit path.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        let Self {
            channel,
            session,
            read_timeout,
        } = self;

        loop {
            let line = match channel.recv_line(*read_timeout).await? {
                None => continue,
                Some(line) if line.is_empty() => continue,
                Some(line) => line,
            };
            debug!("received: {}", line);

            let event = match wire::parse_event(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("discarding line ({}): {:?}", e, line);
                    continue;
                }
            };
            info!(
                "gate event: plate {:?} balance {}",
                event.plate, event.balance
            );

            match session.settle(channel, &event).await {
                Ok(SessionOutcome::Paid(record)) => {
                    info!(
                        "plate {} paid {} for {} h",
                        record.plate_number, record.amount, record.duration_hr
                    );
                }
                Ok(SessionOutcome::UnknownPlate) => {
                    warn!("plate {:?} has no open entry", event.plate);
                }
                Ok(SessionOutcome::InvalidInterval) => {
                    error!(
                        "plate {:?}: entry time is in the future, event dropped",
                        event.plate
                    );
                }
                Ok(SessionOutcome::InsufficientBalance { amount_due, balance }) => {
                    warn!(
                        "plate {:?}: balance {} below amount due {}",
                        event.plate, balance, amount_due
                    );
                }
                Ok(SessionOutcome::ProtocolFailure(ProtocolFailure::AckTimeout)) => {
                    error!(
                        "plate {:?}: no confirmation from device, ledgers untouched",
                        event.plate
                    );
                }
                Ok(SessionOutcome::ProtocolFailure(ProtocolFailure::AckMismatch(reply))) => {
                    error!(
                        "plate {:?}: device answered {:?} instead of {}, ledgers untouched",
                        event.plate,
                        reply,
                        wire::ACK_DONE
                    );
                }
                Err(SessionError::Storage(e)) => {
                    // the event is lost but the link is fine; keep listening
                    error!("ledger failure while settling {:?}: {}", event.plate, e);
                }
                Err(SessionError::Transport(e)) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Local};
    use parkpay_core::ledger::MemoryLedger;
    use parkpay_core::types::{EntryRecord, PaymentStatus};

    use crate::channel::MockChannel;

    fn listener_over(
        channel: MockChannel,
        ledger: MemoryLedger,
    ) -> Listener<MockChannel, MemoryLedger> {
        let session = PaymentSession::new(ledger, 200, Duration::from_millis(10));
        Listener::new(channel, session, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_full_exchange_through_noise() {
        let entered_at = Local::now().naive_local() - ChronoDuration::hours(2);
        let ledger = MemoryLedger::new().with_entry(EntryRecord::new("ABC123", entered_at));
        let channel = MockChannel::new()
            .push_line("boot: gate controller v1")
            .push_timeout()
            .push_line("PLATE:ABC123|BALANCE:500")
            .push_line("DONE");
        let mut listener = listener_over(channel, ledger);

        // script exhaustion reads as a closed link
        let err = listener.run().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let ledger = listener.session().ledger();
        assert_eq!(ledger.entries()[0].status, PaymentStatus::Paid);
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].amount, 400);
    }

    #[tokio::test]
    async fn test_failed_event_does_not_stop_the_loop() {
        let entered_at = Local::now().naive_local() - ChronoDuration::hours(1);
        let ledger = MemoryLedger::new()
            .with_entry(EntryRecord::new("AAA111", entered_at))
            .with_entry(EntryRecord::new("BBB222", entered_at));
        let channel = MockChannel::new()
            // first event: device answers garbage, no commit
            .push_line("PLATE:AAA111|BALANCE:900")
            .push_line("WHAT")
            // second event succeeds
            .push_line("PLATE:BBB222|BALANCE:900")
            .push_line("DONE");
        let mut listener = listener_over(channel, ledger);

        let err = listener.run().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let ledger = listener.session().ledger();
        assert!(ledger.entries()[0].is_open());
        assert_eq!(ledger.entries()[1].status, PaymentStatus::Paid);
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].plate_number, "BBB222");
    }

    #[tokio::test]
    async fn test_malformed_lines_never_reach_the_session() {
        let channel = MockChannel::new()
            .push_line("PLATE:ABC123")
            .push_line("BALANCE:500")
            .push_line("PLATE:ABC123|BALANCE:not-a-number");
        let mut listener = listener_over(channel, MemoryLedger::new());

        let err = listener.run().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert!(listener.session().ledger().transactions().is_empty());
    }
}
