//! # Parkpay Serial Adapter
//!
//! Host-side payment protocol for a serial-attached gate controller.
//!
//! The gate controller reports a vehicle's plate and prepaid balance as one
//! line; this crate correlates the plate with the entry ledger, computes the
//! tariff, commands the device to deduct the fee and commits both ledgers
//! only after the device confirms.
//!
//! ## Architecture
//!
//! ```text
//! Gate controller (device)
//!       │ serial, one message per line
//!       ▼
//! ┌───────────────────────────────────┐
//! │    parkpay-adapter-serial         │
//! │  ┌──────────┐   ┌──────────────┐  │
//! │  │ Listener │──►│ Payment      │  │
//! │  │ (lines)  │   │ Session      │  │
//! │  └──────────┘   └──────┬───────┘  │
//! └────────────────────────┼──────────┘
//!                          ▼
//! ┌───────────────────────────────────┐
//! │    parkpay-core                   │
//! │  Tariff │ Entry log │ Transactions│
//! └───────────────────────────────────┘
//! ```
//!
//! ## Wire protocol
//!
//! | direction | line | meaning |
//! |-----------|------|---------|
//! | device → host | `PLATE:<plate>\|BALANCE:<n>` | vehicle at gate with prepaid balance |
//! | host → device | `PAY:<n>` | deduct `n` from the held account |
//! | device → host | `DONE` | deduction performed |
//!
//! Any acknowledgment other than the exact `DONE` literal — including a
//! timeout — fails the event without touching the ledgers, and the request
//! is never retried: a second `PAY` could double-deduct.

pub mod channel;
pub mod config;
pub mod listener;
pub mod session;
pub mod wire;

pub use channel::{DeviceChannel, MockChannel, SerialChannel, TransportError};
pub use config::{AdapterConfig, DeviceConfig, LedgerConfig, TariffConfig};
pub use listener::Listener;
pub use session::{PaymentSession, ProtocolFailure, SessionError, SessionOutcome};
pub use wire::{PlateEvent, WireError};
