//! Parkpay Core Library
//!
//! Domain types, tariff computation and ledger stores for the parking
//! payment daemon. Device I/O lives in `parkpay-adapter-serial`.

pub mod fee;
pub mod ledger;
pub mod types;

pub use fee::{compute, Fee, FeeError, DEFAULT_RATE_PER_HOUR};
pub use ledger::{CsvLedger, LedgerStore, MemoryLedger, StorageError};
pub use types::{EntryRecord, PaymentStatus, TransactionRecord};
