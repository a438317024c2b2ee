//! Durable record stores for the two ledgers
//!
//! Two flat CSV files:
//! - the entry log, written by the external entry-logging process and
//!   mutated here only to flip a session's payment status;
//! - the transaction log, append-only, one row per confirmed payment.
//!
//! `mark_paid` rewrites the entry log through a temp-file-then-rename
//! replace so a crash mid-update never leaves a half-written store visible
//! to readers. One writer at a time is assumed; the payment session runs
//! events strictly sequentially.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{EntryRecord, PaymentStatus, TransactionRecord};

/// Errors from the underlying stores
///
/// Callers must not assume partial success: a failed `mark_paid` has not
/// changed the visible store, and a failed append has not recorded the row.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ledger record: {0}")]
    Csv(#[from] csv::Error),
}

/// Record access for the entry and transaction ledgers
pub trait LedgerStore {
    /// First unpaid entry for `plate` in storage order, if any.
    /// An absent or empty store is a miss, not an error.
    fn lookup_open_entry(&self, plate: &str) -> Result<Option<EntryRecord>, StorageError>;

    /// Transition the open entry for `plate` to paid.
    fn mark_paid(&mut self, plate: &str) -> Result<(), StorageError>;

    /// Append one confirmed payment, creating the store with a header if
    /// absent.
    fn append_transaction(&mut self, record: &TransactionRecord) -> Result<(), StorageError>;
}

/// CSV-file-backed ledger store
pub struct CsvLedger {
    entry_log: PathBuf,
    transaction_log: PathBuf,
}

impl CsvLedger {
    pub fn new(entry_log: impl Into<PathBuf>, transaction_log: impl Into<PathBuf>) -> Self {
        Self {
            entry_log: entry_log.into(),
            transaction_log: transaction_log.into(),
        }
    }

    fn read_entries(&self) -> Result<Vec<EntryRecord>, StorageError> {
        if !self.entry_log.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.entry_log)?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Replace the entry log atomically: write everything to a temp file in
    /// the same directory, then rename over the original.
    fn write_entries(&self, entries: &[EntryRecord]) -> Result<(), StorageError> {
        let temp_path = self.entry_log.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&temp_path)?;
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&temp_path, &self.entry_log)?;
        Ok(())
    }
}

impl LedgerStore for CsvLedger {
    fn lookup_open_entry(&self, plate: &str) -> Result<Option<EntryRecord>, StorageError> {
        Ok(self
            .read_entries()?
            .into_iter()
            .find(|e| e.plate == plate && e.is_open()))
    }

    fn mark_paid(&mut self, plate: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;

        let open: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.plate == plate && e.is_open())
            .map(|(i, _)| i)
            .collect();

        match open.as_slice() {
            [] => {
                warn!("no open entry for plate {}, entry log unchanged", plate);
                return Ok(());
            }
            [first, rest @ ..] => {
                // Only the row the lookup returned; duplicates would mean the
                // entry log violated its single-open-entry invariant.
                if !rest.is_empty() {
                    warn!(
                        "plate {} has {} open entries, settling only the first",
                        plate,
                        open.len()
                    );
                }
                entries[*first].status = PaymentStatus::Paid;
            }
        }

        self.write_entries(&entries)?;
        debug!("entry log updated: plate {} marked paid", plate);
        Ok(())
    }

    fn append_transaction(&mut self, record: &TransactionRecord) -> Result<(), StorageError> {
        if let Some(parent) = self.transaction_log.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let exists = self.transaction_log.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.transaction_log)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!exists)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        debug!(
            "transaction appended: plate {} amount {}",
            record.plate_number, record.amount
        );
        Ok(())
    }
}

/// Read every transaction row (reporting and tests)
pub fn read_transactions(path: &Path) -> Result<Vec<TransactionRecord>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// In-memory ledger for testing
pub struct MemoryLedger {
    entries: Vec<EntryRecord>,
    transactions: Vec<TransactionRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            transactions: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: EntryRecord) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedger {
    fn lookup_open_entry(&self, plate: &str) -> Result<Option<EntryRecord>, StorageError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.plate == plate && e.is_open())
            .cloned())
    }

    fn mark_paid(&mut self, plate: &str) -> Result<(), StorageError> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.plate == plate && e.is_open())
        {
            entry.status = PaymentStatus::Paid;
        }
        Ok(())
    }

    fn append_transaction(&mut self, record: &TransactionRecord) -> Result<(), StorageError> {
        self.transactions.push(record.clone());
        Ok(())
    }
}
