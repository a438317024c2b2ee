//! Record types for the two persisted ledgers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Payment state of a parking session
///
/// Stored as `"0"`/`"1"` in the entry log, matching what the external
/// entry-logging process writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "0")]
    Unpaid,
    #[serde(rename = "1")]
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "0"),
            PaymentStatus::Paid => write!(f, "1"),
        }
    }
}

/// One parking session's start, as written by the entry-logging process
///
/// Created externally when a vehicle enters; this crate only ever flips
/// `status` to `Paid`. Timestamps are host-local, ISO-8601, no timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(rename = "Plate Number")]
    pub plate: String,
    #[serde(rename = "Payment Status")]
    pub status: PaymentStatus,
    #[serde(rename = "Timestamp")]
    pub entered_at: NaiveDateTime,
}

impl EntryRecord {
    /// New unpaid entry (tests and tooling; production rows come from the
    /// entry-logging process)
    pub fn new(plate: impl Into<String>, entered_at: NaiveDateTime) -> Self {
        Self {
            plate: plate.into(),
            status: PaymentStatus::Unpaid,
            entered_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PaymentStatus::Unpaid
    }
}

/// Immutable record of one completed, confirmed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub plate_number: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub duration_hr: f64,
    pub amount: i64,
    pub payment_status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_status_roundtrip_as_digit() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer
            .serialize(EntryRecord {
                plate: "ABC123".into(),
                status: PaymentStatus::Unpaid,
                entered_at: ts("2024-01-01T10:00:00"),
            })
            .unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert!(data.starts_with("Plate Number,Payment Status,Timestamp\n"));
        assert!(data.contains("ABC123,0,2024-01-01T10:00:00"));
    }

    #[test]
    fn test_entry_parse_from_log_row() {
        let data = "Plate Number,Payment Status,Timestamp\nRAA 123 B,1,2024-03-05T08:30:00\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let entry: EntryRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(entry.plate, "RAA 123 B");
        assert_eq!(entry.status, PaymentStatus::Paid);
        assert!(!entry.is_open());
        assert_eq!(
            entry.entered_at.date(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }
}
