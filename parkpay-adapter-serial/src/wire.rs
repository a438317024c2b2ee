//! Gate controller line protocol
//!
//! One message per newline-terminated line:
//! - inbound event: `PLATE:<plate>|BALANCE:<integer>`
//! - outbound request: `PAY:<integer>`
//! - inbound acknowledgment: the exact literal `DONE`

use thiserror::Error;

/// Marker introducing the plate field
pub const PLATE_MARKER: &str = "PLATE:";

/// Marker introducing the balance field
pub const BALANCE_MARKER: &str = "BALANCE:";

/// Confirmation token the device returns after a performed deduction
pub const ACK_DONE: &str = "DONE";

/// A vehicle-at-gate report: plate plus prepaid balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateEvent {
    /// Plate identifier as received; no canonicalization
    pub plate: String,
    /// Prepaid balance on the device-held account, integer currency units
    pub balance: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("line carries no plate/balance markers")]
    NotAnEvent,

    #[error("plate marker outside the first field")]
    MisplacedPlate,

    #[error("balance marker outside the second field")]
    MisplacedBalance,

    #[error("balance is not an integer: {0:?}")]
    BadBalance(String),
}

/// Parse an inbound line as a gate event
///
/// A line is a candidate iff it contains both markers. The plate is the text
/// after `PLATE:` within the first `|`-separated field; the balance is the
/// integer after `BALANCE:` in the second field. Anything else is rejected
/// for the listener to discard.
pub fn parse_event(line: &str) -> Result<PlateEvent, WireError> {
    if !line.contains(PLATE_MARKER) || !line.contains(BALANCE_MARKER) {
        return Err(WireError::NotAnEvent);
    }

    let mut fields = line.split('|');
    let plate_field = fields.next().unwrap_or_default();
    let balance_field = fields.next().unwrap_or_default();

    let (_, plate) = plate_field
        .split_once(PLATE_MARKER)
        .ok_or(WireError::MisplacedPlate)?;
    let (_, balance_text) = balance_field
        .split_once(BALANCE_MARKER)
        .ok_or(WireError::MisplacedBalance)?;

    let balance = balance_text
        .trim()
        .parse::<i64>()
        .map_err(|_| WireError::BadBalance(balance_text.to_string()))?;

    Ok(PlateEvent {
        plate: plate.trim().to_string(),
        balance,
    })
}

/// Encode the deduction request for `amount` currency units
pub fn pay_request(amount: i64) -> String {
    format!("PAY:{}", amount)
}

/// Whether `line` is the exact confirmation token
pub fn is_ack(line: &str) -> bool {
    line.trim() == ACK_DONE
}
