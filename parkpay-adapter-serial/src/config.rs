//! Configuration for the serial payment adapter

use std::path::PathBuf;
use std::time::Duration;

use parkpay_core::fee::DEFAULT_RATE_PER_HOUR;

/// Complete adapter configuration
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub device: DeviceConfig,
    pub tariff: TariffConfig,
    pub ledger: LedgerConfig,
}

/// Serial link settings
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Serial device path
    pub port: String,

    /// Baud rate
    pub baud: u32,

    /// Idle read timeout in the listener loop
    pub read_timeout: Duration,

    /// How long to wait for the `DONE` acknowledgment; the actuation path
    /// on the device is slower than its reporting path
    pub ack_timeout: Duration,

    /// Wait after opening the port; the board resets on open
    pub settle_delay: Duration,

    /// Initial reconnect delay after a transport failure
    pub reconnect_delay: Duration,

    /// Maximum reconnect delay (exponential backoff cap)
    pub max_reconnect_delay: Duration,
}

/// Tariff settings
#[derive(Debug, Clone)]
pub struct TariffConfig {
    /// Currency units per hour
    pub rate_per_hour: i64,
}

/// Ledger file locations
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Entry log written by the entry-logging process
    pub entry_log: PathBuf,

    /// Append-only transaction log
    pub transaction_log: PathBuf,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            tariff: TariffConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
            read_timeout: Duration::from_secs(2),
            ack_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(300),
        }
    }
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            rate_per_hour: DEFAULT_RATE_PER_HOUR,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            entry_log: PathBuf::from("plates_log.csv"),
            transaction_log: PathBuf::from("data/transactions.csv"),
        }
    }
}

impl AdapterConfig {
    /// Create config for a device port
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            device: DeviceConfig {
                port: port.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud(mut self, baud: u32) -> Self {
        self.device.baud = baud;
        self
    }

    /// Set the hourly rate
    pub fn with_rate(mut self, rate_per_hour: i64) -> Self {
        self.tariff.rate_per_hour = rate_per_hour;
        self
    }

    /// Set the entry log path
    pub fn with_entry_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger.entry_log = path.into();
        self
    }

    /// Set the transaction log path
    pub fn with_transaction_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger.transaction_log = path.into();
        self
    }

    /// Set the acknowledgment timeout
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.device.ack_timeout = timeout;
        self
    }
}
