//! Parkpay Node - CLI for the serial payment adapter
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port and ledgers
//! parkpay-node --port /dev/ttyUSB0
//!
//! # Custom tariff and ledger locations
//! parkpay-node --port /dev/ttyACM0 --rate 350 \
//!     --entry-log /var/lib/parkpay/plates_log.csv \
//!     --transaction-log /var/lib/parkpay/transactions.csv
//! ```
//!
//! The node opens the serial link, runs the listener until the link fails,
//! then reconnects with exponential backoff. Ctrl-C shuts down cleanly; the
//! ledgers' atomic-replace discipline means an interrupt never exposes a
//! half-written store.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use parkpay_adapter_serial::{AdapterConfig, Listener, PaymentSession, SerialChannel};
use parkpay_core::CsvLedger;

/// Serial parking payment daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial device path
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Tariff in currency units per hour
    #[arg(short, long, default_value = "200")]
    rate: i64,

    /// Entry log path
    #[arg(long, default_value = "plates_log.csv")]
    entry_log: String,

    /// Transaction log path
    #[arg(long, default_value = "data/transactions.csv")]
    transaction_log: String,

    /// Acknowledgment timeout in seconds
    #[arg(long, default_value = "5")]
    ack_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AdapterConfig::new(&args.port)
        .with_baud(args.baud)
        .with_rate(args.rate)
        .with_entry_log(&args.entry_log)
        .with_transaction_log(&args.transaction_log)
        .with_ack_timeout(Duration::from_secs(args.ack_timeout));

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║        Parkpay Node - Parking Payment Daemon          ║");
    println!("╠══════════════════════════════════════════════════════╣");
    println!("║  Port:      {:<40} ║", config.device.port);
    println!("║  Baud:      {:<40} ║", config.device.baud);
    println!("║  Rate:      {:<40} ║", config.tariff.rate_per_hour);
    println!(
        "║  Entry log: {:<40} ║",
        config.ledger.entry_log.display().to_string()
    );
    println!(
        "║  Tx log:    {:<40} ║",
        config.ledger.transaction_log.display().to_string()
    );
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut reconnect_delay = config.device.reconnect_delay;

    loop {
        let opened = SerialChannel::open(
            &config.device.port,
            config.device.baud,
            config.device.settle_delay,
        )
        .await;

        match opened {
            Ok(channel) => {
                let ledger = CsvLedger::new(
                    &config.ledger.entry_log,
                    &config.ledger.transaction_log,
                );
                let session = PaymentSession::new(
                    ledger,
                    config.tariff.rate_per_hour,
                    config.device.ack_timeout,
                );
                let mut listener =
                    Listener::new(channel, session, config.device.read_timeout);

                tokio::select! {
                    result = listener.run() => {
                        if let Err(e) = result {
                            error!("device link failed: {}", e);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupt received, shutting down");
                        return Ok(());
                    }
                }
            }
            Err(e) => {
                error!("cannot open {}: {}", config.device.port, e);
            }
        }

        // Exponential backoff before reopening the link
        info!("reconnecting in {:?}", reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                return Ok(());
            }
        }
        reconnect_delay = std::cmp::min(reconnect_delay * 2, config.device.max_reconnect_delay);
    }
}
