//! Line-oriented device channel
//!
//! The protocol code never touches raw bytes: a [`DeviceChannel`] sends one
//! line and receives one line with a timeout. [`SerialChannel`] implements
//! it over an async serial stream; [`MockChannel`] is a scripted double for
//! tests.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use thiserror::Error;

/// Longest line the device may send; runaway byte streams without a
/// newline are discarded past this
const MAX_LINE_LEN: usize = 256;

/// Channel-level failures
///
/// All of these are fatal to the listener loop: the link is closed or
/// unusable and the caller decides whether to reopen it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device link closed")]
    Closed,

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Duplex line transport to the gate controller
#[allow(async_fn_in_trait)]
pub trait DeviceChannel {
    /// Send one line; the newline terminator is appended here.
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Receive one line, trimmed of its terminator.
    ///
    /// `Ok(None)` means the timeout elapsed with no complete line — an idle
    /// poll, not a failure. `Err(Closed)` means the link is gone.
    async fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;
}

/// Serial-port-backed channel
///
/// The read half is framed into lines; a partial line that straddles a
/// timeout stays buffered in the framer and completes on a later poll.
pub struct SerialChannel {
    lines: FramedRead<ReadHalf<SerialStream>, LinesCodec>,
    writer: WriteHalf<SerialStream>,
}

impl SerialChannel {
    /// Open `port` at `baud` and wait out the device reset
    ///
    /// Opening the port power-cycles common gate controller boards; nothing
    /// sent before `settle_delay` elapses would be seen by the firmware.
    pub async fn open(port: &str, baud: u32, settle_delay: Duration) -> Result<Self, TransportError> {
        let stream = tokio_serial::new(port, baud).open_native_async()?;
        info!("listening on {} at {} baud", port, baud);
        tokio::time::sleep(settle_delay).await;

        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            lines: FramedRead::new(
                read_half,
                LinesCodec::new_with_max_length(MAX_LINE_LEN),
            ),
            writer: write_half,
        })
    }
}

impl DeviceChannel for SerialChannel {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        debug!("-> {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match tokio::time::timeout(timeout, self.lines.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(TransportError::Closed),
            Ok(Some(Ok(line))) => {
                let line = line.trim_end_matches('\r').to_string();
                debug!("<- {}", line);
                Ok(Some(line))
            }
            // garbage on the line is never fatal; the codec resumes at
            // the next newline
            Ok(Some(Err(LinesCodecError::MaxLineLengthExceeded))) => {
                warn!("oversized line from device, discarded");
                Ok(None)
            }
            Ok(Some(Err(LinesCodecError::Io(e)))) => Err(e.into()),
        }
    }
}

/// Scripted channel for testing
///
/// Receives pop the script in order; `None` entries simulate an idle
/// timeout. When the script runs out the link counts as closed. Every sent
/// line is recorded.
pub struct MockChannel {
    script: VecDeque<Option<String>>,
    pub sent: Vec<String>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    /// Queue a line the device will send
    pub fn push_line(mut self, line: impl Into<String>) -> Self {
        self.script.push_back(Some(line.into()));
        self
    }

    /// Queue a receive that times out
    pub fn push_timeout(mut self) -> Self {
        self.script.push_back(None);
        self
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceChannel for MockChannel {
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.sent.push(line.to_string());
        Ok(())
    }

    async fn recv_line(&mut self, _timeout: Duration) -> Result<Option<String>, TransportError> {
        match self.script.pop_front() {
            Some(entry) => Ok(entry),
            None => Err(TransportError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_channel_scripts_in_order() {
        let mut channel = MockChannel::new()
            .push_line("PLATE:ABC123|BALANCE:500")
            .push_timeout()
            .push_line("DONE");

        let timeout = Duration::from_millis(1);
        assert_eq!(
            channel.recv_line(timeout).await.unwrap(),
            Some("PLATE:ABC123|BALANCE:500".to_string())
        );
        assert_eq!(channel.recv_line(timeout).await.unwrap(), None);
        assert_eq!(
            channel.recv_line(timeout).await.unwrap(),
            Some("DONE".to_string())
        );
        assert!(matches!(
            channel.recv_line(timeout).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_mock_channel_records_sends() {
        let mut channel = MockChannel::new();
        channel.send_line("PAY:400").await.unwrap();
        assert_eq!(channel.sent, vec!["PAY:400"]);
    }
}
