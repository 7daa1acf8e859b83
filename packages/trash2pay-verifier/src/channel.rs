//! Acquisition channels: where decoded pickup codes come from.
//!
//! A channel is started with a sender for [`ScanEvent`]s and reports every
//! read through it. Dropping the sender ends the stream. `stop` is
//! synchronous so a closing workflow never waits on capture shutdown.

use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One read from an acquisition channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A code was found; carries its raw text.
    Decoded(String),
    /// A frame or line without a readable code.
    Miss(String),
}

pub type ScanEventSender = mpsc::UnboundedSender<ScanEvent>;

/// Preferred capture source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    /// Rear-facing camera.
    Environment,
    /// Front-facing camera.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub fps: u32,
    pub box_width: u32,
    pub box_height: u32,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            fps: 10,
            box_width: 250,
            box_height: 250,
        }
    }
}

/// Channel start/stop failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError(pub String);

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ChannelError {}

/// Source of decoded pickup codes.
pub trait AcquisitionChannel: Send {
    fn start(
        &mut self,
        source: &ScanSource,
        params: &ScanParameters,
        events: ScanEventSender,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    fn stop(&mut self) -> Result<(), ChannelError>;
}

/// Replays a payload that was already decoded elsewhere, e.g. by a client
/// posting it to the service. Each start delivers the payload once.
#[derive(Debug, Clone)]
pub struct PayloadChannel {
    payload: String,
    running: bool,
}

impl PayloadChannel {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            running: false,
        }
    }
}

impl AcquisitionChannel for PayloadChannel {
    async fn start(
        &mut self,
        _source: &ScanSource,
        _params: &ScanParameters,
        events: ScanEventSender,
    ) -> Result<(), ChannelError> {
        events
            .send(ScanEvent::Decoded(self.payload.clone()))
            .map_err(|_| ChannelError("scan listener dropped".into()))?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChannelError> {
        self.running = false;
        Ok(())
    }
}

/// Reads newline-delimited codes from a byte stream, as emitted by
/// keyboard-wedge and serial QR scanners.
///
/// The reader survives stop/start cycles; a new start resumes where the
/// previous run left off, including a line that was half read when the
/// scanner stopped. End of stream closes the event stream.
pub struct LineScanner<R> {
    lines: Arc<AsyncMutex<Lines<BufReader<R>>>>,
    cancel: Option<CancellationToken>,
}

impl<R> LineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Arc::new(AsyncMutex::new(BufReader::new(reader).lines())),
            cancel: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| !c.is_cancelled())
            .unwrap_or(false)
    }
}

impl<R> AcquisitionChannel for LineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn start(
        &mut self,
        _source: &ScanSource,
        _params: &ScanParameters,
        events: ScanEventSender,
    ) -> Result<(), ChannelError> {
        if self.is_running() {
            return Err(ChannelError("scanner already running".into()));
        }

        let cancel = CancellationToken::new();
        let lines = Arc::clone(&self.lines);
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut lines = lines.lock().await;
            loop {
                // `next_line` keeps partial input buffered when cancelled.
                let read = tokio::select! {
                    _ = token.cancelled() => break,
                    read = lines.next_line() => read,
                };
                match read {
                    Ok(None) => {
                        info!("Scanner stream ended");
                        break;
                    }
                    Ok(Some(line)) => {
                        let code = line.trim();
                        let event = if code.is_empty() {
                            ScanEvent::Miss("empty line".into())
                        } else {
                            ScanEvent::Decoded(code.to_string())
                        };
                        if events.send(event).is_err() {
                            debug!("Scan listener gone, stopping reader");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Scanner read failed");
                        break;
                    }
                }
            }
        });

        self.cancel = Some(cancel);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChannelError> {
        match self.cancel.take() {
            Some(cancel) => {
                cancel.cancel();
                Ok(())
            }
            None => Err(ChannelError("scanner not running".into())),
        }
    }
}
