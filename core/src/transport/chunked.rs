/// Chunked notification transport
///
/// Delivers an arbitrary-length payload over a notification channel limited
/// to small frames. Frames go out strictly in order, one `notify` per frame,
/// with a short pause between frames so the link layer can flush. The first
/// failed frame aborts the whole send; frames already delivered are not
/// retracted.

use crate::peripheral::{NativePeripheral, PeripheralError};
use futures::FutureExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default frame size in bytes
pub const CHUNK_SIZE: usize = 200;

/// Largest frame a GATT attribute value can carry
pub const MAX_NOTIFICATION_SIZE: usize = 512;

/// Default pause between consecutive frames
pub const DEFAULT_PACING: Duration = Duration::from_millis(1);

/// Errors for chunked sends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No payload supplied")]
    NoPayload,
    #[error("Payload is empty")]
    EmptyPayload,
    #[error("Chunk {index} of {total} was not delivered: {source}")]
    ChunkDeliveryFailure {
        /// 0-based index of the failed chunk
        index: usize,
        total: usize,
        #[source]
        source: PeripheralError,
    },
    #[error("Transmission interrupted before chunk {index} of {total}")]
    TransmissionInterrupted { index: usize, total: usize },
    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Frame size and pacing for a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum bytes per notification
    pub chunk_size: usize,
    /// Pause between consecutive notifications
    pub pacing: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            pacing: DEFAULT_PACING,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.chunk_size == 0 {
            return Err(TransportError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_size > MAX_NOTIFICATION_SIZE {
            return Err(TransportError::InvalidConfig(format!(
                "chunk_size {} exceeds notification limit {}",
                self.chunk_size, MAX_NOTIFICATION_SIZE
            )));
        }
        Ok(())
    }
}

/// Outcome of a fully delivered send
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub chunks: usize,
    pub bytes: usize,
}

/// Sizes of the chunks a payload of `len` bytes is split into
pub fn chunk_plan(len: usize, chunk_size: usize) -> Vec<usize> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let full = len / chunk_size;
    let rest = len % chunk_size;
    let mut plan = vec![chunk_size; full];
    if rest > 0 {
        plan.push(rest);
    }
    plan
}

/// Ordered, paced, abort-on-failure sender
#[derive(Debug, Clone)]
pub struct ChunkedTransport {
    config: TransportConfig,
}

impl Default for ChunkedTransport {
    fn default() -> Self {
        Self {
            config: TransportConfig::default(),
        }
    }
}

impl ChunkedTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Number of notifications needed for `len` bytes
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.config.chunk_size)
    }

    /// Send `payload`, collapsing every failure to `false`
    pub async fn send(&self, peripheral: &dyn NativePeripheral, payload: Option<&[u8]>) -> bool {
        match self.try_send(peripheral, payload).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Chunked send failed: {}", e);
                false
            }
        }
    }

    /// Send `payload` and report the specific failure
    pub async fn try_send(
        &self,
        peripheral: &dyn NativePeripheral,
        payload: Option<&[u8]>,
    ) -> Result<SendReport, TransportError> {
        self.try_send_until(peripheral, payload, std::future::pending::<()>())
            .await
    }

    /// Send `payload` unless `cancel` completes first.
    ///
    /// `cancel` is checked before every chunk and raced against every pacing
    /// wait. Once it fires no further `notify` call is made.
    pub async fn try_send_until<F>(
        &self,
        peripheral: &dyn NativePeripheral,
        payload: Option<&[u8]>,
        cancel: F,
    ) -> Result<SendReport, TransportError>
    where
        F: Future<Output = ()>,
    {
        let payload = payload.ok_or(TransportError::NoPayload)?;
        if payload.is_empty() {
            return Err(TransportError::EmptyPayload);
        }

        let total = self.chunk_count(payload.len());
        let mut report = SendReport::default();
        tokio::pin!(cancel);

        for (index, chunk) in payload.chunks(self.config.chunk_size).enumerate() {
            if index > 0 && !self.config.pacing.is_zero() {
                tokio::select! {
                    biased;
                    _ = &mut cancel => {
                        return Err(TransportError::TransmissionInterrupted { index, total });
                    }
                    _ = tokio::time::sleep(self.config.pacing) => {}
                }
            }
            if cancel.as_mut().now_or_never().is_some() {
                return Err(TransportError::TransmissionInterrupted { index, total });
            }

            peripheral
                .notify(chunk)
                .await
                .map_err(|source| TransportError::ChunkDeliveryFailure {
                    index,
                    total,
                    source,
                })?;

            report.chunks += 1;
            report.bytes += chunk.len();
            debug!("Notified chunk {}/{} ({} bytes)", index + 1, total, chunk.len());
        }

        Ok(report)
    }
}
