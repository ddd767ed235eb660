// Peripheral session
//
// Owns the identifier pair and the start/stop lifecycle around a chunked
// transport. The peripheral is started lazily on the first send and stays
// up until `stop`. Identifiers can only change while the peripheral is down.

use crate::peripheral::{NativePeripheral, PeripheralError};
use crate::transport::{ChunkedTransport, SendReport, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Heart Rate service (Bluetooth SIG 0x180D)
pub const DEFAULT_SERVICE_UUID: &str = "0000180D-0000-1000-8000-00805F9B34FB";

/// Heart Rate Measurement characteristic (Bluetooth SIG 0x2A37)
pub const DEFAULT_CHARACTERISTIC_UUID: &str = "00002A37-0000-1000-8000-00805F9B34FB";

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Peripheral failed to start: {0}")]
    PeripheralStartFailure(#[source] PeripheralError),
    #[error("State transition error: {0}")]
    InvalidStateTransition(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ============================================================================
// STATE MANAGEMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    NotStarted,
    Started,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "NotStarted"),
            SessionState::Started => write!(f, "Started"),
        }
    }
}

/// Snapshot of a session for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub service_id: String,
    pub characteristic_id: String,
    pub started: bool,
}

impl fmt::Display for SessionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service UUID: {}\nCharacteristic UUID: {}\nServer started: {}",
            self.service_id, self.characteristic_id, self.started
        )
    }
}

struct SessionInner {
    service_id: String,
    characteristic_id: String,
    state: SessionState,
}

impl Default for SessionInner {
    fn default() -> Self {
        Self {
            service_id: DEFAULT_SERVICE_UUID.to_string(),
            characteristic_id: DEFAULT_CHARACTERISTIC_UUID.to_string(),
            state: SessionState::NotStarted,
        }
    }
}

/// Trimmed value, or `None` when nothing usable was supplied
fn normalize(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// SESSION
// ============================================================================

/// Lifecycle wrapper around a native peripheral and a chunked transport.
///
/// All state sits behind one async lock that is held across start and
/// transmission, so concurrent callers serialize and two payloads never
/// interleave their chunks.
pub struct PeripheralSession {
    peripheral: Arc<dyn NativePeripheral>,
    transport: ChunkedTransport,
    inner: Mutex<SessionInner>,
}

impl PeripheralSession {
    /// Session with the default transport (200-byte chunks, 1 ms pacing)
    pub fn new(peripheral: Arc<dyn NativePeripheral>) -> Self {
        Self::with_transport(peripheral, ChunkedTransport::default())
    }

    pub fn with_transport(peripheral: Arc<dyn NativePeripheral>, transport: ChunkedTransport) -> Self {
        Self {
            peripheral,
            transport,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn transport(&self) -> &ChunkedTransport {
        &self.transport
    }

    /// Update either identifier. Surrounding whitespace is trimmed; absent or
    /// blank values keep the current identifier. Rejected once started.
    pub async fn configure(
        &self,
        service_id: Option<&str>,
        characteristic_id: Option<&str>,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Started {
            return Err(SessionError::InvalidStateTransition(
                "cannot configure identifiers after the peripheral has started; stop it first"
                    .to_string(),
            ));
        }

        if let Some(service_id) = normalize(service_id) {
            inner.service_id = service_id.to_string();
        }
        if let Some(characteristic_id) = normalize(characteristic_id) {
            inner.characteristic_id = characteristic_id.to_string();
        }
        Ok(())
    }

    pub async fn configuration(&self) -> SessionConfiguration {
        let inner = self.inner.lock().await;
        SessionConfiguration {
            service_id: inner.service_id.clone(),
            characteristic_id: inner.characteristic_id.clone(),
            started: inner.state == SessionState::Started,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Send `payload`, starting the peripheral first if needed.
    /// Every failure collapses to `false`; the session stays usable.
    pub async fn send(&self, payload: Option<&[u8]>) -> bool {
        match self.try_send(payload).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Session send failed: {}", e);
                false
            }
        }
    }

    /// Send UTF-8 text
    pub async fn send_text(&self, text: Option<&str>) -> bool {
        self.send(text.map(str::as_bytes)).await
    }

    pub async fn try_send(&self, payload: Option<&[u8]>) -> Result<SendReport, SessionError> {
        self.try_send_until(payload, std::future::pending::<()>())
            .await
    }

    /// Send `payload` unless `cancel` completes first. Chunks already
    /// delivered when the cancellation lands are not retracted.
    pub async fn try_send_until<F>(
        &self,
        payload: Option<&[u8]>,
        cancel: F,
    ) -> Result<SendReport, SessionError>
    where
        F: Future<Output = ()>,
    {
        // An absent payload must not start the peripheral
        let payload = payload.ok_or(TransportError::NoPayload)?;

        let mut inner = self.inner.lock().await;
        self.ensure_started(&mut inner).await?;

        let report = self
            .transport
            .try_send_until(self.peripheral.as_ref(), Some(payload), cancel)
            .await?;
        Ok(report)
    }

    async fn ensure_started(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        if inner.state == SessionState::Started {
            return Ok(());
        }

        self.peripheral
            .start(&inner.service_id, &inner.characteristic_id)
            .await
            .map_err(|e| {
                warn!(
                    "Peripheral start failed for service {}: {}",
                    inner.service_id, e
                );
                SessionError::PeripheralStartFailure(e)
            })?;

        inner.state = SessionState::Started;
        info!(
            "Peripheral started: service={} characteristic={}",
            inner.service_id, inner.characteristic_id
        );
        Ok(())
    }

    /// Stop the peripheral if it is running. Safe to call repeatedly.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_locked(self.peripheral.as_ref(), &mut inner).await;
    }

    /// Alias of [`stop`](Self::stop) for callers tearing the session down
    pub async fn shutdown(&self) {
        self.stop().await;
    }

    /// Stop if running, then restore the default identifiers
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        Self::stop_locked(self.peripheral.as_ref(), &mut inner).await;
        *inner = SessionInner::default();
    }

    async fn stop_locked(peripheral: &dyn NativePeripheral, inner: &mut SessionInner) {
        if inner.state == SessionState::NotStarted {
            return;
        }
        peripheral.stop().await;
        inner.state = SessionState::NotStarted;
        info!("Peripheral stopped");
    }
}

// ============================================================================
// TESTS
// ============================================================================
