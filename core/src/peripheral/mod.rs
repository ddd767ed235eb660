//! Native BLE peripheral boundary
//!
//! The GATT server, advertising and link-layer flow control live in a
//! platform library outside this crate. This module defines the narrow
//! capability the rest of the crate consumes:
//!
//! - **NativePeripheral**: start/stop the GATT server and push one notification frame
//! - **NativeStatus**: the single status-code convention accepted at the boundary
//! - **dry_run** / **loopback**: built-in providers for diagnostics and testing
//! - **provider**: startup selection of a provider by name

pub mod dry_run;
pub mod loopback;
pub mod provider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use dry_run::DryRunPeripheral;
pub use loopback::{LoopbackPeripheral, PeripheralCall};
pub use provider::{Provider, ProviderKind};

/// Errors reported by a native peripheral
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("Native call failed with status {0}")]
    Status(i32),
    #[error("Peripheral unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown peripheral provider: {0}")]
    UnknownProvider(String),
}

/// Raw status code returned by a native peripheral library.
///
/// Native builds have used both "0 means success" and "1 means success".
/// This crate accepts exactly one convention: `0` is success, anything else
/// is a failure carrying the code. Adapters convert once, here, and nothing
/// above the boundary handles integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    pub const SUCCESS: NativeStatus = NativeStatus(0);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Convert the raw code into the crate's error model
    pub fn into_result(self) -> Result<(), PeripheralError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(PeripheralError::Status(self.0))
        }
    }
}

impl From<i32> for NativeStatus {
    fn from(code: i32) -> Self {
        NativeStatus(code)
    }
}

impl Default for NativeStatus {
    fn default() -> Self {
        NativeStatus::SUCCESS
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform-specific BLE peripheral abstraction
///
/// Implementers wrap the actual GATT server of their platform (a native
/// library, an OS Bluetooth API, a simulator). Calls are made sequentially
/// by a single session; implementations must still be `Send + Sync` so the
/// session can be shared across tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NativePeripheral: Send + Sync {
    /// Begin advertising and serving the given service/characteristic pair
    async fn start(&self, service_id: &str, characteristic_id: &str)
        -> Result<(), PeripheralError>;

    /// Stop serving. Never fails observably to the caller.
    async fn stop(&self);

    /// Deliver one notification frame to subscribed centrals
    async fn notify(&self, chunk: &[u8]) -> Result<(), PeripheralError>;
}
