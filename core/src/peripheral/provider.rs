/// Peripheral provider selection
///
/// Chooses which `NativePeripheral` backend a session talks to. Selection
/// happens once at startup from configuration; the transport and session
/// never see which backend is behind the trait object.

use super::{DryRunPeripheral, LoopbackPeripheral, NativePeripheral, NativeStatus, PeripheralError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Built-in provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Log frames and answer with a configured native status
    #[default]
    DryRun,
    /// Record frames in memory
    Loopback,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::DryRun, ProviderKind::Loopback];

    /// Instantiate the provider. `native_status` only affects `DryRun`.
    pub fn build(self, native_status: NativeStatus) -> Provider {
        match self {
            ProviderKind::DryRun => Provider::DryRun(Arc::new(DryRunPeripheral::new(native_status))),
            ProviderKind::Loopback => Provider::Loopback(Arc::new(LoopbackPeripheral::new())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::DryRun => write!(f, "dry-run"),
            ProviderKind::Loopback => write!(f, "loopback"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = PeripheralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dry-run" | "dryrun" => Ok(ProviderKind::DryRun),
            "loopback" => Ok(ProviderKind::Loopback),
            other => Err(PeripheralError::UnknownProvider(other.to_string())),
        }
    }
}

/// A constructed provider, keeping the concrete handle for diagnostics
#[derive(Debug, Clone)]
pub enum Provider {
    DryRun(Arc<DryRunPeripheral>),
    Loopback(Arc<LoopbackPeripheral>),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::DryRun(_) => ProviderKind::DryRun,
            Provider::Loopback(_) => ProviderKind::Loopback,
        }
    }

    /// Shared handle for a session
    pub fn peripheral(&self) -> Arc<dyn NativePeripheral> {
        match self {
            Provider::DryRun(p) => p.clone(),
            Provider::Loopback(p) => p.clone(),
        }
    }
}
