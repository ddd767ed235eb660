// VitalBLE core: chunked BLE notifications over a native GATT peripheral
#![allow(clippy::empty_line_after_doc_comments)]
//
// The GATT server itself is native code behind `NativePeripheral`. This crate
// owns what happens above it: splitting payloads into notification frames,
// pacing and ordering them, and the start/stop lifecycle of a session.

pub mod peripheral;
pub mod session;
pub mod transport;

pub use peripheral::{
    DryRunPeripheral, LoopbackPeripheral, NativePeripheral, NativeStatus, PeripheralCall,
    PeripheralError, Provider, ProviderKind,
};
pub use session::{
    PeripheralSession, SessionConfiguration, SessionError, SessionState,
    DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID,
};
pub use transport::{
    chunk_plan, ChunkedTransport, SendReport, TransportConfig, TransportError, CHUNK_SIZE,
    DEFAULT_PACING, MAX_NOTIFICATION_SIZE,
};

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
