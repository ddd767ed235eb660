// Dry-run peripheral
//
// Stands in for a native GATT server library on hosts where none is linked.
// It logs what would be advertised and sent, then answers every call with a
// fixed native status code so both success and failure paths can be driven
// from configuration.

use super::{NativePeripheral, NativeStatus, PeripheralError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// Number of leading bytes of each frame included in the log line
const PREVIEW_BYTES: usize = 10;

/// Logging-only peripheral answering with a configured native status
#[derive(Debug)]
pub struct DryRunPeripheral {
    status: NativeStatus,
    serving: AtomicBool,
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl DryRunPeripheral {
    pub fn new(status: NativeStatus) -> Self {
        Self {
            status,
            serving: AtomicBool::new(false),
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Status code every native call reports
    pub fn status(&self) -> NativeStatus {
        self.status
    }

    /// Frames accepted since creation
    pub fn frames_sent(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Bytes accepted since creation
    pub fn bytes_sent(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Relaxed)
    }
}

impl Default for DryRunPeripheral {
    fn default() -> Self {
        Self::new(NativeStatus::SUCCESS)
    }
}

/// Upper-case hex of the first bytes of a frame, space separated
pub(crate) fn frame_preview(chunk: &[u8]) -> String {
    chunk
        .iter()
        .take(PREVIEW_BYTES)
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl NativePeripheral for DryRunPeripheral {
    async fn start(
        &self,
        service_id: &str,
        characteristic_id: &str,
    ) -> Result<(), PeripheralError> {
        info!(
            "Dry-run GATT server start: service={} characteristic={} status={}",
            service_id, characteristic_id, self.status
        );
        self.status.into_result()?;
        self.serving.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&self) {
        self.serving.store(false, Ordering::Relaxed);
        info!(
            "Dry-run GATT server stop ({} frames, {} bytes)",
            self.frames_sent(),
            self.bytes_sent()
        );
    }

    async fn notify(&self, chunk: &[u8]) -> Result<(), PeripheralError> {
        debug!(
            "Dry-run notify ({} bytes): {}",
            chunk.len(),
            frame_preview(chunk)
        );
        self.status.into_result()?;
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_preview_truncates() {
        let chunk: Vec<u8> = (0u8..20).collect();
        assert_eq!(frame_preview(&chunk), "00 01 02 03 04 05 06 07 08 09");
        assert_eq!(frame_preview(&[0xAB, 0xCD]), "AB CD");
        assert_eq!(frame_preview(&[]), "");
    }

    #[tokio::test]
    async fn test_success_status_counts_frames() {
        let peripheral = DryRunPeripheral::default();

        peripheral.start("svc", "char").await.unwrap();
        assert!(peripheral.is_serving());

        peripheral.notify(&[1, 2, 3]).await.unwrap();
        peripheral.notify(&[4, 5]).await.unwrap();
        peripheral.stop().await;

        assert_eq!(peripheral.frames_sent(), 2);
        assert_eq!(peripheral.bytes_sent(), 5);
        assert!(!peripheral.is_serving());
    }

    #[tokio::test]
    async fn test_failure_status_propagates() {
        let peripheral = DryRunPeripheral::new(NativeStatus(-1));

        assert_eq!(
            peripheral.start("svc", "char").await,
            Err(PeripheralError::Status(-1))
        );
        assert!(!peripheral.is_serving());
        assert_eq!(
            peripheral.notify(&[1]).await,
            Err(PeripheralError::Status(-1))
        );
        assert_eq!(peripheral.frames_sent(), 0);
    }
}
