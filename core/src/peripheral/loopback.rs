//! In-memory peripheral that records every call instead of touching a radio.
//!
//! Frames delivered through `notify` are kept in order so callers can check
//! exactly what a central would have received. Start and notify failures can
//! be scripted to exercise abort paths.

use super::{NativePeripheral, NativeStatus, PeripheralError};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// A single call observed by the loopback peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralCall {
    Start {
        service_id: String,
        characteristic_id: String,
    },
    Stop,
    Notify(Vec<u8>),
}

#[derive(Debug, Default)]
struct LoopbackState {
    calls: Vec<PeripheralCall>,
    delivered: Vec<Vec<u8>>,
    serving: bool,
    notify_attempts: usize,
    /// Number of upcoming start calls that fail, and the code they report
    start_failures: usize,
    start_failure_status: i32,
    /// 1-indexed notify attempt that fails, and the code it reports
    notify_failure: Option<(usize, i32)>,
}

/// Recording peripheral backed by process memory
#[derive(Debug, Default)]
pub struct LoopbackPeripheral {
    state: Mutex<LoopbackState>,
}

impl LoopbackPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` start calls fail with `status`
    pub fn with_start_failures(self, count: usize, status: i32) -> Self {
        {
            let mut state = self.state.lock();
            state.start_failures = count;
            state.start_failure_status = status;
        }
        self
    }

    /// Make the `attempt`-th notify call (1-indexed, counted from creation) fail with `status`
    pub fn with_notify_failure_at(self, attempt: usize, status: i32) -> Self {
        self.fail_notify_at(attempt, status);
        self
    }

    /// Script a notify failure on an already shared peripheral
    pub fn fail_notify_at(&self, attempt: usize, status: i32) {
        self.state.lock().notify_failure = Some((attempt, status));
    }

    /// Every call in the order it was made
    pub fn calls(&self) -> Vec<PeripheralCall> {
        self.state.lock().calls.clone()
    }

    /// Frames that were accepted, in delivery order
    pub fn delivered_frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().delivered.clone()
    }

    /// Concatenation of all accepted frames, as a central would reassemble them
    pub fn received_payload(&self) -> Vec<u8> {
        self.state.lock().delivered.concat()
    }

    pub fn notify_attempts(&self) -> usize {
        self.state.lock().notify_attempts
    }

    pub fn start_calls(&self) -> usize {
        self.count(|call| matches!(call, PeripheralCall::Start { .. }))
    }

    pub fn stop_calls(&self) -> usize {
        self.count(|call| matches!(call, PeripheralCall::Stop))
    }

    pub fn is_serving(&self) -> bool {
        self.state.lock().serving
    }

    fn count(&self, predicate: impl Fn(&PeripheralCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(*c)).count()
    }
}

#[async_trait]
impl NativePeripheral for LoopbackPeripheral {
    async fn start(
        &self,
        service_id: &str,
        characteristic_id: &str,
    ) -> Result<(), PeripheralError> {
        let mut state = self.state.lock();
        state.calls.push(PeripheralCall::Start {
            service_id: service_id.to_string(),
            characteristic_id: characteristic_id.to_string(),
        });

        let status = if state.start_failures > 0 {
            state.start_failures -= 1;
            NativeStatus(state.start_failure_status)
        } else {
            NativeStatus::SUCCESS
        };

        status.into_result()?;
        state.serving = true;
        debug!(
            "Loopback serving service={} characteristic={}",
            service_id, characteristic_id
        );
        Ok(())
    }

    async fn stop(&self) {
        let mut state = self.state.lock();
        state.calls.push(PeripheralCall::Stop);
        state.serving = false;
    }

    async fn notify(&self, chunk: &[u8]) -> Result<(), PeripheralError> {
        let mut state = self.state.lock();
        state.calls.push(PeripheralCall::Notify(chunk.to_vec()));
        state.notify_attempts += 1;

        if !state.serving {
            return Err(PeripheralError::Unavailable(
                "GATT server not started".to_string(),
            ));
        }

        if let Some((attempt, status)) = state.notify_failure {
            if attempt == state.notify_attempts {
                return NativeStatus(status).into_result();
            }
        }

        state.delivered.push(chunk.to_vec());
        Ok(())
    }
}
