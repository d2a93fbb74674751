//! Fault switches for the in-memory backends.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared toggles that make an in-memory backend fail or stall.
///
/// Clones share state, so a test can flip a switch on a backend already
/// handed to an adapter.
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    inner: Arc<FaultState>,
}

#[derive(Debug, Default)]
struct FaultState {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl FaultSwitch {
    pub fn fail_reads(&self, enabled: bool) {
        self.inner.fail_reads.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, enabled: bool) {
        self.inner.fail_writes.store(enabled, Ordering::SeqCst);
    }

    /// Delays every write by `delay` before it lands.
    pub fn delay_writes(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub(crate) fn reads_fail(&self) -> bool {
        self.inner.fail_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes_fail(&self) -> bool {
        self.inner.fail_writes.load(Ordering::SeqCst)
    }

    pub(crate) async fn apply_write_delay(&self) {
        let millis = self.inner.write_delay_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}
