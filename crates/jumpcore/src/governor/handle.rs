use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::config::GovernorConfig;

use super::{EnvironmentKind, PerformanceGovernor, ThrottleState, ThrottleTransition};

static GOVERNOR_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_governor_lock_poison_once(operation: &'static str) {
    if GOVERNOR_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "governor lock poisoned; recovered inner value");
    }
}

/// Shared reference to the pipeline's governor. Cloned into the normalizer
/// and the recorder at construction; every throttle read or write happens
/// under the lock, so a reader never sees a half-updated [`ThrottleState`].
#[derive(Clone, Debug)]
pub struct GovernorHandle {
    inner: Arc<RwLock<PerformanceGovernor>>,
}

impl GovernorHandle {
    pub fn new(governor: PerformanceGovernor) -> Self {
        Self {
            inner: Arc::new(RwLock::new(governor)),
        }
    }

    pub fn development(config: GovernorConfig) -> Self {
        Self::new(PerformanceGovernor::new(
            config,
            EnvironmentKind::Development,
        ))
    }

    pub fn environment(&self) -> EnvironmentKind {
        self.read("environment").environment()
    }

    pub fn is_enabled(&self) -> bool {
        self.read("is_enabled").is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.write("set_enabled").set_enabled(enabled);
    }

    pub fn throttle_state(&self) -> ThrottleState {
        self.read("throttle_state").throttle_state()
    }

    pub fn feature_average_ms(&self, tag: &str) -> Option<f32> {
        self.read("feature_average_ms").feature_average_ms(tag)
    }

    pub fn should_record(&self, tag: &str) -> bool {
        self.write("should_record").should_record(tag)
    }

    pub fn observe_overhead(&self, tag: &str, overhead_ms: f32) -> ThrottleTransition {
        self.write("observe_overhead")
            .observe_overhead(tag, overhead_ms)
    }

    pub fn throttle(&self) -> bool {
        self.write("throttle").throttle()
    }

    pub fn unthrottle(&self) -> bool {
        self.write("unthrottle").unthrottle()
    }

    fn read(&self, operation: &'static str) -> RwLockReadGuard<'_, PerformanceGovernor> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_governor_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }

    fn write(&self, operation: &'static str) -> RwLockWriteGuard<'_, PerformanceGovernor> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_governor_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_lock(handle: &GovernorHandle) {
        let lock = handle.inner.as_ref();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison governor lock");
                })
                .join();
        });
    }

    #[test]
    fn clones_share_throttle_state() {
        let handle = GovernorHandle::development(GovernorConfig::default());
        let recorder_side = handle.clone();

        recorder_side.throttle();

        assert!(handle.throttle_state().throttled);
        assert_eq!(handle.throttle_state().update_frequency_hz, 30.0);
    }

    #[test]
    fn reads_recover_after_poison_without_panic() {
        let handle = GovernorHandle::development(GovernorConfig::default());
        poison_lock(&handle);

        let state = handle.throttle_state();
        assert!(!state.throttled);
        assert_eq!(state.update_frequency_hz, 60.0);
    }

    #[test]
    fn writes_recover_after_poison_without_panic() {
        let handle = GovernorHandle::development(GovernorConfig::default());
        poison_lock(&handle);

        assert!(handle.throttle());
        assert!(handle.throttle_state().throttled);
    }
}
