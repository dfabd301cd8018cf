//! # Scanner Hook
//!
//! The surface a UI binds to: the session's operations plus flat accessors
//! over the latest state snapshot.
//!
//! State changes are pushed by the session over a watch channel, so a UI
//! re-renders on [`ScannerHook::changed`] rather than polling.

use std::sync::Arc;

use dock_core::{ScanError, ScanRequest, ScanResult, ScannerState};
use tokio::sync::watch;

use crate::device::Capabilities;
use crate::error::{ScannerError, ScannerResult};
use crate::session::{ScanOutcome, ScanSession};

/// UI-facing adapter over a [`ScanSession`].
pub struct ScannerHook {
    session: ScanSession,
    capabilities: Arc<dyn Capabilities>,
    state: watch::Receiver<ScannerState>,
}

impl ScannerHook {
    /// `capabilities` should be the provider the session was built with.
    pub fn new(session: ScanSession, capabilities: Arc<dyn Capabilities>) -> Self {
        let state = session.subscribe();
        ScannerHook {
            session,
            capabilities,
            state,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn scan(&self, request: ScanRequest) -> ScanOutcome {
        self.session.scan(request).await
    }

    pub async fn request_permissions(&self) -> bool {
        self.session.request_permissions().await
    }

    /// Answers from the platform's remembered permission when it has a
    /// definite one, otherwise probes the camera. A remembered denial lands
    /// in [`error`](Self::error).
    pub async fn check_permissions(&self) -> bool {
        self.session.check_permissions().await
    }

    pub async fn stop_scanning(&self) -> ScannerResult<()> {
        self.session.stop_scanning().await
    }

    pub async fn cancel_scan(&self) -> ScannerResult<()> {
        self.session.cancel_scan().await
    }

    pub async fn clear_error(&self) -> ScannerResult<()> {
        self.session.clear_error().await
    }

    pub async fn clear_result(&self) -> ScannerResult<()> {
        self.session.clear_result().await
    }

    /// Destroys the session, releasing the device.
    pub async fn unmount(self) {
        self.session.destroy().await;
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Waits for the next state publication and returns it.
    pub async fn changed(&mut self) -> ScannerResult<ScannerState> {
        self.state
            .changed()
            .await
            .map_err(|_| ScannerError::ShuttingDown)?;
        Ok(self.state.borrow_and_update().clone())
    }

    pub fn snapshot(&self) -> ScannerState {
        self.state.borrow().clone()
    }

    pub fn is_supported(&self) -> bool {
        self.capabilities.is_scanning_supported()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.borrow().is_scanning
    }

    pub fn is_initializing(&self) -> bool {
        self.state.borrow().is_initializing
    }

    /// `None` until permission has been observed.
    pub fn has_permission(&self) -> Option<bool> {
        self.state.borrow().permission.as_bool()
    }

    pub fn error(&self) -> Option<ScanError> {
        self.state.borrow().error.clone()
    }

    pub fn last_result(&self) -> Option<ScanResult> {
        self.state.borrow().last_result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CameraDevice, DeviceOptions, FrameSink, StaticCapabilities};
    use async_trait::async_trait;
    use dock_core::{CameraFacing, NativeError, PermissionState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts probes; never decodes anything.
    struct ProbeCounter(Arc<AtomicUsize>);

    #[async_trait]
    impl CameraDevice for ProbeCounter {
        async fn probe(&mut self, _facing: CameraFacing) -> Result<(), NativeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn init(&mut self, _options: DeviceOptions) -> Result<(), NativeError> {
            Ok(())
        }

        async fn start(&mut self, _frames: FrameSink) -> Result<(), NativeError> {
            Ok(())
        }

        async fn stop(&mut self) {}

        async fn destroy(&mut self) {}
    }

    fn mount(capabilities: StaticCapabilities) -> (ScannerHook, Arc<AtomicUsize>) {
        let probes = Arc::new(AtomicUsize::new(0));
        let capabilities: Arc<dyn Capabilities> = Arc::new(capabilities);
        let session = ScanSession::builder(ProbeCounter(probes.clone()))
            .capabilities(capabilities.clone())
            .spawn();
        (ScannerHook::new(session, capabilities), probes)
    }

    #[tokio::test]
    async fn test_check_permissions_uses_cached_state() {
        let (hook, probes) =
            mount(StaticCapabilities::supported().with_permission(PermissionState::Granted));

        assert!(hook.check_permissions().await);
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert_eq!(hook.has_permission(), Some(true));
    }

    #[tokio::test]
    async fn test_check_permissions_falls_back_to_probe() {
        let (hook, probes) = mount(StaticCapabilities::supported());

        assert_eq!(hook.has_permission(), None);
        assert!(hook.check_permissions().await);
        assert_eq!(probes.load(Ordering::SeqCst), 1);
        assert_eq!(hook.has_permission(), Some(true));
    }

    #[tokio::test]
    async fn test_check_permissions_reports_remembered_denial() {
        let (hook, probes) =
            mount(StaticCapabilities::supported().with_permission(PermissionState::Denied));

        assert!(!hook.check_permissions().await);
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert_eq!(hook.has_permission(), Some(false));

        let error = hook.error().unwrap();
        assert_eq!(error.kind, dock_core::ScanErrorKind::PermissionDenied);
        assert!(!error.recovery_actions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_reports_scan_progress() {
        let (mut hook, _) = mount(StaticCapabilities::supported());
        let session = hook.session.clone();

        let scanning = tokio::spawn(async move {
            session
                .scan(ScanRequest::new().timeout(Duration::from_secs(1)))
                .await
        });

        let mut saw_scanning = false;
        loop {
            let state = hook.changed().await.unwrap();
            saw_scanning |= state.is_scanning;
            if state.error.is_some() {
                break;
            }
        }

        assert!(saw_scanning);
        assert!(scanning.await.unwrap().is_err());
        assert!(!hook.is_scanning());
        assert!(hook.error().is_some());
    }

    #[tokio::test]
    async fn test_unsupported_surface() {
        let (hook, _) = mount(StaticCapabilities::unsupported());
        assert!(!hook.is_supported());
        assert!(hook.error().is_some());
        assert!(hook.last_result().is_none());
        hook.unmount().await;
    }
}
