//! # Scan Session
//!
//! Owns one camera device and serializes scan attempts against it.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Scan Session                                   │
//! │                                                                         │
//! │   ScanSession (Clone)                  SessionActor (one task)          │
//! │   ───────────────────                  ───────────────────────          │
//! │   scan()            ── Command ──►     ┌─────────────────────────┐      │
//! │   request_permissions()  (mpsc)        │ select! {               │      │
//! │   stop_scanning()                      │   command,              │      │
//! │   cancel_scan()     ◄── oneshot ──     │   device event,         │      │
//! │   destroy()             reply          │   deadline,             │      │
//! │                                        │ }                       │      │
//! │   state() / subscribe() ◄── watch ──   └───────────┬─────────────┘      │
//! │                                                    │                    │
//! │                                        CameraDevice (exclusive)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Attempt Lifecycle
//! ```text
//!   scan() ──► Attempt { waiters: [caller] }
//!                 │
//!   scan() ──►    ├── joins waiters (no second acquisition)
//!                 │
//!                 ├── accepted frame  ──► Ok(result)          ─┐
//!                 ├── deadline        ──► Err(TIMEOUT)         │ first one wins,
//!                 ├── cancel_scan()   ──► Err(CANCELLED)       │ attempt is taken
//!                 ├── device failure  ──► Err(classified)      │ and every waiter
//!                 └── destroy()       ──► Err(CANCELLED)      ─┘ gets the outcome
//! ```
//!
//! All state lives inside the actor, so "whichever fires first wins" falls
//! out of the task processing one event at a time: the attempt is taken
//! on resolution and later triggers find nothing to resolve.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dock_core::format::detect_format;
use dock_core::{
    classify, NativeError, ScanError, ScanErrorKind, ScanRequest, ScanResult, ScannerState,
    HAPTIC_PULSE_MS, MAX_SCANS_PER_SECOND, SUCCESS_TONE_HZ, SUCCESS_TONE_MS,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::error::Elapsed;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::device::{
    CameraDevice, Capabilities, DecodedFrame, DeviceEvent, DeviceOptions, FrameSink, NoFeedback,
    ScanFeedback, StaticCapabilities,
};
use crate::error::{ScannerError, ScannerResult};

/// What every caller of one scan attempt receives.
pub type ScanOutcome = Result<ScanResult, ScanError>;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

// =============================================================================
// Commands
// =============================================================================

enum Command {
    RequestPermissions { reply: oneshot::Sender<bool> },
    CheckPermissions { reply: oneshot::Sender<bool> },
    Scan { request: ScanRequest, reply: oneshot::Sender<ScanOutcome> },
    StopScanning { reply: oneshot::Sender<()> },
    CancelScan { reply: oneshot::Sender<()> },
    ClearError { reply: oneshot::Sender<()> },
    ClearResult { reply: oneshot::Sender<()> },
    Destroy { reply: oneshot::Sender<()> },
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle to a running scan session.
///
/// Cheap to clone. When the last handle is dropped the session destroys its
/// device and the task exits.
///
/// ## Usage
/// ```rust,ignore
/// let session = ScanSession::builder(WedgeDevice::new(BufReader::new(stdin())))
///     .capabilities(Arc::new(StaticCapabilities::supported()))
///     .spawn();
///
/// let result = session
///     .scan(ScanRequest::new().formats([BarcodeFormat::Code128]))
///     .await?;
/// ```
#[derive(Clone)]
pub struct ScanSession {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ScannerState>,
    supported: bool,
}

impl ScanSession {
    pub fn builder<D: CameraDevice>(device: D) -> SessionBuilder<D> {
        SessionBuilder {
            device,
            capabilities: Arc::new(StaticCapabilities::supported()),
            feedback: Arc::new(NoFeedback),
            max_scans_per_second: MAX_SCANS_PER_SECOND,
        }
    }

    /// Scans once.
    ///
    /// If a scan is already in flight this call waits for that scan's
    /// outcome instead of starting another.
    pub async fn scan(&self, request: ScanRequest) -> ScanOutcome {
        match self.call(|reply| Command::Scan { request, reply }).await {
            Ok(outcome) => outcome,
            Err(e) => Err(ScanError::new(ScanErrorKind::CameraError, e.to_string())),
        }
    }

    /// Probes the camera to learn whether access is granted.
    pub async fn request_permissions(&self) -> bool {
        self.call(|reply| Command::RequestPermissions { reply })
            .await
            .unwrap_or(false)
    }

    /// Answers from the platform's remembered permission when it is
    /// definite, otherwise probes like [`request_permissions`](Self::request_permissions).
    /// A remembered denial is recorded as PERMISSION_DENIED.
    pub async fn check_permissions(&self) -> bool {
        self.call(|reply| Command::CheckPermissions { reply })
            .await
            .unwrap_or(false)
    }

    /// Stops capture and clears the deadline. The scan in flight, if any,
    /// stays pending; a later `scan()` resumes it, `cancel_scan()` ends it.
    pub async fn stop_scanning(&self) -> ScannerResult<()> {
        self.call(|reply| Command::StopScanning { reply }).await
    }

    /// Ends the scan in flight with CANCELLED. No-op when idle.
    pub async fn cancel_scan(&self) -> ScannerResult<()> {
        self.call(|reply| Command::CancelScan { reply }).await
    }

    pub async fn clear_error(&self) -> ScannerResult<()> {
        self.call(|reply| Command::ClearError { reply }).await
    }

    pub async fn clear_result(&self) -> ScannerResult<()> {
        self.call(|reply| Command::ClearResult { reply }).await
    }

    /// Releases the device. Safe to call repeatedly, and on a session whose
    /// task is already gone.
    pub async fn destroy(&self) {
        if let Err(e) = self.call(|reply| Command::Destroy { reply }).await {
            debug!(error = %e, "Destroy on a stopped session");
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> ScannerState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.clone()
    }

    /// Whether the platform could scan when the session was created.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> ScannerResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ScannerError::ShuttingDown)?;
        response
            .await
            .map_err(|_| ScannerError::ChannelError("Session dropped the reply".into()))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Configures and spawns a [`ScanSession`].
pub struct SessionBuilder<D> {
    device: D,
    capabilities: Arc<dyn Capabilities>,
    feedback: Arc<dyn ScanFeedback>,
    max_scans_per_second: u32,
}

impl<D: CameraDevice> SessionBuilder<D> {
    pub fn capabilities(mut self, capabilities: Arc<dyn Capabilities>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn feedback(mut self, feedback: Arc<dyn ScanFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn max_scans_per_second(mut self, rate: u32) -> Self {
        self.max_scans_per_second = rate;
        self
    }

    /// Spawns the session task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> ScanSession {
        let supported = self.capabilities.is_scanning_supported();

        let initial = ScannerState {
            permission: self.capabilities.cached_permission(),
            error: (!supported).then(|| {
                ScanError::new(
                    ScanErrorKind::UnsupportedDevice,
                    "Device does not support barcode scanning",
                )
            }),
            ..ScannerState::default()
        };

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(initial);

        let actor = SessionActor {
            device: self.device,
            capabilities: self.capabilities,
            feedback: self.feedback,
            max_scans_per_second: self.max_scans_per_second,
            supported,
            state: state_tx,
            commands: command_rx,
            events_tx: event_tx,
            events_rx: event_rx,
            attempt: None,
            pending: VecDeque::new(),
            initialized: false,
            next_attempt: 1,
        };

        tokio::spawn(actor.run());

        ScanSession {
            commands: command_tx,
            state: state_rx,
            supported,
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// One scan in flight.
struct Attempt {
    id: u64,
    request: ScanRequest,
    waiters: Vec<oneshot::Sender<ScanOutcome>>,
    started: Instant,
    timeout: Duration,
    /// `None` while capture is stopped.
    deadline: Option<Instant>,
}

/// How waiting on device init ended.
enum InitWait {
    Done(Result<Result<(), NativeError>, Elapsed>),
    /// Cancel or destroy arrived first. `None` when every handle is gone.
    Interrupted(Option<Command>),
}

struct SessionActor<D> {
    device: D,
    capabilities: Arc<dyn Capabilities>,
    feedback: Arc<dyn ScanFeedback>,
    max_scans_per_second: u32,
    supported: bool,
    state: watch::Sender<ScannerState>,
    commands: mpsc::Receiver<Command>,
    events_tx: FrameSink,
    events_rx: mpsc::Receiver<DeviceEvent>,
    attempt: Option<Attempt>,
    /// Commands that arrived during device init, handled in order afterwards.
    pending: VecDeque<Command>,
    initialized: bool,
    next_attempt: u64,
}

impl<D: CameraDevice> SessionActor<D> {
    async fn run(mut self) {
        debug!(supported = self.supported, "Scan session running");

        loop {
            if let Some(command) = self.pending.pop_front() {
                self.handle(command).await;
                continue;
            }

            let deadline = self.attempt.as_ref().and_then(|a| a.deadline);

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },

                Some(event) = self.events_rx.recv() => self.on_device_event(event).await,

                _ = wait_until(deadline) => self.on_timeout().await,
            }
        }

        self.destroy().await;
        debug!("Scan session stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::RequestPermissions { reply } => {
                let granted = self.request_permissions().await;
                let _ = reply.send(granted);
            }
            Command::CheckPermissions { reply } => {
                let granted = self.check_permissions().await;
                let _ = reply.send(granted);
            }
            Command::Scan { request, reply } => self.begin_scan(request, reply).await,
            Command::StopScanning { reply } => {
                self.stop_capture().await;
                let _ = reply.send(());
            }
            Command::CancelScan { reply } => {
                if self.attempt.is_some() {
                    self.fail(ScanError::cancelled()).await;
                } else {
                    trace!("Cancel with no scan in flight");
                }
                let _ = reply.send(());
            }
            Command::ClearError { reply } => {
                self.update(|s| s.error = None);
                let _ = reply.send(());
            }
            Command::ClearResult { reply } => {
                self.update(|s| s.last_result = None);
                let _ = reply.send(());
            }
            Command::Destroy { reply } => {
                self.destroy().await;
                let _ = reply.send(());
            }
        }
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    async fn check_permissions(&mut self) -> bool {
        if !self.supported {
            return self.request_permissions().await;
        }

        match self.capabilities.cached_permission().as_bool() {
            Some(true) => {
                self.update(|s| s.permission = true.into());
                true
            }
            Some(false) => {
                let error = ScanError::new(
                    ScanErrorKind::PermissionDenied,
                    "Camera permission was denied",
                );
                warn!(kind = %error.kind, "Camera permission previously denied");
                self.update(|s| {
                    s.permission = false.into();
                    s.error = Some(error);
                });
                false
            }
            None => self.request_permissions().await,
        }
    }

    async fn request_permissions(&mut self) -> bool {
        if !self.supported {
            self.update(|s| {
                s.permission = false.into();
                s.error = Some(ScanError::unsupported_device());
            });
            return false;
        }

        let facing = self
            .attempt
            .as_ref()
            .map(|a| a.request.facing)
            .unwrap_or_default();

        match self.device.probe(facing).await {
            Ok(()) => {
                info!("Camera permission granted");
                self.update(|s| {
                    s.permission = true.into();
                    s.error = None;
                });
                true
            }
            Err(native) => {
                let error = classify(native);
                warn!(kind = %error.kind, message = %error.message, "Camera permission check failed");
                self.update(|s| {
                    s.permission = false.into();
                    s.error = Some(error);
                });
                false
            }
        }
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    async fn begin_scan(&mut self, request: ScanRequest, reply: oneshot::Sender<ScanOutcome>) {
        if !self.supported {
            let error = ScanError::unsupported_device();
            self.update(|s| s.error = Some(error.clone()));
            let _ = reply.send(Err(error));
            return;
        }

        if let Some(attempt) = self.attempt.as_mut() {
            attempt.waiters.push(reply);
            debug!(attempt = attempt.id, waiters = attempt.waiters.len(), "Joining scan in flight");

            if attempt.deadline.is_none() {
                attempt.timeout = request.timeout;
                let deadline = Instant::now() + request.timeout;
                debug!(attempt = attempt.id, "Resuming stopped capture");
                self.start_capture(deadline).await;
            }
            return;
        }

        let started = Instant::now();
        let deadline = started + request.timeout;
        let id = self.next_attempt;
        self.next_attempt += 1;

        info!(
            attempt = id,
            timeout_ms = request.timeout.as_millis() as u64,
            formats = ?request.formats,
            "Scan started"
        );

        let options = DeviceOptions {
            facing: request.facing,
            max_scans_per_second: self.max_scans_per_second,
        };

        self.attempt = Some(Attempt {
            id,
            timeout: request.timeout,
            request,
            waiters: vec![reply],
            started,
            deadline: None,
        });
        self.update(|s| {
            s.is_scanning = true;
            s.error = None;
        });

        if !self.initialized {
            self.update(|s| s.is_initializing = true);
            let waited = self.init_device(options, deadline).await;
            self.update(|s| s.is_initializing = false);

            match waited {
                InitWait::Done(Ok(Ok(()))) => self.initialized = true,
                InitWait::Done(Ok(Err(native))) => return self.fail(classify(native)).await,
                InitWait::Done(Err(_)) => return self.fail(self.timeout_error()).await,
                InitWait::Interrupted(command) => {
                    debug!(attempt = id, "Device init abandoned");
                    self.fail(ScanError::cancelled()).await;
                    self.device.destroy().await;
                    self.pending.extend(command);
                    return;
                }
            }
        }

        self.start_capture(deadline).await;
    }

    /// Awaits device init without blocking the command channel. Scans join
    /// the attempt, cancel and destroy abandon the init, and anything else
    /// is queued in `pending`.
    async fn init_device(&mut self, options: DeviceOptions, deadline: Instant) -> InitWait {
        let init = timeout_at(deadline, self.device.init(options));
        tokio::pin!(init);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Scan { reply, .. }) => {
                        if let Some(attempt) = self.attempt.as_mut() {
                            attempt.waiters.push(reply);
                        }
                    }
                    Some(command @ (Command::CancelScan { .. } | Command::Destroy { .. })) => {
                        return InitWait::Interrupted(Some(command));
                    }
                    Some(command) => self.pending.push_back(command),
                    None => return InitWait::Interrupted(None),
                },

                initialized = &mut init => return InitWait::Done(initialized),
            }
        }
    }

    async fn start_capture(&mut self, deadline: Instant) {
        self.drain_events();

        match timeout_at(deadline, self.device.start(self.events_tx.clone())).await {
            Ok(Ok(())) => {
                if let Some(attempt) = self.attempt.as_mut() {
                    attempt.deadline = Some(deadline);
                }
                self.update(|s| s.is_scanning = true);
                debug!("Capture running");
            }
            Ok(Err(native)) => self.fail(classify(native)).await,
            Err(_) => self.fail(self.timeout_error()).await,
        }
    }

    async fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Decoded(frame) => self.on_frame(frame).await,
            DeviceEvent::Failed(native) => {
                if self.is_capturing() {
                    self.fail(classify(native)).await;
                } else {
                    debug!(error = %native, "Device fault outside capture");
                }
            }
        }
    }

    async fn on_frame(&mut self, frame: DecodedFrame) {
        let Some(attempt) = self.attempt.as_ref().filter(|a| a.deadline.is_some()) else {
            trace!("Frame outside capture");
            return;
        };

        let format = detect_format(&frame.data);
        if !attempt.request.accepts(&frame.data, format) {
            debug!(attempt = attempt.id, %format, "Frame rejected by filter");
            return;
        }

        let haptic = attempt.request.haptic_feedback;
        let audio = attempt.request.audio_feedback;
        let id = attempt.id;

        let result = ScanResult {
            data: frame.data,
            format,
            timestamp: Utc::now(),
            bounds: frame.bounds,
        };

        if haptic && self.capabilities.supports_haptics() {
            self.feedback.vibrate(Duration::from_millis(HAPTIC_PULSE_MS));
        }
        if audio {
            self.feedback
                .beep(SUCCESS_TONE_HZ, Duration::from_millis(SUCCESS_TONE_MS));
        }

        self.stop_capture().await;
        info!(attempt = id, %format, "Scan succeeded");

        self.update(|s| {
            s.last_result = Some(result.clone());
            s.error = None;
        });
        self.resolve(Ok(result));
    }

    async fn on_timeout(&mut self) {
        if self.attempt.is_some() {
            self.fail(self.timeout_error()).await;
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Stops capture, records `error` and resolves the attempt with it.
    async fn fail(&mut self, error: ScanError) {
        self.stop_capture().await;
        warn!(kind = %error.kind, message = %error.message, "Scan failed");
        self.update(|s| {
            s.is_scanning = false;
            s.error = Some(error.clone());
        });
        self.resolve(Err(error));
    }

    /// Hands `outcome` to every waiter. Later calls find no attempt.
    fn resolve(&mut self, outcome: ScanOutcome) {
        let Some(attempt) = self.attempt.take() else {
            return;
        };

        debug!(
            attempt = attempt.id,
            waiters = attempt.waiters.len(),
            elapsed_ms = attempt.started.elapsed().as_millis() as u64,
            "Scan resolved"
        );

        for waiter in attempt.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn stop_capture(&mut self) {
        self.device.stop().await;
        self.drain_events();
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.deadline = None;
        }
        self.update(|s| s.is_scanning = false);
    }

    async fn destroy(&mut self) {
        if self.attempt.is_some() {
            self.fail(ScanError::cancelled()).await;
        } else {
            self.stop_capture().await;
        }

        self.device.destroy().await;
        self.initialized = false;
        self.update(|s| {
            s.is_scanning = false;
            s.is_initializing = false;
        });
        debug!("Device released");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn is_capturing(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.deadline.is_some())
    }

    fn timeout_error(&self) -> ScanError {
        let timeout = self.attempt.as_ref().map(|a| a.timeout).unwrap_or_default();
        ScanError::timeout(timeout.as_millis())
    }

    fn drain_events(&mut self) {
        while self.events_rx.try_recv().is_ok() {}
    }

    fn update(&self, modify: impl FnOnce(&mut ScannerState)) {
        self.state.send_modify(modify);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
