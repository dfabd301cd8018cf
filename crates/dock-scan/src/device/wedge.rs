//! # Keyboard-Wedge Device
//!
//! Handheld warehouse scanners usually present themselves as a keyboard:
//! every decoded code is "typed" followed by Enter. [`WedgeDevice`] adapts
//! any line source (stdin, a serial port, a test pipe) to [`CameraDevice`].
//!
//! ## Flow
//! ```text
//! ┌──────────────┐  lines   ┌──────────────┐  DeviceEvent   ┌──────────────┐
//! │ line source  │ ───────► │ reader task  │ ─────────────► │ FrameSink    │
//! │ (AsyncBufRead)│         │ (spawned on  │  only while    │ (session)    │
//! └──────────────┘          │  first init) │  started       └──────────────┘
//!                           └──────────────┘
//! ```
//!
//! The reader task lives as long as the device. Lines typed while the
//! device is stopped are discarded, the same way a camera that is not
//! running sees nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dock_core::{CameraFacing, NativeError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{CameraDevice, DecodedFrame, DeviceEvent, DeviceOptions, FrameSink};

/// Where the reader task currently delivers payloads.
#[derive(Clone)]
struct Route {
    sink: FrameSink,
    min_interval: Duration,
}

/// A line-oriented scanner.
pub struct WedgeDevice<R> {
    source: Option<R>,
    route: watch::Sender<Option<Route>>,
    reader: Option<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
    options: Option<DeviceOptions>,
}

impl<R> WedgeDevice<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(source: R) -> Self {
        let (route, _) = watch::channel(None);
        WedgeDevice {
            source: Some(source),
            route,
            reader: None,
            closed: Arc::new(AtomicBool::new(false)),
            options: None,
        }
    }

    fn ensure_open(&self) -> Result<(), NativeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NativeError::new("NotReadableError", "Scanner input closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl<R> CameraDevice for WedgeDevice<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn probe(&mut self, _facing: CameraFacing) -> Result<(), NativeError> {
        self.ensure_open()
    }

    async fn init(&mut self, options: DeviceOptions) -> Result<(), NativeError> {
        self.ensure_open()?;

        if let Some(source) = self.source.take() {
            let routes = self.route.subscribe();
            let closed = self.closed.clone();
            self.reader = Some(tokio::spawn(read_lines(source, routes, closed)));
            info!(rate = options.max_scans_per_second, "Keyboard wedge attached");
        }

        self.options = Some(options);
        Ok(())
    }

    async fn start(&mut self, frames: FrameSink) -> Result<(), NativeError> {
        self.ensure_open()?;

        let options = self.options.ok_or_else(|| {
            NativeError::new("InvalidStateError", "Scanner started before init")
        })?;

        self.route.send_replace(Some(Route {
            sink: frames,
            min_interval: options.min_frame_interval(),
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        self.route.send_replace(None);
    }

    async fn destroy(&mut self) {
        self.route.send_replace(None);
        self.options = None;
    }
}

impl<R> Drop for WedgeDevice<R> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Reads lines until the source closes, forwarding each to the current
/// route.
async fn read_lines<R>(mut source: R, routes: watch::Receiver<Option<Route>>, closed: Arc<AtomicBool>)
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut last_sent: Option<Instant> = None;

    let fault = loop {
        line.clear();

        match source.read_line(&mut line).await {
            Ok(0) => break NativeError::new("NotReadableError", "Scanner input closed"),
            Ok(_) => {
                let data = line.trim_end_matches(['\r', '\n']);
                if data.trim().is_empty() {
                    continue;
                }

                let route = routes.borrow().clone();
                let Some(route) = route else {
                    trace!("Dropping payload, scanner not started");
                    continue;
                };

                let now = Instant::now();
                if let Some(previous) = last_sent {
                    if now.duration_since(previous) < route.min_interval {
                        debug!("Dropping payload over scan rate");
                        continue;
                    }
                }
                last_sent = Some(now);

                let event = DeviceEvent::Decoded(DecodedFrame::new(data));
                if route.sink.send(event).await.is_err() {
                    debug!("Frame sink closed");
                }
            }
            Err(e) => break NativeError::new("NotReadableError", e.to_string()),
        }
    };

    closed.store(true, Ordering::Release);
    warn!(error = %fault, "Keyboard wedge stopped reading");

    let route = routes.borrow().clone();
    if let Some(route) = route {
        let _ = route.sink.send(DeviceEvent::Failed(fault)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt, BufReader};
    use tokio::sync::mpsc;

    fn decoded(data: &str) -> Option<DeviceEvent> {
        Some(DeviceEvent::Decoded(DecodedFrame::new(data)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_lines_while_started() {
        let (mut input, output) = duplex(256);
        let mut device = WedgeDevice::new(BufReader::new(output));
        device.init(DeviceOptions::default()).await.unwrap();

        let (tx, mut frames) = mpsc::channel(8);
        device.start(tx).await.unwrap();

        input.write_all(b"PAL-ABC123\r\n").await.unwrap();
        assert_eq!(frames.recv().await, decoded("PAL-ABC123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_drops_bursts() {
        let (mut input, output) = duplex(256);
        let mut device = WedgeDevice::new(BufReader::new(output));
        device.init(DeviceOptions::default()).await.unwrap();

        let (tx, mut frames) = mpsc::channel(8);
        device.start(tx).await.unwrap();

        input.write_all(b"AAA111\nBBB222\n").await.unwrap();
        assert_eq!(frames.recv().await, decoded("AAA111"));

        tokio::time::advance(Duration::from_millis(250)).await;
        input.write_all(b"CCC333\n").await.unwrap();
        assert_eq!(frames.recv().await, decoded("CCC333"));
    }

    #[tokio::test]
    async fn test_start_before_init_fails() {
        let mut device = WedgeDevice::new(BufReader::new(tokio::io::empty()));
        let (tx, _frames) = mpsc::channel(1);
        let err = device.start(tx).await.unwrap_err();
        assert_eq!(err.name, "InvalidStateError");
    }

    #[tokio::test]
    async fn test_closed_input_is_reported() {
        let (input, output) = duplex(64);
        let mut device = WedgeDevice::new(BufReader::new(output));
        device.init(DeviceOptions::default()).await.unwrap();

        let (tx, mut frames) = mpsc::channel(8);
        device.start(tx).await.unwrap();
        drop(input);

        match frames.recv().await {
            Some(DeviceEvent::Failed(native)) => assert_eq!(native.name, "NotReadableError"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(device.probe(CameraFacing::Environment).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_and_destroy_are_idempotent() {
        let mut device = WedgeDevice::new(BufReader::new(tokio::io::empty()));
        device.stop().await;
        device.destroy().await;
        device.destroy().await;
    }
}
