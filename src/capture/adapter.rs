use super::device::{DeviceProvider, DeviceRequest};
use super::session::{CaptureMode, CaptureSession};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::events::{EventBus, MediaEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Opens capture sessions against a device provider. At most one session is
/// live; opening another closes the previous one first.
pub struct CaptureAdapter {
    provider: Arc<dyn DeviceProvider>,
    config: CaptureConfig,
    events: EventBus,
    active: Mutex<Option<CaptureSession>>,
    /// Cancelled by `close_active`; grants still in flight are abandoned
    pending: Mutex<CancellationToken>,
    requesting: AtomicUsize,
    next_id: AtomicU64,
}

impl CaptureAdapter {
    pub fn new(provider: Arc<dyn DeviceProvider>, config: CaptureConfig, events: EventBus) -> Self {
        Self {
            provider,
            config,
            events,
            active: Mutex::new(None),
            pending: Mutex::new(CancellationToken::new()),
            requesting: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Camera only
    pub async fn open_photo(&self) -> Result<CaptureSession, CaptureError> {
        self.open(false).await
    }

    /// Camera and microphone
    pub async fn open_video(&self) -> Result<CaptureSession, CaptureError> {
        self.open(true).await
    }

    pub fn mode(&self) -> CaptureMode {
        if self.requesting.load(Ordering::SeqCst) > 0 {
            return CaptureMode::Requesting;
        }
        self.active
            .lock()
            .as_ref()
            .map(|session| session.mode())
            .unwrap_or(CaptureMode::Idle)
    }

    pub fn active_session(&self) -> Option<CaptureSession> {
        self.active.lock().clone()
    }

    /// Close the live session and abandon any grant still being requested
    pub fn close_active(&self) {
        let abandoned =
            std::mem::replace(&mut *self.pending.lock(), CancellationToken::new());
        abandoned.cancel();

        let previous = self.active.lock().take();
        if let Some(session) = previous {
            session.close();
        }
    }

    async fn open(&self, with_audio: bool) -> Result<CaptureSession, CaptureError> {
        self.close_active();
        let pending = self.pending.lock().clone();

        let request = DeviceRequest::from_config(&self.config, with_audio);
        let requesting = RequestingGuard::enter(&self.requesting);
        let granted = tokio::select! {
            biased;
            _ = pending.cancelled() => None,
            granted = self.provider.acquire(request) => Some(granted),
        };
        drop(requesting);

        let device = match granted {
            Some(Ok(mut device)) if pending.is_cancelled() => {
                device.release();
                return Err(Self::abandoned());
            }
            None => {
                debug!("Device request abandoned before the grant arrived");
                return Err(Self::abandoned());
            }
            Some(Ok(device)) => device,
            Some(Err(e)) => {
                warn!("Capture device request failed: {}", e);
                self.events.publish(MediaEvent::CaptureDenied {
                    details: e.to_string(),
                });
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = CaptureSession::new(
            id,
            device,
            with_audio,
            self.config.clone(),
            self.events.clone(),
        );
        info!(
            "Capture session {} opened (audio: {}, muted: {})",
            id,
            with_audio,
            session.is_muted()
        );

        // A concurrent open may have landed while this one was waiting
        let replaced = self.active.lock().replace(session.clone());
        if let Some(previous) = replaced {
            previous.close();
        }

        self.events.publish(MediaEvent::CaptureOpened { with_audio });
        Ok(session)
    }

    fn abandoned() -> CaptureError {
        CaptureError::InvalidState {
            operation: "open",
            mode: CaptureMode::Idle.as_str(),
        }
    }
}

/// Counts an in-flight device request, including one whose future is dropped
struct RequestingGuard<'a>(&'a AtomicUsize);

impl<'a> RequestingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RequestingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for CaptureAdapter {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            session.close();
        }
    }
}
