use super::device::DeviceHandle;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::events::{EventBus, MediaEvent};
use crate::media::{IncomingFile, MediaKind};
use crate::normalize::encode_frame;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Idle,
    Requesting,
    Previewing,
    Recording,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Idle => "idle",
            CaptureMode::Requesting => "requesting",
            CaptureMode::Previewing => "previewing",
            CaptureMode::Recording => "recording",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JPEG still taken from the preview
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedStill {
    pub file_name: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

impl CapturedStill {
    pub fn into_incoming_file(self) -> IncomingFile {
        IncomingFile::new(self.file_name, self.data)
            .with_content_type(MediaKind::Photo.default_content_type())
    }
}

/// Recorded clip, concatenated from the encoder's chunks
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedClip {
    pub file_name: String,
    pub data: Bytes,
    pub duration_seconds: u32,
    /// The duration ceiling ended the recording
    pub automatic: bool,
}

impl CapturedClip {
    pub fn into_incoming_file(self) -> IncomingFile {
        IncomingFile::new(self.file_name, self.data)
            .with_content_type(MediaKind::Video.default_content_type())
    }
}

struct SessionState {
    mode: CaptureMode,
    device: Option<Box<dyn DeviceHandle>>,
    elapsed_seconds: u32,
    chunks: Vec<Bytes>,
    recording_token: Option<CancellationToken>,
    finished_clip: Option<CapturedClip>,
    muted: bool,
}

struct SessionShared {
    id: u64,
    with_audio: bool,
    config: CaptureConfig,
    events: EventBus,
    state: Mutex<SessionState>,
    token: CancellationToken,
}

enum TickOutcome {
    Continue,
    Done,
}

/// A live device grant driven through Previewing and Recording. Clones share
/// the same session.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<SessionShared>,
}

impl CaptureSession {
    pub(crate) fn new(
        id: u64,
        mut device: Box<dyn DeviceHandle>,
        with_audio: bool,
        config: CaptureConfig,
        events: EventBus,
    ) -> Self {
        let muted = config.start_muted;
        device.set_monitor_muted(muted);

        Self {
            shared: Arc::new(SessionShared {
                id,
                with_audio,
                config,
                events,
                state: Mutex::new(SessionState {
                    mode: CaptureMode::Previewing,
                    device: Some(device),
                    elapsed_seconds: 0,
                    chunks: Vec::new(),
                    recording_token: None,
                    finished_clip: None,
                    muted,
                }),
                token: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn has_audio(&self) -> bool {
        self.shared.with_audio
    }

    pub fn mode(&self) -> CaptureMode {
        self.shared.state.lock().mode
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.shared.state.lock().elapsed_seconds
    }

    pub fn is_muted(&self) -> bool {
        self.shared.state.lock().muted
    }

    /// Cancelled once the session closes
    pub fn closed_token(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    /// Encode the current preview frame as a JPEG at its native resolution
    pub async fn snapshot(&self) -> Result<CapturedStill, CaptureError> {
        let frame = {
            let mut state = self.shared.state.lock();
            self.shared.require(&state, "snapshot", CaptureMode::Previewing)?;

            let device = state
                .device
                .as_mut()
                .ok_or(CaptureError::InvalidState {
                    operation: "snapshot",
                    mode: CaptureMode::Idle.as_str(),
                })?;
            match device.current_frame() {
                Ok(Some(frame)) if frame.has_picture() => frame,
                Ok(_) => return Err(CaptureError::NoActiveFrame),
                Err(e) => {
                    self.shared.fail(&mut state, &e);
                    return Err(e);
                }
            }
        };

        let quality = self.shared.config.snapshot_quality;
        let (width, height) = (frame.width, frame.height);
        let token = self.shared.token.clone();
        let encode = tokio::task::spawn_blocking(move || {
            encode_frame(&frame, frame.width.max(frame.height), quality)
        });

        let data = tokio::select! {
            _ = token.cancelled() => {
                debug!("Session {} closed while encoding snapshot", self.shared.id);
                return Err(CaptureError::InvalidState {
                    operation: "snapshot",
                    mode: CaptureMode::Idle.as_str(),
                });
            }
            joined = encode => joined
                .map_err(|e| CaptureError::Encoding { details: e.to_string() })?
                .map_err(|e| CaptureError::Encoding { details: e.to_string() })?,
        };

        let file_name = format!("foto-{}.jpg", chrono::Utc::now().timestamp_millis());
        info!(
            "Session {} captured {}x{} still {} ({} bytes)",
            self.shared.id,
            width,
            height,
            file_name,
            data.len()
        );

        Ok(CapturedStill {
            file_name,
            data,
            width,
            height,
        })
    }

    /// Begin recording. The clip ends by itself once the configured ceiling
    /// is reached; collect it with `take_clip`.
    pub fn start_recording(&self) -> Result<(), CaptureError> {
        let token = {
            let mut state = self.shared.state.lock();
            self.shared
                .require(&state, "start_recording", CaptureMode::Previewing)?;

            let started = match state.device.as_mut() {
                Some(device) => device.start_recording(),
                None => Err(CaptureError::InvalidState {
                    operation: "start_recording",
                    mode: CaptureMode::Idle.as_str(),
                }),
            };
            if let Err(e) = started {
                if matches!(e, CaptureError::DeviceLost { .. }) {
                    self.shared.fail(&mut state, &e);
                }
                return Err(e);
            }

            let token = self.shared.token.child_token();
            state.mode = CaptureMode::Recording;
            state.elapsed_seconds = 0;
            state.chunks.clear();
            state.finished_clip = None;
            state.recording_token = Some(token.clone());
            token
        };

        info!(
            "Session {} recording (limit {}s)",
            self.shared.id, self.shared.config.max_recording_seconds
        );
        self.shared.events.publish(MediaEvent::RecordingStarted);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            run_recording_timer(shared, token).await;
        });

        Ok(())
    }

    /// Stop recording and return the finished clip
    pub fn stop_recording(&self) -> Result<CapturedClip, CaptureError> {
        let mut state = self.shared.state.lock();
        self.shared
            .require(&state, "stop_recording", CaptureMode::Recording)?;
        self.shared.finalize(&mut state, false)
    }

    /// Take the clip produced by an automatic stop, if any
    pub fn take_clip(&self) -> Option<CapturedClip> {
        self.shared.state.lock().finished_clip.take()
    }

    /// Flip local audio monitoring; returns the new muted state
    pub fn toggle_mute(&self) -> Result<bool, CaptureError> {
        let mut state = self.shared.state.lock();
        if state.mode == CaptureMode::Idle {
            return Err(CaptureError::InvalidState {
                operation: "toggle_mute",
                mode: CaptureMode::Idle.as_str(),
            });
        }

        state.muted = !state.muted;
        let muted = state.muted;
        if let Some(device) = state.device.as_mut() {
            device.set_monitor_muted(muted);
        }
        debug!("Session {} monitor muted: {}", self.shared.id, muted);
        Ok(muted)
    }

    /// Release the device from any state. An in-flight recording is
    /// discarded. Safe to call repeatedly.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        let was_active = state.mode != CaptureMode::Idle;

        if state.mode == CaptureMode::Recording {
            if let Some(token) = state.recording_token.take() {
                token.cancel();
            }
            if let Some(device) = state.device.as_mut() {
                if let Err(e) = device.stop_recording() {
                    debug!("Encoder stop on close failed: {}", e);
                }
            }
            let discarded: usize = state.chunks.drain(..).map(|c| c.len()).sum();
            info!(
                "Session {} closed mid-recording; discarded {} bytes",
                self.shared.id, discarded
            );
        }

        if let Some(mut device) = state.device.take() {
            device.release();
        }
        state.mode = CaptureMode::Idle;
        state.elapsed_seconds = 0;
        drop(state);

        self.shared.token.cancel();
        if was_active {
            self.shared.events.publish(MediaEvent::CaptureClosed);
            debug!("Session {} closed", self.shared.id);
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.shared.id)
            .field("with_audio", &self.shared.with_audio)
            .field("mode", &self.mode())
            .finish()
    }
}

impl SessionShared {
    fn require(
        &self,
        state: &SessionState,
        operation: &'static str,
        expected: CaptureMode,
    ) -> Result<(), CaptureError> {
        if state.mode != expected {
            return Err(CaptureError::InvalidState {
                operation,
                mode: state.mode.as_str(),
            });
        }
        Ok(())
    }

    /// Stop the encoder, join the chunks and return to Previewing
    fn finalize(
        &self,
        state: &mut SessionState,
        automatic: bool,
    ) -> Result<CapturedClip, CaptureError> {
        if let Some(token) = state.recording_token.take() {
            token.cancel();
        }

        let tail = match state.device.as_mut() {
            Some(device) => device.stop_recording(),
            None => Ok(Vec::new()),
        };
        let tail = match tail {
            Ok(tail) => tail,
            Err(e) => {
                self.fail(state, &e);
                return Err(e);
            }
        };
        state.chunks.extend(tail);

        let mut data = BytesMut::with_capacity(state.chunks.iter().map(|c| c.len()).sum());
        for chunk in state.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        let data = data.freeze();

        state.mode = CaptureMode::Previewing;
        let clip = CapturedClip {
            file_name: format!("video-{}.mp4", chrono::Utc::now().timestamp_millis()),
            data,
            duration_seconds: state.elapsed_seconds,
            automatic,
        };

        self.events.publish(MediaEvent::RecordingStopped {
            size_bytes: clip.data.len(),
            automatic,
        });
        Ok(clip)
    }

    /// End the session after the device went away
    fn fail(&self, state: &mut SessionState, err: &CaptureError) {
        error!("Session {} lost its device: {}", self.id, err);

        if let Some(token) = state.recording_token.take() {
            token.cancel();
        }
        if let Some(mut device) = state.device.take() {
            device.release();
        }
        state.chunks.clear();
        state.mode = CaptureMode::Idle;
        self.token.cancel();

        self.events.publish(MediaEvent::CaptureFailed {
            details: err.to_string(),
        });
    }

    fn on_recording_tick(&self) -> TickOutcome {
        let mut state = self.state.lock();
        if state.mode != CaptureMode::Recording {
            return TickOutcome::Done;
        }

        let drained = match state.device.as_mut() {
            Some(device) => device.take_chunks(),
            None => return TickOutcome::Done,
        };
        match drained {
            Ok(chunks) => state.chunks.extend(chunks),
            Err(e) => {
                self.fail(&mut state, &e);
                return TickOutcome::Done;
            }
        }

        state.elapsed_seconds += 1;
        self.events.publish(MediaEvent::RecordingTick {
            elapsed_seconds: state.elapsed_seconds,
        });

        if state.elapsed_seconds >= self.config.max_recording_seconds {
            info!(
                "Session {} reached the {}s recording limit",
                self.id, self.config.max_recording_seconds
            );
            match self.finalize(&mut state, true) {
                Ok(clip) => state.finished_clip = Some(clip),
                Err(e) => warn!("Automatic stop failed: {}", e),
            }
            return TickOutcome::Done;
        }

        TickOutcome::Continue
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(mut device) = state.device.take() {
            warn!("Session {} dropped without close; releasing device", self.id);
            device.release();
        }
    }
}

async fn run_recording_timer(shared: Arc<SessionShared>, token: CancellationToken) {
    let period = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let TickOutcome::Done = shared.on_recording_tick() {
                    break;
                }
            }
        }
    }

    debug!("Recording timer for session {} stopped", shared.id);
}
