use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::FrameData;
use async_trait::async_trait;
use bytes::Bytes;

/// Video constraints passed to the device when requesting a grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub video: VideoConstraints,
    pub audio: bool,
}

impl DeviceRequest {
    pub fn from_config(config: &CaptureConfig, audio: bool) -> Self {
        Self {
            video: VideoConstraints {
                ideal_width: config.ideal_resolution.0,
                ideal_height: config.ideal_resolution.1,
                facing_mode: config.facing_mode.clone(),
            },
            audio,
        }
    }
}

/// Grants camera/microphone access. Refusal is reported as
/// `CaptureError::DeviceAccessDenied`.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    async fn acquire(&self, request: DeviceRequest) -> Result<Box<dyn DeviceHandle>, CaptureError>;
}

/// A granted, revocable device. Any call may report `DeviceLost` once the
/// platform revokes the grant.
pub trait DeviceHandle: Send {
    /// The frame currently shown in the preview, if one has arrived
    fn current_frame(&mut self) -> Result<Option<FrameData>, CaptureError>;

    /// Begin producing encoded clip chunks
    fn start_recording(&mut self) -> Result<(), CaptureError>;

    /// Encoded chunks produced since the last call
    fn take_chunks(&mut self) -> Result<Vec<Bytes>, CaptureError>;

    /// Stop the encoder and return whatever it still held
    fn stop_recording(&mut self) -> Result<Vec<Bytes>, CaptureError>;

    /// Local monitoring only; recorded audio is unaffected
    fn set_monitor_muted(&mut self, muted: bool);

    /// Give the grant back. Must tolerate repeated calls.
    fn release(&mut self);
}
