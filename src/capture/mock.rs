//! In-process camera used by tests and the `capture-demo` command

use super::device::{DeviceHandle, DeviceProvider, DeviceRequest};
use crate::error::CaptureError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Default)]
struct MockCounters {
    live: AtomicUsize,
    grants: AtomicUsize,
    lost: AtomicBool,
    monitor_muted: AtomicBool,
}

/// Hands out synthetic devices that render a gradient and emit fixed-size
/// encoder chunks
#[derive(Debug, Clone)]
pub struct MockDeviceProvider {
    deny: bool,
    resolution: (u32, u32),
    frames: bool,
    chunk_size: usize,
    counters: Arc<MockCounters>,
}

impl Default for MockDeviceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDeviceProvider {
    pub fn new() -> Self {
        Self {
            deny: false,
            resolution: (64, 48),
            frames: true,
            chunk_size: 1024,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Refuse every grant
    pub fn denying(mut self) -> Self {
        self.deny = true;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Devices never deliver a frame
    pub fn without_frames(mut self) -> Self {
        self.frames = false;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Revoke every device handed out so far
    pub fn lose_device(&self) {
        self.counters.lost.store(true, Ordering::SeqCst);
    }

    /// Devices granted and not yet released
    pub fn live_devices(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Whether the most recent device is monitoring its microphone muted
    pub fn monitor_muted(&self) -> bool {
        self.counters.monitor_muted.load(Ordering::SeqCst)
    }

    /// Total grants handed out
    pub fn grants(&self) -> usize {
        self.counters.grants.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceProvider for MockDeviceProvider {
    async fn acquire(&self, request: DeviceRequest) -> Result<Box<dyn DeviceHandle>, CaptureError> {
        if self.deny {
            return Err(CaptureError::DeviceAccessDenied {
                details: "permission dismissed".to_string(),
            });
        }

        self.counters.lost.store(false, Ordering::SeqCst);
        self.counters.grants.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Mock device granted ({}x{} ideal, facing {}, audio {})",
            request.video.ideal_width,
            request.video.ideal_height,
            request.video.facing_mode,
            request.audio
        );

        Ok(Box::new(MockDevice {
            width: self.resolution.0,
            height: self.resolution.1,
            frames: self.frames,
            chunk_size: self.chunk_size,
            recording: false,
            released: false,
            frame_id: 0,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockDevice {
    width: u32,
    height: u32,
    frames: bool,
    chunk_size: usize,
    recording: bool,
    released: bool,
    frame_id: u64,
    counters: Arc<MockCounters>,
}

impl MockDevice {
    fn check(&self) -> Result<(), CaptureError> {
        if self.counters.lost.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceLost {
                details: "mock device unplugged".to_string(),
            });
        }
        if self.released {
            return Err(CaptureError::DeviceLost {
                details: "mock device already released".to_string(),
            });
        }
        Ok(())
    }

    fn gradient(&self) -> Bytes {
        let (w, h) = (self.width.max(1), self.height.max(1));
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x * 255 / w) as u8);
                data.push((y * 255 / h) as u8);
                data.push(128);
            }
        }
        Bytes::from(data)
    }
}

impl DeviceHandle for MockDevice {
    fn current_frame(&mut self) -> Result<Option<FrameData>, CaptureError> {
        self.check()?;
        if !self.frames {
            return Ok(None);
        }

        let id = self.frame_id;
        self.frame_id += 1;
        Ok(Some(FrameData::new(
            id,
            SystemTime::now(),
            self.gradient(),
            self.width,
            self.height,
            FrameFormat::Rgb24,
        )))
    }

    fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.check()?;
        self.recording = true;
        Ok(())
    }

    fn take_chunks(&mut self) -> Result<Vec<Bytes>, CaptureError> {
        self.check()?;
        if !self.recording {
            return Ok(Vec::new());
        }
        Ok(vec![Bytes::from(vec![0xAB; self.chunk_size])])
    }

    fn stop_recording(&mut self) -> Result<Vec<Bytes>, CaptureError> {
        self.check()?;
        if !self.recording {
            return Ok(Vec::new());
        }
        self.recording = false;
        Ok(vec![Bytes::from_static(b"moov")])
    }

    fn set_monitor_muted(&mut self, muted: bool) {
        self.counters.monitor_muted.store(muted, Ordering::SeqCst);
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.recording = false;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.release();
    }
}
