use super::*;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::events::{EventBus, MediaEvent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn adapter_with(provider: MockDeviceProvider) -> (CaptureAdapter, EventBus) {
    let events = EventBus::new(256);
    let adapter = CaptureAdapter::new(
        Arc::new(provider),
        CaptureConfig::default(),
        events.clone(),
    );
    (adapter, events)
}

/// Grants only after `delay`, like a user sitting on the permission prompt
struct SlowProvider {
    inner: MockDeviceProvider,
    delay: Duration,
}

#[async_trait]
impl DeviceProvider for SlowProvider {
    async fn acquire(
        &self,
        request: DeviceRequest,
    ) -> Result<Box<dyn DeviceHandle>, CaptureError> {
        tokio::time::sleep(self.delay).await;
        self.inner.acquire(request).await
    }
}

fn slow_adapter(provider: MockDeviceProvider) -> Arc<CaptureAdapter> {
    let slow = SlowProvider {
        inner: provider,
        delay: Duration::from_secs(2),
    };
    Arc::new(CaptureAdapter::new(
        Arc::new(slow),
        CaptureConfig::default(),
        EventBus::new(64),
    ))
}

fn drain(receiver: &mut broadcast::Receiver<MediaEvent>) -> Vec<MediaEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_open_photo_previews_muted() {
    let provider = MockDeviceProvider::new();
    let (adapter, events) = adapter_with(provider.clone());
    let mut receiver = events.subscribe();

    let session = adapter.open_photo().await.unwrap();
    assert_eq!(session.mode(), CaptureMode::Previewing);
    assert_eq!(adapter.mode(), CaptureMode::Previewing);
    assert!(session.is_muted());
    assert!(!session.has_audio());
    assert_eq!(provider.live_devices(), 1);

    assert_eq!(
        drain(&mut receiver),
        vec![MediaEvent::CaptureOpened { with_audio: false }]
    );
}

#[tokio::test]
async fn test_denied_request_returns_to_idle() {
    let provider = MockDeviceProvider::new().denying();
    let (adapter, events) = adapter_with(provider.clone());
    let mut receiver = events.subscribe();

    let err = adapter.open_video().await.unwrap_err();
    assert!(matches!(err, CaptureError::DeviceAccessDenied { .. }));
    assert_eq!(adapter.mode(), CaptureMode::Idle);
    assert!(adapter.active_session().is_none());
    assert_eq!(provider.live_devices(), 0);

    let events = drain(&mut receiver);
    assert!(matches!(events[..], [MediaEvent::CaptureDenied { .. }]));
}

#[tokio::test]
async fn test_snapshot_produces_native_size_jpeg() {
    let provider = MockDeviceProvider::new().with_resolution(80, 60);
    let (adapter, _events) = adapter_with(provider);

    let session = adapter.open_photo().await.unwrap();
    let still = session.snapshot().await.unwrap();

    assert!(still.file_name.starts_with("foto-"));
    assert!(still.file_name.ends_with(".jpg"));
    assert_eq!((still.width, still.height), (80, 60));
    assert_eq!(&still.data[..2], &[0xFF, 0xD8]);

    let decoded = image::load_from_memory(&still.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (80, 60));

    let file = still.into_incoming_file();
    assert_eq!(file.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(session.mode(), CaptureMode::Previewing);
}

#[tokio::test]
async fn test_snapshot_without_frame_fails() {
    let provider = MockDeviceProvider::new().without_frames();
    let (adapter, _events) = adapter_with(provider);

    let session = adapter.open_photo().await.unwrap();
    assert_eq!(session.snapshot().await, Err(CaptureError::NoActiveFrame));
    assert_eq!(session.mode(), CaptureMode::Previewing);
}

#[tokio::test]
async fn test_zero_sized_frame_is_no_frame() {
    let provider = MockDeviceProvider::new().with_resolution(0, 0);
    let (adapter, _events) = adapter_with(provider);

    let session = adapter.open_photo().await.unwrap();
    assert_eq!(session.snapshot().await, Err(CaptureError::NoActiveFrame));
}

#[tokio::test(start_paused = true)]
async fn test_operations_rejected_in_wrong_mode() {
    let (adapter, _events) = adapter_with(MockDeviceProvider::new());
    let session = adapter.open_video().await.unwrap();

    assert!(matches!(
        session.stop_recording(),
        Err(CaptureError::InvalidState {
            operation: "stop_recording",
            mode: "previewing"
        })
    ));

    session.start_recording().unwrap();
    assert!(matches!(
        session.snapshot().await,
        Err(CaptureError::InvalidState {
            operation: "snapshot",
            ..
        })
    ));
    assert!(session.start_recording().is_err());

    session.close();
    assert!(session.start_recording().is_err());
    assert!(session.toggle_mute().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_manual_stop_returns_clip() {
    let provider = MockDeviceProvider::new().with_chunk_size(100);
    let (adapter, events) = adapter_with(provider);
    let mut receiver = events.subscribe();

    let session = adapter.open_video().await.unwrap();
    session.start_recording().unwrap();
    assert_eq!(session.mode(), CaptureMode::Recording);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(session.elapsed_seconds(), 3);

    let clip = session.stop_recording().unwrap();
    assert_eq!(session.mode(), CaptureMode::Previewing);
    assert_eq!(clip.duration_seconds, 3);
    assert!(!clip.automatic);
    // three one-second chunks plus the encoder trailer
    assert_eq!(clip.data.len(), 3 * 100 + 4);
    assert!(clip.file_name.starts_with("video-"));
    assert!(clip.file_name.ends_with(".mp4"));

    let ticks: Vec<u32> = drain(&mut receiver)
        .into_iter()
        .filter_map(|event| match event {
            MediaEvent::RecordingTick { elapsed_seconds } => Some(elapsed_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![1, 2, 3]);

    let file = clip.into_incoming_file();
    assert_eq!(file.content_type.as_deref(), Some("video/mp4"));
}

#[tokio::test(start_paused = true)]
async fn test_recording_stops_at_thirty_seconds() {
    let (adapter, events) = adapter_with(MockDeviceProvider::new().with_chunk_size(10));
    let mut receiver = events.subscribe();

    let session = adapter.open_video().await.unwrap();
    session.start_recording().unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(session.mode(), CaptureMode::Previewing);

    let clip = session.take_clip().unwrap();
    assert_eq!(clip.duration_seconds, 30);
    assert!(clip.automatic);
    assert_eq!(clip.data.len(), 30 * 10 + 4);
    assert!(session.take_clip().is_none());

    let events = drain(&mut receiver);
    assert!(events.contains(&MediaEvent::RecordingStopped {
        size_bytes: 304,
        automatic: true,
    }));
    assert!(!events.contains(&MediaEvent::RecordingTick {
        elapsed_seconds: 31
    }));
}

#[tokio::test(start_paused = true)]
async fn test_close_mid_recording_discards_and_releases() {
    let provider = MockDeviceProvider::new();
    let (adapter, events) = adapter_with(provider.clone());
    let mut receiver = events.subscribe();

    let session = adapter.open_video().await.unwrap();
    session.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    session.close();
    assert_eq!(session.mode(), CaptureMode::Idle);
    assert_eq!(provider.live_devices(), 0);
    assert!(session.closed_token().is_cancelled());

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(session.take_clip().is_none());

    session.close();
    let events = drain(&mut receiver);
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == MediaEvent::CaptureClosed)
            .count(),
        1
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, MediaEvent::RecordingStopped { .. })));
}

#[tokio::test]
async fn test_second_open_closes_first() {
    let provider = MockDeviceProvider::new();
    let (adapter, _events) = adapter_with(provider.clone());

    let first = adapter.open_photo().await.unwrap();
    let second = adapter.open_video().await.unwrap();

    assert_eq!(first.mode(), CaptureMode::Idle);
    assert_eq!(second.mode(), CaptureMode::Previewing);
    assert_ne!(first.id(), second.id());
    assert_eq!(provider.grants(), 2);
    assert_eq!(provider.live_devices(), 1);

    adapter.close_active();
    assert_eq!(adapter.mode(), CaptureMode::Idle);
    assert_eq!(provider.live_devices(), 0);
}

#[tokio::test]
async fn test_dropping_adapter_releases_device() {
    let provider = MockDeviceProvider::new();
    let (adapter, _events) = adapter_with(provider.clone());

    let session = adapter.open_photo().await.unwrap();
    drop(adapter);

    assert_eq!(session.mode(), CaptureMode::Idle);
    assert_eq!(provider.live_devices(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_device_loss_mid_recording() {
    let provider = MockDeviceProvider::new();
    let (adapter, events) = adapter_with(provider.clone());
    let mut receiver = events.subscribe();

    let session = adapter.open_video().await.unwrap();
    session.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    provider.lose_device();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(session.mode(), CaptureMode::Idle);
    assert_eq!(provider.live_devices(), 0);
    assert!(session.take_clip().is_none());

    let events = drain(&mut receiver);
    assert!(events
        .iter()
        .any(|event| matches!(event, MediaEvent::CaptureFailed { .. })));
}

#[tokio::test]
async fn test_device_loss_during_snapshot() {
    let provider = MockDeviceProvider::new();
    let (adapter, _events) = adapter_with(provider.clone());

    let session = adapter.open_photo().await.unwrap();
    provider.lose_device();

    let err = session.snapshot().await.unwrap_err();
    assert!(matches!(err, CaptureError::DeviceLost { .. }));
    assert_eq!(session.mode(), CaptureMode::Idle);
    assert_eq!(provider.live_devices(), 0);
}

#[tokio::test]
async fn test_toggle_mute() {
    let provider = MockDeviceProvider::new();
    let (adapter, _events) = adapter_with(provider.clone());
    let session = adapter.open_video().await.unwrap();

    assert!(session.is_muted());
    assert!(provider.monitor_muted());
    assert_eq!(session.toggle_mute(), Ok(false));
    assert!(!session.is_muted());
    assert!(!provider.monitor_muted());
    assert_eq!(session.toggle_mute(), Ok(true));
    assert!(provider.monitor_muted());
}

async fn record_with_toggles(toggle: bool) -> (CapturedStill, CapturedClip) {
    let (adapter, _events) = adapter_with(MockDeviceProvider::new().with_chunk_size(16));
    let session = adapter.open_video().await.unwrap();

    if toggle {
        session.toggle_mute().unwrap();
    }
    let still = session.snapshot().await.unwrap();

    session.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    if toggle {
        session.toggle_mute().unwrap();
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
    if toggle {
        session.toggle_mute().unwrap();
    }
    let clip = session.stop_recording().unwrap();

    (still, clip)
}

#[tokio::test(start_paused = true)]
async fn test_mute_does_not_change_captured_media() {
    let (plain_still, plain_clip) = record_with_toggles(false).await;
    let (toggled_still, toggled_clip) = record_with_toggles(true).await;

    assert_eq!(toggled_still.data, plain_still.data);
    assert_eq!(
        (toggled_still.width, toggled_still.height),
        (plain_still.width, plain_still.height)
    );
    assert_eq!(toggled_clip.data, plain_clip.data);
    assert_eq!(toggled_clip.duration_seconds, plain_clip.duration_seconds);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_requesting_abandons_grant() {
    let provider = MockDeviceProvider::new();
    let adapter = slow_adapter(provider.clone());

    let opening = tokio::spawn({
        let adapter = Arc::clone(&adapter);
        async move { adapter.open_video().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(adapter.mode(), CaptureMode::Requesting);

    adapter.close_active();
    let result = opening.await.unwrap();

    assert!(matches!(
        result,
        Err(CaptureError::InvalidState {
            operation: "open",
            mode: "idle"
        })
    ));
    assert_eq!(adapter.mode(), CaptureMode::Idle);
    assert!(adapter.active_session().is_none());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.live_devices(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_opens_keep_requesting_until_last_grant() {
    let provider = MockDeviceProvider::new();
    let adapter = slow_adapter(provider.clone());

    let first = tokio::spawn({
        let adapter = Arc::clone(&adapter);
        async move { adapter.open_photo().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = tokio::spawn({
        let adapter = Arc::clone(&adapter);
        async move { adapter.open_video().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;

    // the newer request supersedes the older one
    assert!(first.await.unwrap().is_err());
    assert_eq!(adapter.mode(), CaptureMode::Requesting);

    let session = second.await.unwrap().unwrap();
    assert!(session.has_audio());
    assert_eq!(adapter.mode(), CaptureMode::Previewing);
    assert_eq!(provider.grants(), 1);
    assert_eq!(provider.live_devices(), 1);
}

#[test]
fn test_device_request_from_config() {
    let request = DeviceRequest::from_config(&CaptureConfig::default(), true);
    assert_eq!(
        request.video,
        VideoConstraints {
            ideal_width: 1280,
            ideal_height: 720,
            facing_mode: "environment".to_string(),
        }
    );
    assert!(request.audio);
}
