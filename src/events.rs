use crate::media::MediaKind;
use crate::persistence::SaveTier;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Notifications the media pipeline raises for the user interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Some selected files were already in the list and were ignored
    DuplicatesSkipped { kind: MediaKind, count: usize },
    /// A capture device was granted and is previewing
    CaptureOpened { with_audio: bool },
    /// Device grant was refused
    CaptureDenied { details: String },
    /// Recording started
    RecordingStarted,
    /// One more second of footage has been recorded
    RecordingTick { elapsed_seconds: u32 },
    /// Recording finished; `automatic` is set when the duration ceiling ended it
    RecordingStopped { size_bytes: usize, automatic: bool },
    /// Device disappeared mid-session
    CaptureFailed { details: String },
    /// Device released
    CaptureClosed,
    /// A profile save had to fall back below the first tier
    ProfileSaveDegraded { tier: SaveTier, image_dropped: bool },
    /// No fallback tier could store the profile
    ProfileSaveFailed,
}

impl MediaEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MediaEvent::DuplicatesSkipped { kind, count } => {
                format!("{} duplicate {} file(s) ignored", count, kind)
            }
            MediaEvent::CaptureOpened { with_audio } => {
                if *with_audio {
                    "Camera and microphone opened".to_string()
                } else {
                    "Camera opened".to_string()
                }
            }
            MediaEvent::CaptureDenied { details } => format!("Device access denied: {}", details),
            MediaEvent::RecordingStarted => "Recording started".to_string(),
            MediaEvent::RecordingTick { elapsed_seconds } => format!(
                "REC {}:{:02}",
                elapsed_seconds / 60,
                elapsed_seconds % 60
            ),
            MediaEvent::RecordingStopped {
                size_bytes,
                automatic,
            } => format!(
                "Recording stopped{} ({} bytes)",
                if *automatic { " at duration limit" } else { "" },
                size_bytes
            ),
            MediaEvent::CaptureFailed { details } => format!("Capture failed: {}", details),
            MediaEvent::CaptureClosed => "Capture closed".to_string(),
            MediaEvent::ProfileSaveDegraded {
                tier,
                image_dropped,
            } => format!(
                "Profile saved at tier {:?}{}",
                tier,
                if *image_dropped {
                    "; profile photo was not saved"
                } else {
                    ""
                }
            ),
            MediaEvent::ProfileSaveFailed => "Profile could not be saved locally".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MediaEvent::DuplicatesSkipped { .. } => "duplicates_skipped",
            MediaEvent::CaptureOpened { .. } => "capture_opened",
            MediaEvent::CaptureDenied { .. } => "capture_denied",
            MediaEvent::RecordingStarted => "recording_started",
            MediaEvent::RecordingTick { .. } => "recording_tick",
            MediaEvent::RecordingStopped { .. } => "recording_stopped",
            MediaEvent::CaptureFailed { .. } => "capture_failed",
            MediaEvent::CaptureClosed => "capture_closed",
            MediaEvent::ProfileSaveDegraded { .. } => "profile_save_degraded",
            MediaEvent::ProfileSaveFailed => "profile_save_failed",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },

    #[error("Event channel closed")]
    ChannelClosed,
}

/// Broadcast bus fanning pipeline notifications out to UI listeners
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MediaEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter applied
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers, returning how many received it.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: MediaEvent) -> usize {
        match &event {
            MediaEvent::CaptureDenied { .. }
            | MediaEvent::CaptureFailed { .. }
            | MediaEvent::ProfileSaveDegraded { .. }
            | MediaEvent::ProfileSaveFailed => {
                warn!("{}", event.description());
            }
            MediaEvent::CaptureOpened { .. } | MediaEvent::RecordingStopped { .. } => {
                info!("{}", event.description());
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    Custom(fn(&MediaEvent) -> bool),
}

impl EventFilter {
    /// Device and recording lifecycle, without list or profile notices
    pub fn capture() -> Self {
        EventFilter::EventTypes(vec![
            "capture_opened",
            "capture_denied",
            "recording_started",
            "recording_tick",
            "recording_stopped",
            "capture_failed",
            "capture_closed",
        ])
    }

    pub fn matches(&self, event: &MediaEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<MediaEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<MediaEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<MediaEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<MediaEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
