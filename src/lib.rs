pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod frame;
pub mod media;
pub mod normalize;
pub mod persistence;
pub mod reorder;

pub use capture::{
    CaptureAdapter, CaptureMode, CaptureSession, CapturedClip, CapturedStill, DeviceHandle,
    DeviceProvider, DeviceRequest, MockDeviceProvider,
};
pub use config::{MediaConfig, NormalizePreset};
pub use error::{
    CaptureError, MediaError, NormalizeError, PersistenceError, ReorderError, Result, StoreError,
};
pub use events::{EventBus, EventBusError, EventFilter, EventReceiver, MediaEvent};
pub use form::{UploadCollaborator, UploadRequest, VehicleMediaForm};
pub use frame::{FrameData, FrameFormat};
pub use media::{
    AddOutcome, IncomingFile, MediaId, MediaItem, MediaKind, MediaList, MediaOrigin, MediaSource,
    PendingMedia, PendingUpload, PreviewHandle, PreviewRegistry, UploadPayload,
};
pub use persistence::{
    JsonFileStore, KeyValueStore, MemoryStore, ProfilePatch, ProfileRecord, QuotaAwareSaver,
    SaveReport, SaveTier, SessionVault,
};
pub use reorder::{move_item, DropResult};
