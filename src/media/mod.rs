mod item;
mod list;
mod preview;
#[cfg(test)]
mod tests;

pub use item::{
    IncomingFile, MediaId, MediaItem, MediaKind, MediaOrigin, MediaSource, PendingMedia,
};
pub use list::{AddOutcome, MediaList, PendingUpload, UploadPayload};
pub use preview::{PreviewHandle, PreviewRegistry};
