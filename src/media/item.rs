use super::preview::PreviewHandle;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a media item, unique within its list for the form session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn default_content_type(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => f.write_str("photo"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOrigin {
    /// Already persisted server-side
    Existing,
    /// Held locally, awaiting upload
    Pending,
}

/// A local file not yet uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMedia {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub preview: PreviewHandle,
}

impl PendingMedia {
    /// Duplicate detection key: original file name and byte length
    pub fn dedupe_key(&self) -> (&str, usize) {
        (&self.file_name, self.data.len())
    }
}

/// Where an item's content lives. The variant is the item's origin.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    Existing { path: String },
    Pending(PendingMedia),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub id: MediaId,
    pub kind: MediaKind,
    pub source: MediaSource,
}

impl MediaItem {
    pub fn existing(kind: MediaKind, path: impl Into<String>) -> Self {
        Self {
            id: MediaId::new(),
            kind,
            source: MediaSource::Existing { path: path.into() },
        }
    }

    pub fn pending(kind: MediaKind, media: PendingMedia) -> Self {
        Self {
            id: MediaId::new(),
            kind,
            source: MediaSource::Pending(media),
        }
    }

    pub fn origin(&self) -> MediaOrigin {
        match self.source {
            MediaSource::Existing { .. } => MediaOrigin::Existing,
            MediaSource::Pending(_) => MediaOrigin::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.source, MediaSource::Pending(_))
    }

    pub fn pending_media(&self) -> Option<&PendingMedia> {
        match &self.source {
            MediaSource::Pending(media) => Some(media),
            MediaSource::Existing { .. } => None,
        }
    }

    pub fn server_path(&self) -> Option<&str> {
        match &self.source {
            MediaSource::Existing { path } => Some(path),
            MediaSource::Pending(_) => None,
        }
    }

    /// URL the UI renders: a server URL for existing items, the preview
    /// handle for pending ones
    pub fn display_url(&self, server_base_url: &str) -> String {
        match &self.source {
            MediaSource::Existing { path } => {
                format!("{}{}", server_base_url.trim_end_matches('/'), path)
            }
            MediaSource::Pending(media) => media.preview.url(),
        }
    }
}

/// A file handed over by the picker or produced by a capture session
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
