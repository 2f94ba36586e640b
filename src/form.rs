//! Media state of one vehicle create/edit form

use crate::capture::{CapturedClip, CapturedStill};
use crate::config::MediaListConfig;
use crate::error::{MediaError, ReorderError};
use crate::events::{EventBus, MediaEvent};
use crate::media::{
    AddOutcome, IncomingFile, MediaId, MediaKind, MediaList, PreviewRegistry, UploadPayload,
};
use crate::reorder::DropResult;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

/// Everything handed to the backend when the form is submitted
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub photos: UploadPayload,
    pub videos: UploadPayload,
}

/// Backend endpoint that stores new media and the final order of the rest
#[async_trait]
pub trait UploadCollaborator: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> std::result::Result<(), String>;
}

pub struct VehicleMediaForm {
    photos: MediaList,
    videos: MediaList,
    config: MediaListConfig,
    events: EventBus,
}

impl VehicleMediaForm {
    pub fn new(config: MediaListConfig, events: EventBus) -> Self {
        let previews = PreviewRegistry::new();
        Self {
            photos: MediaList::with_registry(MediaKind::Photo, previews.clone()),
            videos: MediaList::with_registry(MediaKind::Video, previews),
            config,
            events,
        }
    }

    pub fn photos(&self) -> &MediaList {
        &self.photos
    }

    pub fn videos(&self) -> &MediaList {
        &self.videos
    }

    pub fn list(&self, kind: MediaKind) -> &MediaList {
        match kind {
            MediaKind::Photo => &self.photos,
            MediaKind::Video => &self.videos,
        }
    }

    fn list_mut(&mut self, kind: MediaKind) -> &mut MediaList {
        match kind {
            MediaKind::Photo => &mut self.photos,
            MediaKind::Video => &mut self.videos,
        }
    }

    /// Seed the lists from a saved vehicle. Absolute URLs under the server
    /// base are reduced to their server path.
    pub fn load_vehicle<P, V>(&mut self, photos: P, videos: V)
    where
        P: IntoIterator<Item = String>,
        V: IntoIterator<Item = String>,
    {
        let base = self.config.server_base_url.trim_end_matches('/').to_string();
        let strip = |url: String| {
            let relative = url
                .strip_prefix(&base)
                .filter(|path| path.starts_with('/'))
                .map(str::to_string);
            relative.unwrap_or(url)
        };

        let photos: Vec<String> = photos.into_iter().map(&strip).collect();
        let videos: Vec<String> = videos.into_iter().map(&strip).collect();
        self.photos.load_existing(photos);
        self.videos.load_existing(videos);

        info!(
            "Loaded vehicle media: {} photo(s), {} video(s)",
            self.photos.len(),
            self.videos.len()
        );
    }

    pub fn add_photos(&mut self, files: Vec<IncomingFile>) -> AddOutcome {
        self.add(MediaKind::Photo, files)
    }

    pub fn add_videos(&mut self, files: Vec<IncomingFile>) -> AddOutcome {
        self.add(MediaKind::Video, files)
    }

    pub fn add_captured_still(&mut self, still: CapturedStill) -> AddOutcome {
        self.add(MediaKind::Photo, vec![still.into_incoming_file()])
    }

    pub fn add_captured_clip(&mut self, clip: CapturedClip) -> AddOutcome {
        self.add(MediaKind::Video, vec![clip.into_incoming_file()])
    }

    fn add(&mut self, kind: MediaKind, files: Vec<IncomingFile>) -> AddOutcome {
        let outcome = self.list_mut(kind).add(files);
        if outcome.duplicates_skipped > 0 {
            self.events.publish(MediaEvent::DuplicatesSkipped {
                kind,
                count: outcome.duplicates_skipped,
            });
        }
        outcome
    }

    pub fn remove(&mut self, kind: MediaKind, id: MediaId) -> bool {
        self.list_mut(kind).remove(id)
    }

    pub fn apply_drop(
        &mut self,
        kind: MediaKind,
        drop: DropResult,
    ) -> std::result::Result<bool, ReorderError> {
        self.list_mut(kind).apply_drop(drop)
    }

    pub fn move_up(
        &mut self,
        kind: MediaKind,
        index: usize,
    ) -> std::result::Result<bool, ReorderError> {
        self.list_mut(kind).move_up(index)
    }

    pub fn move_down(
        &mut self,
        kind: MediaKind,
        index: usize,
    ) -> std::result::Result<bool, ReorderError> {
        self.list_mut(kind).move_down(index)
    }

    /// URLs for rendering thumbnails in list order
    pub fn display_urls(&self, kind: MediaKind) -> Vec<String> {
        self.list(kind)
            .items()
            .iter()
            .map(|item| item.display_url(&self.config.server_base_url))
            .collect()
    }

    pub fn to_upload_request(&self) -> UploadRequest {
        UploadRequest {
            photos: self.photos.to_upload_payload(),
            videos: self.videos.to_upload_payload(),
        }
    }

    /// Hand the media off to the backend. The lists are discarded on
    /// success; on failure the form is returned so the user can retry.
    pub async fn submit(
        self,
        uploader: &dyn UploadCollaborator,
    ) -> std::result::Result<UploadRequest, (Self, MediaError)> {
        let request = self.to_upload_request();
        debug!(
            "Submitting {} new photo(s), {} new video(s)",
            request.photos.pending.len(),
            request.videos.pending.len()
        );

        if let Err(details) = uploader.upload(request.clone()).await {
            return Err((self, MediaError::Upload { details }));
        }

        drop(self);
        info!("Vehicle media submitted");
        Ok(request)
    }
}

impl fmt::Debug for VehicleMediaForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VehicleMediaForm")
            .field("photos", &self.photos)
            .field("videos", &self.videos)
            .field("config", &self.config)
            .finish()
    }
}
