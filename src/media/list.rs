use super::item::{IncomingFile, MediaId, MediaItem, MediaKind, MediaSource, PendingMedia};
use super::preview::PreviewRegistry;
use crate::error::ReorderError;
use crate::reorder::{self, DropResult};
use bytes::Bytes;
use std::collections::HashSet;
use tracing::{debug, info};

/// Result of an `add` call
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub accepted: Vec<MediaItem>,
    /// Inputs whose (name, size) matched a pending item already present
    pub duplicates_skipped: usize,
}

/// A new file for the upload collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The two halves of a list handed to the backend: new bytes in display
/// order, and the final order of already persisted media
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPayload {
    pub kind: MediaKind,
    pub pending: Vec<PendingUpload>,
    pub existing_order: Vec<String>,
}

impl UploadPayload {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.existing_order.is_empty()
    }
}

/// Ordered photo or video set of one form session
#[derive(Debug)]
pub struct MediaList {
    kind: MediaKind,
    items: Vec<MediaItem>,
    previews: PreviewRegistry,
}

impl MediaList {
    pub fn new(kind: MediaKind) -> Self {
        Self::with_registry(kind, PreviewRegistry::new())
    }

    pub fn with_registry(kind: MediaKind, previews: PreviewRegistry) -> Self {
        Self {
            kind,
            items: Vec::new(),
            previews,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn position(&self, id: MediaId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_pending()).count()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Append already persisted media, e.g. when editing a saved vehicle
    pub fn load_existing<I, S>(&mut self, paths: I) -> Vec<MediaId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<MediaId> = paths
            .into_iter()
            .map(|path| {
                let item = MediaItem::existing(self.kind, path);
                let id = item.id;
                self.items.push(item);
                id
            })
            .collect();

        debug!("Loaded {} existing {} item(s)", ids.len(), self.kind);
        ids
    }

    /// Append files, skipping any whose (name, size) is already held by a
    /// pending item, including one accepted earlier in the same call
    pub fn add(&mut self, files: Vec<IncomingFile>) -> AddOutcome {
        let mut seen: HashSet<(String, usize)> = self
            .items
            .iter()
            .filter_map(|item| item.pending_media())
            .map(|media| (media.file_name.clone(), media.data.len()))
            .collect();

        let mut accepted = Vec::new();
        let mut duplicates_skipped = 0;

        for file in files {
            let key = (file.name.clone(), file.size());
            if !seen.insert(key) {
                debug!(
                    "Skipping duplicate {} '{}' ({} bytes)",
                    self.kind,
                    file.name,
                    file.size()
                );
                duplicates_skipped += 1;
                continue;
            }

            let preview = self.previews.create(file.data.clone());
            let item = MediaItem::pending(
                self.kind,
                PendingMedia {
                    file_name: file.name,
                    content_type: file.content_type,
                    data: file.data,
                    preview,
                },
            );
            self.items.push(item.clone());
            accepted.push(item);
        }

        if duplicates_skipped > 0 {
            info!(
                "Ignored {} duplicate {} file(s); accepted {}",
                duplicates_skipped,
                self.kind,
                accepted.len()
            );
        }

        AddOutcome {
            accepted,
            duplicates_skipped,
        }
    }

    /// Delete an item, releasing its preview if it was pending
    pub fn remove(&mut self, id: MediaId) -> bool {
        let Some(index) = self.position(id) else {
            debug!("Remove of unknown {} {} ignored", self.kind, id);
            return false;
        };

        let item = self.items.remove(index);
        if let MediaSource::Pending(media) = &item.source {
            self.previews.release(&media.preview);
        }
        debug!("Removed {} {} from position {}", self.kind, id, index);
        true
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ReorderError> {
        self.items = reorder::move_item(&self.items, from, to)?;
        Ok(())
    }

    /// Apply a drag gesture; returns whether the order changed
    pub fn apply_drop(&mut self, drop: DropResult) -> Result<bool, ReorderError> {
        Ok(self.replace_order(reorder::apply_drop(&self.items, drop)?))
    }

    pub fn move_up(&mut self, index: usize) -> Result<bool, ReorderError> {
        Ok(self.replace_order(reorder::move_up(&self.items, index)?))
    }

    pub fn move_down(&mut self, index: usize) -> Result<bool, ReorderError> {
        Ok(self.replace_order(reorder::move_down(&self.items, index)?))
    }

    fn replace_order(&mut self, reordered: Option<Vec<MediaItem>>) -> bool {
        match reordered {
            Some(items) => {
                self.items = items;
                true
            }
            None => false,
        }
    }

    /// Split the current order into new bytes and existing references,
    /// each keeping its relative order
    pub fn to_upload_payload(&self) -> UploadPayload {
        let mut pending = Vec::new();
        let mut existing_order = Vec::new();

        for item in &self.items {
            match &item.source {
                MediaSource::Pending(media) => pending.push(PendingUpload {
                    kind: item.kind,
                    file_name: media.file_name.clone(),
                    content_type: media
                        .content_type
                        .clone()
                        .unwrap_or_else(|| item.kind.default_content_type().to_string()),
                    data: media.data.clone(),
                }),
                MediaSource::Existing { path } => existing_order.push(path.clone()),
            }
        }

        UploadPayload {
            kind: self.kind,
            pending,
            existing_order,
        }
    }

    /// Hand the list off and discard it
    pub fn into_upload_payload(mut self) -> UploadPayload {
        let payload = self.to_upload_payload();
        self.clear();
        payload
    }

    /// Drop every item, releasing all pending previews
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            if let MediaSource::Pending(media) = &item.source {
                self.previews.release(&media.preview);
            }
        }
    }
}

impl Drop for MediaList {
    fn drop(&mut self) {
        self.clear();
    }
}
