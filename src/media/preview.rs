use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Locally scoped reference to the bytes of a pending item, used by the UI to
/// render a thumbnail before upload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    id: Uuid,
}

impl PreviewHandle {
    pub fn url(&self) -> String {
        format!("blob:dealer-media/{}", self.id)
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Owner of every live preview handle in a form session. Handles stay
/// resolvable until released.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<Uuid, Bytes>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Bytes) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.entries.lock().insert(id, data);
        trace!("Created preview {}", id);
        PreviewHandle { id }
    }

    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Bytes> {
        self.entries.lock().get(&handle.id).cloned()
    }

    /// Release a handle. Returns false if it was already released.
    pub fn release(&self, handle: &PreviewHandle) -> bool {
        let released = self.entries.lock().remove(&handle.id).is_some();
        if released {
            trace!("Released preview {}", handle.id);
        }
        released
    }

    /// Number of handles not yet released
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}
