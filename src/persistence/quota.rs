use super::profile::ProfileRecord;
use super::store::KeyValueStore;
use crate::config::PersistenceConfig;
use crate::error::PersistenceError;
use crate::normalize::estimated_data_url_bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Fallback level at which a profile save succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SaveTier {
    /// Record stored as given
    Full,
    /// Stored after evicting every unprotected key
    AfterEviction,
    /// Stored with the embedded image removed
    WithoutImage,
    /// Only the identity fields were stored
    IdentityOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub tier: SaveTier,
    /// The profile image is not in the stored record
    pub image_dropped: bool,
    pub evicted_keys: Vec<String>,
}

impl SaveReport {
    pub fn is_degraded(&self) -> bool {
        self.tier != SaveTier::Full || self.image_dropped
    }
}

/// Saves a profile record into a size-bounded store, shedding data in a
/// fixed order until a write fits
#[derive(Debug, Clone)]
pub struct QuotaAwareSaver {
    config: PersistenceConfig,
}

impl QuotaAwareSaver {
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn save<S: KeyValueStore + ?Sized>(
        &self,
        store: &mut S,
        record: &ProfileRecord,
    ) -> Result<SaveReport, PersistenceError> {
        let user_key = self.config.user_key.as_str();
        let mut candidate = record.clone();
        let mut image_dropped = false;

        if let Some(image) = &candidate.profile_image {
            let estimated = estimated_data_url_bytes(image);
            if estimated > self.config.max_inline_image_bytes {
                warn!(
                    "Profile image of ~{} bytes exceeds {} byte inline limit; not saving it",
                    estimated, self.config.max_inline_image_bytes
                );
                candidate.profile_image = None;
                image_dropped = true;
            }
        }

        let full = serde_json::to_string(&candidate)?;
        match store.set(user_key, &full) {
            Ok(()) => {
                debug!("Profile {} stored ({} bytes)", record.id, full.len());
                return Ok(SaveReport {
                    tier: SaveTier::Full,
                    image_dropped,
                    evicted_keys: Vec::new(),
                });
            }
            Err(e) if e.is_quota_exceeded() => {
                warn!("Profile write exceeded quota: {}", e);
            }
            Err(e) => {
                error!("Profile write failed: {}", e);
                return Err(e.into());
            }
        }

        let evicted_keys = self.evict_unprotected(store);
        if store.set(user_key, &full).is_ok() {
            info!(
                "Profile {} stored after evicting {} key(s)",
                record.id,
                evicted_keys.len()
            );
            return Ok(SaveReport {
                tier: SaveTier::AfterEviction,
                image_dropped,
                evicted_keys,
            });
        }

        let without_image = serde_json::to_string(&candidate.without_image())?;
        if let Err(e) = store.set(user_key, &without_image) {
            warn!("Profile write without image failed: {}", e);
        } else {
            warn!("Profile {} stored without its image", record.id);
            return Ok(SaveReport {
                tier: SaveTier::WithoutImage,
                image_dropped: image_dropped || record.profile_image.is_some(),
                evicted_keys,
            });
        }

        let identity = serde_json::to_string(&candidate.identity())?;
        match store.set(user_key, &identity) {
            Ok(()) => {
                warn!("Only identity fields of profile {} were stored", record.id);
                Ok(SaveReport {
                    tier: SaveTier::IdentityOnly,
                    image_dropped: image_dropped || record.profile_image.is_some(),
                    evicted_keys,
                })
            }
            Err(e) => {
                error!("Could not store profile {} at any tier: {}", record.id, e);
                Err(PersistenceError::Exhausted)
            }
        }
    }

    fn evict_unprotected<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Vec<String> {
        let evicted: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| key != &self.config.token_key && key != &self.config.user_key)
            .collect();

        for key in &evicted {
            store.remove(key);
        }
        debug!("Evicted {} unprotected key(s)", evicted.len());
        evicted
    }
}
