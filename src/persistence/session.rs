use super::profile::{ProfilePatch, ProfileRecord};
use super::quota::{QuotaAwareSaver, SaveReport};
use super::store::KeyValueStore;
use crate::config::{NormalizePreset, PersistenceConfig};
use crate::error::PersistenceError;
use crate::events::{EventBus, MediaEvent};
use crate::normalize::compress_data_url_if_needed;
use tracing::{debug, info, warn};

/// Signed-in user state backed by a bounded key/value store
pub struct SessionVault<S: KeyValueStore> {
    store: S,
    saver: QuotaAwareSaver,
    image_preset: NormalizePreset,
    events: Option<EventBus>,
    user: Option<ProfileRecord>,
}

impl<S: KeyValueStore> SessionVault<S> {
    pub fn new(store: S, config: PersistenceConfig, image_preset: NormalizePreset) -> Self {
        Self {
            store,
            saver: QuotaAwareSaver::new(config),
            image_preset,
            events: None,
            user: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_user(&self) -> Option<&ProfileRecord> {
        self.user.as_ref()
    }

    fn config(&self) -> &PersistenceConfig {
        self.saver.config()
    }

    /// Restore token and user from the store. Both must be present and the
    /// user record must parse.
    pub fn load(&mut self) -> Option<(String, ProfileRecord)> {
        let token = self.store.get(&self.config().token_key)?;
        let raw_user = self.store.get(&self.config().user_key)?;

        match serde_json::from_str::<ProfileRecord>(&raw_user) {
            Ok(user) => {
                debug!("Restored session for user {}", user.id);
                self.user = Some(user.clone());
                Some((token, user))
            }
            Err(e) => {
                warn!("Stored user record is unreadable: {}", e);
                None
            }
        }
    }

    /// Remember a fresh sign-in. Storage failures are logged, not raised;
    /// the in-memory session stays valid either way.
    pub fn store_sign_in(&mut self, token: &str, user: ProfileRecord) -> bool {
        let token_key = self.config().token_key.clone();
        let user_key = self.config().user_key.clone();

        let stored = serde_json::to_string(&user)
            .map_err(PersistenceError::from)
            .and_then(|json| {
                self.store.set(&token_key, token)?;
                self.store.set(&user_key, &json)?;
                Ok(())
            });

        info!("User {} signed in", user.id);
        self.user = Some(user);

        match stored {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not persist sign-in: {}", e);
                false
            }
        }
    }

    pub fn sign_out(&mut self) {
        let token_key = self.config().token_key.clone();
        let user_key = self.config().user_key.clone();
        self.store.remove(&token_key);
        self.store.remove(&user_key);

        if let Some(user) = self.user.take() {
            info!("User {} signed out", user.id);
        }
    }

    /// Merge `patch` into the current user and persist it through the quota
    /// cascade. The in-memory user is updated even if persistence fails.
    pub async fn update(&mut self, patch: ProfilePatch) -> Result<SaveReport, PersistenceError> {
        let current = self.user.as_ref().ok_or(PersistenceError::NotSignedIn)?;
        let mut updated = patch.apply(current);

        if let Some(image) = updated.profile_image.take() {
            updated.profile_image =
                Some(compress_data_url_if_needed(image, &self.image_preset).await);
        }
        self.user = Some(updated.clone());

        let result = self.saver.save(&mut self.store, &updated);
        if let Some(events) = &self.events {
            match &result {
                Ok(report) if report.is_degraded() => {
                    events.publish(MediaEvent::ProfileSaveDegraded {
                        tier: report.tier,
                        image_dropped: report.image_dropped,
                    });
                }
                Ok(_) => {}
                Err(_) => {
                    events.publish(MediaEvent::ProfileSaveFailed);
                }
            }
        }
        result
    }
}
