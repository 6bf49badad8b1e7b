use std::collections::HashSet;

use log::{debug, error, info, warn};
use serde_json::Value;

use super::backend::ProfileBackend;
use super::profile::{ConnectionProfile, ProfileDraft};
use crate::errors::{StoreError, ValidationError};

/// The saved profiles, newest first, mirrored to a [`ProfileBackend`] on
/// every mutation.
pub struct ProfileStore {
    backend: Box<dyn ProfileBackend + Send>,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// Opens the store and rehydrates it from `backend`.
    ///
    /// Never fails: an unreadable or corrupt slot yields an empty store.
    pub fn open(backend: Box<dyn ProfileBackend + Send>) -> Self {
        let profiles = match backend.load() {
            Ok(Some(payload)) => parse_profiles(&payload),
            Ok(None) => {
                debug!("No saved profiles yet");
                Vec::new()
            }
            Err(e) => {
                warn!("Could not read saved profiles, starting empty: {e}");
                Vec::new()
            }
        };
        info!("Loaded {} profile(s)", profiles.len());
        Self { backend, profiles }
    }

    /// Every stored profile, most recently created first.
    pub fn list(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Looks a profile up by id, falling back to the newest one with that name.
    pub fn find(&self, id_or_name: &str) -> Option<&ConnectionProfile> {
        self.get(id_or_name)
            .or_else(|| self.profiles.iter().find(|p| p.name == id_or_name))
    }

    /// Validates `draft`, stores the resulting profile in front and persists.
    pub fn add(&mut self, draft: ProfileDraft) -> Result<ConnectionProfile, ValidationError> {
        let profile = ConnectionProfile::from_draft(draft)?;
        info!("Saving profile '{}' ({})", profile.name, profile.id);
        self.profiles.insert(0, profile.clone());
        self.persist();
        Ok(profile)
    }

    /// Deletes the profile with `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        if self.profiles.len() == before {
            debug!("remove: no profile with id '{id}'");
        } else {
            info!("Removed profile '{id}'");
        }
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            error!("Failed to persist {} profile(s): {e}", self.profiles.len());
        }
    }

    fn try_persist(&self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.profiles)?;
        self.backend.save(&payload)?;
        debug!("Persisted {} profile(s)", self.profiles.len());
        Ok(())
    }
}

/// Parses the persisted list, skipping records that do not deserialize and
/// repeated ids.
fn parse_profiles(payload: &str) -> Vec<ConnectionProfile> {
    let records: Vec<Value> = match serde_json::from_str(payload) {
        Ok(records) => records,
        Err(e) => {
            warn!("Saved profiles are corrupt, starting empty: {e}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let profile = match serde_json::from_value::<ConnectionProfile>(record) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Skipping malformed profile record: {e}");
                continue;
            }
        };
        if let Err(e) = profile.check() {
            warn!("Skipping malformed profile record '{}': {e}", profile.id);
        } else if seen.insert(profile.id.clone()) {
            out.push(profile);
        } else {
            warn!("Skipping duplicate profile id '{}'", profile.id);
        }
    }
    out
}
