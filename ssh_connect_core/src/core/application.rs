use log::info;

use crate::errors::ValidationError;
use crate::session::{Sequencer, SessionHandle};
use crate::storage::{ConnectionProfile, ProfileDraft, ProfileStore};

/// Ties the profile store and the sequencer to the events a front-end emits.
///
/// Holds at most one session. Connecting again while a session is active
/// closes the old one first, so two scripts never interleave.
pub struct Application {
    profiles: ProfileStore,
    sequencer: Sequencer,
    active: Option<SessionHandle>,
}

impl Application {
    pub fn new(profiles: ProfileStore, sequencer: Sequencer) -> Self {
        Self {
            profiles,
            sequencer,
            active: None,
        }
    }

    pub fn profiles(&self) -> &[ConnectionProfile] {
        self.profiles.list()
    }

    pub fn store(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn active_session(&self) -> Option<&SessionHandle> {
        self.active.as_ref()
    }

    /// "Save" on the connection form.
    pub fn on_save(&mut self, draft: ProfileDraft) -> Result<ConnectionProfile, ValidationError> {
        self.profiles.add(draft)
    }

    /// "Connect" on a saved profile.
    pub fn on_connect(&mut self, profile: &ConnectionProfile) -> SessionHandle {
        self.on_session_close();
        let session = self.sequencer.begin(profile);
        self.active = Some(session.clone());
        session
    }

    /// "Connect" straight from the form: validates the draft but does not save it.
    pub fn on_quick_connect(
        &mut self,
        draft: ProfileDraft,
    ) -> Result<SessionHandle, ValidationError> {
        let profile = ConnectionProfile::from_draft(draft)?;
        Ok(self.on_connect(&profile))
    }

    /// "Delete" on a saved profile.
    pub fn on_delete(&mut self, id: &str) {
        self.profiles.remove(id);
    }

    /// The terminal view was closed.
    pub fn on_session_close(&mut self) {
        if let Some(session) = self.active.take() {
            info!("Closing session {}", session.id());
            session.cancel();
        }
    }
}
