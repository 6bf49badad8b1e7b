//! An in‑process stand‑in for `ssh_connect_core::storage::ProfileBackend`
//! that remembers every payload written to it.
//!
//! * Seed the slot with [`FakeBackend::with_payload`] to simulate data from an
//!   earlier run.
//! * Inspect what the store persisted via [`FakeBackend::save_history`].
//! * Flip `fail_reads` / `fail_writes` to exercise the fail‑soft paths.
//!
//! Clones share state, so a test can hand one clone to the store and keep
//! the other for assertions.

use std::io;
use std::sync::{Arc, Mutex};

use ssh_connect_core::{ProfileBackend, StoreError};

#[derive(Default)]
struct FakeState {
    payload: Option<String>,
    save_history: Vec<String>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: &str) -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().payload = Some(payload.to_string());
        backend
    }

    pub fn failing_reads() -> Self {
        let backend = Self::with_payload("[]");
        backend.state.lock().unwrap().fail_reads = true;
        backend
    }

    pub fn failing_writes() -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().fail_writes = true;
        backend
    }

    pub fn payload(&self) -> Option<String> {
        self.state.lock().unwrap().payload.clone()
    }

    /// Every payload handed to `save`, oldest first.
    pub fn save_history(&self) -> Vec<String> {
        self.state.lock().unwrap().save_history.clone()
    }
}

impl ProfileBackend for FakeBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused").into());
        }
        Ok(state.payload.clone())
    }

    fn save(&self, payload: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.save_history.push(payload.to_string());
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
        }
        state.payload = Some(payload.to_string());
        Ok(())
    }
}
