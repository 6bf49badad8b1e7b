pub mod core;
pub mod errors;
pub mod session;
pub mod storage;
pub mod utils;

// re‑export ergonomic entry points
pub use crate::core::application::Application;
pub use crate::errors::{Field, StoreError, ValidationError};
pub use crate::session::{Sequencer, SequencerConfig, SessionHandle, SessionLine, SessionState};
pub use crate::storage::{
    ConnectionProfile, FileBackend, MemoryBackend, ProfileBackend, ProfileDraft, ProfileStore,
};
