pub mod backend;
pub mod profile;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, ProfileBackend, PROFILES_KEY};
pub use profile::{is_valid_ipv4, ConnectionProfile, ProfileDraft, DEFAULT_PORT};
pub use store::ProfileStore;
