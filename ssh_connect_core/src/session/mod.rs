//! Simulated SSH sessions: a fixed login script played out on a timer.

pub mod script;
pub mod sequencer;

pub use script::{build_script, FingerprintGenerator, PASSWORD_PROMPT_MARKER, SCRIPT_LEN};
pub use sequencer::{
    Sequencer, SequencerConfig, SessionHandle, SessionLine, SessionState, Subscription,
    DEFAULT_CADENCE,
};
