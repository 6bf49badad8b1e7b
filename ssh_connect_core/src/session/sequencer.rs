use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use super::script::{build_script, FingerprintGenerator, PASSWORD_PROMPT_MARKER, SCRIPT_LEN};
use crate::storage::ConnectionProfile;

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(800);

/// Where a session is in its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Closed by the user; nothing more will be emitted.
    Idle,
    /// `next_line` lines have been emitted so far (0..=6).
    Emitting { next_line: usize },
    /// The password prompt is on screen. Terminal.
    AwaitingPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub index: usize,
    pub text: String,
}

impl SessionLine {
    pub fn is_password_prompt(&self) -> bool {
        self.text.contains(PASSWORD_PROMPT_MARKER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Delay between consecutive lines.
    pub cadence: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
        }
    }
}

/// Turns profiles into running simulated sessions.
#[derive(Debug, Clone)]
pub struct Sequencer {
    config: SequencerConfig,
    fingerprints: FingerprintGenerator,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(SequencerConfig::default())
    }
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            fingerprints: FingerprintGenerator::from_entropy(),
        }
    }

    /// A sequencer whose fingerprints are reproducible.
    pub fn with_seed(config: SequencerConfig, seed: u64) -> Self {
        Self {
            config,
            fingerprints: FingerprintGenerator::seeded(seed),
        }
    }

    pub fn config(&self) -> SequencerConfig {
        self.config
    }

    /// Renders the script for `profile` with a fresh fingerprint.
    pub fn script(&mut self, profile: &ConnectionProfile) -> Vec<String> {
        let fingerprint = self.fingerprints.next_fingerprint();
        build_script(profile, &fingerprint)
    }

    /// Starts a session for `profile`. Line `i` is emitted `i * cadence`
    /// after this call; the first one immediately.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(&mut self, profile: &ConnectionProfile) -> SessionHandle {
        let script = self.script(profile);
        let id = Uuid::new_v4().to_string();

        let (live_tx, _) = broadcast::channel::<SessionLine>(SCRIPT_LEN);
        let shared = Arc::new(Mutex::new(Shared {
            lines: Vec::with_capacity(SCRIPT_LEN),
            state: SessionState::Emitting { next_line: 0 },
            closed: false,
            live: Some(live_tx),
        }));

        // Channel handle -> emission task. One slot is enough: the only event is Cancel.
        let (stop_tx, stop_rx) = mpsc::channel::<SessionEvent>(1);
        let (done_tx, done_rx) = watch::channel(false);

        info!(
            "Session {} started for {} ({} lines every {:?})",
            id,
            profile.target(),
            script.len(),
            self.config.cadence
        );
        tokio::spawn(run_script(
            id.clone(),
            script,
            self.config.cadence,
            shared.clone(),
            stop_rx,
            done_tx,
        ));

        SessionHandle {
            id,
            profile: profile.clone(),
            shared,
            stop_tx,
            done_rx,
        }
    }
}

enum SessionEvent {
    Cancel,
}

struct Shared {
    lines: Vec<SessionLine>,
    state: SessionState,
    closed: bool,
    // Dropped once the script is done or cancelled so subscribers see the end.
    live: Option<broadcast::Sender<SessionLine>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emission task. Every deadline is an offset from the session start, so a
/// slow subscriber never stretches the script.
async fn run_script(
    id: String,
    script: Vec<String>,
    cadence: Duration,
    shared: Arc<Mutex<Shared>>,
    mut stop_rx: mpsc::Receiver<SessionEvent>,
    done_tx: watch::Sender<bool>,
) {
    let start = Instant::now();
    let last = script.len().saturating_sub(1);

    for (index, text) in script.into_iter().enumerate() {
        let deadline = start + cadence * index as u32;
        tokio::select! {
            Some(SessionEvent::Cancel) = stop_rx.recv() => {
                debug!("Session {id}: stop received before line {index}");
                break;
            },
            _ = sleep_until(deadline) => {
                if !emit(&shared, SessionLine { index, text }, index == last) {
                    debug!("Session {id}: closed before line {index}");
                    break;
                }
            }
        }
    }

    let completed = {
        let mut state = lock(&shared);
        state.live = None;
        state.state == SessionState::AwaitingPassword
    };
    if completed {
        info!("Session {id} is awaiting a password");
    }
    done_tx.send_replace(true);
}

/// Appends a line unless the session was closed. Returns `false` if closed.
fn emit(shared: &Mutex<Shared>, line: SessionLine, is_last: bool) -> bool {
    let mut state = lock(shared);
    if state.closed {
        return false;
    }
    debug!("emit [{}] {}", line.index, line.text);
    state.state = if is_last {
        SessionState::AwaitingPassword
    } else {
        SessionState::Emitting {
            next_line: line.index + 1,
        }
    };
    if let Some(live) = &state.live {
        // No receivers is fine; the log below is authoritative.
        let _ = live.send(line.clone());
    }
    state.lines.push(line);
    true
}

/// Control surface of one running session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    profile: ConnectionProfile,
    shared: Arc<Mutex<Shared>>,
    stop_tx: mpsc::Sender<SessionEvent>,
    done_rx: watch::Receiver<bool>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    /// Window title, e.g. `SSH - root@10.0.0.1:22`.
    pub fn title(&self) -> String {
        format!("SSH - {}", self.profile.target())
    }

    pub fn state(&self) -> SessionState {
        lock(&self.shared).state
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared).closed
    }

    /// Snapshot of the lines emitted so far.
    pub fn lines(&self) -> Vec<SessionLine> {
        lock(&self.shared).lines.clone()
    }

    /// Everything emitted so far plus every line still to come, in order.
    pub fn subscribe(&self) -> Subscription {
        let state = lock(&self.shared);
        let receiver = match &state.live {
            Some(live) => live.subscribe(),
            None => {
                let (closed_tx, rx) = broadcast::channel(1);
                drop(closed_tx);
                rx
            }
        };
        Subscription {
            backlog: state.lines.iter().cloned().collect(),
            receiver,
        }
    }

    /// Closes the session. Lines not yet emitted are never emitted; the
    /// state drops back to [`SessionState::Idle`]. Calling it twice is a no-op.
    pub fn cancel(&self) {
        {
            let mut state = lock(&self.shared);
            if state.closed {
                return;
            }
            state.closed = true;
            state.state = SessionState::Idle;
            state.live = None;
        }
        // Full or closed both mean the task is already on its way out.
        let _ = self.stop_tx.try_send(SessionEvent::Cancel);
        info!("Session {} closed", self.id);
    }

    /// Resolves once the emission task has stopped, either because the
    /// script ran out or because the session was cancelled.
    pub async fn finished(&self) {
        let mut done = self.done_rx.clone();
        let _ = done.wait_for(|done| *done).await;
    }
}

/// Ordered feed of session lines: backlog first, then live lines.
pub struct Subscription {
    backlog: VecDeque<SessionLine>,
    receiver: broadcast::Receiver<SessionLine>,
}

impl Subscription {
    /// Next line, or `None` once the session has finished or been closed.
    pub async fn next(&mut self) -> Option<SessionLine> {
        if let Some(line) = self.backlog.pop_front() {
            return Some(line);
        }
        loop {
            match self.receiver.recv().await {
                Ok(line) => return Some(line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Subscriber lagged by {skipped} line(s)");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
