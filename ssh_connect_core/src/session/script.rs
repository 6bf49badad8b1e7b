//! The fixed text of a simulated SSH login.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::storage::{ConnectionProfile, DEFAULT_PORT};

/// Number of lines in every session script.
pub const SCRIPT_LEN: usize = 7;

/// Text that marks the final line of a script.
pub const PASSWORD_PROMPT_MARKER: &str = "password:";

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";
const FINGERPRINT_PAIRS: usize = 16;

/// Produces cosmetic host-key fingerprints (`3f:a0:…`, 16 hex pairs).
///
/// Seeded generators repeat the same sequence, which keeps scripts
/// reproducible under test.
#[derive(Debug, Clone)]
pub struct FingerprintGenerator {
    rng: StdRng,
}

impl FingerprintGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_fingerprint(&mut self) -> String {
        let mut out = String::with_capacity(FINGERPRINT_PAIRS * 3 - 1);
        for pair in 0..FINGERPRINT_PAIRS {
            if pair > 0 {
                out.push(':');
            }
            for _ in 0..2 {
                out.push(HEX_DIGITS[self.rng.gen_range(0..16)] as char);
            }
        }
        out
    }
}

/// Renders the seven script lines for `profile`.
pub fn build_script(profile: &ConnectionProfile, fingerprint: &str) -> Vec<String> {
    let user = &profile.username;
    let ip = &profile.ip_address;
    let port = profile.port;
    // known_hosts style: bare address on the default port, [addr]:port otherwise
    let host = if port == DEFAULT_PORT {
        ip.to_string()
    } else {
        format!("[{ip}]:{port}")
    };

    vec![
        format!("$ ssh {user}@{ip} -p {port}"),
        format!("Connecting to {ip} port {port}..."),
        format!("The authenticity of host '{host}' can't be established."),
        format!("ECDSA key fingerprint is MD5:{fingerprint}."),
        "Are you sure you want to continue connecting (yes/no)? yes".to_string(),
        format!("Warning: Permanently added '{host}' (ECDSA) to the list of known hosts."),
        format!("{user}@{ip}'s {PASSWORD_PROMPT_MARKER}"),
    ]
}
