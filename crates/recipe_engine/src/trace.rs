use chrono::Utc;
use sha2::{Digest, Sha256};

/// Process-wide trace identifier: 16 hex chars derived from pid and start time.
pub fn new_trace_id() -> String {
    let mut hasher = Sha256::new();
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(Utc::now().to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
