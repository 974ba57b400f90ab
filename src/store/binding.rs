use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bytes of the SHA-256 output kept in a subject id (hex doubles it)
const SUBJECT_ID_BYTES: usize = 16;

/// A local principal bound to a remote OAuth account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// assigned by the store on insert
    #[serde(default)]
    pub id: u64,
    pub chat_identity: String,
    pub refresh_token: String,
    pub subject_id: String,
    pub display_alias: String,
    pub client_id: String,
    pub client_secret: String,
    /// unix seconds of the last fully successful bind or renewal
    pub last_success_at: i64,
    #[serde(default)]
    pub extra: String,
}

impl Binding {
    /// Copy with a rotated refresh token and a new success timestamp.
    pub fn renewed(&self, refresh_token: String, now: i64) -> Self {
        Self {
            refresh_token,
            last_success_at: now,
            ..self.clone()
        }
    }
}

/// Fixed-length digest of the remote account's immutable id.
///
/// Raw provider ids can exceed the 64 byte callback payload limit of chat
/// front ends, the digest is 32 hex chars.
pub fn subject_digest(remote_id: &str) -> String {
    let digest = Sha256::digest(remote_id.as_bytes());
    hex::encode(&digest[..SUBJECT_ID_BYTES])
}
