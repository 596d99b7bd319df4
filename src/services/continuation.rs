//! Opaque continuation tokens handed to listing clients.
//!
//! The backend's own token is wrapped in a versioned envelope that also
//! records the prefix it was issued for, then URL-safe base64 encoded.
//! A token replayed against a different prefix is rejected.

use crate::services::error::{StorageError, StorageResult};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

const TOKEN_VERSION: u8 = 1;

/// Largest encoded token accepted from a client.
pub const MAX_ENCODED_TOKEN_LEN: usize = 4096;

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    prefix: String,
    token: String,
}

/// Wrap `backend_token` for a listing of `prefix`.
pub fn encode(prefix: &str, backend_token: &str) -> StorageResult<String> {
    let envelope = Envelope {
        v: TOKEN_VERSION,
        prefix: prefix.to_string(),
        token: backend_token.to_string(),
    };
    let json = serde_json::to_vec(&envelope)
        .map_err(|err| StorageError::unknown("encode continuation token", err))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Unwrap a client token, checking it was issued for `prefix`.
pub fn decode(prefix: &str, encoded: &str) -> StorageResult<String> {
    if encoded.is_empty() {
        return Err(StorageError::invalid_input("continuation token is empty"));
    }
    if encoded.len() > MAX_ENCODED_TOKEN_LEN {
        return Err(StorageError::invalid_input(format!(
            "continuation token exceeds {} characters",
            MAX_ENCODED_TOKEN_LEN
        )));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|_| StorageError::invalid_input("continuation token is malformed"))?;
    let envelope: Envelope = serde_json::from_slice(&bytes)
        .map_err(|_| StorageError::invalid_input("continuation token is malformed"))?;
    if envelope.v != TOKEN_VERSION {
        return Err(StorageError::invalid_input(
            "continuation token version is not supported",
        ));
    }
    if envelope.prefix != prefix {
        return Err(StorageError::invalid_input(
            "continuation token was issued for a different prefix",
        ));
    }
    Ok(envelope.token)
}
