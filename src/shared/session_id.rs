//! Session Identifiers
//!
//! Opaque connection keys: URL-safe base64 of a random UUID v4.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use uuid::Uuid;

/// Generate a fresh session identifier (24 characters, padded).
pub fn generate_session_id() -> String {
    URL_SAFE.encode(Uuid::new_v4().as_bytes())
}
