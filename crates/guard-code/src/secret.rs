//! Decoded shared secret for time-based guard codes

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;

use crate::error::{Error, Result};

/// Raw key bytes behind a base64 shared secret. Redacted in logs and zeroized
/// on drop.
#[derive(Debug, Clone)]
pub struct SharedSecret(Secret<Vec<u8>>);

impl SharedSecret {
    /// Decode a base64 secret as it appears in the account roster.
    ///
    /// Returns `Ok(None)` for blank input: an account without a secret simply
    /// has no unattended second factor.
    pub fn parse(encoded: &str) -> Result<Option<Self>> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|e| Error::InvalidEncoding(e.to_string()))?;
        if bytes.is_empty() {
            return Err(Error::Empty);
        }
        Ok(Some(Self(Secret::new(bytes))))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Secret::new(bytes))
    }

    pub(crate) fn key(&self) -> &[u8] {
        self.0.expose()
    }
}
