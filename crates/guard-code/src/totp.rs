//! Time-based guard codes
//!
//! HMAC-SHA1 over the big-endian 30-second time step, RFC 4226 dynamic
//! truncation, then five base-26 digits over the service's reduced alphabet
//! (no vowels or look-alike characters).

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::trace;

use crate::CodeGenerator;
use crate::secret::SharedSecret;

/// Seconds covered by one code.
pub const TIME_STEP_SECS: u64 = 30;

/// Number of characters in a code.
pub const CODE_LENGTH: usize = 5;

/// Characters a code is drawn from.
pub const CODE_ALPHABET: &[u8; 26] = b"23456789BCDFGHJKMNPQRTVWXY";

/// Generator reading the system clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteamGuardTotp;

impl SteamGuardTotp {
    /// Code for an explicit unix timestamp (seconds).
    pub fn code_at(secret: &SharedSecret, unix_secs: u64) -> String {
        let counter = unix_secs / TIME_STEP_SECS;
        let mut mac = Hmac::<Sha1>::new_from_slice(secret.key())
            .expect("HMAC accepts keys of any length");
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[19] & 0x0f) as usize;
        let mut full = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) & 0x7fff_ffff;

        let mut code = String::with_capacity(CODE_LENGTH);
        for _ in 0..CODE_LENGTH {
            let idx = (full % CODE_ALPHABET.len() as u32) as usize;
            code.push(CODE_ALPHABET[idx] as char);
            full /= CODE_ALPHABET.len() as u32;
        }
        code
    }
}

impl CodeGenerator for SteamGuardTotp {
    fn generate(&self, secret: &SharedSecret) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        trace!(time_step = now / TIME_STEP_SECS, "generating guard code");
        Self::code_at(secret, now)
    }
}
