//! Second-factor ("guard") code generation
//!
//! Accounts configured with a shared secret answer guard challenges without a
//! human. This crate decodes that secret and derives the time-based code the
//! service expects. Codes are only valid for the current 30-second window, so
//! callers generate one immediately before each use and never cache it.

pub mod error;
pub mod secret;
pub mod totp;

pub use error::{Error, Result};
pub use secret::SharedSecret;
pub use totp::{CODE_ALPHABET, CODE_LENGTH, SteamGuardTotp, TIME_STEP_SECS};

/// Produces a fresh one-time code for a shared secret.
///
/// Implementations read the clock at call time; two calls in different time
/// windows return different codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, secret: &SharedSecret) -> String;
}
