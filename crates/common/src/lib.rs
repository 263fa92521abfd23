//! Shared types for the account idler workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
