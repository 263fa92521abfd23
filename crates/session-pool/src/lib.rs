//! Session orchestration for a roster of service accounts
//!
//! Keeps every account in the roster authenticated and announcing its activity
//! list. Each account runs its own `AccountSession`: a pure lifecycle state
//! machine (`machine`) plus a driver that owns the account's timers and talks
//! to the session client. The only thing accounts share is the
//! `GuardPromptQueue`, which serializes interactive second-factor prompts onto
//! the console.
//!
//! Account lifecycle:
//! 1. `StartupScheduler` staggers first logons by a random 12–20 s gap each
//! 2. Logon succeeds → presence and activities announced, timers cleared
//! 3. Guard challenge → answered from the shared secret, or queued for a human
//! 4. Transient failure or disconnect → one reconnect after 30 minutes
//! 5. Session conflict → retry every 2 hours until the other session ends
//! 6. Invalid password → account stops until the process is restarted

pub mod classify;
pub mod error;
pub mod machine;
pub mod metrics;
pub mod periodic;
pub mod prompt;
pub mod reconnect;
pub mod roster;
pub mod session;
pub mod startup;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{ErrorCategory, Recovery, classify};
pub use error::{Error, Result};
pub use machine::{LifecycleState, SessionAction, SessionFacts, SessionInput, handle_input};
pub use periodic::PeriodicRetryScheduler;
pub use prompt::{GuardPrompt, GuardPromptQueue, PromptIo, PromptProgress, PromptWorker};
pub use reconnect::{ReconnectScheduler, Scheduled};
pub use roster::{Account, Roster, load_roster, parse_roster};
pub use session::{AccountSession, SessionContext, SessionPolicy};
pub use startup::{StartSlot, StartupScheduler};
