//! Boundary to the remote session service
//!
//! Defines the `SessionClient` trait the account state machines drive, and the
//! `SessionEvent`s a client reports back. The protocol itself lives behind this
//! trait; `DryRunClient` is the in-tree implementation that accepts every logon
//! so the orchestration can run end to end without network access.
//!
//! Calls on the client are fire-and-forget. Completion of a logon is signalled
//! only through events on the account's channel, in the order the client emits
//! them.

pub mod dry_run;

pub use dry_run::DryRunClient;

use std::fmt;

use common::Secret;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

/// Something an account reports as "currently active": an application id,
/// or a free-form title for non-catalog activities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Activity {
    App(u32),
    Custom(String),
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::App(id) => write!(f, "{id}"),
            Activity::Custom(title) => f.write_str(title),
        }
    }
}

/// Presence status code announced after logon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceStatus(pub u8);

impl PresenceStatus {
    pub const OFFLINE: PresenceStatus = PresenceStatus(0);
    pub const ONLINE: PresenceStatus = PresenceStatus(1);

    /// Resolve the configured status. Offline would hide the account, so it
    /// is treated the same as unset.
    pub fn from_config(code: Option<u8>) -> Self {
        match code {
            Some(code) if code != Self::OFFLINE.0 => PresenceStatus(code),
            _ => Self::ONLINE,
        }
    }
}

impl Default for PresenceStatus {
    fn default() -> Self {
        Self::ONLINE
    }
}

/// Credentials for a single logon attempt.
///
/// `two_factor_code` is generated immediately before the attempt and must not
/// be reused; codes are only valid inside their time window.
#[derive(Debug, Clone)]
pub struct LogOnDetails {
    pub account_name: String,
    pub password: Secret<String>,
    pub two_factor_code: Option<String>,
}

/// Where the service delivered the second-factor code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDestination {
    /// Code was mailed to an address at this domain
    Email { domain: String },
    /// Code comes from the mobile authenticator
    MobileApp,
}

impl GuardDestination {
    /// Map the client's optional destination hint.
    pub fn from_hint(domain: Option<String>) -> Self {
        match domain {
            Some(domain) if !domain.trim().is_empty() => GuardDestination::Email { domain },
            _ => GuardDestination::MobileApp,
        }
    }
}

impl fmt::Display for GuardDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardDestination::Email { domain } => write!(f, "email ({domain})"),
            GuardDestination::MobileApp => f.write_str("mobile authenticator"),
        }
    }
}

/// Completion handle for a pending guard challenge.
///
/// `respond` consumes the handle, so a challenge can be answered at most once.
/// Dropping it without responding abandons the challenge and leaves the logon
/// attempt to fail upstream.
pub struct GuardResponder {
    tx: oneshot::Sender<String>,
}

impl GuardResponder {
    /// Create a responder and the receiver the client awaits the code on.
    pub fn channel() -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Submit the code. Returns false when the client stopped waiting.
    pub fn respond(self, code: String) -> bool {
        self.tx.send(code).is_ok()
    }
}

impl fmt::Debug for GuardResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardResponder")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Lifecycle events emitted by a session client for one account.
#[derive(Debug)]
pub enum SessionEvent {
    /// Logon succeeded
    Authenticated,
    /// A second-factor code is required to finish the logon
    GuardChallenge {
        destination: GuardDestination,
        previous_code_wrong: bool,
        responder: GuardResponder,
    },
    /// Another session started (true) or stopped (false) using the account
    ActivityBlocked(bool),
    /// Logon or runtime failure reported by the service
    RemoteError { code: i32, message: String },
    /// Connection dropped unexpectedly
    Disconnected { code: i32 },
}

/// Receiving half of an account's event stream.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Operations the state machine invokes on the remote session.
pub trait SessionClient: Send {
    /// Start authenticating. The outcome arrives as a `SessionEvent`.
    fn log_on(&mut self, details: LogOnDetails);

    /// Announce the presence status.
    fn set_presence(&mut self, status: PresenceStatus);

    /// Declare the activities the account is engaged in.
    fn declare_activity(&mut self, activities: &[Activity]);
}

impl<C: SessionClient + ?Sized> SessionClient for Box<C> {
    fn log_on(&mut self, details: LogOnDetails) {
        (**self).log_on(details)
    }

    fn set_presence(&mut self, status: PresenceStatus) {
        (**self).set_presence(status)
    }

    fn declare_activity(&mut self, activities: &[Activity]) {
        (**self).declare_activity(activities)
    }
}
