//! Dry-run client: accepts every logon without touching the network.
//!
//! Used when no protocol implementation is linked in. Each `log_on` reports
//! `Authenticated` on the account's event channel, so the whole lifecycle
//! (staggered start, presence, activity declaration) can be exercised.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{Activity, LogOnDetails, PresenceStatus, SessionClient, SessionEvent, SessionEvents};

pub struct DryRunClient {
    account: String,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl DryRunClient {
    /// Create a client for `account` together with its event stream.
    pub fn new(account: impl Into<String>) -> (Self, SessionEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                account: account.into(),
                events,
            },
            rx,
        )
    }
}

impl SessionClient for DryRunClient {
    fn log_on(&mut self, details: LogOnDetails) {
        info!(
            account = %self.account,
            two_factor = details.two_factor_code.is_some(),
            "dry run: logon accepted"
        );
        if self.events.send(SessionEvent::Authenticated).is_err() {
            warn!(account = %self.account, "dry run: event receiver dropped");
        }
    }

    fn set_presence(&mut self, status: PresenceStatus) {
        debug!(account = %self.account, status = status.0, "dry run: presence set");
    }

    fn declare_activity(&mut self, activities: &[Activity]) {
        debug!(
            account = %self.account,
            activities = activities.len(),
            "dry run: activity declared"
        );
    }
}
