//! Per-account session driver
//!
//! Owns one account's client, timers and prompt channel. Every input goes
//! through `dispatch`: it is observed (logged, counted), fed to the pure
//! `handle_input`, and the returned actions are executed in order. `run` is
//! the account's event loop.

use std::sync::Arc;
use std::time::Duration;

use guard_code::{CodeGenerator, SharedSecret};
use session_client::{LogOnDetails, SessionClient, SessionEvent, SessionEvents};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::classify::{ErrorCategory, classify};
use crate::error::Error;
use crate::machine::{LifecycleState, SessionAction, SessionFacts, SessionInput, handle_input};
use crate::periodic::{DEFAULT_CONFLICT_RETRY_PERIOD, PeriodicRetryScheduler};
use crate::prompt::{GuardPrompt, GuardPromptQueue, PromptProgress};
use crate::reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectScheduler, Scheduled};
use crate::roster::Account;

/// Timing and escalation knobs shared by every account.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub reconnect_delay: Duration,
    pub conflict_retry_period: Duration,
    /// Hand the guard challenge to a human after this many automated codes
    /// were rejected in a row. `None` never escalates.
    pub max_automated_rejections: Option<u32>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            conflict_retry_period: DEFAULT_CONFLICT_RETRY_PERIOD,
            max_automated_rejections: None,
        }
    }
}

/// Mutable per-account state: lifecycle, timers and counters.
#[derive(Debug)]
pub struct SessionContext {
    state: LifecycleState,
    reconnect: ReconnectScheduler,
    periodic: PeriodicRetryScheduler,
    automated_rejections: u32,
    login_attempts: u32,
}

impl SessionContext {
    fn new(policy: &SessionPolicy) -> Self {
        Self {
            state: LifecycleState::Idle,
            reconnect: ReconnectScheduler::new(policy.reconnect_delay),
            periodic: PeriodicRetryScheduler::new(policy.conflict_retry_period),
            automated_rejections: 0,
            login_attempts: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn reconnect(&self) -> &ReconnectScheduler {
        &self.reconnect
    }

    pub fn periodic(&self) -> &PeriodicRetryScheduler {
        &self.periodic
    }

    /// Automated guard codes rejected since the last successful logon.
    pub fn automated_rejections(&self) -> u32 {
        self.automated_rejections
    }

    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }
}

pub struct AccountSession<C> {
    account: Account,
    client: C,
    events: SessionEvents,
    codes: Arc<dyn CodeGenerator>,
    prompts: GuardPromptQueue,
    progress_tx: mpsc::UnboundedSender<PromptProgress>,
    progress_rx: mpsc::UnboundedReceiver<PromptProgress>,
    policy: SessionPolicy,
    ctx: SessionContext,
}

impl<C: SessionClient> AccountSession<C> {
    pub fn new(
        account: Account,
        client: C,
        events: SessionEvents,
        codes: Arc<dyn CodeGenerator>,
        prompts: GuardPromptQueue,
        policy: SessionPolicy,
    ) -> Self {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        Self {
            account,
            client,
            events,
            codes,
            prompts,
            progress_tx,
            progress_rx,
            ctx: SessionContext::new(&policy),
            policy,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Wait for the start offset, log on, then process inputs until the
    /// client's event stream closes.
    pub async fn run(mut self, start_offset: Duration) {
        if !start_offset.is_zero() {
            tokio::time::sleep(start_offset).await;
        }
        self.dispatch(SessionInput::StartupDue);

        loop {
            let input = tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => SessionInput::Client(event),
                    None => {
                        info!(account = %self.account.username, "session events closed, stopping");
                        break;
                    }
                },
                Some(progress) = self.progress_rx.recv() => SessionInput::Prompt(progress),
                _ = self.ctx.reconnect.expired() => {
                    self.ctx.reconnect.mark_fired();
                    SessionInput::ReconnectDue
                }
                _ = self.ctx.periodic.tick() => SessionInput::ConflictRetryTick,
            };
            self.dispatch(input);
        }
    }

    /// Apply one input: observe it, transition, execute the actions.
    pub fn dispatch(&mut self, input: SessionInput) {
        self.observe(&input);

        let facts = self.facts();
        let from = self.ctx.state;
        let (to, actions) = handle_input(from, input, &facts);
        if from != to {
            debug!(
                account = %self.account.username,
                from = from.label(),
                to = to.label(),
                "state changed"
            );
        }
        self.ctx.state = to;

        for action in actions {
            self.execute(action);
        }
    }

    fn facts(&self) -> SessionFacts {
        SessionFacts {
            unattended_guard: self.account.has_unattended_guard(),
            escalate_guard: self
                .policy
                .max_automated_rejections
                .is_some_and(|max| self.ctx.automated_rejections >= max),
        }
    }

    fn observe(&mut self, input: &SessionInput) {
        let account = self.account.username.as_str();
        if self.ctx.state == LifecycleState::Failed {
            debug!(account, ?input, "account stopped, input ignored");
            return;
        }

        match input {
            SessionInput::StartupDue => debug!(account, "start offset reached"),
            SessionInput::ReconnectDue => info!(account, "reconnect timer fired"),
            SessionInput::ConflictRetryTick => info!(account, "retrying after session conflict"),
            SessionInput::Client(SessionEvent::Authenticated) => {
                self.ctx.automated_rejections = 0;
                info!(account, "logged on");
            }
            SessionInput::Client(SessionEvent::GuardChallenge {
                destination,
                previous_code_wrong,
                ..
            }) => {
                if *previous_code_wrong && self.account.has_unattended_guard() {
                    self.ctx.automated_rejections += 1;
                }
                info!(
                    account,
                    destination = %destination,
                    previous_code_wrong,
                    "guard verification requested"
                );
            }
            SessionInput::Client(SessionEvent::ActivityBlocked(true)) => {
                warn!(account, "account is in use elsewhere, activity suspended")
            }
            SessionInput::Client(SessionEvent::ActivityBlocked(false)) => {
                info!(account, "account no longer in use elsewhere")
            }
            SessionInput::Client(SessionEvent::RemoteError { code, message }) => {
                let category = classify(*code);
                crate::metrics::record_remote_error(category.label());
                let detail = category.describe(*code, message);
                if category == ErrorCategory::FatalCredentialFailure {
                    error!(account, code, category = category.label(), "{detail}");
                } else {
                    warn!(account, code, category = category.label(), "{detail}");
                }
            }
            SessionInput::Client(SessionEvent::Disconnected { code }) => {
                warn!(account, code, "disconnected")
            }
            SessionInput::Prompt(progress) => {
                debug!(account, progress = progress.label(), "guard prompt progress")
            }
        }
    }

    fn execute(&mut self, action: SessionAction) {
        let account = self.account.username.as_str();
        match action {
            SessionAction::LogOn => self.attempt_login(),
            SessionAction::AnnouncePresence => {
                self.client.set_presence(self.account.presence);
                self.client.declare_activity(&self.account.activities);
                info!(
                    account,
                    status = self.account.presence.0,
                    activities = self.account.activities.len(),
                    "presence and activities announced"
                );
            }
            SessionAction::CancelReconnect => {
                if self.ctx.reconnect.cancel() {
                    debug!(account, "pending reconnect cancelled");
                }
            }
            SessionAction::ScheduleReconnect { reason } => match self.ctx.reconnect.schedule() {
                Scheduled::Armed { delay } => {
                    crate::metrics::record_reconnect_scheduled();
                    info!(account, reason, delay_secs = delay.as_secs(), "reconnect scheduled");
                }
                Scheduled::AlreadyPending { remaining_secs } => {
                    info!(account, reason, remaining_secs, "reconnect already pending");
                }
            },
            SessionAction::StartConflictRetry { reason } => {
                if self.ctx.periodic.start() {
                    info!(
                        account,
                        reason,
                        period_secs = self.ctx.periodic.period().as_secs(),
                        "periodic retry started"
                    );
                }
            }
            SessionAction::StopConflictRetry => {
                if self.ctx.periodic.stop() {
                    info!(account, "periodic retry stopped");
                }
            }
            SessionAction::AnswerGuard { responder } => match &self.account.shared_secret {
                Some(secret) => {
                    let code = self.generate_code(secret);
                    if !responder.respond(code) {
                        warn!(account, "guard challenge closed before the code was sent");
                    }
                }
                None => warn!(account, "no shared secret, guard challenge dropped"),
            },
            SessionAction::PromptForGuard {
                destination,
                previous_code_wrong,
                responder,
            } => {
                let prompt = GuardPrompt::new(
                    account,
                    destination,
                    previous_code_wrong,
                    responder,
                    self.progress_tx.clone(),
                );
                if self.prompts.enqueue(prompt).is_err() {
                    error!(account, "guard prompt queue closed, challenge abandoned");
                    let _ = self
                        .progress_tx
                        .send(PromptProgress::Abandoned(Error::PromptQueueClosed));
                }
            }
        }
    }

    /// Log on with fresh credentials. A new guard code is generated for every
    /// attempt when a shared secret is configured.
    fn attempt_login(&mut self) {
        self.ctx.login_attempts += 1;
        crate::metrics::record_login_attempt(&self.account.username);

        let two_factor_code = self
            .account
            .shared_secret
            .as_ref()
            .map(|secret| self.generate_code(secret));
        info!(
            account = %self.account.username,
            attempt = self.ctx.login_attempts,
            unattended_guard = two_factor_code.is_some(),
            "logging on"
        );
        self.client.log_on(LogOnDetails {
            account_name: self.account.username.clone(),
            password: self.account.password.clone(),
            two_factor_code,
        });
    }

    fn generate_code(&self, secret: &SharedSecret) -> String {
        crate::metrics::record_guard_code_generated();
        self.codes.generate(secret)
    }
}
