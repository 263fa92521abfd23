//! Account lifecycle state machine
//!
//! Pure state machine: receives an input, returns (new_state, actions). The
//! account driver (`session.rs`) executes the client calls and timer changes
//! implied by each action.
//!
//! ```text
//! Idle ──start──▶ Connecting ──authenticated──▶ Authenticated ⇄ Blocked
//! Connecting ──guard──▶ AwaitingGuardDecision ──yes──▶ AwaitingGuardCode ──code──▶ Connecting
//! Connecting | Authenticated ──failure──▶ ReconnectPending ──timer──▶ Connecting
//! any ──invalid password──▶ Failed
//! ```

use session_client::{GuardDestination, GuardResponder, SessionEvent};

use crate::classify::{Recovery, classify};
use crate::error::Error;
use crate::prompt::PromptProgress;

pub const REASON_GUARD_NOT_COMPLETED: &str = "guard not completed";
pub const REASON_GUARD_UNREADABLE: &str = "guard code could not be read";
pub const REASON_REMOTE_ERROR: &str = "remote error";
pub const REASON_DISCONNECTED: &str = "connection lost";
pub const REASON_ACTIVITY_BLOCKED: &str = "account in use elsewhere";
pub const REASON_SESSION_CONFLICT: &str = "logon collided with another session";

/// Lifecycle states of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Waiting for the staggered first logon
    Idle,
    /// Logon in flight
    Connecting,
    /// Logged on and announcing activities
    Authenticated,
    /// Another session holds the account; periodic retry running
    Blocked,
    /// Guard prompt queued, waiting for the human to agree
    AwaitingGuardDecision,
    /// Human agreed, waiting for the code
    AwaitingGuardCode,
    /// Single-shot reconnect armed
    ReconnectPending,
    /// Password rejected; nothing automatic happens any more
    Failed,
}

impl LifecycleState {
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Connecting => "connecting",
            LifecycleState::Authenticated => "authenticated",
            LifecycleState::Blocked => "blocked",
            LifecycleState::AwaitingGuardDecision => "awaiting_guard_decision",
            LifecycleState::AwaitingGuardCode => "awaiting_guard_code",
            LifecycleState::ReconnectPending => "reconnect_pending",
            LifecycleState::Failed => "failed",
        }
    }
}

/// Everything that can move an account's state machine.
#[derive(Debug)]
pub enum SessionInput {
    /// Staggered start offset reached
    StartupDue,
    /// Single-shot reconnect timer fired
    ReconnectDue,
    /// Periodic conflict retry ticked
    ConflictRetryTick,
    /// Event from the session client
    Client(SessionEvent),
    /// Progress of this account's guard prompt
    Prompt(PromptProgress),
}

/// Per-account facts the transition depends on, computed by the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFacts {
    /// A shared secret is configured
    pub unattended_guard: bool,
    /// Automated codes were rejected too often; ask a human instead
    pub escalate_guard: bool,
}

/// Side effects for the driver to carry out, in order.
#[derive(Debug)]
pub enum SessionAction {
    /// Generate fresh credentials and log on
    LogOn,
    /// Set presence and declare the activity list
    AnnouncePresence,
    CancelReconnect,
    ScheduleReconnect { reason: &'static str },
    StartConflictRetry { reason: &'static str },
    StopConflictRetry,
    /// Answer the challenge with a freshly generated code
    AnswerGuard { responder: GuardResponder },
    /// Queue the challenge for the human
    PromptForGuard {
        destination: GuardDestination,
        previous_code_wrong: bool,
        responder: GuardResponder,
    },
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_input(
    state: LifecycleState,
    input: SessionInput,
    facts: &SessionFacts,
) -> (LifecycleState, Vec<SessionAction>) {
    use LifecycleState as S;
    use SessionAction as A;

    match (state, input) {
        // --- Failed: stays failed until restart ---
        (S::Failed, _) => (S::Failed, vec![]),

        // --- Logon triggers ---
        (_, SessionInput::StartupDue | SessionInput::ReconnectDue | SessionInput::ConflictRetryTick) => {
            (S::Connecting, vec![A::LogOn])
        }

        // --- Client events ---
        (_, SessionInput::Client(SessionEvent::Authenticated)) => (
            S::Authenticated,
            vec![A::CancelReconnect, A::StopConflictRetry, A::AnnouncePresence],
        ),

        (
            state,
            SessionInput::Client(SessionEvent::GuardChallenge {
                destination,
                previous_code_wrong,
                responder,
            }),
        ) => {
            if facts.unattended_guard && !facts.escalate_guard {
                (state, vec![A::AnswerGuard { responder }])
            } else {
                (
                    S::AwaitingGuardDecision,
                    vec![A::PromptForGuard {
                        destination,
                        previous_code_wrong,
                        responder,
                    }],
                )
            }
        }

        (_, SessionInput::Client(SessionEvent::ActivityBlocked(true))) => (
            S::Blocked,
            vec![
                A::CancelReconnect,
                A::StartConflictRetry {
                    reason: REASON_ACTIVITY_BLOCKED,
                },
            ],
        ),

        (_, SessionInput::Client(SessionEvent::ActivityBlocked(false))) => {
            (S::Authenticated, vec![A::StopConflictRetry])
        }

        (state, SessionInput::Client(SessionEvent::RemoteError { code, .. })) => {
            match classify(code).recovery() {
                Recovery::Halt => (S::Failed, vec![A::CancelReconnect, A::StopConflictRetry]),
                Recovery::PeriodicRetry => (
                    S::Blocked,
                    vec![
                        A::CancelReconnect,
                        A::StartConflictRetry {
                            reason: REASON_SESSION_CONFLICT,
                        },
                    ],
                ),
                Recovery::AwaitGuard => (state, vec![]),
                Recovery::Reconnect => (
                    S::ReconnectPending,
                    vec![A::ScheduleReconnect {
                        reason: REASON_REMOTE_ERROR,
                    }],
                ),
            }
        }

        (_, SessionInput::Client(SessionEvent::Disconnected { .. })) => (
            S::ReconnectPending,
            vec![A::ScheduleReconnect {
                reason: REASON_DISCONNECTED,
            }],
        ),

        // --- Guard prompt progress ---
        (_, SessionInput::Prompt(PromptProgress::ConsentGiven)) => (S::AwaitingGuardCode, vec![]),

        (_, SessionInput::Prompt(PromptProgress::CodeSubmitted)) => (S::Connecting, vec![]),

        (_, SessionInput::Prompt(PromptProgress::Abandoned(Error::GuardAbandoned))) => (
            S::ReconnectPending,
            vec![A::ScheduleReconnect {
                reason: REASON_GUARD_NOT_COMPLETED,
            }],
        ),

        (_, SessionInput::Prompt(PromptProgress::Abandoned(_))) => (
            S::ReconnectPending,
            vec![A::ScheduleReconnect {
                reason: REASON_GUARD_UNREADABLE,
            }],
        ),
    }
}
