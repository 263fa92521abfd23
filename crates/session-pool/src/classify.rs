//! Classification of remote result codes
//!
//! The service reports failures as numeric result codes. Only a handful change
//! what the account should do next; everything else is treated as transient
//! and retried once after the reconnect delay.

/// Remote result codes with a dedicated recovery policy.
pub mod result_code {
    pub const INVALID_PASSWORD: i32 = 5;
    pub const LOGGED_IN_ELSEWHERE: i32 = 6;
    pub const SERVICE_UNAVAILABLE: i32 = 20;
    pub const ACCOUNT_LOGON_DENIED: i32 = 63;
    pub const INVALID_LOGIN_AUTH_CODE: i32 = 65;
    pub const ACCOUNT_LOGIN_DENIED_NEED_TWO_FACTOR: i32 = 85;
}

/// Recovery category for a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong password. Nothing automatic can fix it.
    FatalCredentialFailure,
    /// The account is in use elsewhere.
    SessionConflict,
    /// A second factor is needed; the guard challenge event carries the flow.
    GuardRequired,
    /// Service temporarily down.
    TransientServiceFailure,
    /// Anything unrecognized, retried like a transient failure.
    Unknown,
}

/// What the state machine does about a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Stop all automatic activity for the account
    Halt,
    /// Retry on the long periodic timer
    PeriodicRetry,
    /// Wait for the guard challenge; scheduling a reconnect would mask it
    AwaitGuard,
    /// One reconnect after the reconnect delay
    Reconnect,
}

/// Map a remote result code to its category.
pub fn classify(code: i32) -> ErrorCategory {
    use result_code::*;
    match code {
        INVALID_PASSWORD => ErrorCategory::FatalCredentialFailure,
        LOGGED_IN_ELSEWHERE => ErrorCategory::SessionConflict,
        SERVICE_UNAVAILABLE => ErrorCategory::TransientServiceFailure,
        ACCOUNT_LOGON_DENIED | INVALID_LOGIN_AUTH_CODE | ACCOUNT_LOGIN_DENIED_NEED_TWO_FACTOR => {
            ErrorCategory::GuardRequired
        }
        _ => ErrorCategory::Unknown,
    }
}

impl ErrorCategory {
    /// Short label for log fields and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::FatalCredentialFailure => "fatal_credential_failure",
            ErrorCategory::SessionConflict => "session_conflict",
            ErrorCategory::GuardRequired => "guard_required",
            ErrorCategory::TransientServiceFailure => "transient_service_failure",
            ErrorCategory::Unknown => "unknown",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            ErrorCategory::FatalCredentialFailure => Recovery::Halt,
            ErrorCategory::SessionConflict => Recovery::PeriodicRetry,
            ErrorCategory::GuardRequired => Recovery::AwaitGuard,
            ErrorCategory::TransientServiceFailure | ErrorCategory::Unknown => Recovery::Reconnect,
        }
    }

    /// Operator-facing explanation of a remote error.
    pub fn describe(&self, code: i32, message: &str) -> String {
        match self {
            ErrorCategory::FatalCredentialFailure => {
                "invalid password, check the account roster".to_string()
            }
            ErrorCategory::SessionConflict => {
                "account is already in use by another session".to_string()
            }
            ErrorCategory::GuardRequired => {
                "account requires guard verification (code will be requested)".to_string()
            }
            ErrorCategory::TransientServiceFailure => {
                "service is unavailable, will retry later".to_string()
            }
            ErrorCategory::Unknown => format!("unrecognized error: {message} (code {code})"),
        }
    }
}
