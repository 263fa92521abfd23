//! Session metrics
//!
//! Recorded through the `metrics` facade; the binary decides whether a
//! Prometheus exporter is installed. Without a recorder every call is a no-op.
//!
//! - `idler_login_attempts_total` (counter): label `account`
//! - `idler_remote_errors_total` (counter): label `category`
//! - `idler_reconnects_scheduled_total` (counter)
//! - `idler_guard_prompts_total` (counter): label `outcome`
//! - `idler_guard_codes_generated_total` (counter)

/// Record a logon attempt for an account.
pub fn record_login_attempt(account: &str) {
    metrics::counter!("idler_login_attempts_total", "account" => account.to_string()).increment(1);
}

/// Record a remote error with its classification label.
pub fn record_remote_error(category: &str) {
    metrics::counter!("idler_remote_errors_total", "category" => category.to_string())
        .increment(1);
}

/// Record a newly armed reconnect timer. Deduplicated requests are not counted.
pub fn record_reconnect_scheduled() {
    metrics::counter!("idler_reconnects_scheduled_total").increment(1);
}

/// Record how a guard prompt ended (`submitted`, `declined`, `failed`).
pub fn record_guard_prompt(outcome: &str) {
    metrics::counter!("idler_guard_prompts_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_guard_code_generated() {
    metrics::counter!("idler_guard_codes_generated_total").increment(1);
}
