//! Account roster loading
//!
//! The roster is a JSON array of account records. Each record is validated on
//! its own: a malformed record is logged and skipped, and the remaining
//! records still load. Only a file that cannot be read, or that is not a JSON
//! array at all, fails the load.

use std::collections::HashSet;
use std::path::Path;

use common::Secret;
use guard_code::SharedSecret;
use serde::Deserialize;
use session_client::{Activity, PresenceStatus};
use tracing::{info, warn};

use crate::error::Error;

/// A validated account, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: Secret<String>,
    /// Present when guard codes can be generated without a human.
    pub shared_secret: Option<SharedSecret>,
    pub activities: Vec<Activity>,
    pub presence: PresenceStatus,
}

impl Account {
    pub fn has_unattended_guard(&self) -> bool {
        self.shared_secret.is_some()
    }
}

/// Result of loading a roster: the usable accounts plus every rejected record.
#[derive(Debug, Default)]
pub struct Roster {
    pub accounts: Vec<Account>,
    pub rejected: Vec<Error>,
}

/// Record as it appears on disk. Every field is optional here so that a
/// missing field produces a precise diagnostic instead of a parse failure.
#[derive(Debug, Deserialize)]
struct RosterEntry {
    username: Option<String>,
    password: Option<String>,
    shared_secret: Option<String>,
    games: Option<serde_json::Value>,
    status: Option<serde_json::Value>,
}

/// Read and validate the roster file.
pub fn load_roster(path: &Path) -> common::Result<Roster> {
    let contents = std::fs::read_to_string(path)?;
    let roster = parse_roster(&contents)?;
    info!(
        path = %path.display(),
        accounts = roster.accounts.len(),
        rejected = roster.rejected.len(),
        "roster loaded"
    );
    Ok(roster)
}

/// Validate a roster document.
pub fn parse_roster(json: &str) -> common::Result<Roster> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(entries) = document else {
        return Err(common::Error::Config(
            "account roster must be a JSON array of account records".into(),
        ));
    };

    let mut roster = Roster::default();
    let mut seen = HashSet::new();
    for (index, value) in entries.into_iter().enumerate() {
        let position = index + 1;
        let result = validate_entry(position, value).and_then(|account| {
            if seen.insert(account.username.clone()) {
                Ok(account)
            } else {
                Err(Error::InvalidAccount {
                    position,
                    reason: format!("duplicate username {}", account.username),
                })
            }
        });
        match result {
            Ok(account) => roster.accounts.push(account),
            Err(e) => {
                warn!(error = %e, "skipping roster entry");
                roster.rejected.push(e);
            }
        }
    }
    Ok(roster)
}

fn validate_entry(position: usize, value: serde_json::Value) -> Result<Account, Error> {
    let invalid = |reason: String| Error::InvalidAccount { position, reason };

    let entry: RosterEntry =
        serde_json::from_value(value).map_err(|e| invalid(format!("malformed record: {e}")))?;

    let username = entry
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| invalid("missing username".into()))?;

    let password = entry
        .password
        .map(Secret::new)
        .filter(|p| !p.is_blank())
        .ok_or_else(|| invalid(format!("{username}: missing password")))?;

    let games = match entry.games {
        Some(games @ serde_json::Value::Array(_)) => games,
        Some(_) => return Err(invalid(format!("{username}: games must be a list"))),
        None => return Err(invalid(format!("{username}: missing games"))),
    };
    let activities: Vec<Activity> = serde_json::from_value(games).map_err(|_| {
        invalid(format!(
            "{username}: games must contain application ids or titles"
        ))
    })?;
    if activities.is_empty() {
        return Err(invalid(format!("{username}: games list is empty")));
    }

    let shared_secret = match entry.shared_secret.as_deref() {
        Some(encoded) => SharedSecret::parse(encoded)
            .map_err(|e| invalid(format!("{username}: {e}")))?,
        None => None,
    };

    let presence = PresenceStatus::from_config(presence_code(&username, entry.status));
    Ok(Account {
        username,
        password,
        shared_secret,
        activities,
        presence,
    })
}

/// A status that is not a small non-negative integer is treated as unset
/// rather than costing the account its place in the roster.
fn presence_code(username: &str, status: Option<serde_json::Value>) -> Option<u8> {
    let value = status.filter(|v| !v.is_null())?;
    let code = value.as_u64().and_then(|n| u8::try_from(n).ok());
    if code.is_none() {
        warn!(account = username, status = %value, "ignoring invalid presence status");
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: &Error) -> String {
        match err {
            Error::InvalidAccount { reason, .. } => reason.clone(),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parses_complete_records() {
        let roster = parse_roster(
            r#"[
                {"username": "alice", "password": "pw1", "games": [730, 440], "status": 3,
                 "shared_secret": "MTIzNDU2Nzg5MDEyMzQ1Njc4OTA="},
                {"username": "bob", "password": "pw2", "games": ["Idle Hours"]}
            ]"#,
        )
        .unwrap();

        assert!(roster.rejected.is_empty());
        assert_eq!(roster.accounts.len(), 2);

        let alice = &roster.accounts[0];
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.password.expose(), "pw1");
        assert!(alice.has_unattended_guard());
        assert_eq!(alice.activities, vec![Activity::App(730), Activity::App(440)]);
        assert_eq!(alice.presence, PresenceStatus(3));

        let bob = &roster.accounts[1];
        assert!(!bob.has_unattended_guard());
        assert_eq!(bob.presence, PresenceStatus::ONLINE);
        assert_eq!(bob.activities, vec![Activity::Custom("Idle Hours".into())]);
    }

    #[test]
    fn invalid_records_are_skipped_and_order_kept() {
        let roster = parse_roster(
            r#"[
                {"username": "a", "password": "pw", "games": [1]},
                {"password": "pw", "games": [1]},
                {"username": "c", "games": [1]},
                {"username": "d", "password": "pw", "games": 730},
                {"username": "e", "password": "pw"},
                {"username": "f", "password": "pw", "games": []},
                {"username": "g", "password": "pw", "games": [1]}
            ]"#,
        )
        .unwrap();

        let names: Vec<_> = roster.accounts.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["a", "g"]);
        assert_eq!(roster.rejected.len(), 5);
        assert_eq!(reason(&roster.rejected[0]), "missing username");
        assert_eq!(reason(&roster.rejected[1]), "c: missing password");
        assert_eq!(reason(&roster.rejected[2]), "d: games must be a list");
        assert_eq!(reason(&roster.rejected[3]), "e: missing games");
        assert_eq!(reason(&roster.rejected[4]), "f: games list is empty");
        assert!(matches!(
            roster.rejected[0],
            Error::InvalidAccount { position: 2, .. }
        ));
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let roster = parse_roster(
            r#"[
                {"username": "  ", "password": "pw", "games": [1]},
                {"username": "b", "password": "   ", "games": [1]}
            ]"#,
        )
        .unwrap();
        assert!(roster.accounts.is_empty());
        assert_eq!(reason(&roster.rejected[0]), "missing username");
        assert_eq!(reason(&roster.rejected[1]), "b: missing password");
    }

    #[test]
    fn wrongly_typed_fields_are_malformed() {
        let roster = parse_roster(
            r#"[
                {"username": 12, "password": "pw", "games": [1]},
                "not an object",
                {"username": "c", "password": "pw", "games": [true]}
            ]"#,
        )
        .unwrap();
        assert!(roster.accounts.is_empty());
        assert!(reason(&roster.rejected[0]).starts_with("malformed record"));
        assert!(reason(&roster.rejected[1]).starts_with("malformed record"));
        assert_eq!(
            reason(&roster.rejected[2]),
            "c: games must contain application ids or titles"
        );
    }

    #[test]
    fn blank_shared_secret_means_no_unattended_guard() {
        let roster = parse_roster(
            r#"[{"username": "a", "password": "pw", "games": [1], "shared_secret": "  "}]"#,
        )
        .unwrap();
        assert!(!roster.accounts[0].has_unattended_guard());
    }

    #[test]
    fn undecodable_shared_secret_rejects_record() {
        let roster = parse_roster(
            r#"[{"username": "a", "password": "pw", "games": [1], "shared_secret": "%%%"}]"#,
        )
        .unwrap();
        assert!(roster.accounts.is_empty());
        assert!(reason(&roster.rejected[0]).starts_with("a: shared secret"));
    }

    #[test]
    fn duplicate_usernames_keep_first() {
        let roster = parse_roster(
            r#"[
                {"username": "a", "password": "first", "games": [1]},
                {"username": "a", "password": "second", "games": [2]}
            ]"#,
        )
        .unwrap();
        assert_eq!(roster.accounts.len(), 1);
        assert_eq!(roster.accounts[0].password.expose(), "first");
        assert_eq!(reason(&roster.rejected[0]), "duplicate username a");
    }

    #[test]
    fn invalid_status_falls_back_to_online() {
        let roster = parse_roster(
            r#"[
                {"username": "a", "password": "pw", "games": [1], "status": "busy"},
                {"username": "b", "password": "pw", "games": [1], "status": 300},
                {"username": "c", "password": "pw", "games": [1], "status": -1},
                {"username": "d", "password": "pw", "games": [1], "status": null},
                {"username": "e", "password": "pw", "games": [1], "status": 7}
            ]"#,
        )
        .unwrap();
        assert!(roster.rejected.is_empty());
        let presence: Vec<_> = roster.accounts.iter().map(|a| a.presence).collect();
        assert_eq!(
            presence,
            vec![
                PresenceStatus::ONLINE,
                PresenceStatus::ONLINE,
                PresenceStatus::ONLINE,
                PresenceStatus::ONLINE,
                PresenceStatus(7),
            ]
        );
    }

    #[test]
    fn non_array_document_is_config_error() {
        let err = parse_roster(r#"{"username": "a"}"#).unwrap_err();
        assert!(matches!(err, common::Error::Config(_)), "got: {err:?}");
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_roster("[{").unwrap_err();
        assert!(matches!(err, common::Error::Json(_)), "got: {err:?}");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"[{"username": "a", "password": "pw", "games": [1]}]"#,
        )
        .unwrap();
        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.accounts.len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_roster(Path::new("/nonexistent/accounts.json")).unwrap_err();
        assert!(matches!(err, common::Error::Io(_)), "got: {err:?}");
    }
}
