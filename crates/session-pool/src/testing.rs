//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use common::Secret;
use guard_code::{CodeGenerator, SharedSecret};
use session_client::{Activity, LogOnDetails, PresenceStatus, SessionClient};

use crate::prompt::PromptIo;
use crate::roster::Account;

/// Console double answering from a fixed script and recording every question.
pub struct ScriptedPrompt {
    answers: VecDeque<Result<&'static str, io::ErrorKind>>,
    transcript: Arc<Mutex<Vec<String>>>,
    yield_while_asking: bool,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = Result<&'static str, io::ErrorKind>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            transcript: Arc::new(Mutex::new(Vec::new())),
            yield_while_asking: false,
        }
    }

    /// Yield to the scheduler while "waiting for the human", giving other
    /// tasks every chance to interleave.
    pub fn with_delay(mut self) -> Self {
        self.yield_while_asking = true;
        self
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }

    pub fn transcript_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.transcript.clone()
    }
}

impl PromptIo for ScriptedPrompt {
    fn ask<'a>(
        &'a mut self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.transcript.lock().unwrap().push(question.to_string());
            if self.yield_while_asking {
                for _ in 0..8 {
                    tokio::task::yield_now().await;
                }
            }
            match self.answers.pop_front() {
                Some(Ok(answer)) => Ok(answer.to_string()),
                Some(Err(kind)) => Err(io::Error::new(kind, "scripted failure")),
                None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted")),
            }
        })
    }
}

/// A call made on the session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    LogOn { two_factor_code: Option<String> },
    Presence(u8),
    Activity(Vec<Activity>),
}

/// Session client double that records calls and emits nothing by itself.
#[derive(Clone, Default)]
pub struct RecordingClient {
    calls: Arc<Mutex<Vec<ClientCall>>>,
}

impl RecordingClient {
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn log_ons(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ClientCall::LogOn { .. }))
            .count()
    }
}

impl SessionClient for RecordingClient {
    fn log_on(&mut self, details: LogOnDetails) {
        self.calls.lock().unwrap().push(ClientCall::LogOn {
            two_factor_code: details.two_factor_code,
        });
    }

    fn set_presence(&mut self, status: PresenceStatus) {
        self.calls.lock().unwrap().push(ClientCall::Presence(status.0));
    }

    fn declare_activity(&mut self, activities: &[Activity]) {
        self.calls
            .lock()
            .unwrap()
            .push(ClientCall::Activity(activities.to_vec()));
    }
}

/// Generator returning `CODE1`, `CODE2`, ... so reuse is detectable.
#[derive(Default)]
pub struct CountingCodes {
    issued: AtomicU32,
}

impl CodeGenerator for CountingCodes {
    fn generate(&self, _secret: &SharedSecret) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("CODE{n}")
    }
}

pub fn account(username: &str, with_secret: bool) -> Account {
    Account {
        username: username.to_string(),
        password: Secret::new(format!("pw-{username}")),
        shared_secret: with_secret.then(|| SharedSecret::from_bytes(b"0123456789".to_vec())),
        activities: vec![Activity::App(730), Activity::App(440)],
        presence: PresenceStatus::ONLINE,
    }
}

/// Let spawned tasks run without letting paused time auto-advance.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
