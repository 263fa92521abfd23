//! Serialized guard-code prompts
//!
//! All accounts share one console. Prompts are queued on a single-consumer
//! channel and a single worker runs them one at a time, so two accounts'
//! questions are never interleaved. A prompt that fails (console closed, read
//! error) is reported to its own account and the worker moves on to the next.
//!
//! Each prompt asks whether to answer now, then asks for the code. The code is
//! handed straight to the challenge's responder; declining, an empty code, or
//! an I/O error leaves the challenge unanswered.

use std::future::Future;
use std::io;
use std::pin::Pin;

use session_client::{GuardDestination, GuardResponder};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Error;

/// Line-oriented console the prompt worker talks to.
///
/// Uses `Pin<Box<dyn Future>>` so the worker can hold a `Box<dyn PromptIo>`.
pub trait PromptIo: Send {
    /// Show `question` and read one line of input, without the line ending.
    fn ask<'a>(
        &'a mut self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>>;
}

impl<P: PromptIo + ?Sized> PromptIo for Box<P> {
    fn ask<'a>(
        &'a mut self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>> {
        (**self).ask(question)
    }
}

/// Progress of a queued prompt, reported back to the owning account.
#[derive(Debug)]
pub enum PromptProgress {
    /// The human agreed to enter a code and is being asked for it
    ConsentGiven,
    /// The code was handed to the challenge
    CodeSubmitted,
    /// No code was supplied
    Abandoned(Error),
}

impl PromptProgress {
    pub fn label(&self) -> &'static str {
        match self {
            PromptProgress::ConsentGiven => "consent_given",
            PromptProgress::CodeSubmitted => "submitted",
            PromptProgress::Abandoned(e) if e.is_declined() => "declined",
            PromptProgress::Abandoned(_) => "failed",
        }
    }
}

/// One account's pending guard challenge, waiting for the console.
#[derive(Debug)]
pub struct GuardPrompt {
    account: String,
    destination: GuardDestination,
    previous_code_wrong: bool,
    responder: GuardResponder,
    progress: mpsc::UnboundedSender<PromptProgress>,
}

impl GuardPrompt {
    pub fn new(
        account: impl Into<String>,
        destination: GuardDestination,
        previous_code_wrong: bool,
        responder: GuardResponder,
        progress: mpsc::UnboundedSender<PromptProgress>,
    ) -> Self {
        Self {
            account: account.into(),
            destination,
            previous_code_wrong,
            responder,
            progress,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn previous_code_wrong(&self) -> bool {
        self.previous_code_wrong
    }

    pub fn consent_question(&self) -> String {
        let retry_note = if self.previous_code_wrong {
            " Previous code was incorrect."
        } else {
            ""
        };
        format!(
            "[guard] [{}] verification required via {}.{} Enter code now? (y/n): ",
            self.account, self.destination, retry_note
        )
    }

    pub fn code_question(&self) -> String {
        format!("[guard] [{}] guard code: ", self.account)
    }

    /// Ask the questions and deliver the result. Never fails: every outcome
    /// is reported to the account through its progress channel.
    pub async fn run<P: PromptIo + ?Sized>(self, io: &mut P) {
        let collected = self.collect_code(io).await;
        let GuardPrompt {
            account,
            responder,
            progress,
            ..
        } = self;
        let outcome = match collected {
            Ok(Some(code)) => {
                if !responder.respond(code) {
                    warn!(account = %account, "guard challenge expired before the code arrived");
                }
                PromptProgress::CodeSubmitted
            }
            // The responder is dropped unanswered below.
            Ok(None) => {
                info!(account = %account, "guard code not entered, will retry later");
                PromptProgress::Abandoned(Error::GuardAbandoned)
            }
            Err(e) => {
                error!(account = %account, error = %e, "failed to read guard code");
                PromptProgress::Abandoned(Error::PromptIo(e))
            }
        };
        finish(&account, &progress, outcome);
    }

    async fn collect_code<P: PromptIo + ?Sized>(&self, io: &mut P) -> io::Result<Option<String>> {
        let consent = io.ask(&self.consent_question()).await?;
        if !is_affirmative(&consent) {
            return Ok(None);
        }
        let _ = self.progress.send(PromptProgress::ConsentGiven);

        let code = io.ask(&self.code_question()).await?;
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(Some(code.to_string()))
    }
}

fn finish(account: &str, progress: &mpsc::UnboundedSender<PromptProgress>, outcome: PromptProgress) {
    crate::metrics::record_guard_prompt(outcome.label());
    if progress.send(outcome).is_err() {
        debug!(account, "account stopped before its prompt finished");
    }
}

/// Accept the usual ways of saying yes, including the Thai "ใช่".
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "1" | "ใช่"
    )
}

/// Producer handle for the shared prompt queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GuardPromptQueue {
    tx: mpsc::UnboundedSender<GuardPrompt>,
}

/// Consumer side of the queue; runs prompts strictly one after another.
#[derive(Debug)]
pub struct PromptWorker {
    rx: mpsc::UnboundedReceiver<GuardPrompt>,
}

impl GuardPromptQueue {
    pub fn new() -> (Self, PromptWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PromptWorker { rx })
    }

    /// Create the queue and spawn its worker on `io`.
    pub fn spawn<P: PromptIo + 'static>(io: P) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new();
        (queue, tokio::spawn(worker.run(io)))
    }

    /// Queue a prompt. Hands the prompt back if the worker is gone.
    pub fn enqueue(&self, prompt: GuardPrompt) -> Result<(), GuardPrompt> {
        self.tx.send(prompt).map_err(|rejected| rejected.0)
    }
}

impl PromptWorker {
    /// Run queued prompts until every queue handle is dropped.
    pub async fn run<P: PromptIo>(mut self, mut io: P) {
        while let Some(prompt) = self.rx.recv().await {
            debug!(account = prompt.account(), "running guard prompt");
            prompt.run(&mut io).await;
        }
        debug!("guard prompt queue closed");
    }

    /// Take the next queued prompt without running it.
    pub fn try_next(&mut self) -> Option<GuardPrompt> {
        self.rx.try_recv().ok()
    }
}
