//! Console used by the guard prompt worker
//!
//! Questions go to stdout, answers come from stdin. Stdin is read on a
//! dedicated thread: a blocking read parked on tokio's blocking pool would
//! hold up runtime shutdown until the user pressed enter.
//!
//! The reader runs all the time, so lines typed while no question is showing
//! still arrive. Each line is stamped when read and `ask` only accepts lines
//! read after its question was written.

use std::future::Future;
use std::io::{self, BufRead};
use std::pin::Pin;
use std::time::Instant;

use session_pool::PromptIo;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One line of console input and when it was read.
#[derive(Debug)]
pub struct ConsoleLine {
    read_at: Instant,
    text: io::Result<String>,
}

impl ConsoleLine {
    pub fn at(read_at: Instant, text: io::Result<String>) -> Self {
        Self { read_at, text }
    }

    pub fn now(text: io::Result<String>) -> Self {
        Self::at(Instant::now(), text)
    }
}

pub struct ConsolePrompt<W> {
    lines: mpsc::Receiver<ConsoleLine>,
    out: W,
}

impl ConsolePrompt<tokio::io::Stdout> {
    /// Console on the process's stdin and stdout.
    pub fn stdio() -> Self {
        let (tx, rx) = mpsc::channel(1);
        let reader = std::thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    if tx.blocking_send(ConsoleLine::now(line)).is_err() {
                        break;
                    }
                }
                debug!("stdin closed");
            });
        // Without a reader every prompt fails with EOF, which the accounts survive.
        if let Err(e) = reader {
            warn!(error = %e, "failed to start stdin reader, guard prompts unavailable");
        }
        Self::new(rx, tokio::io::stdout())
    }
}

impl<W> ConsolePrompt<W> {
    pub fn new(lines: mpsc::Receiver<ConsoleLine>, out: W) -> Self {
        Self { lines, out }
    }
}

impl<W: AsyncWrite + Unpin + Send> PromptIo for ConsolePrompt<W> {
    fn ask<'a>(
        &'a mut self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = io::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let asked_at = Instant::now();
            self.out.write_all(question.as_bytes()).await?;
            self.out.flush().await?;
            loop {
                match self.lines.recv().await {
                    Some(line) if line.read_at < asked_at => {
                        debug!("discarding input typed before the prompt")
                    }
                    Some(line) => {
                        return line
                            .text
                            .map(|l| l.trim_end_matches(['\r', '\n']).to_string());
                    }
                    None => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "console input closed",
                        ));
                    }
                }
            }
        })
    }
}
