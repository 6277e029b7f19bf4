// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Off-thread execution of tokenizer calls.
//!
//! Sessions hand a [`TokenizeJob`] to a [`Spawner`] and later drain the
//! matching [`TokenizeOutcome`] from their own reply channel. Nothing is ever
//! cancelled: a session that has moved on simply ignores the reply, and a
//! reply to a session that no longer exists is dropped on send.

use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::error::TokenizeError;
use crate::highlight::CallerId;
use crate::syntax::{TokenLine, Tokenizer};

/// One tokenizer call on behalf of a session.
#[derive(Debug)]
pub struct TokenizeJob {
    pub caller: CallerId,
    pub epoch: u64,
    /// Index of the first line in `lines`.
    pub start: usize,
    /// Line texts as they were when the job was created.
    pub lines: Vec<String>,
    pub language: String,
    pub reply: Sender<TokenizeOutcome>,
}

impl TokenizeJob {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.lines.len()
    }
}

/// Result of a [`TokenizeJob`], sent back to the owning session.
#[derive(Debug)]
pub struct TokenizeOutcome {
    pub caller: CallerId,
    pub epoch: u64,
    pub start: usize,
    pub lines: Vec<String>,
    pub result: Result<Vec<TokenLine>, TokenizeError>,
    pub elapsed: Duration,
}

impl TokenizeOutcome {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.lines.len()
    }
}

/// Dispatches tokenizer jobs.
pub trait Spawner: Send + Sync {
    /// Queues `job`. The outcome arrives later on `job.reply`.
    fn spawn(&self, job: TokenizeJob) -> Result<(), TokenizeError>;
}

/// Runs `job` on the calling thread and sends its outcome.
pub fn run_job(tokenizer: &dyn Tokenizer, job: TokenizeJob) {
    let TokenizeJob {
        caller,
        epoch,
        start,
        lines,
        language,
        reply,
    } = job;

    let started = Instant::now();
    let result = tokenizer
        .tokenize(&lines, &language)
        .and_then(|token_lines| {
            if token_lines.len() == lines.len() {
                Ok(token_lines)
            } else {
                Err(TokenizeError::LengthMismatch {
                    expected: lines.len(),
                    got: token_lines.len(),
                })
            }
        });
    let elapsed = started.elapsed();

    tracing::trace!(
        %caller,
        epoch,
        range = ?(start..start + lines.len()),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        ok = result.is_ok(),
        "tokenize job finished"
    );

    // The session may be gone by now.
    let _ = reply.send(TokenizeOutcome {
        caller,
        epoch,
        start,
        lines,
        result,
        elapsed,
    });
}

/// Fixed-size pool of named tokenizer threads sharing one job queue.
pub struct WorkerPool {
    jobs: Option<Sender<TokenizeJob>>,
    workers: Vec<JoinHandle<()>>,
    submitted: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns `threads` workers (at least one) running `tokenizer`.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, threads: usize) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<TokenizeJob>();
        let completed = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(threads.max(1));

        for index in 0..threads.max(1) {
            let rx = rx.clone();
            let tokenizer = tokenizer.clone();
            let completed = completed.clone();
            let handle = thread::Builder::new()
                .name(format!("codeview-tokenize-{index}"))
                .spawn(move || {
                    for job in rx.iter() {
                        run_job(tokenizer.as_ref(), job);
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                })?;
            workers.push(handle);
        }

        tracing::debug!(threads = workers.len(), "tokenizer pool started");
        Ok(Self {
            jobs: Some(tx),
            workers,
            submitted: AtomicUsize::new(0),
            completed,
        })
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Jobs accepted since the pool started.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Jobs finished since the pool started.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

impl Spawner for WorkerPool {
    fn spawn(&self, job: TokenizeJob) -> Result<(), TokenizeError> {
        let jobs = self.jobs.as_ref().ok_or(TokenizeError::WorkerGone)?;
        jobs.send(job).map_err(|_| TokenizeError::WorkerGone)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue ends each worker's loop once it drains.
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("tokenizer worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.workers.len())
            .field("submitted", &self.submitted())
            .field("completed", &self.completed())
            .finish()
    }
}

/// Runs jobs synchronously inside [`Spawner::spawn`].
///
/// The outcome is already waiting on the reply channel when `spawn` returns.
pub struct InlineSpawner {
    tokenizer: Arc<dyn Tokenizer>,
}

impl InlineSpawner {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl Spawner for InlineSpawner {
    fn spawn(&self, job: TokenizeJob) -> Result<(), TokenizeError> {
        run_job(self.tokenizer.as_ref(), job);
        Ok(())
    }
}
