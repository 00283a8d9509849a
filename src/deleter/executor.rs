//! Batch delete execution
//!
//! A plan is split into ordered chunks. Each chunk is submitted as one bulk
//! delete; async jobs are polled until they complete, fail or exhaust the
//! poll budget. A failing chunk never stops the chunks after it.

use crate::config::DeleterConfig;
use crate::deleter::RateGate;
use crate::model::{ItemOutcome, PathOutcome};
use crate::remote::{DeleteSubmitter, ItemResult, JobStatus, SubmitResult};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Reason attached to paths the remote returned no result for
pub const MISSING_RESULT: &str = "missing result";

/// Pacing and sizing for a delete run
#[derive(Debug, Clone)]
pub struct DeleteSettings {
    pub chunk_size: usize,
    pub poll_interval: Duration,
    pub inter_batch_delay: Duration,
    pub error_backoff: Duration,
    pub max_poll_attempts: u32,
    pub max_in_flight: usize,
}

impl From<&DeleterConfig> for DeleteSettings {
    fn from(config: &DeleterConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            poll_interval: Duration::from_millis(config.poll_interval),
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay),
            error_backoff: Duration::from_millis(config.error_backoff),
            max_poll_attempts: config.max_poll_attempts,
            max_in_flight: config.max_in_flight,
        }
    }
}

/// How a chunk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// The remote reported per-path results
    Completed,
    /// The async job failed as a whole
    JobFailed,
    /// The submission itself was rejected
    SubmitFailed,
    /// The job never finished within the poll budget
    TimedOut,
    /// Cancelled before submission
    Skipped,
}

/// Progress notification sent after each chunk
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub index: usize,
    pub total_chunks: usize,
    pub state: ChunkState,
    pub paths: usize,
    pub succeeded: usize,
}

/// Aggregated result of a delete run
#[derive(Debug, Clone, Default)]
pub struct DeleteSummary {
    /// Outcomes of attempted paths, in plan order
    pub outcomes: Vec<PathOutcome>,
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Paths never submitted because the run was cancelled
    pub not_attempted: Vec<String>,
    /// State of every chunk, in plan order
    pub chunks: Vec<ChunkState>,
}

impl DeleteSummary {
    /// Paths worth submitting again: failures, timeouts and skipped paths
    pub fn retry_paths(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_retryable())
            .map(|o| o.path.clone())
            .chain(self.not_attempted.iter().cloned())
            .collect()
    }

    /// True if every planned path is known to be gone
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.not_attempted.is_empty()
    }

    fn absorb(&mut self, state: ChunkState, chunk: &[String], outcomes: Vec<PathOutcome>) {
        self.chunks.push(state);
        if state == ChunkState::Skipped {
            self.not_attempted.extend(chunk.iter().cloned());
            return;
        }
        for item in &outcomes {
            match item.outcome {
                ItemOutcome::Deleted => self.deleted += 1,
                ItemOutcome::AlreadyAbsent => self.already_absent += 1,
                ItemOutcome::Failed(_) => self.failed += 1,
                ItemOutcome::Timeout => self.timed_out += 1,
            }
        }
        self.outcomes.extend(outcomes);
    }
}

/// Executes deletion plans against a `DeleteSubmitter`
pub struct BatchDeleter<D> {
    submitter: D,
    settings: DeleteSettings,
    gate: RateGate,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<UnboundedSender<ChunkReport>>,
}

impl<D: DeleteSubmitter> BatchDeleter<D> {
    pub fn new(submitter: D, settings: DeleteSettings) -> Self {
        let gate = RateGate::new(settings.inter_batch_delay);
        Self {
            submitter,
            settings,
            gate,
            cancel: None,
            progress: None,
        }
    }

    /// Installs a flag that stops new chunks from being submitted
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sends a `ChunkReport` for every finished chunk
    pub fn with_progress(mut self, progress: UnboundedSender<ChunkReport>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Deletes `paths`, returning per-path outcomes in plan order
    pub async fn execute(&self, paths: &[String]) -> DeleteSummary {
        let chunks: Vec<&[String]> = paths.chunks(self.settings.chunk_size.max(1)).collect();
        let total = chunks.len();

        tracing::info!(
            "Deleting {} paths in {} chunks ({} in flight)",
            paths.len(),
            total,
            self.settings.max_in_flight.max(1)
        );

        let mut results: Vec<(usize, ChunkState, Vec<PathOutcome>)> =
            stream::iter(chunks.iter().copied().enumerate())
                .map(|(index, chunk)| async move {
                    let (state, outcomes) = self.run_chunk(index, total, chunk).await;
                    (index, state, outcomes)
                })
                .buffer_unordered(self.settings.max_in_flight.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);

        let mut summary = DeleteSummary::default();
        for (index, state, outcomes) in results {
            summary.absorb(state, chunks[index], outcomes);
        }

        tracing::info!(
            "Delete run finished: {} deleted, {} already absent, {} failed, {} timed out, {} not attempted",
            summary.deleted,
            summary.already_absent,
            summary.failed,
            summary.timed_out,
            summary.not_attempted.len()
        );
        summary
    }

    async fn run_chunk(
        &self,
        index: usize,
        total: usize,
        chunk: &[String],
    ) -> (ChunkState, Vec<PathOutcome>) {
        if self.is_cancelled() {
            return self.finish(index, total, chunk, ChunkState::Skipped, Vec::new());
        }

        self.gate.acquire().await;

        if self.is_cancelled() {
            return self.finish(index, total, chunk, ChunkState::Skipped, Vec::new());
        }

        tracing::info!("Chunk {}/{}: submitting {} paths", index + 1, total, chunk.len());

        let (state, outcomes) = match self.submitter.submit(chunk).await {
            Ok(SubmitResult::Complete(results)) => {
                (ChunkState::Completed, classify_results(chunk, results))
            }
            Ok(SubmitResult::Async(job_id)) => {
                tracing::debug!("Chunk {}/{}: async job {}", index + 1, total, job_id);
                self.await_job(&job_id, chunk).await
            }
            Err(e) => {
                tracing::warn!(
                    "Chunk {}/{}: submission failed, backing off {:?}: {}",
                    index + 1,
                    total,
                    self.settings.error_backoff,
                    e
                );
                self.gate.penalize(self.settings.error_backoff).await;
                (ChunkState::SubmitFailed, fail_all(chunk, &e.to_string()))
            }
        };

        self.gate.complete().await;
        self.finish(index, total, chunk, state, outcomes)
    }

    /// Polls an async job until it completes, fails or the budget runs out
    async fn await_job(&self, job_id: &str, chunk: &[String]) -> (ChunkState, Vec<PathOutcome>) {
        for attempt in 1..=self.settings.max_poll_attempts {
            tokio::time::sleep(self.settings.poll_interval).await;

            match self.submitter.poll_job(job_id).await {
                Ok(JobStatus::InProgress) => {}
                Ok(JobStatus::Complete(results)) => {
                    return (ChunkState::Completed, classify_results(chunk, results));
                }
                Ok(JobStatus::Failed(reason)) => {
                    tracing::warn!("Job {} failed: {}", job_id, reason);
                    return (ChunkState::JobFailed, fail_all(chunk, &reason));
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!("Job {} poll {} failed transiently: {}", job_id, attempt, e);
                }
                Err(e) => {
                    tracing::warn!("Job {} could not be checked: {}", job_id, e);
                    return (ChunkState::JobFailed, fail_all(chunk, &e.to_string()));
                }
            }
        }

        tracing::warn!(
            "Job {} still running after {} polls; marking {} paths as timed out",
            job_id,
            self.settings.max_poll_attempts,
            chunk.len()
        );
        let outcomes = chunk
            .iter()
            .map(|p| PathOutcome::new(p.clone(), ItemOutcome::Timeout))
            .collect();
        (ChunkState::TimedOut, outcomes)
    }

    fn finish(
        &self,
        index: usize,
        total: usize,
        chunk: &[String],
        state: ChunkState,
        outcomes: Vec<PathOutcome>,
    ) -> (ChunkState, Vec<PathOutcome>) {
        let succeeded = outcomes.iter().filter(|o| o.outcome.is_success()).count();

        if state != ChunkState::Skipped {
            tracing::info!(
                "Chunk {}/{}: {:?}, {}/{} paths gone",
                index + 1,
                total,
                state,
                succeeded,
                chunk.len()
            );
        }

        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(ChunkReport {
                index,
                total_chunks: total,
                state,
                paths: chunk.len(),
                succeeded,
            });
        }

        (state, outcomes)
    }
}

/// Maps per-path results onto the submitted paths
///
/// A failure mentioning `not_found` means the path is already gone. Paths
/// without a result are failed with [`MISSING_RESULT`].
pub fn classify_results(chunk: &[String], results: Vec<ItemResult>) -> Vec<PathOutcome> {
    if results.len() != chunk.len() {
        tracing::warn!(
            "Remote returned {} results for {} paths",
            results.len(),
            chunk.len()
        );
    }

    let mut results = results.into_iter();
    chunk
        .iter()
        .map(|path| {
            let outcome = match results.next() {
                Some(ItemResult::Success) => ItemOutcome::Deleted,
                Some(ItemResult::Failure(reason))
                    if reason.to_lowercase().contains("not_found") =>
                {
                    ItemOutcome::AlreadyAbsent
                }
                Some(ItemResult::Failure(reason)) => ItemOutcome::Failed(reason),
                None => ItemOutcome::Failed(MISSING_RESULT.to_string()),
            };
            PathOutcome::new(path.clone(), outcome)
        })
        .collect()
}

fn fail_all(chunk: &[String], reason: &str) -> Vec<PathOutcome> {
    chunk
        .iter()
        .map(|p| PathOutcome::new(p.clone(), ItemOutcome::Failed(reason.to_string())))
        .collect()
}
