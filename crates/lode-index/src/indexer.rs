//! Rate-limited, retrying batch embedding: segments → [`IndexHandle`].
//!
//! Batches are embedded strictly in order. Each batch gets `retry_limit`
//! attempts. If the first batch never succeeds the run fails with
//! [`IndexError::IndexBuild`]; a later batch that never succeeds stops the run
//! and the handle built so far is returned with [`IndexStatus::Aborted`].

use std::time::Duration;

use lode_llm::{EmbeddingProvider, StatusTx};
use tokio_util::sync::CancellationToken;

use crate::context::embedding_text;
use crate::error::{AttemptError, IndexError, Result};
use crate::handle::IndexHandle;
use crate::rate::{RateLimit, RateWindow};
use crate::segmenter::Segment;

/// Indexer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Segments per downstream call (default: 500).
    pub batch_size: usize,
    pub rate_limit: RateLimit,
    /// Attempts per batch, including the first (default: 3).
    pub retry_limit: u32,
    /// Delay before the second attempt, doubled for each further one.
    pub retry_base_delay: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            rate_limit: RateLimit::default(),
            retry_limit: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl IndexerConfig {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] for zero batch size, request
    /// budget or retry limit.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IndexError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.rate_limit.max_requests_per_window == 0 {
            return Err(IndexError::InvalidConfig(
                "max_requests_per_window must be > 0".into(),
            ));
        }
        if self.retry_limit == 0 {
            return Err(IndexError::InvalidConfig("retry_limit must be > 0".into()));
        }
        Ok(())
    }
}

/// Terminal state of an indexing run that produced a usable handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// Every batch was indexed.
    Completed,
    /// Batch `failed_batch` (1-based) exhausted its retries; later batches
    /// were not attempted.
    Aborted { failed_batch: usize, reason: String },
    /// The cancellation token fired between batches.
    Cancelled,
}

/// Summary of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub attempts: usize,
    pub segments_total: usize,
    pub segments_indexed: usize,
    /// Delay computed before each batch after the first.
    pub throttle: Vec<Duration>,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub struct IndexOutcome {
    pub handle: IndexHandle,
    pub status: IndexStatus,
    pub report: IndexReport,
}

impl IndexOutcome {
    /// Whether every segment made it into the handle.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Completed
            && self.report.segments_indexed == self.report.segments_total
    }
}

enum BatchFailure {
    Exhausted { attempts: u32, error: AttemptError },
    Cancelled,
}

pub struct BatchIndexer<P> {
    provider: P,
    config: IndexerConfig,
    status_tx: Option<StatusTx>,
}

impl<P: EmbeddingProvider> BatchIndexer<P> {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] if `config` is out of range.
    pub fn new(provider: P, config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            config,
            status_tx: None,
        })
    }

    #[must_use]
    pub fn with_status_tx(mut self, tx: StatusTx) -> Self {
        self.status_tx = Some(tx);
        self
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    fn emit_status(&self, msg: impl Into<String>) {
        if let Some(tx) = &self.status_tx {
            let _ = tx.send(msg.into());
        }
    }

    /// Embed `segments` batch by batch into a fresh [`IndexHandle`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::IndexBuild`] only when the first batch fails
    /// every attempt. Later failures are reported through
    /// [`IndexStatus::Aborted`] together with the partial handle.
    pub async fn index(
        &self,
        segments: &[Segment],
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome> {
        let start = std::time::Instant::now();
        let mut window = RateWindow::new(self.config.rate_limit);
        let mut handle = IndexHandle::new();
        let batches: Vec<&[Segment]> = segments.chunks(self.config.batch_size).collect();
        let total = batches.len();
        let mut report = IndexReport {
            batches_total: total,
            segments_total: segments.len(),
            ..IndexReport::default()
        };

        tracing::info!(
            provider = self.provider.name(),
            segments = segments.len(),
            batches = total,
            "indexing started"
        );

        let mut status = IndexStatus::Completed;
        for (i, batch) in batches.into_iter().enumerate() {
            let number = i + 1;

            if i > 0 {
                let delay = window.sleep_duration();
                report.throttle.push(delay);
                if !delay.is_zero() {
                    tracing::info!(
                        batch = number,
                        requests = window.requests_made(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "throttling before next batch"
                    );
                    self.emit_status(format!(
                        "throttling {:.1}s before batch {number}/{total}",
                        delay.as_secs_f64()
                    ));
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            status = IndexStatus::Cancelled;
                            break;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }

            match self.submit(batch, number, &mut handle, &mut report, cancel).await {
                Ok(()) => {
                    window.record_request();
                    report.batches_succeeded += 1;
                    report.segments_indexed += batch.len();
                    tracing::info!(
                        batch = number,
                        progress = format_args!("{number}/{total}"),
                        indexed = report.segments_indexed,
                        "batch indexed"
                    );
                    self.emit_status(format!("indexed batch {number}/{total}"));
                }
                Err(BatchFailure::Cancelled) => {
                    status = IndexStatus::Cancelled;
                    break;
                }
                Err(BatchFailure::Exhausted { attempts, error }) if i == 0 => {
                    tracing::error!(batch = number, attempts, %error, "first batch failed, nothing indexed");
                    return Err(IndexError::IndexBuild {
                        batch: number,
                        attempts,
                        source: error,
                    });
                }
                Err(BatchFailure::Exhausted { attempts, error }) => {
                    tracing::warn!(
                        batch = number,
                        attempts,
                        %error,
                        indexed = report.segments_indexed,
                        "batch failed, stopping with a partial index"
                    );
                    status = IndexStatus::Aborted {
                        failed_batch: number,
                        reason: error.to_string(),
                    };
                    break;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        if status == IndexStatus::Cancelled {
            tracing::warn!(indexed = report.segments_indexed, "indexing cancelled");
        }
        tracing::info!(
            indexed = report.segments_indexed,
            total = report.segments_total,
            status = ?status,
            duration_ms = report.duration_ms,
            "indexing finished"
        );
        Ok(IndexOutcome {
            handle,
            status,
            report,
        })
    }

    async fn submit(
        &self,
        batch: &[Segment],
        number: usize,
        handle: &mut IndexHandle,
        report: &mut IndexReport,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), BatchFailure> {
        let texts: Vec<String> = batch.iter().map(embedding_text).collect();
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(BatchFailure::Cancelled);
            }
            attempt += 1;
            report.attempts += 1;

            let error = match self.provider.embed_batch(&texts).await {
                Ok(vectors) => match handle.append_batch(batch, vectors) {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                },
                Err(e) => AttemptError::from(e),
            };

            if attempt >= self.config.retry_limit {
                return Err(BatchFailure::Exhausted { attempts: attempt, error });
            }

            let delay = self
                .config
                .retry_base_delay
                .saturating_mul(1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX));
            tracing::warn!(
                batch = number,
                attempt,
                retry_limit = self.config.retry_limit,
                %error,
                "batch attempt failed, retrying"
            );
            self.emit_status(format!(
                "batch {number} failed ({attempt}/{}), retrying",
                self.config.retry_limit
            ));
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(BatchFailure::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
