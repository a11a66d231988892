//! Fetch, segment and index one repository.

use std::fmt;

use anyhow::Context;
use lode_index::{
    BatchIndexer, IndexError, IndexHandle, IndexReport, IndexStatus, Segmenter, SegmenterConfig,
};
use lode_llm::{EmbeddingProvider, StatusTx};
use lode_source::{Corpus, FetchStats, RemoteTreeSource, RepositoryLocator, TreeFetcher};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// How much of the segmented corpus ended up in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    FullyIndexed,
    PartiallyIndexed { indexed: usize, total: usize },
    NothingIndexed,
}

impl CompletionStatus {
    /// Zero of zero counts as fully indexed.
    #[must_use]
    pub fn from_counts(indexed: usize, total: usize) -> Self {
        if indexed >= total {
            Self::FullyIndexed
        } else if indexed == 0 {
            Self::NothingIndexed
        } else {
            Self::PartiallyIndexed { indexed, total }
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullyIndexed => f.write_str("fully indexed"),
            Self::PartiallyIndexed { indexed, total } => {
                write!(f, "partially indexed: {indexed} of {total} segments")
            }
            Self::NothingIndexed => f.write_str("failed to index anything"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub files: usize,
    pub files_skipped: usize,
    pub fetch: FetchStats,
    pub segments: usize,
    pub dropped_invalid: usize,
    pub dropped_empty: usize,
    pub truncated: usize,
    pub index: IndexReport,
    /// `None` when the first batch never succeeded.
    pub index_status: Option<IndexStatus>,
    pub completion: CompletionStatus,
    /// Error that stopped indexing early, if any.
    pub failure: Option<String>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub corpus: Corpus,
    pub handle: IndexHandle,
    pub report: PipelineReport,
}

pub struct Pipeline<S, P> {
    fetcher: TreeFetcher<S>,
    segmenter: SegmenterConfig,
    indexer: BatchIndexer<P>,
}

impl<S: RemoteTreeSource, P: EmbeddingProvider> Pipeline<S, P> {
    /// Wire a pipeline from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(source: S, provider: P, config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let indexer = BatchIndexer::new(provider, config.indexer.to_indexer_config())
            .context("invalid indexer configuration")?;
        Ok(Self {
            fetcher: TreeFetcher::new(source, config.fetch_config()),
            segmenter: config.segmenter,
            indexer,
        })
    }

    #[must_use]
    pub fn with_status_tx(mut self, tx: StatusTx) -> Self {
        self.indexer = self.indexer.with_status_tx(tx);
        self
    }

    #[must_use]
    pub fn fetcher(&self) -> &TreeFetcher<S> {
        &self.fetcher
    }

    #[must_use]
    pub fn indexer(&self) -> &BatchIndexer<P> {
        &self.indexer
    }

    /// Fetch `locator` and index everything that survives validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be listed or the run is cancelled
    /// while fetching. Indexing failures are reported in
    /// [`PipelineReport::completion`] instead.
    pub async fn run(
        &self,
        locator: &RepositoryLocator,
        cancel: &CancellationToken,
    ) -> anyhow::Result<PipelineOutput> {
        tracing::info!(repo = %locator, "fetching repository tree");
        let corpus = self
            .fetcher
            .fetch(locator, cancel)
            .await
            .with_context(|| format!("failed to fetch {locator}"))?;
        self.index_corpus(corpus, cancel).await
    }

    /// Segment and index an already fetched corpus.
    ///
    /// # Errors
    ///
    /// Returns an error only if the segmenter configuration is invalid.
    pub async fn index_corpus(
        &self,
        corpus: Corpus,
        cancel: &CancellationToken,
    ) -> anyhow::Result<PipelineOutput> {
        let mut segmenter =
            Segmenter::new(self.segmenter).context("invalid segmenter configuration")?;
        let segmentation = segmenter.segment(&corpus);

        let total = segmentation.segments.len();
        let (handle, index, index_status, failure) =
            match self.indexer.index(&segmentation.segments, cancel).await {
                Ok(outcome) => {
                    let failure = match &outcome.status {
                        IndexStatus::Aborted { reason, .. } => Some(reason.clone()),
                        IndexStatus::Cancelled => Some("cancelled".to_owned()),
                        IndexStatus::Completed => None,
                    };
                    (outcome.handle, outcome.report, Some(outcome.status), failure)
                }
                Err(err @ IndexError::IndexBuild { attempts, .. }) => {
                    let index = IndexReport {
                        batches_total: total.div_ceil(self.indexer.config().batch_size),
                        attempts: attempts as usize,
                        segments_total: total,
                        ..IndexReport::default()
                    };
                    (IndexHandle::new(), index, None, Some(err.to_string()))
                }
                Err(err) => return Err(err).context("indexing failed"),
            };

        let completion = CompletionStatus::from_counts(handle.len(), total);
        tracing::info!(%completion, indexed = handle.len(), total, "pipeline finished");

        let report = PipelineReport {
            files: corpus.len(),
            files_skipped: corpus.skipped.len(),
            fetch: corpus.stats.clone(),
            segments: total,
            dropped_invalid: segmentation.dropped_invalid,
            dropped_empty: segmentation.dropped_empty,
            truncated: segmentation.truncated,
            index,
            index_status,
            completion,
            failure,
        };
        Ok(PipelineOutput {
            corpus,
            handle,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lode_llm::MockEmbedder;
    use lode_source::{GitHubSource, Lang, RawFile};

    use super::*;

    fn python_file(path: &str, lines: usize) -> RawFile {
        let body: String = (0..lines).map(|i| format!("v_{i} = {i}\n")).collect();
        RawFile::new(path, Lang::Python, body)
    }

    fn worked_example() -> Corpus {
        Corpus::from_files(vec![
            python_file("a.py", 40),
            python_file("b.py", 120),
            python_file("c.py", 5),
        ])
    }

    fn config(batch_size: usize, max_requests: u64) -> Config {
        let mut config = Config::default();
        config.indexer.batch_size = batch_size;
        config.indexer.max_requests_per_window = max_requests;
        config.indexer.window_seconds = 60;
        config.indexer.retry_base_delay_ms = 10;
        config
    }

    fn pipeline(provider: MockEmbedder, config: &Config) -> Pipeline<GitHubSource, MockEmbedder> {
        Pipeline::new(GitHubSource::new(), provider, config).unwrap()
    }

    #[test]
    fn completion_from_counts() {
        assert_eq!(CompletionStatus::from_counts(0, 0), CompletionStatus::FullyIndexed);
        assert_eq!(CompletionStatus::from_counts(4, 4), CompletionStatus::FullyIndexed);
        assert_eq!(CompletionStatus::from_counts(0, 4), CompletionStatus::NothingIndexed);
        assert_eq!(
            CompletionStatus::from_counts(2, 5),
            CompletionStatus::PartiallyIndexed {
                indexed: 2,
                total: 5
            }
        );
        assert_eq!(
            CompletionStatus::from_counts(2, 5).to_string(),
            "partially indexed: 2 of 5 segments"
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = Config::default();
        config.segmenter.overlap_lines = 50;
        assert!(Pipeline::new(GitHubSource::new(), MockEmbedder::default(), &config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn worked_example_indexes_everything() {
        let pipeline = pipeline(MockEmbedder::default(), &config(2, 1));
        let out = pipeline
            .index_corpus(worked_example(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(out.report.segments >= 3);
        assert_eq!(out.handle.len(), out.report.segments);
        assert_eq!(out.report.completion, CompletionStatus::FullyIndexed);
        assert_eq!(out.report.index_status, Some(IndexStatus::Completed));
        assert_eq!(out.report.files, 3);
        assert_eq!(out.report.index.throttle[0], Duration::from_secs(60));
        assert!(out.report.failure.is_none());

        let paths: Vec<&str> = out.handle.segments().map(|s| s.path()).collect();
        assert_eq!(paths.first(), Some(&"a.py"));
        assert_eq!(paths.last(), Some(&"c.py"));
    }

    #[tokio::test(start_paused = true)]
    async fn later_batch_failure_is_partial() {
        // first call succeeds, second batch fails all three attempts
        let provider = MockEmbedder::default().with_script([false, true, true, true]);
        let pipeline = pipeline(provider, &config(2, 500));
        let out = pipeline
            .index_corpus(worked_example(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.handle.len(), 2);
        assert_eq!(
            out.report.completion,
            CompletionStatus::PartiallyIndexed {
                indexed: 2,
                total: out.report.segments
            }
        );
        assert!(matches!(
            out.report.index_status,
            Some(IndexStatus::Aborted { failed_batch: 2, .. })
        ));
        assert!(out.report.failure.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn first_batch_failure_indexes_nothing() {
        let pipeline = pipeline(MockEmbedder::failing(), &config(2, 500));
        let out = pipeline
            .index_corpus(worked_example(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(out.handle.is_empty());
        assert_eq!(out.report.completion, CompletionStatus::NothingIndexed);
        assert!(out.report.index_status.is_none());
        assert_eq!(out.report.index.attempts, 3);
        assert!(out.report.failure.unwrap().contains("batch 1"));
    }

    #[tokio::test]
    async fn empty_corpus_is_fully_indexed() {
        let provider = MockEmbedder::default();
        let pipeline = pipeline(provider.clone(), &Config::default());
        let out = pipeline
            .index_corpus(Corpus::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.report.completion, CompletionStatus::FullyIndexed);
        assert_eq!(out.report.segments, 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_indexing_keeps_nothing() {
        let pipeline = pipeline(MockEmbedder::default(), &config(2, 500));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = pipeline.index_corpus(worked_example(), &cancel).await.unwrap();

        assert!(out.handle.is_empty());
        assert_eq!(out.report.index_status, Some(IndexStatus::Cancelled));
        assert_eq!(out.report.completion, CompletionStatus::NothingIndexed);
    }
}
