//! Segmentation and rate-limited batch indexing.
//!
//! [`Segmenter`] cuts a fetched corpus into overlapping line windows that
//! still parse on their own. [`BatchIndexer`] embeds those windows in fixed
//! size batches, throttled by a [`RateWindow`] and retried on failure, into an
//! [`IndexHandle`] that can be searched or saved.

pub mod context;
pub mod error;
pub mod handle;
pub mod indexer;
pub mod rate;
pub mod segmenter;

pub use context::{display_header, embedding_text};
pub use error::{AttemptError, IndexError, Result};
pub use handle::{IndexHandle, IndexedSegment, SearchHit};
pub use indexer::{BatchIndexer, IndexOutcome, IndexReport, IndexStatus, IndexerConfig};
pub use rate::{RateLimit, RateWindow, sleep_for};
pub use segmenter::{Segment, Segmentation, Segmenter, SegmenterConfig, segment};
