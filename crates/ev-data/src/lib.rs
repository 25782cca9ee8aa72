//! Data sources and off-thread retrieval for the viewer
//!
//! Every source is addressed by time. A `Query` names a window and a channel
//! selection; `fetch` turns it into a `FetchResult`, and `AsyncGrabber` runs
//! fetches on a worker task so the UI never waits on storage.

pub mod grabber;
pub mod memory;
pub mod query;
pub mod sources;

use arrow::error::ArrowError;
use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use grabber::{AsyncGrabber, FetchFailure, GrabberError, GrabberNotification, Submitter};
pub use query::{fetch, FetchResult, Query};
pub use sources::{
    ChannelData, DataSource, EpochChannel, EpochChunk, InMemoryAnalogSignalSource,
    InMemoryEpochSource, InMemorySpikeSource, SignalChunk, SourceKind, SpikeChunk, SpikeTrain,
};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Channel {channel} out of range (nb_channel: {nb_channel})")]
    ChannelOutOfRange { channel: usize, nb_channel: usize },

    #[error("Channel {0} selected more than once")]
    DuplicateChannel(usize),

    #[error("Invalid window: t_start {t_start} is after t_stop {t_stop}")]
    InvalidWindow { t_start: f64, t_stop: f64 },

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}
