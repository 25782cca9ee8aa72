//! Time-addressable data sources
//!
//! A source is immutable once built and is shared read-only between the UI
//! side and the grabber worker. All variants follow the same out-of-range
//! policy: a window outside the source bounds is clamped and yields whatever
//! overlap exists, possibly nothing. It is never an error.

pub mod analog;
pub mod epochs;
pub mod spikes;

pub use analog::InMemoryAnalogSignalSource;
pub use epochs::{EpochChannel, InMemoryEpochSource};
pub use spikes::{InMemorySpikeSource, SpikeTrain};

use std::fmt;

use crate::DataError;

/// Modality of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    AnalogSignal,
    Epoch,
    Spike,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::AnalogSignal => "AnalogSignal",
            SourceKind::Epoch => "Epoch",
            SourceKind::Spike => "Spike",
        };
        f.write_str(name)
    }
}

/// Samples of one continuous channel over a window
#[derive(Debug, Clone, PartialEq)]
pub struct SignalChunk {
    /// Time of `values[0]`
    pub t_first: f64,
    pub sample_rate: f64,
    pub values: Vec<f32>,
}

impl SignalChunk {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sample_time(&self, i: usize) -> f64 {
        self.t_first + i as f64 / self.sample_rate
    }
}

/// Epochs of one channel overlapping a window, as parallel sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochChunk {
    pub times: Vec<f64>,
    pub durations: Vec<f64>,
    pub labels: Vec<String>,
}

impl EpochChunk {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(onset, duration, label)` triples
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, &str)> + '_ {
        self.times
            .iter()
            .zip(&self.durations)
            .zip(&self.labels)
            .map(|((&t, &d), l)| (t, d, l.as_str()))
    }
}

/// Spike times of one channel inside a window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeChunk {
    pub times: Vec<f64>,
}

/// Data returned for a single channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Signal(SignalChunk),
    Epochs(EpochChunk),
    Spikes(SpikeChunk),
}

impl ChannelData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChannelData::Signal(chunk) => chunk.is_empty(),
            ChannelData::Epochs(chunk) => chunk.is_empty(),
            ChannelData::Spikes(chunk) => chunk.times.is_empty(),
        }
    }
}

/// Trait for data sources
pub trait DataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Number of addressable sub-streams
    fn nb_channel(&self) -> usize;

    fn t_start(&self) -> f64;

    fn t_stop(&self) -> f64;

    /// Display name of a channel
    fn channel_name(&self, channel: usize) -> String {
        format!("ch{}", channel)
    }

    /// Data of `channel` inside `[t_start, t_stop)`.
    ///
    /// Only an unknown channel is an error; windows are clamped.
    fn get_chunk_by_time(
        &self,
        channel: usize,
        t_start: f64,
        t_stop: f64,
    ) -> Result<ChannelData, DataError>;
}

pub(crate) fn check_channel(channel: usize, nb_channel: usize) -> Result<(), DataError> {
    if channel < nb_channel {
        Ok(())
    } else {
        Err(DataError::ChannelOutOfRange { channel, nb_channel })
    }
}

/// Names given explicitly, or `ch{i}` for each channel
pub(crate) fn resolve_names(
    names: Option<Vec<String>>,
    nb_channel: usize,
) -> Result<Vec<String>, DataError> {
    match names {
        Some(names) if names.len() != nb_channel => Err(DataError::Schema(format!(
            "{} channel names given for {} channels",
            names.len(),
            nb_channel
        ))),
        Some(names) => Ok(names),
        None => Ok((0..nb_channel).map(|i| format!("ch{}", i)).collect()),
    }
}
