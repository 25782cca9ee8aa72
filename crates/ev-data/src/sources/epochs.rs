//! Labeled intervals held in memory

use arrow::array::{Array, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;

use super::{check_channel, ChannelData, DataSource, EpochChunk, SourceKind};
use crate::DataError;

/// One channel of epochs, sorted by onset
#[derive(Debug, Clone)]
pub struct EpochChannel {
    name: String,
    times: Vec<f64>,
    durations: Vec<f64>,
    labels: Vec<String>,
}

impl EpochChannel {
    pub fn new(
        name: impl Into<String>,
        times: Vec<f64>,
        durations: Vec<f64>,
        labels: Vec<String>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        if times.len() != durations.len() || times.len() != labels.len() {
            return Err(DataError::Schema(format!(
                "Epoch channel '{}' has {} times, {} durations and {} labels",
                name,
                times.len(),
                durations.len(),
                labels.len()
            )));
        }
        if let Some(d) = durations.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
            return Err(DataError::Schema(format!(
                "Epoch channel '{}' has invalid duration {}",
                name, d
            )));
        }
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(DataError::Schema(format!(
                "Epoch channel '{}' has invalid onset {}",
                name, t
            )));
        }

        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        Ok(Self {
            times: order.iter().map(|&i| times[i]).collect(),
            durations: order.iter().map(|&i| durations[i]).collect(),
            labels: order.iter().map(|&i| labels[i].clone()).collect(),
            name,
        })
    }

    /// Read `time` and `duration` (Float64) and `label` (Utf8) columns
    pub fn from_record_batch(name: impl Into<String>, batch: &RecordBatch) -> Result<Self, DataError> {
        let times = float_column(batch, "time")?;
        let durations = float_column(batch, "duration")?;
        let labels = batch
            .column_by_name("label")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| DataError::Schema("Missing Utf8 column 'label'".to_string()))?;
        let labels = (0..labels.len())
            .map(|i| if labels.is_null(i) { String::new() } else { labels.value(i).to_string() })
            .collect();

        Self::new(name, times, durations, labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Epochs overlapping `[t_start, t_stop)`.
    ///
    /// A zero-length epoch counts when its onset lies inside the window.
    fn overlapping(&self, t_start: f64, t_stop: f64) -> EpochChunk {
        let mut chunk = EpochChunk::default();
        if !(t_start < t_stop) {
            return chunk;
        }

        // Onsets are sorted, nothing at or after t_stop can overlap
        let end = self.times.partition_point(|&t| t < t_stop);
        for i in 0..end {
            let (onset, duration) = (self.times[i], self.durations[i]);
            let hit = if duration > 0.0 {
                onset + duration > t_start
            } else {
                onset >= t_start
            };
            if hit {
                chunk.times.push(onset);
                chunk.durations.push(duration);
                chunk.labels.push(self.labels[i].clone());
            }
        }
        chunk
    }
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>, DataError> {
    let array = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| DataError::Schema(format!("Missing Float64 column '{}'", name)))?;
    if array.null_count() > 0 {
        return Err(DataError::Schema(format!("Column '{}' contains nulls", name)));
    }
    Ok(array.values().to_vec())
}

/// Epoch table: one list of labeled intervals per channel
#[derive(Debug, Clone)]
pub struct InMemoryEpochSource {
    channels: Vec<EpochChannel>,
    t_start: f64,
    t_stop: f64,
}

impl InMemoryEpochSource {
    /// Bounds are derived so that they enclose every epoch
    pub fn new(channels: Vec<EpochChannel>) -> Self {
        let mut bounds: Option<(f64, f64)> = None;
        for channel in &channels {
            for (&t, &d) in channel.times.iter().zip(&channel.durations) {
                let (lo, hi) = bounds.unwrap_or((t, t + d));
                bounds = Some((lo.min(t), hi.max(t + d)));
            }
        }
        let (t_start, t_stop) = bounds.unwrap_or((0.0, 0.0));

        Self {
            channels,
            t_start,
            t_stop,
        }
    }

    pub fn channel(&self, channel: usize) -> Option<&EpochChannel> {
        self.channels.get(channel)
    }
}

impl DataSource for InMemoryEpochSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Epoch
    }

    fn nb_channel(&self) -> usize {
        self.channels.len()
    }

    fn t_start(&self) -> f64 {
        self.t_start
    }

    fn t_stop(&self) -> f64 {
        self.t_stop
    }

    fn channel_name(&self, channel: usize) -> String {
        self.channels
            .get(channel)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("ch{}", channel))
    }

    fn get_chunk_by_time(
        &self,
        channel: usize,
        t_start: f64,
        t_stop: f64,
    ) -> Result<ChannelData, DataError> {
        check_channel(channel, self.channels.len())?;
        Ok(ChannelData::Epochs(self.channels[channel].overlapping(t_start, t_stop)))
    }
}
