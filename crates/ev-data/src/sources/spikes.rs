//! Spike trains held in memory

use super::{check_channel, ChannelData, DataSource, SourceKind, SpikeChunk};
use crate::DataError;

/// Sorted spike times of one unit
#[derive(Debug, Clone)]
pub struct SpikeTrain {
    name: String,
    times: Vec<f64>,
}

impl SpikeTrain {
    pub fn new(name: impl Into<String>, mut times: Vec<f64>) -> Result<Self, DataError> {
        let name = name.into();
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(DataError::Schema(format!(
                "Spike train '{}' has invalid time {}",
                name, t
            )));
        }
        times.sort_by(f64::total_cmp);
        Ok(Self { name, times })
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
}

/// One spike train per channel
#[derive(Debug, Clone)]
pub struct InMemorySpikeSource {
    trains: Vec<SpikeTrain>,
    t_start: f64,
    t_stop: f64,
}

impl InMemorySpikeSource {
    pub fn new(trains: Vec<SpikeTrain>) -> Self {
        let t_start = trains
            .iter()
            .filter_map(|s| s.times.first().copied())
            .reduce(f64::min)
            .unwrap_or(0.0);
        let t_stop = trains
            .iter()
            .filter_map(|s| s.times.last().copied())
            .reduce(f64::max)
            .unwrap_or(0.0);

        Self {
            trains,
            t_start,
            t_stop,
        }
    }
}

impl DataSource for InMemorySpikeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Spike
    }

    fn nb_channel(&self) -> usize {
        self.trains.len()
    }

    fn t_start(&self) -> f64 {
        self.t_start
    }

    fn t_stop(&self) -> f64 {
        self.t_stop
    }

    fn channel_name(&self, channel: usize) -> String {
        self.trains
            .get(channel)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("ch{}", channel))
    }

    fn get_chunk_by_time(
        &self,
        channel: usize,
        t_start: f64,
        t_stop: f64,
    ) -> Result<ChannelData, DataError> {
        check_channel(channel, self.trains.len())?;
        let times = &self.trains[channel].times;
        let lo = times.partition_point(|&t| t < t_start);
        let hi = times.partition_point(|&t| t < t_stop);
        let times = if lo < hi { times[lo..hi].to_vec() } else { Vec::new() };
        Ok(ChannelData::Spikes(SpikeChunk { times }))
    }
}
