//! Memory accounting for fetched payloads

use crate::query::FetchResult;
use crate::sources::ChannelData;

/// Estimate the heap memory held by one channel's data
pub fn estimate_channel_memory(data: &ChannelData) -> usize {
    match data {
        ChannelData::Signal(chunk) => chunk.values.capacity() * std::mem::size_of::<f32>(),
        ChannelData::Epochs(chunk) => {
            let numbers = (chunk.times.capacity() + chunk.durations.capacity()) * std::mem::size_of::<f64>();
            // String headers plus their text
            let labels = chunk.labels.capacity() * std::mem::size_of::<String>()
                + chunk.labels.iter().map(|l| l.capacity()).sum::<usize>();
            numbers + labels
        }
        ChannelData::Spikes(chunk) => chunk.times.capacity() * std::mem::size_of::<f64>(),
    }
}

/// Estimate memory usage of a fetch result
pub fn estimate_result_memory(result: &FetchResult) -> usize {
    let mut total_bytes = std::mem::size_of::<FetchResult>();

    for data in result.payload.values() {
        total_bytes += std::mem::size_of::<(usize, ChannelData)>();
        total_bytes += estimate_channel_memory(data);
    }

    total_bytes += result.channels().len() * std::mem::size_of::<usize>();
    total_bytes
}
