//! Fetch requests and their results

use ahash::AHashMap;
use ev_core::TimeWindow;

use crate::sources::{ChannelData, DataSource};
use crate::DataError;

/// A window plus the channels to read, in display order.
///
/// Validated on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    window: TimeWindow,
    channels: Vec<usize>,
}

impl Query {
    /// Fails on a reversed window or a selection outside `[0, nb_channel)`
    pub fn new(window: TimeWindow, channels: Vec<usize>, nb_channel: usize) -> Result<Self, DataError> {
        if !window.is_valid() {
            return Err(DataError::InvalidWindow {
                t_start: window.t_start,
                t_stop: window.t_stop,
            });
        }
        for (i, &channel) in channels.iter().enumerate() {
            if channel >= nb_channel {
                return Err(DataError::ChannelOutOfRange { channel, nb_channel });
            }
            if channels[..i].contains(&channel) {
                return Err(DataError::DuplicateChannel(channel));
            }
        }
        Ok(Self { window, channels })
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn t_start(&self) -> f64 {
        self.window.t_start
    }

    pub fn t_stop(&self) -> f64 {
        self.window.t_stop
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }
}

/// Data for every channel of a query
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub query: Query,
    pub payload: AHashMap<usize, ChannelData>,
}

impl FetchResult {
    pub fn t_start(&self) -> f64 {
        self.query.t_start()
    }

    pub fn t_stop(&self) -> f64 {
        self.query.t_stop()
    }

    pub fn channels(&self) -> &[usize] {
        self.query.channels()
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelData> {
        self.payload.get(&channel)
    }
}

/// Read every selected channel, one after the other
pub fn fetch(source: &dyn DataSource, query: &Query) -> Result<FetchResult, DataError> {
    let mut payload = AHashMap::with_capacity(query.channels.len());
    for &channel in &query.channels {
        let data = source.get_chunk_by_time(channel, query.t_start(), query.t_stop())?;
        payload.insert(channel, data);
    }
    Ok(FetchResult {
        query: query.clone(),
        payload,
    })
}
