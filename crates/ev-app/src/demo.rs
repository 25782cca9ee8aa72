//! Demo mode for the viewer
//! Creates synthetic recordings to drive the pipeline headlessly

use std::f64::consts::TAU;
use std::sync::Arc;
use arrow::array::{ArrayRef, Float32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use anyhow::Result;

use ev_data::{
    EpochChannel, InMemoryAnalogSignalSource, InMemoryEpochSource, InMemorySpikeSource, SpikeTrain,
};

pub const DURATION: f64 = 60.0;
const SAMPLE_RATE: f64 = 1000.0;

/// Four channels of oscillations at different frequencies, built through arrow
pub fn signal_source() -> Result<InMemoryAnalogSignalSource> {
    let length = (DURATION * SAMPLE_RATE) as usize;
    let channels = [("theta", 7.0), ("alpha", 10.0), ("beta", 20.0), ("gamma", 40.0)];

    let fields = channels
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Float32, false))
        .collect::<Vec<_>>();
    let columns = channels
        .iter()
        .enumerate()
        .map(|(c, (_, freq))| {
            let values = (0..length).map(|i| {
                let t = i as f64 / SAMPLE_RATE;
                // Slow envelope so each channel looks different along the recording
                let envelope = 1.0 + 0.5 * (TAU * t / (10.0 + c as f64)).sin();
                (envelope * (TAU * freq * t).sin()) as f32
            });
            Arc::new(Float32Array::from_iter_values(values)) as ArrayRef
        })
        .collect::<Vec<_>>();

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(InMemoryAnalogSignalSource::from_record_batch(&batch, SAMPLE_RATE, 0.0)?)
}

/// Stimulus trials and behavioral states
pub fn epoch_source() -> Result<InMemoryEpochSource> {
    let trials = (0..30).map(|i| i as f64 * 2.0).collect::<Vec<_>>();
    let stimulus = EpochChannel::new(
        "stimulus",
        trials.clone(),
        vec![0.5; trials.len()],
        trials.iter().enumerate().map(|(i, _)| format!("trial {}", i)).collect(),
    )?;

    let state = EpochChannel::new(
        "state",
        vec![0.0, 15.0, 32.5, 47.0],
        vec![15.0, 17.5, 14.5, 13.0],
        ["awake", "nrem", "rem", "awake"].iter().map(|s| s.to_string()).collect(),
    )?;

    Ok(InMemoryEpochSource::new(vec![stimulus, state]))
}

/// Regular-ish spike trains from a deterministic generator
pub fn spike_source() -> Result<InMemorySpikeSource> {
    let trains = (0..3)
        .map(|unit| {
            let rate = 5.0 + unit as f64 * 3.0;
            let mut t = 0.0;
            let mut times = Vec::new();
            let mut k = 0u32;
            while t < DURATION {
                times.push(t);
                k += 1;
                // Jitter the interval so trains do not line up
                t += (1.0 + 0.4 * (k as f64 * 1.7 + unit as f64).sin()) / rate;
            }
            SpikeTrain::new(format!("unit{}", unit), times)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InMemorySpikeSource::new(trains))
}
