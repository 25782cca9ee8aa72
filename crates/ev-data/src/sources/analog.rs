//! Continuous signals held in memory

use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use ndarray::{s, Array2};

use super::{check_channel, resolve_names, ChannelData, DataSource, SignalChunk, SourceKind};
use crate::DataError;

/// Fixed-rate signals stored as a `(length, nb_channel)` array
#[derive(Debug, Clone)]
pub struct InMemoryAnalogSignalSource {
    signals: Array2<f32>,
    sample_rate: f64,
    t_start: f64,
    names: Vec<String>,
}

impl InMemoryAnalogSignalSource {
    pub fn new(signals: Array2<f32>, sample_rate: f64, t_start: f64) -> Result<Self, DataError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DataError::Schema(format!("Invalid sample rate {}", sample_rate)));
        }
        if !t_start.is_finite() {
            return Err(DataError::Schema(format!("Invalid t_start {}", t_start)));
        }
        let names = resolve_names(None, signals.ncols())?;
        Ok(Self {
            signals,
            sample_rate,
            t_start,
            names,
        })
    }

    pub fn with_channel_names(mut self, names: Vec<String>) -> Result<Self, DataError> {
        self.names = resolve_names(Some(names), self.signals.ncols())?;
        Ok(self)
    }

    /// Build from a record batch with one numeric column per channel.
    ///
    /// Column names become channel names; nulls become NaN.
    pub fn from_record_batch(
        batch: &RecordBatch,
        sample_rate: f64,
        t_start: f64,
    ) -> Result<Self, DataError> {
        let schema = batch.schema();
        let columns = batch
            .columns()
            .iter()
            .zip(schema.fields())
            .map(|(column, field)| column_as_f32(column, field.name()))
            .collect::<Result<Vec<_>, _>>()?;

        let length = batch.num_rows();
        let signals = Array2::from_shape_fn((length, columns.len()), |(i, c)| columns[c][i]);
        let names = schema.fields().iter().map(|f| f.name().clone()).collect();

        Self::new(signals, sample_rate, t_start)?.with_channel_names(names)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of samples per channel
    pub fn length(&self) -> usize {
        self.signals.nrows()
    }

    /// `floor((t - t_start) * sample_rate)`, unclamped
    pub fn raw_time_to_index(&self, t: f64) -> i64 {
        ((t - self.t_start) * self.sample_rate).floor() as i64
    }

    /// Sample index for time `t`, clamped to `[0, length]`.
    ///
    /// The upper bound is `length` rather than `length - 1` so the result can
    /// be used directly as an exclusive slice end.
    pub fn time_to_index(&self, t: f64) -> usize {
        self.raw_time_to_index(t).clamp(0, self.length() as i64) as usize
    }

    /// Samples `[i_start, i_stop)` of one channel, clamped to the buffer
    pub fn get_chunk(&self, channel: usize, i_start: usize, i_stop: usize) -> Result<Vec<f32>, DataError> {
        check_channel(channel, self.nb_channel())?;
        let i_stop = i_stop.min(self.length());
        if i_start >= i_stop {
            return Ok(Vec::new());
        }
        Ok(self.signals.slice(s![i_start..i_stop, channel]).to_vec())
    }
}

impl DataSource for InMemoryAnalogSignalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::AnalogSignal
    }

    fn nb_channel(&self) -> usize {
        self.signals.ncols()
    }

    fn t_start(&self) -> f64 {
        self.t_start
    }

    fn t_stop(&self) -> f64 {
        self.t_start + self.length() as f64 / self.sample_rate
    }

    fn channel_name(&self, channel: usize) -> String {
        self.names
            .get(channel)
            .cloned()
            .unwrap_or_else(|| format!("ch{}", channel))
    }

    fn get_chunk_by_time(
        &self,
        channel: usize,
        t_start: f64,
        t_stop: f64,
    ) -> Result<ChannelData, DataError> {
        let i_start = self.time_to_index(t_start);
        let i_stop = self.time_to_index(t_stop);
        let values = self.get_chunk(channel, i_start, i_stop)?;
        Ok(ChannelData::Signal(SignalChunk {
            t_first: self.t_start + i_start as f64 / self.sample_rate,
            sample_rate: self.sample_rate,
            values,
        }))
    }
}

fn column_as_f32(column: &ArrayRef, name: &str) -> Result<Vec<f32>, DataError> {
    macro_rules! collect {
        ($array_type:ty) => {
            column
                .as_any()
                .downcast_ref::<$array_type>()
                .map(|array| array.iter().map(|v| v.map_or(f32::NAN, |v| v as f32)).collect())
        };
    }

    let values = match column.data_type() {
        DataType::Float32 => collect!(Float32Array),
        DataType::Float64 => collect!(Float64Array),
        DataType::Int16 => collect!(Int16Array),
        DataType::Int32 => collect!(Int32Array),
        DataType::Int64 => collect!(Int64Array),
        other => {
            return Err(DataError::Schema(format!(
                "Column '{}' has non-numeric type {:?}",
                name, other
            )))
        }
    };
    values.ok_or_else(|| DataError::Schema(format!("Column '{}' could not be read", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use arrow::array::StringArray;
    use arrow::datatypes::{Field, Schema};

    fn ramp_source(length: usize, nb_channel: usize, sample_rate: f64) -> InMemoryAnalogSignalSource {
        let signals = Array2::from_shape_fn((length, nb_channel), |(i, c)| (i + 100 * c) as f32);
        InMemoryAnalogSignalSource::new(signals, sample_rate, 0.0).unwrap()
    }

    #[test]
    fn test_time_to_index() {
        let source = ramp_source(100, 1, 10.0);
        assert_eq!(source.time_to_index(0.0), 0);
        assert_eq!(source.time_to_index(9.95), 99);
        assert_eq!(source.t_stop(), 10.0);
    }

    #[test]
    fn test_time_to_index_clamps() {
        let source = ramp_source(100, 1, 10.0);
        assert_eq!(source.raw_time_to_index(-1.0), -10);
        assert_eq!(source.time_to_index(-1.0), 0);
        assert_eq!(source.time_to_index(50.0), 100);
    }

    #[test]
    fn test_chunk_by_time() {
        let source = ramp_source(10, 2, 1.0);
        match source.get_chunk_by_time(1, 3.8, 7.8).unwrap() {
            ChannelData::Signal(chunk) => {
                assert_eq!(chunk.values, vec![103.0, 104.0, 105.0, 106.0]);
                assert_eq!(chunk.t_first, 3.0);
                assert_eq!(chunk.sample_time(2), 5.0);
            }
            other => panic!("unexpected chunk {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_window_is_empty() {
        let source = ramp_source(10, 1, 1.0);
        for &(t0, t1) in &[(20.0, 30.0), (-30.0, -20.0), (6.0, 2.0)] {
            let chunk = source.get_chunk_by_time(0, t0, t1).unwrap();
            assert!(chunk.is_empty());
        }
        // Partial overlap keeps what exists
        match source.get_chunk_by_time(0, -5.0, 2.0).unwrap() {
            ChannelData::Signal(chunk) => assert_eq!(chunk.values, vec![0.0, 1.0]),
            other => panic!("unexpected chunk {:?}", other),
        }
    }

    #[test]
    fn test_unknown_channel() {
        let source = ramp_source(10, 2, 1.0);
        let err = source.get_chunk_by_time(2, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, DataError::ChannelOutOfRange { channel: 2, nb_channel: 2 }));
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(InMemoryAnalogSignalSource::new(Array2::zeros((4, 1)), 0.0, 0.0).is_err());
    }

    #[test]
    fn test_from_record_batch() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("lfp", DataType::Float64, true),
            Field::new("emg", DataType::Int16, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(0.5), None, Some(1.5)])),
                Arc::new(Int16Array::from(vec![1, 2, 3])),
            ],
        )
        .unwrap();

        let source = InMemoryAnalogSignalSource::from_record_batch(&batch, 2.0, 1.0).unwrap();
        assert_eq!(source.nb_channel(), 2);
        assert_eq!(source.length(), 3);
        assert_eq!(source.t_stop(), 2.5);
        assert_eq!(source.channel_name(1), "emg");
        assert_eq!(source.get_chunk(1, 0, 3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(source.get_chunk(0, 1, 2).unwrap()[0].is_nan());
    }

    #[test]
    fn test_from_record_batch_rejects_text() {
        let schema = Arc::new(Schema::new(vec![Field::new("label", DataType::Utf8, false)]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["a"]))]).unwrap();
        assert!(matches!(
            InMemoryAnalogSignalSource::from_record_batch(&batch, 1.0, 0.0),
            Err(DataError::Schema(_))
        ));
    }
}
