//! Frame assembly from fetched data

use egui::Color32;
use ev_core::StyleBinding;
use ev_data::{ChannelData, DataSource, EpochChunk, FetchResult, SignalChunk, SpikeChunk};

use crate::{DrawPrimitive, Frame, ViewBounds};

/// Alpha applied to the channel color when filling epochs
pub const EPOCH_FILL_ALPHA: u8 = 130;

/// Height of an epoch box or spike tick, in rows
pub const ROW_HEIGHT: f64 = 0.9;

pub const CURSOR_COLOR: Color32 = Color32::from_rgb(0x00, 0xFF, 0x00);

pub const LABEL_BACKGROUND: Color32 = Color32::from_rgba_premultiplied(90, 90, 90, 180);

/// Build the frame for `result` with the cursor at `cursor`.
///
/// Channels keep their selection order top to bottom: rank 0 gets the highest
/// row. Channels missing from the payload leave their row empty.
pub fn assemble_frame(
    result: &FetchResult,
    cursor: f64,
    style: &dyn StyleBinding,
    source: &dyn DataSource,
) -> Frame {
    let channels = result.channels();
    let count = channels.len();
    let mut primitives = Vec::new();

    for (rank, &channel) in channels.iter().enumerate() {
        let row = (count - rank - 1) as f64;
        let color = style.color(channel);

        match result.channel(channel) {
            Some(ChannelData::Signal(chunk)) => push_trace(&mut primitives, chunk, row, color),
            Some(ChannelData::Epochs(chunk)) => push_epochs(&mut primitives, chunk, row, color),
            Some(ChannelData::Spikes(chunk)) => push_spikes(&mut primitives, chunk, row, color),
            None => tracing::warn!("No data for channel {} in fetch result", channel),
        }

        if style.display_labels() {
            primitives.push(DrawPrimitive::Text {
                position: [result.t_start(), row + 0.45],
                text: format!("{}: {}", channel, source.channel_name(channel)),
                color,
                background: LABEL_BACKGROUND,
            });
        }
    }

    primitives.push(DrawPrimitive::Cursor {
        t: cursor,
        color: CURSOR_COLOR,
    });

    Frame {
        primitives,
        bounds: ViewBounds {
            x_min: result.t_start(),
            x_max: result.t_stop(),
            y_min: 0.0,
            y_max: count as f64,
        },
        background: style.background_color(),
    }
}

/// Trace centered in its row, scaled by the window's peak amplitude
fn push_trace(primitives: &mut Vec<DrawPrimitive>, chunk: &SignalChunk, row: f64, color: Color32) {
    if chunk.is_empty() {
        return;
    }

    let peak = chunk
        .values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |acc, &v| acc.max((v as f64).abs()));
    let half_height = ROW_HEIGHT / 2.0;
    let gain = if peak > 0.0 { half_height / peak } else { 0.0 };
    let center = row + half_height;

    let points = chunk
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| [chunk.sample_time(i), center + v as f64 * gain])
        .collect();

    primitives.push(DrawPrimitive::Line { points, color });
}

fn push_epochs(primitives: &mut Vec<DrawPrimitive>, chunk: &EpochChunk, row: f64, color: Color32) {
    let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), EPOCH_FILL_ALPHA);
    for (onset, duration, _label) in chunk.iter() {
        primitives.push(DrawPrimitive::Rect {
            x: onset,
            y: row,
            width: duration,
            height: ROW_HEIGHT,
            fill,
            border: color,
        });
    }
}

/// One vertical tick per spike
fn push_spikes(primitives: &mut Vec<DrawPrimitive>, chunk: &SpikeChunk, row: f64, color: Color32) {
    for &t in &chunk.times {
        primitives.push(DrawPrimitive::Line {
            points: vec![[t, row], [t, row + ROW_HEIGHT]],
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_core::{TimeWindow, ViewerParams};
    use ev_data::{fetch, EpochChannel, InMemoryAnalogSignalSource, InMemoryEpochSource, InMemorySpikeSource, Query, SpikeTrain};
    use ndarray::Array2;

    fn epoch_source() -> InMemoryEpochSource {
        let first = EpochChannel::new(
            "stim",
            vec![0.0, 5.0],
            vec![2.0, 1.0],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        let second = EpochChannel::new("sleep", vec![3.0], vec![0.5], vec!["rem".to_string()]).unwrap();
        InMemoryEpochSource::new(vec![first, second])
    }

    #[test]
    fn test_epoch_frame_layout() {
        let source = epoch_source();
        let mut params = ViewerParams::new(2);
        let red = Color32::from_rgb(255, 0, 0);
        params.set_color(0, red).unwrap();

        let query = Query::new(TimeWindow::new(1.0, 6.0), vec![0, 1], 2).unwrap();
        let result = fetch(&source, &query).unwrap();
        let frame = assemble_frame(&result, 2.5, &params, &source);

        assert_eq!(frame.count_rects(), 3);
        assert_eq!(frame.count_texts(), 2);
        assert_eq!(frame.count_cursors(), 1);
        assert_eq!(frame.bounds, ViewBounds { x_min: 1.0, x_max: 6.0, y_min: 0.0, y_max: 2.0 });

        // First selected channel sits on the top row
        match &frame.primitives[0] {
            DrawPrimitive::Rect { x, y, width, height, fill, border } => {
                assert_eq!((*x, *y, *width, *height), (0.0, 1.0, 2.0, ROW_HEIGHT));
                assert_eq!(*border, red);
                assert_eq!(*fill, Color32::from_rgba_unmultiplied(255, 0, 0, EPOCH_FILL_ALPHA));
            }
            other => panic!("unexpected primitive {:?}", other),
        }
        match &frame.primitives[2] {
            DrawPrimitive::Text { position, text, .. } => {
                assert_eq!(position[0], 1.0);
                assert!((position[1] - 1.45).abs() < 1e-9);
                assert_eq!(text, "0: stim");
            }
            other => panic!("unexpected primitive {:?}", other),
        }
        assert!(matches!(frame.primitives.last(), Some(DrawPrimitive::Cursor { t, .. }) if *t == 2.5));
    }

    #[test]
    fn test_labels_can_be_hidden() {
        let source = epoch_source();
        let mut params = ViewerParams::new(2);
        params.set_display_labels(false);
        let query = Query::new(TimeWindow::new(1.0, 6.0), vec![1], 2).unwrap();
        let result = fetch(&source, &query).unwrap();
        let frame = assemble_frame(&result, 2.5, &params, &source);
        assert_eq!(frame.count_texts(), 0);
        assert_eq!(frame.count_rects(), 1);
        assert_eq!(frame.bounds.y_max, 1.0);
    }

    #[test]
    fn test_trace_stays_inside_row() {
        let signals = Array2::from_shape_fn((10, 2), |(i, c)| if c == 0 { i as f32 - 5.0 } else { 0.0 });
        let source = InMemoryAnalogSignalSource::new(signals, 1.0, 0.0).unwrap();
        let params = ViewerParams::new(2);
        let query = Query::new(TimeWindow::new(0.0, 10.0), vec![0, 1], 2).unwrap();
        let result = fetch(&source, &query).unwrap();
        let frame = assemble_frame(&result, 3.0, &params, &source);

        assert_eq!(frame.count_lines(), 2);
        for primitive in &frame.primitives {
            if let DrawPrimitive::Line { points, .. } = primitive {
                assert_eq!(points.len(), 10);
                assert_eq!(points[3][0], 3.0);
            }
        }
        // Channel 0 is on row 1, its peak reaches the row edge
        match &frame.primitives[0] {
            DrawPrimitive::Line { points, .. } => {
                let min = points.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
                assert!((min - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected primitive {:?}", other),
        }
        // Flat channel 1 draws at its row center
        match &frame.primitives[2] {
            DrawPrimitive::Line { points, .. } => assert!(points.iter().all(|p| (p[1] - 0.45).abs() < 1e-9)),
            other => panic!("unexpected primitive {:?}", other),
        }
    }

    #[test]
    fn test_spike_ticks() {
        let source = InMemorySpikeSource::new(vec![SpikeTrain::new("u1", vec![0.5, 1.5, 9.0]).unwrap()]);
        let mut params = ViewerParams::new(1);
        params.set_display_labels(false);
        let query = Query::new(TimeWindow::new(0.0, 2.0), vec![0], 1).unwrap();
        let result = fetch(&source, &query).unwrap();
        let frame = assemble_frame(&result, 1.0, &params, &source);
        assert_eq!(frame.count_lines(), 2);
        assert_eq!(
            frame.primitives[0],
            DrawPrimitive::Line { points: vec![[0.5, 0.0], [0.5, ROW_HEIGHT]], color: params.color(0) }
        );
    }

    #[test]
    fn test_empty_selection_still_has_cursor() {
        let source = epoch_source();
        let params = ViewerParams::new(2);
        let query = Query::new(TimeWindow::new(0.0, 1.0), vec![], 2).unwrap();
        let result = fetch(&source, &query).unwrap();
        let frame = assemble_frame(&result, 0.5, &params, &source);
        assert_eq!(frame.primitives.len(), 1);
        assert_eq!(frame.bounds.y_max, 0.0);
    }
}
