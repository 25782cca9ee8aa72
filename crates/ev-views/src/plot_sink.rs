//! Drawing sink backed by egui_plot

use egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Line, Plot, PlotBounds, PlotPoint, PlotPoints, PlotUi, Polygon, Text, VLine};

use ev_render::{DrawPrimitive, DrawSink, ViewBounds};

/// Keeps the latest frame and replays it into a plot every UI pass
#[derive(Debug, Default)]
pub struct PlotSink {
    primitives: Vec<DrawPrimitive>,
    bounds: Option<ViewBounds>,
    background: Option<Color32>,
}

impl PlotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &[DrawPrimitive] {
        &self.primitives
    }

    pub fn bounds(&self) -> Option<ViewBounds> {
        self.bounds
    }

    /// Draw the stored frame inside its background
    pub fn ui(&self, ui: &mut Ui, id_source: &str) {
        let background = self.background.unwrap_or(Color32::BLACK);
        egui::Frame::none().fill(background).show(ui, |ui| {
            Plot::new(id_source)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| self.show(plot_ui));
        });
    }

    /// Replay the stored primitives into an open plot
    pub fn show(&self, plot_ui: &mut PlotUi) {
        for primitive in &self.primitives {
            match primitive {
                DrawPrimitive::Rect { x, y, width, height, fill, border } => {
                    let corners = vec![
                        [*x, *y],
                        [*x + *width, *y],
                        [*x + *width, *y + *height],
                        [*x, *y + *height],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(corners))
                            .fill_color(*fill)
                            .stroke(Stroke::new(1.0, *border)),
                    );
                }
                DrawPrimitive::Line { points, color } => {
                    plot_ui.line(Line::new(PlotPoints::new(points.clone())).color(*color));
                }
                DrawPrimitive::Text { position, text, color, background } => {
                    let label = RichText::new(text.as_str()).background_color(*background);
                    plot_ui.text(
                        Text::new(PlotPoint::new(position[0], position[1]), label)
                            .color(*color)
                            .anchor(Align2::LEFT_CENTER),
                    );
                }
                DrawPrimitive::Cursor { t, color } => {
                    plot_ui.vline(VLine::new(*t).color(*color));
                }
            }
        }

        if let Some(bounds) = self.bounds {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                [bounds.x_min, bounds.y_min],
                [bounds.x_max, bounds.y_max],
            ));
        }
    }
}

impl DrawSink for PlotSink {
    fn clear(&mut self) {
        self.primitives.clear();
        self.bounds = None;
    }

    fn set_background(&mut self, color: Color32) {
        self.background = Some(color);
    }

    fn draw(&mut self, primitive: &DrawPrimitive) {
        self.primitives.push(primitive.clone());
    }

    fn set_view_bounds(&mut self, bounds: ViewBounds) {
        self.bounds = Some(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_render::{Frame, CURSOR_COLOR};

    fn sample_frame() -> Frame {
        Frame {
            primitives: vec![
                DrawPrimitive::Rect {
                    x: 1.0,
                    y: 0.0,
                    width: 2.0,
                    height: 0.9,
                    fill: Color32::from_rgba_unmultiplied(85, 255, 0, 130),
                    border: Color32::from_rgb(85, 255, 0),
                },
                DrawPrimitive::Text {
                    position: [0.0, 0.45],
                    text: "0: stim".to_string(),
                    color: Color32::from_rgb(85, 255, 0),
                    background: Color32::GRAY,
                },
                DrawPrimitive::Cursor { t: 1.5, color: CURSOR_COLOR },
            ],
            bounds: ViewBounds { x_min: 0.0, x_max: 3.0, y_min: 0.0, y_max: 1.0 },
            background: Color32::BLACK,
        }
    }

    #[test]
    fn test_repaint_replaces_previous_frame() {
        let mut sink = PlotSink::new();
        let frame = sample_frame();
        frame.paint(&mut sink);
        frame.paint(&mut sink);
        assert_eq!(sink.primitives().len(), 3);
        assert_eq!(sink.bounds(), Some(frame.bounds));
    }

    #[test]
    fn test_ui_pass_runs_headless() {
        let mut sink = PlotSink::new();
        sample_frame().paint(&mut sink);

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| sink.ui(ui, "epochs"));
        });
    }
}
