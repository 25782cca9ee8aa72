//! Viewer layer: refresh-on-navigation and frame hand-off

mod controller;
mod plot_sink;

pub use controller::{Handled, ViewerController, ViewerError, ViewerId};
pub use plot_sink::PlotSink;

use std::sync::Arc;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use ev_core::ViewerParams;
use ev_data::{AsyncGrabber, DataSource, GrabberNotification};
use ev_render::DrawSink;

/// A viewer bound to one source: its controller, the grabber's notification
/// stream, and the parameters the UI edits.
pub struct Viewer {
    controller: ViewerController<AsyncGrabber>,
    notifications: UnboundedReceiver<GrabberNotification>,
    params: Arc<RwLock<ViewerParams>>,
}

impl Viewer {
    /// Start a grabber for `source` on `handle`, with default parameters
    pub fn spawn(source: Arc<dyn DataSource>, handle: &Handle) -> Self {
        let params = ViewerParams::new(source.nb_channel());
        let (controller, notifications) = ViewerController::spawn(source, handle);
        Self {
            controller,
            notifications,
            params: Arc::new(RwLock::new(params)),
        }
    }

    pub fn controller(&self) -> &ViewerController<AsyncGrabber> {
        &self.controller
    }

    /// Parameters shared with the UI; call `style_changed` after editing
    pub fn params(&self) -> Arc<RwLock<ViewerParams>> {
        Arc::clone(&self.params)
    }

    pub fn navigate(&mut self, t: f64) -> Result<(), ViewerError> {
        let params = self.params.read();
        self.controller.navigate(t, &*params)
    }

    pub fn style_changed(&mut self, sink: &mut dyn DrawSink) -> Result<(), ViewerError> {
        let params = self.params.read();
        self.controller.style_changed(&*params, sink)
    }

    /// Handle every notification already delivered, without waiting
    pub fn poll(&mut self, sink: &mut dyn DrawSink) -> usize {
        let params = self.params.read();
        self.controller.drain(&mut self.notifications, &*params, sink)
    }

    /// Wait for the next notification and handle it
    pub async fn next(&mut self, sink: &mut dyn DrawSink) -> Option<Handled> {
        let notification = self.notifications.recv().await?;
        let params = self.params.read();
        Some(self.controller.handle_notification(notification, &*params, sink))
    }
}
