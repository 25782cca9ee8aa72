//! Viewer controller: navigation in, frames out
//!
//! The controller only remembers the cursor, the parameters of its latest
//! request and the last result it drew. Results arrive asynchronously; any
//! result that does not match the latest request is dropped, which is how
//! rapid navigation is absorbed without cancelling in-flight fetches.

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use ev_core::{StyleBinding, TimeWindow};
use ev_data::{
    AsyncGrabber, DataError, DataSource, FetchFailure, FetchResult, GrabberError,
    GrabberNotification, Query, Submitter,
};
use ev_render::{assemble_frame, DrawSink};

/// Unique identifier for a viewer
pub type ViewerId = Uuid;

#[derive(Error, Debug)]
pub enum ViewerError {
    /// The style asks for channels the source does not have
    #[error("Invalid channel selection: {0}")]
    Configuration(DataError),

    #[error(transparent)]
    Grabber(#[from] GrabberError),
}

/// What happened to a delivered notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Rendered,
    /// Fetch failed; the previous frame stays on screen
    Failed,
    /// Belonged to a superseded request
    Stale,
}

pub struct ViewerController<S: Submitter = AsyncGrabber> {
    id: ViewerId,
    source: Arc<dyn DataSource>,
    grabber: S,
    cursor: Option<f64>,
    expected: Option<Query>,
    /// Last drawn result, reused when only styling changes
    cache: Option<FetchResult>,
    last_failure: Option<FetchFailure>,
    frames_rendered: u64,
}

impl ViewerController<AsyncGrabber> {
    /// Controller with its own grabber worker running on `handle`
    pub fn spawn(
        source: Arc<dyn DataSource>,
        handle: &Handle,
    ) -> (Self, UnboundedReceiver<GrabberNotification>) {
        let (grabber, notifications) = AsyncGrabber::spawn(Arc::clone(&source), handle);
        (Self::new(source, grabber), notifications)
    }
}

impl<S: Submitter> ViewerController<S> {
    pub fn new(source: Arc<dyn DataSource>, grabber: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            grabber,
            cursor: None,
            expected: None,
            cache: None,
            last_failure: None,
            frames_rendered: 0,
        }
    }

    pub fn id(&self) -> ViewerId {
        self.id
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }

    /// Parameters of the most recent submission
    pub fn expected_query(&self) -> Option<&Query> {
        self.expected.as_ref()
    }

    pub fn cached_result(&self) -> Option<&FetchResult> {
        self.cache.as_ref()
    }

    /// Failure of the current request, if it failed
    pub fn last_failure(&self) -> Option<&FetchFailure> {
        self.last_failure.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// A request was submitted and has not been drawn or failed yet
    pub fn is_pending(&self) -> bool {
        match &self.expected {
            None => false,
            Some(expected) => {
                self.cache.as_ref().map(|c| &c.query) != Some(expected)
                    && self.last_failure.as_ref().map(|f| &f.query) != Some(expected)
            }
        }
    }

    fn query_for(&self, t: f64, style: &dyn StyleBinding) -> Result<Query, ViewerError> {
        let window = TimeWindow::around(t, style.xsize(), style.anchor_ratio());
        Query::new(window, style.visible_channels(), self.source.nb_channel())
            .map_err(ViewerError::Configuration)
    }

    /// Move the cursor to `t` and request the matching window.
    ///
    /// Nothing is drawn here; the frame follows when the result arrives.
    pub fn navigate(&mut self, t: f64, style: &dyn StyleBinding) -> Result<(), ViewerError> {
        let query = self.query_for(t, style)?;
        self.grabber.submit(query.clone())?;

        tracing::debug!(
            viewer = %self.id,
            "Requested [{:.3}, {:.3}) for channels {:?}",
            query.t_start(),
            query.t_stop(),
            query.channels()
        );

        if self.cache.as_ref().map_or(false, |c| c.query != query) {
            self.cache = None;
        }
        self.cursor = Some(t);
        self.expected = Some(query);
        Ok(())
    }

    pub fn handle_notification(
        &mut self,
        notification: GrabberNotification,
        style: &dyn StyleBinding,
        sink: &mut dyn DrawSink,
    ) -> Handled {
        match notification {
            GrabberNotification::Ready(result) => self.on_result(result, style, sink),
            GrabberNotification::Failed(failure) => self.on_failure(failure),
        }
    }

    /// Draw `result` if it answers the latest request, drop it otherwise
    pub fn on_result(
        &mut self,
        result: FetchResult,
        style: &dyn StyleBinding,
        sink: &mut dyn DrawSink,
    ) -> Handled {
        let cursor = match (self.cursor, &self.expected) {
            (Some(cursor), Some(expected)) if *expected == result.query => cursor,
            _ => {
                tracing::debug!(
                    viewer = %self.id,
                    "Discarding stale result for [{:.3}, {:.3})",
                    result.t_start(),
                    result.t_stop()
                );
                return Handled::Stale;
            }
        };

        let frame = assemble_frame(&result, cursor, style, self.source.as_ref());
        frame.paint(sink);
        self.frames_rendered += 1;
        self.last_failure = None;
        self.cache = Some(result);
        Handled::Rendered
    }

    /// Record a failed fetch; the frame on screen is left untouched
    pub fn on_failure(&mut self, failure: FetchFailure) -> Handled {
        if self.expected.as_ref() != Some(&failure.query) {
            tracing::debug!(viewer = %self.id, "Ignoring failure of a superseded request: {}", failure.error);
            return Handled::Stale;
        }

        tracing::error!(
            viewer = %self.id,
            t_start = failure.query.t_start(),
            t_stop = failure.query.t_stop(),
            "Fetch failed, keeping previous frame: {}",
            failure.error
        );
        self.last_failure = Some(failure);
        Handled::Failed
    }

    /// Re-render after a style edit.
    ///
    /// The cached result is reused when the edit leaves the query unchanged
    /// (colors, labels, background); otherwise the current cursor is fetched
    /// again. Before the first navigation there is nothing to do.
    pub fn style_changed(
        &mut self,
        style: &dyn StyleBinding,
        sink: &mut dyn DrawSink,
    ) -> Result<(), ViewerError> {
        let Some(t) = self.cursor else {
            return Ok(());
        };

        let query = self.query_for(t, style)?;
        if let Some(cached) = &self.cache {
            if cached.query == query {
                let frame = assemble_frame(cached, t, style, self.source.as_ref());
                frame.paint(sink);
                self.frames_rendered += 1;
                return Ok(());
            }
        }

        self.navigate(t, style)
    }

    /// Handle every notification already waiting in `notifications`
    pub fn drain(
        &mut self,
        notifications: &mut UnboundedReceiver<GrabberNotification>,
        style: &dyn StyleBinding,
        sink: &mut dyn DrawSink,
    ) -> usize {
        let mut handled = 0;
        loop {
            match notifications.try_recv() {
                Ok(notification) => {
                    self.handle_notification(notification, style, sink);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!(viewer = %self.id, "Data grabber is gone");
                    break;
                }
            }
        }
        handled
    }
}
