//! Off-thread data retrieval
//!
//! `AsyncGrabber` owns one worker task per viewer. Requests go in through an
//! unbounded channel and are served strictly one at a time, so results come
//! back in submission order. The grabber keeps no state about which request
//! is current; discarding stale results is the caller's job.

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::memory::estimate_result_memory;
use crate::query::{fetch, FetchResult, Query};
use crate::sources::DataSource;
use crate::DataError;

/// A fetch that did not produce data
#[derive(Debug)]
pub struct FetchFailure {
    pub query: Query,
    pub error: DataError,
}

/// Message delivered back to the requesting side, one per submission
#[derive(Debug)]
pub enum GrabberNotification {
    Ready(FetchResult),
    Failed(FetchFailure),
}

impl GrabberNotification {
    pub fn query(&self) -> &Query {
        match self {
            GrabberNotification::Ready(result) => &result.query,
            GrabberNotification::Failed(failure) => &failure.query,
        }
    }
}

#[derive(Error, Debug)]
pub enum GrabberError {
    #[error("Data grabber worker has shut down")]
    Closed,
}

/// Anything that accepts fetch requests
pub trait Submitter {
    fn submit(&self, query: Query) -> Result<(), GrabberError>;
}

/// Handle to a worker fetching from one source
pub struct AsyncGrabber {
    requests: mpsc::UnboundedSender<Query>,
    worker: JoinHandle<()>,
}

impl AsyncGrabber {
    /// Start the worker on `handle`.
    ///
    /// Returns the grabber and the receiving end of its notifications.
    pub fn spawn(
        source: Arc<dyn DataSource>,
        handle: &Handle,
    ) -> (Self, mpsc::UnboundedReceiver<GrabberNotification>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let worker = handle.spawn(run_worker(source, request_rx, notify_tx));

        (
            Self {
                requests: request_tx,
                worker,
            },
            notify_rx,
        )
    }

    /// Whether the worker can still take requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed() && !self.worker.is_finished()
    }

    /// Stop accepting requests; the worker drains what is queued then exits
    pub fn shutdown(self) -> JoinHandle<()> {
        drop(self.requests);
        self.worker
    }
}

impl Submitter for AsyncGrabber {
    fn submit(&self, query: Query) -> Result<(), GrabberError> {
        self.requests.send(query).map_err(|_| GrabberError::Closed)
    }
}

async fn run_worker(
    source: Arc<dyn DataSource>,
    mut requests: mpsc::UnboundedReceiver<Query>,
    notifications: mpsc::UnboundedSender<GrabberNotification>,
) {
    tracing::info!(
        "Data grabber started for {} source with {} channels",
        source.kind(),
        source.nb_channel()
    );

    while let Some(query) = requests.recv().await {
        let worker_source = Arc::clone(&source);
        let worker_query = query.clone();

        // Storage access may block; keep it off the async worker threads
        let outcome =
            tokio::task::spawn_blocking(move || fetch(worker_source.as_ref(), &worker_query)).await;

        let notification = match outcome {
            Ok(Ok(result)) => {
                tracing::debug!(
                    "Fetched [{:.3}, {:.3}) for {} channels ({} bytes)",
                    result.t_start(),
                    result.t_stop(),
                    result.channels().len(),
                    estimate_result_memory(&result)
                );
                GrabberNotification::Ready(result)
            }
            Ok(Err(error)) => GrabberNotification::Failed(FetchFailure { query, error }),
            // A panicking source fails this request only
            Err(join_error) => GrabberNotification::Failed(FetchFailure {
                query,
                error: DataError::Join(join_error),
            }),
        };

        if notifications.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped, stopping data grabber");
            break;
        }
    }

    tracing::info!("Data grabber stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ChannelData, InMemoryAnalogSignalSource, SourceKind};
    use ev_core::TimeWindow;
    use ndarray::Array2;

    /// Fails for windows starting before zero, panics past 100s
    struct FlakySource;

    impl DataSource for FlakySource {
        fn kind(&self) -> SourceKind {
            SourceKind::AnalogSignal
        }

        fn nb_channel(&self) -> usize {
            1
        }

        fn t_start(&self) -> f64 {
            0.0
        }

        fn t_stop(&self) -> f64 {
            100.0
        }

        fn get_chunk_by_time(&self, _channel: usize, t_start: f64, _t_stop: f64) -> Result<ChannelData, DataError> {
            if t_start > 100.0 {
                panic!("disk went away");
            }
            if t_start < 0.0 {
                return Err(DataError::Io(std::io::Error::new(std::io::ErrorKind::Other, "read failed")));
            }
            Ok(ChannelData::Spikes(Default::default()))
        }
    }

    fn query(t_start: f64, t_stop: f64, nb_channel: usize) -> Query {
        let channels = (0..nb_channel).collect();
        Query::new(TimeWindow::new(t_start, t_stop), channels, nb_channel).unwrap()
    }

    #[tokio::test]
    async fn test_results_arrive_in_submission_order() {
        let signals = Array2::from_shape_fn((1000, 2), |(i, c)| (i * 2 + c) as f32);
        let source = Arc::new(InMemoryAnalogSignalSource::new(signals, 100.0, 0.0).unwrap());
        let (grabber, mut notifications) = AsyncGrabber::spawn(source, &Handle::current());

        let queries: Vec<Query> = (0..5).map(|i| query(i as f64, i as f64 + 0.5, 2)).collect();
        for q in &queries {
            grabber.submit(q.clone()).unwrap();
        }

        for expected in &queries {
            match notifications.recv().await {
                Some(GrabberNotification::Ready(result)) => {
                    assert_eq!(&result.query, expected);
                    assert_eq!(result.payload.len(), 2);
                }
                other => panic!("unexpected notification {:?}", other),
            }
        }
        grabber.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_identical_requests_yield_identical_payloads() {
        let signals = Array2::from_shape_fn((50, 3), |(i, c)| ((i * 7 + c) % 11) as f32 * 0.1);
        let source = Arc::new(InMemoryAnalogSignalSource::new(signals, 10.0, -1.0).unwrap());
        let (grabber, mut notifications) = AsyncGrabber::spawn(source, &Handle::current());

        let q = query(0.33, 2.71, 3);
        grabber.submit(q.clone()).unwrap();
        grabber.submit(q).unwrap();

        let mut payloads = Vec::new();
        for _ in 0..2 {
            match notifications.recv().await {
                Some(GrabberNotification::Ready(result)) => payloads.push(result.payload),
                other => panic!("unexpected notification {:?}", other),
            }
        }
        assert_eq!(payloads[0], payloads[1]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_worker() {
        let (grabber, mut notifications) = AsyncGrabber::spawn(Arc::new(FlakySource), &Handle::current());

        grabber.submit(query(-5.0, 1.0, 1)).unwrap();
        grabber.submit(query(150.0, 160.0, 1)).unwrap();
        grabber.submit(query(10.0, 20.0, 1)).unwrap();

        match notifications.recv().await {
            Some(GrabberNotification::Failed(failure)) => {
                assert!(matches!(failure.error, DataError::Io(_)));
                assert_eq!(failure.query.t_start(), -5.0);
            }
            other => panic!("expected an I/O failure, got {:?}", other),
        }
        match notifications.recv().await {
            Some(GrabberNotification::Failed(failure)) => {
                assert!(matches!(failure.error, DataError::Join(_)));
            }
            other => panic!("expected a join failure, got {:?}", other),
        }
        match notifications.recv().await {
            Some(GrabberNotification::Ready(result)) => assert_eq!(result.t_start(), 10.0),
            other => panic!("expected data, got {:?}", other),
        }
        assert!(grabber.is_running());
    }

    #[tokio::test]
    async fn test_submit_after_worker_exit_fails() {
        let (grabber, notifications) = AsyncGrabber::spawn(Arc::new(FlakySource), &Handle::current());
        drop(notifications);

        // First request is accepted, then the worker notices nobody listens
        grabber.submit(query(1.0, 2.0, 1)).unwrap();
        for _ in 0..100 {
            if !grabber.is_running() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(matches!(grabber.submit(query(1.0, 2.0, 1)), Err(GrabberError::Closed)));
    }
}
