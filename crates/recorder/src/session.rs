//! Tracking sessions.
//!
//! While a route is recorded, one spawned task owns the [`PointBuffer`], the
//! flush timer and the uploader. [`Tracker`] talks to it over a channel, so
//! buffer mutations never interleave: a sample sent during an upload waits
//! until that upload has finished or been requeued.

use std::{sync::Arc, time::Duration};

use rides::{models::GpsPoint, trip_summary::TrackMetric, types::MAX_BATCH_POINTS};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    buffer::{Admission, PointBuffer},
    config::TrackerConfig,
    stats::{LiveMetric, LiveStats},
    uploader::PointUploader,
};

const COMMAND_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("route {0} is already being recorded")]
    AlreadyActive(Uuid),
    #[error("no route is being recorded")]
    NotActive,
    #[error("tracking session ended unexpectedly")]
    SessionClosed,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub route_id: Uuid,
    /// Samples delivered in successful uploads.
    pub uploaded_points: usize,
    /// Samples the server reported as stored.
    pub stored_points: usize,
    pub failed_flushes: usize,
    /// Samples still buffered after the final flush failed.
    pub lost_points: usize,
    pub stats: LiveStats,
}

enum Command {
    Record(GpsPoint),
    Buffered(oneshot::Sender<usize>),
    Stop,
}

struct ActiveSession {
    route_id: Uuid,
    commands: mpsc::Sender<Command>,
    stats: watch::Receiver<LiveStats>,
    task: JoinHandle<SessionReport>,
}

/// Records at most one route at a time.
pub struct Tracker<U: ?Sized> {
    uploader: Arc<U>,
    config: TrackerConfig,
    active: Option<ActiveSession>,
}

impl<U> Tracker<U>
where
    U: PointUploader + ?Sized + 'static,
{
    pub fn new(uploader: Arc<U>, config: TrackerConfig) -> Self {
        Self {
            uploader,
            config,
            active: None,
        }
    }

    /// Begins recording `route_id` with an empty buffer and a fresh flush timer.
    pub fn start(&mut self, route_id: Uuid) -> Result<(), TrackerError> {
        if let Some(active) = &self.active {
            return Err(TrackerError::AlreadyActive(active.route_id));
        }

        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let (stats_tx, stats) = watch::channel(LiveStats::default());
        let session = Session {
            route_id,
            uploader: Arc::clone(&self.uploader),
            buffer: PointBuffer::new(self.config.accuracy_filter_m),
            max_batch_points: self.config.max_batch_points,
            metric: LiveMetric::default(),
            stats: stats_tx,
            uploaded_points: 0,
            stored_points: 0,
            failed_flushes: 0,
        };
        let task = tokio::spawn(session.run(receiver, self.config.flush_interval));

        info!(%route_id, "Tracking started");
        self.active = Some(ActiveSession {
            route_id,
            commands,
            stats,
            task,
        });
        Ok(())
    }

    /// Hands a sample to the active session. Samples recorded while idle are dropped.
    pub async fn record(&self, point: GpsPoint) -> Result<(), TrackerError> {
        let Some(active) = &self.active else {
            debug!("No active route, discarding sample");
            return Ok(());
        };
        active
            .commands
            .send(Command::Record(point))
            .await
            .map_err(|_| TrackerError::SessionClosed)
    }

    /// Number of samples waiting for upload, once every earlier command is handled.
    pub async fn buffered(&self) -> Result<usize, TrackerError> {
        let active = self.active.as_ref().ok_or(TrackerError::NotActive)?;
        let (reply, response) = oneshot::channel();
        active
            .commands
            .send(Command::Buffered(reply))
            .await
            .map_err(|_| TrackerError::SessionClosed)?;
        response.await.map_err(|_| TrackerError::SessionClosed)
    }

    pub fn live_stats(&self) -> Option<LiveStats> {
        self.active
            .as_ref()
            .map(|active| active.stats.borrow().clone())
    }

    pub fn route_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|active| active.route_id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Makes one last flush attempt and ends the session.
    ///
    /// An upload already in flight is not cancelled. Whatever the final flush
    /// fails to deliver is dropped and counted in [`SessionReport::lost_points`].
    pub async fn stop(&mut self) -> Result<SessionReport, TrackerError> {
        let active = self.active.take().ok_or(TrackerError::NotActive)?;

        // A closed channel means the task already ended; joining still yields its report.
        let _ = active.commands.send(Command::Stop).await;
        let report = active
            .task
            .await
            .map_err(|_| TrackerError::SessionClosed)?;

        info!(
            route_id = %report.route_id,
            uploaded = report.uploaded_points,
            lost = report.lost_points,
            "Tracking stopped"
        );
        Ok(report)
    }
}

struct Session<U: ?Sized> {
    route_id: Uuid,
    uploader: Arc<U>,
    buffer: PointBuffer,
    max_batch_points: usize,
    metric: LiveMetric,
    stats: watch::Sender<LiveStats>,
    uploaded_points: usize,
    stored_points: usize,
    failed_flushes: usize,
}

impl<U> Session<U>
where
    U: PointUploader + ?Sized,
{
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, period: Duration) -> SessionReport {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Record(point)) => self.record(point).await,
                    Some(Command::Buffered(reply)) => {
                        let _ = reply.send(self.buffer.len());
                    }
                    Some(Command::Stop) | None => break,
                },
                _ = ticker.tick() => self.flush().await,
            }
        }

        self.finish().await
    }

    async fn record(&mut self, point: GpsPoint) {
        match self.buffer.push(point) {
            Admission::Buffered => {
                if let Some(point) = self.buffer.points().last() {
                    self.metric.next_point(point);
                }
                self.stats.send_replace(self.metric.current().clone());

                if self.buffer.len() >= self.max_batch_points {
                    self.flush().await;
                }
            }
            Admission::Invalid(errors) => {
                warn!(route_id = %self.route_id, "Rejected invalid sample: {errors}");
            }
            Admission::Inaccurate(accuracy) => {
                debug!(route_id = %self.route_id, accuracy, "Discarded inaccurate sample");
            }
        }
    }

    /// Uploads the buffer in server-sized batches, oldest first.
    ///
    /// The first failed batch and everything after it go back to the front of
    /// the buffer, so a backlog larger than one batch drains over later flushes.
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let mut snapshot = self.buffer.take_snapshot();
        let mut sent = 0;
        while sent < snapshot.len() {
            let end = (sent + MAX_BATCH_POINTS).min(snapshot.len());
            let batch = &snapshot[sent..end];
            match self.uploader.upload(self.route_id, batch).await {
                Ok(response) => {
                    self.uploaded_points += batch.len();
                    self.stored_points += response.stored;
                    debug!(
                        route_id = %self.route_id,
                        received = response.received,
                        stored = response.stored,
                        "Flushed point batch"
                    );
                    sent = end;
                }
                Err(e) => {
                    self.failed_flushes += 1;
                    let unsent = snapshot.split_off(sent);
                    warn!(
                        route_id = %self.route_id,
                        points = unsent.len(),
                        "Point upload failed, requeueing: {e}"
                    );
                    self.buffer.requeue_front(unsent);
                    return;
                }
            }
        }
    }

    async fn finish(mut self) -> SessionReport {
        self.flush().await;

        let lost_points = self.buffer.len();
        if lost_points > 0 {
            warn!(
                route_id = %self.route_id,
                lost_points,
                "Final flush failed, unsent points are dropped"
            );
        }

        SessionReport {
            route_id: self.route_id,
            uploaded_points: self.uploaded_points,
            stored_points: self.stored_points,
            failed_flushes: self.failed_flushes,
            lost_points,
            stats: self.metric.finish(),
        }
    }
}
