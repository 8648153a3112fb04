// Adaptive Scheduler: walks the manifest segment by segment, picks a track for each
// slot from the last bandwidth sample and queue headroom, and feeds the playback queue.

use std::sync::Arc;

use rawhttp::HttpClient;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::SessionError;
use crate::bandwidth::Bandwidth;
use crate::config::SessionConfig;
use crate::manifest::{HEADER_SEGMENT, Manifest, Track};
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::queue::QueueProducer;
use crate::segment::SegmentContent;
use crate::selection::select_track;

/// Result of a session that reached the end of the movie.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Segment slots played, the first (header) segment included
    pub segments: usize,
    pub final_track: usize,
    pub metrics: MetricsSnapshot,
}

pub struct AdaptiveScheduler<C: HttpClient> {
    client: C,
    manifest: Arc<Manifest>,
    config: Arc<SessionConfig>,
    queue: QueueProducer,
    token: CancellationToken,
    metrics: Arc<SessionMetrics>,
    current_track: usize,
    last_bandwidth: Bandwidth,
}

impl<C: HttpClient> AdaptiveScheduler<C> {
    pub fn new(
        client: C,
        manifest: Arc<Manifest>,
        config: Arc<SessionConfig>,
        queue: QueueProducer,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            manifest,
            config,
            queue,
            token,
            metrics: Arc::new(SessionMetrics::new()),
            current_track: 0,
            last_bandwidth: Bandwidth::default(),
        }
    }

    /// Share an existing metrics instance instead of the scheduler's own.
    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Streams the whole movie, then releases the connection.
    ///
    /// Stops at the first failure: nothing further is downloaded, nothing partial
    /// is queued and no end-of-stream marker is sent, so the consumer sees the
    /// queue close without one.
    pub async fn run(mut self) -> Result<SessionSummary, SessionError> {
        let result = self.stream_movie().await;

        if let Err(e) = self.client.close().await {
            warn!(error = %e, "Failed to release HTTP connection");
        }

        match &result {
            Ok(summary) => {
                info!(
                    segments = summary.segments,
                    final_track = summary.final_track,
                    "Session finished"
                );
                self.metrics.log_summary();
            }
            Err(SessionError::Cancelled) => info!("Session cancelled"),
            Err(e) => error!(error = %e, "Session failed"),
        }
        result
    }

    async fn stream_movie(&mut self) -> Result<SessionSummary, SessionError> {
        let manifest = Arc::clone(&self.manifest);
        let tracks = manifest.tracks();
        let baseline = manifest
            .baseline()
            .ok_or_else(|| SessionError::invalid_manifest("manifest has no tracks"))?;
        let segment_count = baseline.segments.len();
        if segment_count == 0 {
            return Err(SessionError::invalid_manifest("baseline track has no segments"));
        }

        info!(
            tracks = tracks.len(),
            segments = segment_count,
            "Starting playback on baseline track"
        );

        self.current_track = 0;
        self.metrics.record_track(0, false);
        let bandwidth = self.download(0, HEADER_SEGMENT).await?;
        self.update_bandwidth(bandwidth);

        for index in 1..segment_count {
            let occupancy = self.queue.occupancy();
            let selection = select_track(
                tracks,
                self.current_track,
                self.last_bandwidth.bits_per_second(),
                occupancy,
            );
            if selection.headroom_downshift {
                debug!(
                    segment = index,
                    occupancy,
                    track = selection.track,
                    "Queue nearly empty, stepping down one track"
                );
                self.metrics.record_headroom_downshift();
            }

            let switched = selection.track != self.current_track;
            if switched {
                info!(
                    segment = index,
                    from = self.current_track,
                    to = selection.track,
                    bandwidth = %self.last_bandwidth,
                    "Switching track"
                );
                // Primes the decoder for the new track; does not feed the estimate.
                self.download(selection.track, HEADER_SEGMENT).await?;
            }

            let bandwidth = self.download(selection.track, index).await?;
            self.update_bandwidth(bandwidth);
            self.current_track = selection.track;
            self.metrics.record_track(selection.track, switched);
        }

        self.push(SegmentContent::end_of_stream(baseline.content_type.clone()))
            .await?;
        debug!("End of stream queued");

        Ok(SessionSummary {
            segments: segment_count,
            final_track: self.current_track,
            metrics: self.metrics.snapshot(),
        })
    }

    fn update_bandwidth(&mut self, bandwidth: Bandwidth) {
        self.last_bandwidth = bandwidth;
        self.metrics.record_bandwidth(bandwidth.bits_per_second());
    }

    /// Fetches one segment, queues it, and returns the bandwidth of the transfer.
    async fn download(
        &self,
        track_index: usize,
        segment_index: usize,
    ) -> Result<Bandwidth, SessionError> {
        let (track, segment) = self.locate(track_index, segment_index)?;
        let url = self.config.track_url(&track.filename);

        if self.token.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let started = Instant::now();
        let fetched = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SessionError::Cancelled),
            result = self.client.get_range(&url, segment.offset, segment.end()) => result,
        };
        let elapsed = started.elapsed();

        let payload = fetched.map_err(|source| {
            self.metrics.record_fetch_error();
            SessionError::segment_fetch(track_index, segment_index, source)
        })?;

        let received = payload.len() as u64;
        if received != segment.length {
            self.metrics.record_fetch_error();
            return Err(SessionError::UnexpectedLength {
                track: track_index,
                segment: segment_index,
                expected: segment.length,
                received,
            });
        }

        let bandwidth = Bandwidth::from_transfer(payload.len(), elapsed);
        self.metrics
            .record_download(received, elapsed, segment_index == HEADER_SEGMENT);
        trace!(
            track = track_index,
            segment = segment_index,
            bytes = received,
            elapsed_ms = elapsed.as_millis() as u64,
            bandwidth = %bandwidth,
            "Segment downloaded"
        );

        self.push(SegmentContent::new(track.content_type.clone(), payload))
            .await?;
        Ok(bandwidth)
    }

    fn locate(
        &self,
        track_index: usize,
        segment_index: usize,
    ) -> Result<(&Track, crate::manifest::Segment), SessionError> {
        let track = self.manifest.track(track_index).ok_or_else(|| {
            SessionError::invalid_manifest(format!("track {track_index} does not exist"))
        })?;
        let segment = track.segments.get(segment_index).copied().ok_or_else(|| {
            SessionError::invalid_manifest(format!(
                "track {track_index} has no segment {segment_index}"
            ))
        })?;
        Ok((track, segment))
    }

    async fn push(&self, content: SegmentContent) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(SessionError::Cancelled),
            result = self.queue.push(content) => result,
        }
    }
}
