// Playback Session: loads the manifest, wires the queue and spawns the scheduler.

use std::sync::Arc;

use rawhttp::{HttpClient, PersistentClient, TransientClient};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::SessionError;
use crate::config::{ConnectionMode, SessionConfig};
use crate::manifest::{Manifest, ManifestParser};
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::queue::{QueueConsumer, playback_queue};
use crate::scheduler::{AdaptiveScheduler, SessionSummary};

/// Owner's handle on a running session.
#[derive(Debug)]
pub struct SessionHandle {
    handle: JoinHandle<Result<SessionSummary, SessionError>>,
    token: CancellationToken,
    metrics: Arc<SessionMetrics>,
}

impl SessionHandle {
    /// Stops the scheduler at its next download or queue push.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Waits for the scheduler to finish.
    pub async fn join(self) -> Result<SessionSummary, SessionError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::TaskFailed {
                reason: e.to_string(),
            }),
        }
    }
}

pub struct PlaybackSession;

impl PlaybackSession {
    /// Connects, loads and validates the manifest, then spawns the scheduler.
    ///
    /// Returns once the scheduler is running; segments arrive on the returned
    /// consumer. Any failure before that point releases the connection.
    pub async fn start<P>(
        config: SessionConfig,
        parser: &P,
    ) -> Result<(SessionHandle, QueueConsumer), SessionError>
    where
        P: ManifestParser + ?Sized,
    {
        config.validate()?;
        let config = Arc::new(config);

        match config.connection_mode {
            ConnectionMode::Persistent => {
                let client = PersistentClient::connect(&config.base_url, config.http.clone()).await?;
                debug!(origin = %client.origin(), "Persistent connection bound");
                Self::launch(client, config, parser).await
            }
            ConnectionMode::Transient => {
                let client = TransientClient::new(config.http.clone());
                Self::launch(client, config, parser).await
            }
        }
    }

    async fn launch<C, P>(
        client: C,
        config: Arc<SessionConfig>,
        parser: &P,
    ) -> Result<(SessionHandle, QueueConsumer), SessionError>
    where
        C: HttpClient + 'static,
        P: ManifestParser + ?Sized,
    {
        let manifest = match load_manifest(&client, &config, parser).await {
            Ok(manifest) => manifest,
            Err(e) => {
                if let Err(close_err) = client.close().await {
                    warn!(error = %close_err, "Failed to release HTTP connection");
                }
                return Err(e);
            }
        };

        let (producer, consumer) = playback_queue(config.queue_capacity);
        let token = CancellationToken::new();
        let metrics = Arc::new(SessionMetrics::new());
        let span = info_span!("session", movie = %config.movie);

        let scheduler = AdaptiveScheduler::new(
            client,
            Arc::new(manifest),
            Arc::clone(&config),
            producer,
            token.clone(),
        )
        .with_metrics(Arc::clone(&metrics));

        let handle = tokio::spawn(scheduler.run().instrument(span));
        Ok((
            SessionHandle {
                handle,
                token,
                metrics,
            },
            consumer,
        ))
    }
}

/// Fetches `<base>/<movie>/manifest.txt` and parses it, validating the result
/// unless the configuration says otherwise.
pub async fn load_manifest<C, P>(
    client: &C,
    config: &SessionConfig,
    parser: &P,
) -> Result<Manifest, SessionError>
where
    C: HttpClient + ?Sized,
    P: ManifestParser + ?Sized,
{
    let url = config.manifest_url();
    let body = client.get(&url).await?;
    let text = String::from_utf8(body.to_vec())?;
    let manifest = parser.parse(&text)?;

    if config.validate_manifest {
        manifest.validate()?;
    }
    info!(
        url = %url,
        tracks = manifest.tracks().len(),
        "Manifest loaded"
    );
    Ok(manifest)
}
