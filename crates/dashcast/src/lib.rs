//! Adaptive-bitrate segment streaming engine.
//!
//! A [`PlaybackSession`] fetches a movie manifest, then drives an
//! [`AdaptiveScheduler`] that downloads one segment per time slot over byte-range
//! GETs, choosing the quality track for each slot from the last measured
//! bandwidth and the playback queue's headroom. Segments land in a bounded
//! queue read by the playback consumer; a zero-length item marks the end.

pub mod bandwidth;
pub mod config;
pub mod error;
pub mod manifest;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod segment;
pub mod selection;
pub mod session;

pub use bandwidth::Bandwidth;
pub use config::{ConnectionMode, SessionConfig};
pub use error::SessionError;
pub use manifest::{Manifest, ManifestParser, Segment, Track};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use queue::{QueueConsumer, QueueProducer, playback_queue};
pub use scheduler::{AdaptiveScheduler, SessionSummary};
pub use segment::SegmentContent;
pub use selection::{Selection, best_track, best_track_within_queue_time, select_track};
pub use session::{PlaybackSession, SessionHandle, load_manifest};

pub use rawhttp;
