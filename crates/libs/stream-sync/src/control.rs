//! Playback-control interface and stream registry
//!
//! The playback engine owns decoder and buffer state. The sync core reads and
//! mutates it only through [`PlaybackControl`], and finds streams by
//! [`StreamId`] through a [`StreamRegistry`]. No handle holds a reference back
//! to the core.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ResumeError, StreamError};
use crate::isolator::ErrorReporter;
use crate::types::{Fragment, SeekableRange, StreamId, WallClockMs};

/// Capability interface the sync core needs from one stream
pub trait PlaybackControl: Send + Sync {
    /// Wall-clock instant currently being rendered, if known
    fn position(&self) -> Option<WallClockMs>;

    /// Whether playback is paused
    fn is_paused(&self) -> bool;

    /// Buffered segment index of the active quality level
    ///
    /// `None` when there is no active level or it has no segment index.
    fn fragments(&self) -> Option<Vec<Fragment>>;

    /// Local media-time ranges currently reachable by seeking
    fn seekable_ranges(&self) -> Vec<SeekableRange>;

    /// Move the playhead to a local media time in seconds
    fn set_position(&self, seconds: f64);

    fn pause(&self);

    /// Request playback to start
    ///
    /// The request is issued when this method is called. The returned future
    /// resolves once the engine accepts or rejects it, and must not borrow
    /// the handle so it can be driven off the tick.
    fn resume(&self) -> BoxFuture<'static, Result<(), ResumeError>>;

    fn set_muted(&self, muted: bool);

    /// Write the user-facing error annotation for this stream
    fn set_error(&self, error: Option<StreamError>);

    /// Current user-facing error annotation
    fn error(&self) -> Option<StreamError>;

    /// Register the channel the engine reports playback errors on
    fn subscribe_errors(&self, reporter: ErrorReporter);
}

/// Lookup capability over the tracked streams
pub trait StreamRegistry: Send + Sync {
    /// Ids of every tracked stream, in a stable order
    fn stream_ids(&self) -> Vec<StreamId>;

    /// Resolve a stream id to its playback handle
    fn get(&self, id: &StreamId) -> Option<Arc<dyn PlaybackControl>>;
}

/// Simple in-memory registry ordered by stream id
#[derive(Default)]
pub struct StreamSet {
    streams: RwLock<BTreeMap<StreamId, Arc<dyn PlaybackControl>>>,
}

impl StreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a stream, replacing any previous handle with the same id
    pub fn insert(&self, id: impl Into<StreamId>, stream: Arc<dyn PlaybackControl>) {
        self.streams.write().insert(id.into(), stream);
    }

    /// Stop tracking a stream
    pub fn remove(&self, id: &StreamId) -> Option<Arc<dyn PlaybackControl>> {
        self.streams.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.read().is_empty()
    }
}

impl StreamRegistry for StreamSet {
    fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.read().keys().cloned().collect()
    }

    fn get(&self, id: &StreamId) -> Option<Arc<dyn PlaybackControl>> {
        self.streams.read().get(id).cloned()
    }
}

/// Issue a resume request and drive it off the tick
///
/// Rejections are expected (autoplay policy, a newer pause or seek) and are
/// dropped here on purpose: the next tick retries. Without a tokio runtime
/// the request is still issued but its outcome is not observed.
pub fn dispatch_resume(id: &StreamId, stream: &dyn PlaybackControl) {
    let pending = stream.resume();
    let id = id.clone();
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = pending.await {
                    tracing::debug!(stream_id = %id, error = %e, "Resume request not honored");
                }
            });
        }
        Err(_) => {
            tracing::trace!(stream_id = %id, "No runtime available, resume outcome not observed");
        }
    }
}
