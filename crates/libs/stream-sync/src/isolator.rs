//! Playback error isolation
//!
//! Each tracked stream gets one persistent subscription: an [`ErrorReporter`]
//! the engine calls whenever playback fails. Reports arrive as discrete
//! [`StreamErrorEvent`]s on a channel, and isolating a stream means pausing
//! it. A paused stream drops out of reference selection and drift correction
//! until it resumes on its own or the sync loop resumes it.

use std::collections::HashSet;
use tokio::sync::mpsc;

use crate::control::StreamRegistry;
use crate::error::PlaybackErrorKind;
use crate::types::StreamId;

/// A playback error reported for one stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamErrorEvent {
    pub stream_id: StreamId,
    pub kind: PlaybackErrorKind,
}

/// Handle given to the playback engine to report errors for one stream
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    stream_id: StreamId,
    sender: mpsc::UnboundedSender<StreamErrorEvent>,
}

impl ErrorReporter {
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Report a playback error
    ///
    /// Returns false if the sync loop is gone.
    pub fn report(&self, kind: PlaybackErrorKind) -> bool {
        self.sender
            .send(StreamErrorEvent {
                stream_id: self.stream_id.clone(),
                kind,
            })
            .is_ok()
    }
}

/// Owns the error channel and the set of subscribed streams
pub struct ErrorIsolator {
    sender: mpsc::UnboundedSender<StreamErrorEvent>,
    receiver: mpsc::UnboundedReceiver<StreamErrorEvent>,
    subscribed: HashSet<StreamId>,
}

impl Default for ErrorIsolator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorIsolator {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            subscribed: HashSet::new(),
        }
    }

    /// Create a reporter for `stream_id` without registering it on a handle
    pub fn reporter(&self, stream_id: StreamId) -> ErrorReporter {
        ErrorReporter {
            stream_id,
            sender: self.sender.clone(),
        }
    }

    pub fn is_subscribed(&self, stream_id: &StreamId) -> bool {
        self.subscribed.contains(stream_id)
    }

    /// Subscribe every stream not yet subscribed, exactly once
    ///
    /// Streams that left the registry are forgotten so a stream re-added
    /// under the same id gets a fresh subscription on its new handle.
    pub fn sync_subscriptions(&mut self, registry: &dyn StreamRegistry) {
        let ids = registry.stream_ids();
        self.subscribed.retain(|id| ids.contains(id));

        for id in ids {
            if self.subscribed.contains(&id) {
                continue;
            }
            if let Some(stream) = registry.get(&id) {
                stream.subscribe_errors(self.reporter(id.clone()));
                tracing::debug!(stream_id = %id, "Subscribed to playback errors");
                self.subscribed.insert(id);
            }
        }
    }

    /// Wait for the next error report
    pub async fn recv(&mut self) -> Option<StreamErrorEvent> {
        self.receiver.recv().await
    }

    /// Take every report already queued, without waiting
    pub fn drain(&mut self) -> Vec<StreamErrorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Pause the stream named by `event`
    ///
    /// Returns true if the stream was playing and has now been paused.
    /// Repeated reports for an already-paused stream are no-ops.
    pub fn isolate(&self, event: &StreamErrorEvent, registry: &dyn StreamRegistry) -> bool {
        let Some(stream) = registry.get(&event.stream_id) else {
            tracing::debug!(stream_id = %event.stream_id, "Error reported for untracked stream");
            return false;
        };

        if stream.is_paused() {
            return false;
        }

        tracing::warn!(
            stream_id = %event.stream_id,
            error = %event.kind,
            "Playback error, pausing stream"
        );
        stream.pause();
        true
    }
}
