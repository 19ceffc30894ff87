//! Sync events and delivery sinks
//!
//! The controller reports what it did each tick as [`SyncEvent`]s. UI layers
//! subscribe through a [`ChannelSink`]; tools print them as JSONL through a
//! [`TerminalSink`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::broadcast;

use crate::error::StreamError;
use crate::types::{StreamId, WallClockMs};

/// Why a resume was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeReason {
    /// Stream was seeked back into tolerance
    DriftCorrection,
    /// Every stream was paused and this one is closest to the timeline
    AllPaused,
}

/// Something the sync loop did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The reference stream changed (or was cleared)
    ReferenceChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<StreamId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<WallClockMs>,
    },

    /// A drifting stream was moved onto the reference timeline
    StreamSeeked {
        stream_id: StreamId,
        drift_secs: f64,
        target_secs: f64,
    },

    /// Playback was requested on a stream
    ResumeRequested {
        stream_id: StreamId,
        reason: ResumeReason,
    },

    /// A user-facing error annotation was set
    StreamErrorSet {
        stream_id: StreamId,
        error: StreamError,
        detail: String,
    },

    /// A stream's error annotation was cleared
    StreamErrorCleared { stream_id: StreamId },

    /// A stream was paused after a playback error
    StreamIsolated { stream_id: StreamId, error: String },
}

impl SyncEvent {
    pub fn stream_id(&self) -> Option<&StreamId> {
        match self {
            SyncEvent::ReferenceChanged { reference, .. } => reference.as_ref(),
            SyncEvent::StreamSeeked { stream_id, .. }
            | SyncEvent::ResumeRequested { stream_id, .. }
            | SyncEvent::StreamErrorSet { stream_id, .. }
            | SyncEvent::StreamErrorCleared { stream_id }
            | SyncEvent::StreamIsolated { stream_id, .. } => Some(stream_id),
        }
    }
}

/// Trait for event delivery targets
pub trait EventSink: Send + Sync {
    /// Emit an event to this sink
    fn emit(&self, event: SyncEvent) -> Result<(), EventSinkError>;
}

/// Error type for event sink operations
#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel send error: {0}")]
    Channel(String),
}

/// JSONL sink writing one event per line
pub struct TerminalSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl TerminalSink<std::io::Stdout> {
    /// Create a terminal sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for TerminalSink<W> {
    fn emit(&self, event: SyncEvent) -> Result<(), EventSinkError> {
        let line = serde_json::to_string(&event)
            .map_err(|e| EventSinkError::Serialization(e.to_string()))?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Broadcast channel sink for UI subscribers
pub struct ChannelSink {
    sender: broadcast::Sender<SyncEvent>,
}

impl ChannelSink {
    /// Create a new channel sink with the specified capacity
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<SyncEvent>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SyncEvent) -> Result<(), EventSinkError> {
        self.sender
            .send(event)
            .map_err(|e| EventSinkError::Channel(e.to_string()))?;
        Ok(())
    }
}
