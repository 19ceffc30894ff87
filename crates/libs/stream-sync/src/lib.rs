//! Stream Sync
//!
//! Keeps several independently buffering live streams playing in lockstep
//! against a shared wall-clock timeline. The only shared clock is the
//! program-date-time metadata carried by buffered fragments.
//!
//! This crate provides:
//! - `find_fragment_by_timestamp` / `find_closest_fragment` - segment index lookups
//! - `plan_seek` - validated seek targets that never leave buffered data
//! - `SyncController` - reference selection, drift correction and resume coordination per tick
//! - `ErrorIsolator` - pauses streams that report playback errors
//! - `SyncEvent` / `EventSink` - what the loop did, for UI delivery
//!
//! The playback engine, stream registry and UI intent live outside this
//! crate and are reached through [`PlaybackControl`], [`StreamRegistry`] and
//! a `watch` channel of [`PlaybackIntent`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use remotemedia_stream_sync::{PlaybackIntent, StreamSet, SyncConfig, SyncController};
//! use tokio::sync::{broadcast, watch};
//!
//! # async fn example() {
//! let streams = Arc::new(StreamSet::new());
//! // streams.insert("camera-1", Arc::new(my_player));
//!
//! let (intent_tx, intent_rx) = watch::channel(PlaybackIntent::playing_from(None));
//! let controller = SyncController::new(SyncConfig::default(), streams, intent_rx);
//! let snapshots = controller.subscribe();
//!
//! let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//! let handle = controller.spawn(shutdown_rx);
//!
//! // Mute every stream from the next tick on
//! intent_tx.send_modify(|intent| intent.muted = true);
//!
//! let _ = shutdown_tx.send(());
//! let _controller = handle.await;
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod control;
pub mod controller;
pub mod drift;
mod driver;
pub mod error;
pub mod events;
pub mod fragment;
pub mod isolator;
pub mod reference;
pub mod resume;
pub mod seek;
pub mod state;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use control::{dispatch_resume, PlaybackControl, StreamRegistry, StreamSet};
pub use controller::{SyncController, TickReport};
pub use drift::DriftOutcome;
pub use error::{Error, PlaybackErrorKind, ResumeError, Result, SeekError, StreamError};
pub use events::{ChannelSink, EventSink, EventSinkError, ResumeReason, SyncEvent, TerminalSink};
pub use fragment::{find_closest_fragment, find_fragment_by_timestamp};
pub use isolator::{ErrorIsolator, ErrorReporter, StreamErrorEvent};
pub use reference::{select_reference, Reference, StreamObservation};
pub use resume::ResumeCandidate;
pub use seek::{plan_seek, plan_seek_for, SeekPlan};
pub use state::{SyncSnapshot, SyncState};
pub use types::{Fragment, PlaybackIntent, SeekableRange, StreamId, WallClockMs};
