//! The sync tick
//!
//! One call to [`SyncController::tick`] is one complete, non-blocking pass:
//!
//! 1. Subscribe new streams to error reports and isolate any pending errors
//! 2. Broadcast the mute intent to every stream
//! 3. Select the reference stream
//! 4. Correct drift against the reference
//! 5. Resume one stream if everything is paused
//! 6. Publish a [`SyncSnapshot`]
//!
//! Per-stream failures are recorded on that stream and never abort the pass.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::control::StreamRegistry;
use crate::drift::{correct_drift, DriftOutcome};
use crate::error::StreamError;
use crate::events::{ChannelSink, EventSink, ResumeReason, SyncEvent};
use crate::isolator::{ErrorIsolator, StreamErrorEvent};
use crate::reference::{apply_reference, select_reference, Reference, StreamObservation};
use crate::resume::{coordinate_resume, resume_anchor, ResumeCandidate};
use crate::state::{SyncSnapshot, SyncState};
use crate::types::{PlaybackIntent, StreamId};

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Streams paused because of playback errors
    pub isolated: Vec<StreamId>,

    /// Reference selected this tick
    pub reference: Option<Reference>,

    /// Drift correction outcome per compared stream
    pub drift: Vec<(StreamId, DriftOutcome)>,

    /// Stream resumed by the all-paused coordinator
    pub resumed: Option<ResumeCandidate>,
}

/// Drives reference selection, drift correction and resume coordination
pub struct SyncController {
    config: SyncConfig,
    registry: Arc<dyn StreamRegistry>,
    intent: watch::Receiver<PlaybackIntent>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn EventSink>>,
    isolator: ErrorIsolator,
    state: SyncState,
    snapshot: watch::Sender<SyncSnapshot>,
    ticks: u64,
}

impl SyncController {
    /// Create a controller over `registry` following `intent`
    pub fn new(
        config: SyncConfig,
        registry: Arc<dyn StreamRegistry>,
        intent: watch::Receiver<PlaybackIntent>,
    ) -> Self {
        let (snapshot, _) = watch::channel(SyncSnapshot::default());
        Self {
            config,
            registry,
            intent,
            clock: Arc::new(SystemClock),
            sink: None,
            isolator: ErrorIsolator::new(),
            state: SyncState::default(),
            snapshot,
            ticks: 0,
        }
    }

    /// Use a different wall-clock source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deliver sync events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Deliver sync events over a broadcast channel sized by
    /// `event_channel_capacity`
    pub fn with_event_channel(self) -> (Self, broadcast::Receiver<SyncEvent>) {
        let (sink, rx) = ChannelSink::new(self.config.event_channel_capacity);
        (self.with_sink(Arc::new(sink)), rx)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Observe the state published after every tick
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot.subscribe()
    }

    /// Run one complete sync pass
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        self.isolator.sync_subscriptions(self.registry.as_ref());
        for event in self.isolator.drain() {
            if self.isolate(&event) {
                report.isolated.push(event.stream_id);
            }
        }

        let intent = self.intent.borrow().clone();
        self.broadcast_mute(intent.muted);

        let observations = self.observe();

        let reference = select_reference(&observations, intent.playing);
        self.update_reference(reference.as_ref());

        if let Some(reference) = &reference {
            // Streams isolated this tick sit out until the next one
            let candidates: Vec<StreamObservation> = observations
                .iter()
                .filter(|obs| !report.isolated.contains(&obs.id))
                .cloned()
                .collect();
            report.drift = correct_drift(
                reference,
                &candidates,
                self.registry.as_ref(),
                self.config.drift_tolerance_secs,
            );
            self.report_drift(&report.drift);
        }

        if intent.playing {
            let anchor = resume_anchor(self.state.last_known_timestamp, intent.requested_start);
            report.resumed = coordinate_resume(&observations, self.registry.as_ref(), anchor);
            if let Some(candidate) = &report.resumed {
                self.emit(SyncEvent::ResumeRequested {
                    stream_id: candidate.id.clone(),
                    reason: ResumeReason::AllPaused,
                });
            }
        }

        report.reference = reference;
        self.snapshot.send_replace(self.state.clone());
        report
    }

    /// Wait for the next playback error report
    pub async fn next_error_event(&mut self) -> Option<StreamErrorEvent> {
        self.isolator.recv().await
    }

    /// Isolate a stream outside a tick
    pub fn handle_error_event(&mut self, event: StreamErrorEvent) -> bool {
        self.isolate(&event)
    }

    fn isolate(&self, event: &StreamErrorEvent) -> bool {
        let paused = self.isolator.isolate(event, self.registry.as_ref());
        if paused {
            self.emit(SyncEvent::StreamIsolated {
                stream_id: event.stream_id.clone(),
                error: event.kind.to_string(),
            });
        }
        paused
    }

    fn broadcast_mute(&self, muted: bool) {
        for id in self.registry.stream_ids() {
            if let Some(stream) = self.registry.get(&id) {
                stream.set_muted(muted);
            }
        }
    }

    fn observe(&self) -> Vec<StreamObservation> {
        self.registry
            .stream_ids()
            .into_iter()
            .filter_map(|id| {
                let stream = self.registry.get(&id)?;
                let position = stream.position()?;
                Some(StreamObservation {
                    id,
                    position,
                    paused: stream.is_paused(),
                })
            })
            .collect()
    }

    fn update_reference(&mut self, reference: Option<&Reference>) {
        let previous = self.state.reference.clone();
        apply_reference(
            &mut self.state,
            reference,
            self.clock.now_ms(),
            self.config.live_window_ms(),
        );

        if previous != self.state.reference {
            match reference {
                Some(r) => tracing::info!(stream_id = %r.id, position = r.position, "Reference stream selected"),
                None => tracing::info!("Reference stream cleared"),
            }
            self.emit(SyncEvent::ReferenceChanged {
                reference: reference.map(|r| r.id.clone()),
                position: reference.map(|r| r.position),
            });
        }
    }

    fn report_drift(&self, outcomes: &[(StreamId, DriftOutcome)]) {
        for (id, outcome) in outcomes {
            match outcome {
                DriftOutcome::Corrected {
                    drift_secs,
                    plan,
                    error_cleared,
                } => {
                    self.emit(SyncEvent::StreamSeeked {
                        stream_id: id.clone(),
                        drift_secs: *drift_secs,
                        target_secs: plan.target_secs,
                    });
                    self.emit(SyncEvent::ResumeRequested {
                        stream_id: id.clone(),
                        reason: ResumeReason::DriftCorrection,
                    });
                    if *error_cleared {
                        self.emit(SyncEvent::StreamErrorCleared {
                            stream_id: id.clone(),
                        });
                    }
                }
                DriftOutcome::SeekFailed {
                    error,
                    newly_set: true,
                    ..
                } => {
                    self.emit(SyncEvent::StreamErrorSet {
                        stream_id: id.clone(),
                        error: StreamError::from(error),
                        detail: error.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.emit(event) {
                tracing::trace!(error = %e, "Sync event not delivered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::control::{PlaybackControl, StreamSet};
    use crate::error::PlaybackErrorKind;
    use crate::test_support::MockStream;
    use crate::types::{Fragment, SeekableRange, WallClockMs};

    const T: WallClockMs = 1_700_000_000_000;

    fn controller(
        set: Arc<StreamSet>,
        intent: PlaybackIntent,
    ) -> (SyncController, watch::Sender<PlaybackIntent>) {
        let (tx, rx) = watch::channel(intent);
        let controller = SyncController::new(SyncConfig::default(), set, rx)
            .with_clock(Arc::new(ManualClock::new(T + 1_000)));
        (controller, tx)
    }

    #[tokio::test]
    async fn test_tick_publishes_snapshot() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));
        let snapshots = controller.subscribe();

        let report = controller.tick();
        assert_eq!(report.reference.unwrap().id, StreamId::new("a"));

        let snapshot = snapshots.borrow().clone();
        assert_eq!(snapshot.reference, Some(StreamId::new("a")));
        assert_eq!(snapshot.last_known_timestamp, Some(T));
        assert!(snapshot.is_live);
        assert!(snapshot.is_playing);
        assert_eq!(controller.ticks(), 1);
    }

    #[tokio::test]
    async fn test_streams_without_position_are_ignored() {
        let set = Arc::new(StreamSet::new());
        let unknown = Arc::new(MockStream::new());
        unknown.set_paused(false);
        set.insert("unknown", unknown);
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));

        let report = controller.tick();
        assert!(report.reference.is_none());
        assert!(report.drift.is_empty());
    }

    #[tokio::test]
    async fn test_play_intent_off_keeps_sync_inert() {
        let set = Arc::new(StreamSet::new());
        let a = Arc::new(MockStream::new().paused_at(T).with_fragments(vec![Fragment::tagged(0.0, 2.0, T)]));
        set.insert("a", a.clone());
        let intent = PlaybackIntent {
            requested_start: Some(T),
            playing: false,
            muted: true,
        };
        let (mut controller, _tx) = controller(set, intent);

        let report = controller.tick();
        assert!(report.reference.is_none());
        assert!(report.resumed.is_none());
        assert_eq!(a.resume_count(), 0);
        assert!(a.is_muted());
    }

    #[tokio::test]
    async fn test_pending_error_isolated_before_selection() {
        let set = Arc::new(StreamSet::new());
        let a = Arc::new(MockStream::new().playing_at(T));
        let b = Arc::new(MockStream::new().playing_at(T - 100));
        set.insert("a", a.clone());
        set.insert("b", b.clone());
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));

        controller.tick();
        assert!(a.emit_error(PlaybackErrorKind::Media("decode failed".into())));

        let report = controller.tick();
        assert_eq!(report.isolated, vec![StreamId::new("a")]);
        assert!(a.is_paused());
        assert_eq!(report.reference.unwrap().id, StreamId::new("b"));
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        set.insert(
            "b",
            Arc::new(
                MockStream::new()
                    .playing_at(T - 2_000)
                    .with_fragments(vec![Fragment::tagged(8.0, 4.0, T)])
                    .with_seekable(vec![SeekableRange::new(0.0, 12.0)]),
            ),
        );
        let (sink, mut rx) = ChannelSink::new(16);
        let (controller, _tx) = controller(set, PlaybackIntent::playing_from(None));
        let mut controller = controller.with_sink(Arc::new(sink));

        controller.tick();

        assert_eq!(
            rx.recv().await.unwrap(),
            SyncEvent::ReferenceChanged {
                reference: Some(StreamId::new("a")),
                position: Some(T),
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SyncEvent::StreamSeeked {
                stream_id: StreamId::new("b"),
                drift_secs: 2.0,
                target_secs: 8.0,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SyncEvent::ResumeRequested {
                stream_id: StreamId::new("b"),
                reason: ResumeReason::DriftCorrection,
            }
        );
    }

    #[tokio::test]
    async fn test_reference_change_emitted_once() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        let (sink, mut rx) = ChannelSink::new(16);
        let (controller, _tx) = controller(set, PlaybackIntent::playing_from(None));
        let mut controller = controller.with_sink(Arc::new(sink));

        controller.tick();
        controller.tick();

        assert!(matches!(rx.recv().await.unwrap(), SyncEvent::ReferenceChanged { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_event_channel_uses_configured_capacity() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        let (_tx, rx) = watch::channel(PlaybackIntent::playing_from(None));
        let config = SyncConfig {
            event_channel_capacity: 1,
            ..SyncConfig::default()
        };
        let (mut controller, mut events) = SyncController::new(config, set.clone(), rx)
            .with_clock(Arc::new(ManualClock::new(T + 1_000)))
            .with_event_channel();

        controller.tick();
        set.remove(&StreamId::new("a"));
        controller.tick();

        // Capacity 1 keeps only the latest event
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::ReferenceChanged {
                reference: None,
                position: None,
            }
        );
    }

    #[tokio::test]
    async fn test_coordinator_wake_pulls_paused_streams_along() {
        let set = Arc::new(StreamSet::new());
        let fragments = vec![
            Fragment::tagged(20.0, 4.0, T - 4_000),
            Fragment::tagged(24.0, 4.0, T),
        ];
        let s1 = Arc::new(
            MockStream::new()
                .paused_at(T)
                .with_fragments(fragments.clone())
                .with_seekable(vec![SeekableRange::new(20.0, 28.0)]),
        );
        let s2 = Arc::new(
            MockStream::new()
                .paused_at(T - 3_000)
                .with_fragments(fragments)
                .with_seekable(vec![SeekableRange::new(20.0, 28.0)]),
        );
        set.insert("s1", s1.clone());
        set.insert("s2", s2.clone());
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(Some(T)));

        let report = controller.tick();
        assert_eq!(report.resumed.unwrap().id, StreamId::new("s1"));
        assert!(!s1.is_paused());
        assert!(s2.is_paused());

        let report = controller.tick();
        assert_eq!(report.reference.unwrap().id, StreamId::new("s1"));
        assert_eq!(s2.seeks(), vec![24.0]);
        assert_eq!(s2.resume_count(), 1);
        assert!(!s2.is_paused());
    }

    #[tokio::test]
    async fn test_stream_isolated_this_tick_is_not_resumed() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        let b = Arc::new(
            MockStream::new()
                .playing_at(T - 3_000)
                .with_fragments(vec![Fragment::tagged(24.0, 4.0, T)])
                .with_seekable(vec![SeekableRange::new(20.0, 28.0)]),
        );
        set.insert("b", b.clone());
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));
        controller.tick();
        b.set_wall_position(Some(T - 3_000));

        assert!(b.emit_error(PlaybackErrorKind::Network("stalled".into())));
        let report = controller.tick();

        assert_eq!(report.isolated, vec![StreamId::new("b")]);
        assert!(report.drift.is_empty());
        assert!(b.is_paused());
        assert_eq!(b.resume_count(), 1);
    }

    #[tokio::test]
    async fn test_last_known_timestamp_never_moves_backwards() {
        let set = Arc::new(StreamSet::new());
        let a = Arc::new(MockStream::new().playing_at(T));
        set.insert("a", a.clone());
        set.insert("b", Arc::new(MockStream::new().playing_at(T - 300)));
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));

        controller.tick();
        assert_eq!(controller.state().last_known_timestamp, Some(T));

        a.set_paused(true);
        let report = controller.tick();
        assert_eq!(report.reference.unwrap().id, StreamId::new("b"));
        assert_eq!(controller.state().reference, Some(StreamId::new("b")));
        assert_eq!(controller.state().last_known_timestamp, Some(T));
    }

    #[tokio::test]
    async fn test_malformed_fragment_does_not_stop_tick() {
        let set = Arc::new(StreamSet::new());
        set.insert("a", Arc::new(MockStream::new().playing_at(T)));
        let bad = Arc::new(
            MockStream::new()
                .playing_at(T - 3_000)
                .with_fragments(vec![Fragment::tagged(f64::NAN, 4.0, T - 1_000)])
                .with_seekable(vec![SeekableRange::new(0.0, 100.0)]),
        );
        let good = Arc::new(
            MockStream::new()
                .playing_at(T - 3_000)
                .with_fragments(vec![Fragment::tagged(24.0, 4.0, T)])
                .with_seekable(vec![SeekableRange::new(20.0, 28.0)]),
        );
        set.insert("bad", bad.clone());
        set.insert("good", good.clone());
        let (mut controller, _tx) = controller(set, PlaybackIntent::playing_from(None));

        controller.tick();

        assert_eq!(bad.error(), Some(StreamError::TimespanMissing));
        assert!(bad.seeks().is_empty());
        assert_eq!(good.seeks(), vec![24.0]);
    }
}
