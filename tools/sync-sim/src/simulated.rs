//! Simulated live stream
//!
//! Media time 0 maps to `origin_ms` on the wall clock. Fragments become
//! available once they end before `now - latency`, and only the newest
//! `window_fragments` are kept. The playhead advances in real time while
//! playing and stalls at the end of the buffer.

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;

use remotemedia_stream_sync::{
    Clock, ErrorReporter, Fragment, PlaybackControl, PlaybackErrorKind, ResumeError,
    SeekableRange, StreamError, WallClockMs,
};

use crate::scenario::StreamSpec;

struct SimState {
    playhead_secs: f64,
    /// Wall-clock instant the playhead was last settled at
    settled_at: WallClockMs,
    paused: bool,
    muted: bool,
    error: Option<StreamError>,
    reporters: Vec<ErrorReporter>,
    fail_at: Option<WallClockMs>,
}

pub struct SimulatedStream {
    id: String,
    clock: Arc<dyn Clock>,
    origin_ms: WallClockMs,
    fragment_secs: f64,
    latency_ms: i64,
    window_fragments: usize,
    state: Mutex<SimState>,
}

impl SimulatedStream {
    pub fn new(spec: &StreamSpec, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        // Media time starts one full window before the live edge
        let window_ms = (spec.window_fragments as f64 * spec.fragment_secs * 1000.0) as i64;
        let origin_ms = now - spec.latency_ms - window_ms;
        let playhead_ms = (window_ms - spec.start_behind_ms).max(0);

        Self {
            id: spec.id.clone(),
            clock,
            origin_ms,
            fragment_secs: spec.fragment_secs,
            latency_ms: spec.latency_ms,
            window_fragments: spec.window_fragments,
            state: Mutex::new(SimState {
                playhead_secs: playhead_ms as f64 / 1000.0,
                settled_at: now,
                paused: spec.paused,
                muted: false,
                error: None,
                reporters: Vec::new(),
                fail_at: spec.fail_after_ms.map(|ms| now + ms as i64),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    /// Fire the scheduled playback error once its time has come
    pub fn poll_failure(&self) {
        let now = self.clock.now_ms();
        let reporters = {
            let mut state = self.state.lock();
            match state.fail_at {
                Some(at) if now >= at => {
                    state.fail_at = None;
                    state.reporters.clone()
                }
                _ => return,
            }
        };

        tracing::info!(stream_id = %self.id, "Injecting playback error");
        for reporter in reporters {
            reporter.report(PlaybackErrorKind::Network("simulated segment fetch failure".into()));
        }
    }

    /// Index range of fully buffered fragments at `now`
    fn buffered_indices(&self, now: WallClockMs) -> Option<(u64, u64)> {
        let fragment_ms = self.fragment_secs * 1000.0;
        let edge = (now - self.latency_ms - self.origin_ms) as f64;
        let available = (edge / fragment_ms).floor();
        if available < 1.0 {
            return None;
        }
        let last = available as u64 - 1;
        let first = last.saturating_sub(self.window_fragments as u64 - 1);
        Some((first, last))
    }

    fn buffered_end_secs(&self, now: WallClockMs) -> f64 {
        self.buffered_indices(now)
            .map(|(_, last)| (last + 1) as f64 * self.fragment_secs)
            .unwrap_or(0.0)
    }

    /// Advance the playhead to `now`
    fn settle(&self, state: &mut SimState, now: WallClockMs) {
        if !state.paused {
            let elapsed = (now - state.settled_at).max(0) as f64 / 1000.0;
            state.playhead_secs = (state.playhead_secs + elapsed).min(self.buffered_end_secs(now));
        }
        state.settled_at = now;
    }
}

impl PlaybackControl for SimulatedStream {
    fn position(&self) -> Option<WallClockMs> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.settle(&mut state, now);
        Some(self.origin_ms + (state.playhead_secs * 1000.0) as WallClockMs)
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn fragments(&self) -> Option<Vec<Fragment>> {
        let (first, last) = self.buffered_indices(self.clock.now_ms())?;
        Some(
            (first..=last)
                .map(|i| {
                    let media_start = i as f64 * self.fragment_secs;
                    let pdt = self.origin_ms + (media_start * 1000.0) as WallClockMs;
                    Fragment::tagged(media_start, self.fragment_secs, pdt)
                })
                .collect(),
        )
    }

    fn seekable_ranges(&self) -> Vec<SeekableRange> {
        match self.buffered_indices(self.clock.now_ms()) {
            Some((first, last)) => vec![SeekableRange::new(
                first as f64 * self.fragment_secs,
                (last + 1) as f64 * self.fragment_secs,
            )],
            None => Vec::new(),
        }
    }

    fn set_position(&self, seconds: f64) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.settle(&mut state, now);
        state.playhead_secs = seconds;
    }

    fn pause(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.settle(&mut state, now);
        state.paused = true;
    }

    fn resume(&self) -> BoxFuture<'static, Result<(), ResumeError>> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.settle(&mut state, now);
        state.paused = false;
        future::ready(Ok(())).boxed()
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_error(&self, error: Option<StreamError>) {
        self.state.lock().error = error;
    }

    fn error(&self) -> Option<StreamError> {
        self.state.lock().error
    }

    fn subscribe_errors(&self, reporter: ErrorReporter) {
        self.state.lock().reporters.push(reporter);
    }
}
