//! In-memory playback double for tests and simulation
//!
//! `MockStream` records every mutation the sync core issues so tests can
//! assert on seeks, resumes, pauses and mute broadcasts.

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::control::PlaybackControl;
use crate::error::{PlaybackErrorKind, ResumeError, StreamError};
use crate::isolator::ErrorReporter;
use crate::types::{Fragment, SeekableRange, WallClockMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumeBehavior {
    Accept,
    Reject,
    Hang,
}

#[derive(Debug)]
struct MockState {
    position: Option<WallClockMs>,
    paused: bool,
    muted: bool,
    fragments: Option<Vec<Fragment>>,
    seekable: Vec<SeekableRange>,
    error: Option<StreamError>,
    resume_behavior: ResumeBehavior,
    seeks: Vec<f64>,
    resume_count: usize,
    pause_count: usize,
    reporters: Vec<ErrorReporter>,
}

/// Scriptable [`PlaybackControl`] implementation
#[derive(Debug)]
pub struct MockStream {
    state: Mutex<MockState>,
}

impl Default for MockStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStream {
    /// A paused stream with no known position and an empty segment index
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                position: None,
                paused: true,
                muted: false,
                fragments: Some(Vec::new()),
                seekable: Vec::new(),
                error: None,
                resume_behavior: ResumeBehavior::Accept,
                seeks: Vec::new(),
                resume_count: 0,
                pause_count: 0,
                reporters: Vec::new(),
            }),
        }
    }

    pub fn playing_at(self, position: WallClockMs) -> Self {
        {
            let mut state = self.state.lock();
            state.position = Some(position);
            state.paused = false;
        }
        self
    }

    pub fn paused_at(self, position: WallClockMs) -> Self {
        {
            let mut state = self.state.lock();
            state.position = Some(position);
            state.paused = true;
        }
        self
    }

    pub fn with_fragments(self, fragments: Vec<Fragment>) -> Self {
        self.state.lock().fragments = Some(fragments);
        self
    }

    /// Simulate a stream with no active level
    pub fn without_level(self) -> Self {
        self.state.lock().fragments = None;
        self
    }

    pub fn with_seekable(self, ranges: Vec<SeekableRange>) -> Self {
        self.state.lock().seekable = ranges;
        self
    }

    pub fn with_error(self, error: StreamError) -> Self {
        self.state.lock().error = Some(error);
        self
    }

    /// Reject every resume request, as an autoplay policy would
    pub fn rejecting_resume(self) -> Self {
        self.state.lock().resume_behavior = ResumeBehavior::Reject;
        self
    }

    /// Never settle resume requests
    pub fn hanging_resume(self) -> Self {
        self.state.lock().resume_behavior = ResumeBehavior::Hang;
        self
    }

    pub fn set_wall_position(&self, position: Option<WallClockMs>) {
        self.state.lock().position = position;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
    }

    pub fn push_fragment(&self, fragment: Fragment) {
        self.state
            .lock()
            .fragments
            .get_or_insert_with(Vec::new)
            .push(fragment);
    }

    pub fn set_seekable(&self, ranges: Vec<SeekableRange>) {
        self.state.lock().seekable = ranges;
    }

    /// Local seek targets issued so far, in order
    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().seeks.clone()
    }

    pub fn resume_count(&self) -> usize {
        self.state.lock().resume_count
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().pause_count
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().reporters.len()
    }

    /// Fire a playback error through every registered reporter
    ///
    /// Returns false if nothing is subscribed or the receiver is gone.
    pub fn emit_error(&self, kind: PlaybackErrorKind) -> bool {
        let reporters = self.state.lock().reporters.clone();
        !reporters.is_empty() && reporters.iter().all(|r| r.report(kind.clone()))
    }

    fn wall_clock_at(fragments: &[Fragment], seconds: f64) -> Option<WallClockMs> {
        fragments.iter().find_map(|fragment| {
            let pdt = fragment.program_date_time?;
            let inside = seconds >= fragment.media_start && seconds <= fragment.media_end();
            inside.then(|| pdt + ((seconds - fragment.media_start) * 1000.0).round() as WallClockMs)
        })
    }
}

impl PlaybackControl for MockStream {
    fn position(&self) -> Option<WallClockMs> {
        self.state.lock().position
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn fragments(&self) -> Option<Vec<Fragment>> {
        self.state.lock().fragments.clone()
    }

    fn seekable_ranges(&self) -> Vec<SeekableRange> {
        self.state.lock().seekable.clone()
    }

    fn set_position(&self, seconds: f64) {
        let mut state = self.state.lock();
        state.seeks.push(seconds);
        let mapped = state
            .fragments
            .as_deref()
            .and_then(|fragments| Self::wall_clock_at(fragments, seconds));
        if let Some(position) = mapped {
            state.position = Some(position);
        }
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        state.pause_count += 1;
    }

    fn resume(&self) -> BoxFuture<'static, Result<(), ResumeError>> {
        let mut state = self.state.lock();
        state.resume_count += 1;
        match state.resume_behavior {
            ResumeBehavior::Accept => {
                state.paused = false;
                future::ready(Ok(())).boxed()
            }
            ResumeBehavior::Reject => future::ready(Err(ResumeError::Rejected(
                "autoplay not allowed".to_string(),
            )))
            .boxed(),
            ResumeBehavior::Hang => future::pending().boxed(),
        }
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
