//! Ripeness session: the state that spans a whole recording.
//!
//! A session is started, fed frames, and stopped. Every accepted frame
//! updates the latest and running-maximum dominant frequency, and the
//! label is recomputed from the maximum.

pub mod driver;
pub mod label;

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::audio::frame::AudioFrame;
use crate::audio::loudness::LoudnessGate;
use crate::audio::spectrum::SpectralPeakDetector;
use crate::config::ClassifierConfig;
use crate::error::EngineError;

pub use label::{classify, RipenessLabel};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RipenessSessionState {
    pub is_active: bool,
    /// Dominant frequency of the last accepted frame, 0 before any.
    pub current_frequency: f64,
    /// Running maximum since `start`; never decreases while active.
    pub max_frequency: f64,
    pub label: RipenessLabel,
}

impl RipenessSessionState {
    fn reset(&mut self, is_active: bool) {
        *self = Self {
            is_active,
            ..Self::default()
        };
    }
}

/// What `on_frame` did with a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Below the loudness gate; the state is untouched.
    Silent { loudness_db: f64 },
    /// State after applying the frame.
    Accepted(RipenessSessionState),
}

#[derive(Debug, Default)]
struct Inner {
    state: RipenessSessionState,
    /// Bumped on every `start`, so results computed for an earlier run
    /// are never applied to a later one.
    generation: u64,
}

/// Thread-safe session. `start`/`stop` may be called from any thread while
/// another thread drives `on_frame`; share it behind an `Arc`.
#[derive(Debug)]
pub struct RipenessSession {
    gate: LoudnessGate,
    detector: SpectralPeakDetector,
    bands: ClassifierConfig,
    inner: Mutex<Inner>,
}

impl RipenessSession {
    pub fn new(sample_rate: u32, classifier: ClassifierConfig) -> Self {
        Self {
            gate: LoudnessGate::new(classifier.loudness_threshold_db),
            detector: SpectralPeakDetector::new(sample_rate),
            bands: classifier,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is plain data and stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sample_rate(&self) -> u32 {
        self.detector.sample_rate()
    }

    /// Frequency resolution of a `frame_size`-sample transform.
    pub fn bin_width_hz(&self, frame_size: usize) -> f64 {
        self.detector.bin_width_hz(frame_size)
    }

    pub fn classifier(&self) -> &ClassifierConfig {
        &self.bands
    }

    /// Begins a fresh session. Restarting an active session resets it.
    pub fn start(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.state.reset(true);
        log::debug!("Session started (generation {})", inner.generation);
    }

    /// Ends the session and clears its readings. A no-op when inactive.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if !inner.state.is_active {
            return;
        }
        inner.state.reset(false);
        log::debug!("Session stopped (generation {})", inner.generation);
    }

    pub fn is_active(&self) -> bool {
        self.lock().state.is_active
    }

    pub fn snapshot(&self) -> RipenessSessionState {
        self.lock().state
    }

    /// Gates, analyzes and applies one frame.
    ///
    /// The lock is released during the FFT. If the session was stopped or
    /// restarted meanwhile, the result is discarded and
    /// `InvalidStateTransition` is returned.
    pub fn on_frame(&self, frame: &AudioFrame) -> Result<FrameOutcome, EngineError> {
        let generation = self.current_generation()?;

        let loudness_db = self.gate.estimate(frame);
        if !self.gate.passes(loudness_db) {
            log::debug!("Frame gated at {:.1} dB", loudness_db);
            return Ok(FrameOutcome::Silent { loudness_db });
        }

        let frequency = self.detector.dominant_frequency_hz(frame)?;
        self.apply(generation, loudness_db, frequency)
    }

    /// Generation of the active run, taken before any analysis starts.
    fn current_generation(&self) -> Result<u64, EngineError> {
        let inner = self.lock();
        if !inner.state.is_active {
            return Err(EngineError::InvalidStateTransition { operation: "on_frame" });
        }
        Ok(inner.generation)
    }

    /// Records `frequency` if the run that produced it is still current.
    fn apply(
        &self,
        generation: u64,
        loudness_db: f64,
        frequency: f64,
    ) -> Result<FrameOutcome, EngineError> {
        let mut inner = self.lock();
        if !inner.state.is_active || inner.generation != generation {
            return Err(EngineError::InvalidStateTransition { operation: "on_frame" });
        }

        let state = &mut inner.state;
        state.current_frequency = frequency;
        if frequency > state.max_frequency {
            state.max_frequency = frequency;
        }
        state.label = classify(state.max_frequency, &self.bands);

        log::debug!(
            "Frame at {:.1} dB peaks at {:.1} Hz (max {:.1} Hz)",
            loudness_db,
            frequency,
            state.max_frequency
        );

        Ok(FrameOutcome::Accepted(*state))
    }
}
