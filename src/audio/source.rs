use super::decode::AudioData;
use super::frame::AudioFrame;
use crate::error::EngineError;

/// Result of asking a source for the next frame.
#[derive(Debug)]
pub enum Pull {
    Frame(AudioFrame),
    /// Nothing arrived within the source's wait window; ask again.
    Idle,
    Exhausted,
}

/// Pull-based supplier of fixed-size frames at a fixed sample rate.
pub trait FrameSource {
    fn sample_rate(&self) -> u32;

    /// Blocks until a frame is ready, the source's wait window elapses,
    /// or the source runs out.
    fn next_frame(&mut self) -> Result<Pull, EngineError>;
}

/// Slices a decoded recording into consecutive, non-overlapping frames.
///
/// A trailing partial frame is zero-padded to the full frame size.
pub struct RecordingSource {
    samples: Vec<i16>,
    sample_rate: u32,
    frame_size: usize,
    pos: usize,
}

impl RecordingSource {
    pub fn new(audio: AudioData, frame_size: usize) -> Self {
        Self {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            frame_size,
            pos: 0,
        }
    }

    /// Total number of frames this source will yield.
    pub fn frame_count(&self) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        self.samples.len().div_ceil(self.frame_size)
    }
}

impl FrameSource for RecordingSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_frame(&mut self) -> Result<Pull, EngineError> {
        if self.frame_size == 0 || self.pos >= self.samples.len() {
            return Ok(Pull::Exhausted);
        }

        let end = (self.pos + self.frame_size).min(self.samples.len());
        let mut samples = self.samples[self.pos..end].to_vec();
        samples.resize(self.frame_size, 0);
        self.pos = end;

        Ok(Pull::Frame(AudioFrame::new(samples)))
    }
}
