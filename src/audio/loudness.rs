use super::frame::AudioFrame;

/// Frames must be strictly louder than this to be analyzed.
pub const DEFAULT_THRESHOLD_DB: f64 = 50.0;

/// Relative loudness of a block of samples, `20 * log10(rms)`.
///
/// There is no reference level, so the value depends on the capture
/// device's scale. A silent or empty block yields negative infinity
/// instead of the logarithm of zero.
pub fn estimate_loudness_db(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();

    if rms == 0.0 {
        return f64::NEG_INFINITY;
    }

    20.0 * rms.log10()
}

/// Decides whether a frame carries enough energy to be worth an FFT.
#[derive(Clone, Copy, Debug)]
pub struct LoudnessGate {
    threshold_db: f64,
}

impl LoudnessGate {
    pub fn new(threshold_db: f64) -> Self {
        Self { threshold_db }
    }

    pub fn estimate(&self, frame: &AudioFrame) -> f64 {
        estimate_loudness_db(frame.samples())
    }

    pub fn passes(&self, loudness_db: f64) -> bool {
        loudness_db > self.threshold_db
    }
}

impl Default for LoudnessGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::synth;

    fn informative(gate: &LoudnessGate, frame: &AudioFrame) -> bool {
        gate.passes(gate.estimate(frame))
    }

    #[test]
    fn silent_frame_is_not_informative() {
        let frame = synth::silence(1024);
        let db = estimate_loudness_db(frame.samples());
        assert!(db.is_infinite() && db.is_sign_negative());
        assert!(!db.is_nan());
        assert!(!informative(&LoudnessGate::default(), &frame));
    }

    #[test]
    fn empty_frame_is_silent() {
        assert_eq!(estimate_loudness_db(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn constant_amplitude_matches_formula() {
        // rms of a constant 1000 is 1000, 20*log10(1000) = 60
        let db = estimate_loudness_db(&[1000; 256]);
        assert!((db - 60.0).abs() < 1e-9);

        let db = estimate_loudness_db(&[-1000; 256]);
        assert!((db - 60.0).abs() < 1e-9);
    }

    #[test]
    fn loud_sine_passes_gate() {
        let frame = synth::sine(440.0, 10_000.0, 44_100, 4096);
        assert!(informative(&LoudnessGate::default(), &frame));
    }

    #[test]
    fn quiet_sine_is_gated() {
        // amplitude 100 -> rms ~70.7 -> ~37 dB
        let frame = synth::sine(440.0, 100.0, 44_100, 4096);
        assert!(!informative(&LoudnessGate::default(), &frame));
    }

    #[test]
    fn threshold_is_exclusive() {
        // constant 316 -> ~49.99 dB, constant 317 -> ~50.02 dB
        let gate = LoudnessGate::default();
        assert!(!informative(&gate, &AudioFrame::new(vec![316; 64])));
        assert!(informative(&gate, &AudioFrame::new(vec![317; 64])));
        assert!(!gate.passes(50.0));
    }

    #[test]
    fn custom_threshold() {
        let gate = LoudnessGate::new(30.0);
        let frame = synth::sine(440.0, 100.0, 44_100, 4096);
        assert!(informative(&gate, &frame));
        assert!(!informative(&LoudnessGate::default(), &frame));
    }
}
