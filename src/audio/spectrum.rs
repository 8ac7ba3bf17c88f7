use rustfft::num_complex::Complex;

use super::frame::AudioFrame;
use crate::error::EngineError;

/// Recursive radix-2 Cooley-Tukey transform, in place.
///
/// `buffer.len()` must be a power of two; callers validate first.
fn fft(buffer: &mut [Complex<f64>]) {
    let n = buffer.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    let half = n / 2;
    let mut even: Vec<Complex<f64>> = buffer.iter().step_by(2).copied().collect();
    let mut odd: Vec<Complex<f64>> = buffer.iter().skip(1).step_by(2).copied().collect();

    fft(&mut even);
    fft(&mut odd);

    for k in 0..half {
        let angle = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
        let t = Complex::from_polar(1.0, angle) * odd[k];
        buffer[k] = even[k] + t;
        buffer[k + half] = even[k] - t;
    }
}

fn check_frame_size(len: usize) -> Result<(), EngineError> {
    if len < 2 || !len.is_power_of_two() {
        return Err(EngineError::InvalidFrameSize { len });
    }
    Ok(())
}

/// Forward transform of real samples. Length must be a power of two (>= 2).
pub fn transform(samples: &[i16]) -> Result<Vec<Complex<f64>>, EngineError> {
    check_frame_size(samples.len())?;

    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .collect();
    fft(&mut buffer);
    Ok(buffer)
}

/// Magnitudes of the non-negative frequency half, bins `[0, N/2)`.
pub fn half_spectrum_magnitudes(spectrum: &[Complex<f64>]) -> Vec<f64> {
    spectrum[..spectrum.len() / 2]
        .iter()
        .map(|c| c.norm())
        .collect()
}

/// Index of the largest value; the first one wins ties.
fn peak_index(magnitudes: &[f64]) -> usize {
    let mut best = 0;
    for (i, &m) in magnitudes.iter().enumerate().skip(1) {
        if m > magnitudes[best] {
            best = i;
        }
    }
    best
}

/// Frequency in Hz of the strongest bin in `samples`.
///
/// No window is applied; leakage between bins is accepted.
pub fn dominant_frequency_hz(samples: &[i16], sample_rate: u32) -> Result<f64, EngineError> {
    let spectrum = transform(samples)?;
    let magnitudes = half_spectrum_magnitudes(&spectrum);
    let index = peak_index(&magnitudes);
    Ok(index as f64 * sample_rate as f64 / samples.len() as f64)
}

/// Locates the dominant frequency of frames captured at a fixed rate.
#[derive(Clone, Copy, Debug)]
pub struct SpectralPeakDetector {
    sample_rate: u32,
}

impl SpectralPeakDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency resolution for a transform of `len` samples.
    pub fn bin_width_hz(&self, len: usize) -> f64 {
        self.sample_rate as f64 / len as f64
    }

    pub fn dominant_frequency_hz(&self, frame: &AudioFrame) -> Result<f64, EngineError> {
        dominant_frequency_hz(frame.samples(), self.sample_rate)
    }
}
