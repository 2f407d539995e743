//! FFT-based pulse frequency estimation

use rustfft::{num_complex::Complex, FftPlanner};

/// Spectral peak within the pulse band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulsePeak {
    /// Peak frequency (Hz)
    pub frequency_hz: f64,
    /// Share of in-band power held by the peak bin
    pub prominence: f64,
}

impl PulsePeak {
    /// Beats per minute
    pub fn bpm(&self) -> u32 {
        (self.frequency_hz * 60.0).round() as u32
    }
}

/// Pulse spectrum analyzer
pub struct PulseSpectrum {
    /// FFT planner for efficient computation
    planner: FftPlanner<f64>,
    /// Sampling frequency (Hz)
    sample_rate: f64,
    /// Accepted band (Hz)
    band: (f64, f64),
}

impl PulseSpectrum {
    /// Create a new analyzer
    pub fn new(sample_rate: f64, band: (f64, f64)) -> Self {
        Self {
            planner: FftPlanner::new(),
            sample_rate,
            band,
        }
    }

    /// Apply Hamming window to reduce spectral leakage
    fn apply_hamming_window(signal: &mut [f64]) {
        let n = signal.len();
        if n < 2 {
            return;
        }
        for (i, v) in signal.iter_mut().enumerate() {
            let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            *v *= window;
        }
    }

    /// Find the dominant in-band frequency of a signal.
    ///
    /// Returns `None` for signals too short or too flat to carry a pulse.
    pub fn dominant(&mut self, signal: &[f64]) -> Option<PulsePeak> {
        let n = signal.len();
        if n < 8 {
            return None;
        }

        // Remove the DC component so it cannot dominate the spectrum
        let mean = signal.iter().sum::<f64>() / n as f64;
        let mut detrended: Vec<f64> = signal.iter().map(|v| v - mean).collect();
        Self::apply_hamming_window(&mut detrended);

        let mut buffer: Vec<Complex<f64>> = detrended
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let freq_resolution = self.sample_rate / n as f64;
        let mut band_power = 0.0;
        let mut best: Option<(usize, f64)> = None;

        for (i, c) in buffer.iter().take(n / 2).enumerate() {
            let freq = i as f64 * freq_resolution;
            if freq < self.band.0 || freq > self.band.1 {
                continue;
            }
            let power = c.norm_sqr() / n as f64;
            band_power += power;
            if best.map_or(true, |(_, p)| power > p) {
                best = Some((i, power));
            }
        }

        let (idx, power) = best?;
        if band_power <= 1e-9 {
            return None;
        }

        Some(PulsePeak {
            frequency_hz: idx as f64 * freq_resolution,
            prominence: power / band_power,
        })
    }
}
