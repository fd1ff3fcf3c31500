//! Frequency analyser tap for the visualizer
//!
//! The engine's render path writes every output sample (mono mixdown,
//! before volume) into a [`SignalTap`]. The [`Analyser`] reads the most
//! recent window from the tap and produces byte and decibel spectra, so a
//! visualizer can be driven from either engine backend.

use parking_lot::Mutex;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Default FFT window size
pub const DEFAULT_FFT_SIZE: usize = 256;

/// Smoothing between successive frames
pub const SMOOTHING: f32 = 0.8;

/// Decibel value mapped to byte 0
pub const MIN_DECIBELS: f32 = -100.0;

/// Decibel value mapped to byte 255
pub const MAX_DECIBELS: f32 = -30.0;

/// Ring of the most recent rendered samples
struct TapRing {
    samples: Vec<f32>,
    write: usize,
}

/// Shared, lock-protected window onto the live signal
///
/// Cloning the tap shares the same ring.
#[derive(Clone)]
pub struct SignalTap {
    ring: Arc<Mutex<TapRing>>,
}

impl SignalTap {
    /// Create a tap holding the last `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(TapRing {
                samples: vec![0.0; capacity.max(1)],
                write: 0,
            })),
        }
    }

    /// Append samples, blocking on the lock
    pub fn push_samples(&self, samples: &[f32]) {
        let mut ring = self.ring.lock();
        Self::write_into(&mut ring, samples);
    }

    /// Append samples unless a reader holds the lock
    ///
    /// Used from the audio callback, which must never wait on the UI.
    /// Returns whether the samples were written.
    pub fn try_push_samples(&self, samples: &[f32]) -> bool {
        match self.ring.try_lock() {
            Some(mut ring) => {
                Self::write_into(&mut ring, samples);
                true
            }
            None => false,
        }
    }

    fn write_into(ring: &mut TapRing, samples: &[f32]) {
        let len = ring.samples.len();
        for &s in samples {
            let idx = ring.write;
            ring.samples[idx] = s;
            ring.write = (idx + 1) % len;
        }
    }

    /// Replace the whole window with silence
    pub fn clear(&self) {
        let mut ring = self.ring.lock();
        ring.samples.iter_mut().for_each(|s| *s = 0.0);
        ring.write = 0;
    }

    /// Copy the last `out.len()` samples, oldest first
    pub fn snapshot(&self, out: &mut [f32]) {
        let ring = self.ring.lock();
        let len = ring.samples.len();
        let n = out.len().min(len);
        let pad = out.len() - n;

        out[..pad].iter_mut().for_each(|s| *s = 0.0);
        let start = (ring.write + len - n) % len;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = ring.samples[(start + i) % len];
        }
    }
}

/// Windowed FFT analyser over a [`SignalTap`]
pub struct Analyser {
    tap: SignalTap,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Smoothed magnitudes carried between reads
    previous: Mutex<Vec<f32>>,
}

impl Analyser {
    /// Create an analyser reading `tap` with the given FFT size
    ///
    /// `fft_size` is rounded up to a power of two, minimum 32.
    pub fn new(tap: SignalTap, fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        Self {
            tap,
            fft_size,
            fft,
            window: blackman_window(fft_size),
            previous: Mutex::new(vec![0.0; fft_size / 2]),
        }
    }

    /// Window size in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Shared tap this analyser reads from
    pub fn tap(&self) -> &SignalTap {
        &self.tap
    }

    /// Smoothed magnitude spectrum, one value per bin
    fn magnitudes(&self) -> Vec<f32> {
        let mut frame = vec![0.0f32; self.fft_size];
        self.tap.snapshot(&mut frame);

        let mut spectrum: Vec<Complex<f32>> = frame
            .iter()
            .zip(&self.window)
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut spectrum);

        let scale = 1.0 / self.fft_size as f32;
        let mut previous = self.previous.lock();
        for (prev, bin) in previous.iter_mut().zip(&spectrum) {
            let magnitude = bin.norm() * scale;
            *prev = SMOOTHING * *prev + (1.0 - SMOOTHING) * magnitude;
        }
        previous.clone()
    }

    /// Spectrum in decibels; silent bins read as negative infinity
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        let magnitudes = self.magnitudes();
        for (slot, m) in out.iter_mut().zip(magnitudes) {
            *slot = if m > 0.0 {
                20.0 * m.log10()
            } else {
                f32::NEG_INFINITY
            };
        }
    }

    /// Spectrum scaled into bytes over [`MIN_DECIBELS`, `MAX_DECIBELS`]
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let mut db = vec![0.0f32; out.len().min(self.frequency_bin_count())];
        self.float_frequency_data(&mut db);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (slot, value) in out.iter_mut().zip(db.iter()) {
            let scaled = 255.0 / range * (value - MIN_DECIBELS);
            *slot = if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Waveform as bytes centred on 128
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let mut frame = vec![0.0f32; out.len().min(self.fft_size)];
        self.tap.snapshot(&mut frame);
        for (slot, s) in out.iter_mut().zip(frame) {
            *slot = (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8;
        }
    }

    /// Forget smoothing history so a restarted signal is not blended with
    /// the old one
    pub fn reset(&self) {
        self.previous.lock().iter_mut().for_each(|m| *m = 0.0);
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * std::f32::consts::PI * x).cos()
                + A2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn test_snapshot_order() {
        let tap = SignalTap::new(4);
        tap.push_samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        tap.snapshot(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);

        let mut wide = [9.0; 6];
        tap.snapshot(&mut wide);
        assert_eq!(wide, [0.0, 0.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_clear() {
        let tap = SignalTap::new(4);
        tap.push_samples(&[1.0, 1.0]);
        tap.clear();

        let mut out = [5.0; 4];
        tap.snapshot(&mut out);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_bin_count() {
        let analyser = Analyser::new(SignalTap::new(256), 256);
        assert_eq!(analyser.fft_size(), 256);
        assert_eq!(analyser.frequency_bin_count(), 128);

        let rounded = Analyser::new(SignalTap::new(256), 200);
        assert_eq!(rounded.fft_size(), 256);
    }

    #[test]
    fn test_silence_reads_zero() {
        let analyser = Analyser::new(SignalTap::new(256), 256);
        let mut bytes = [7u8; 128];
        analyser.byte_frequency_data(&mut bytes);
        assert!(bytes.iter().all(|&b| b == 0));

        let mut wave = [0u8; 256];
        analyser.byte_time_domain_data(&mut wave);
        assert!(wave.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_sine_peak_bin() {
        let tap = SignalTap::new(256);
        let analyser = Analyser::new(tap.clone(), 256);

        // Bin 16 at 24 kHz with a 256-point window is 1500 Hz
        tap.push_samples(&sine(1500.0, 24_000.0, 256));

        let mut db = [0.0f32; 128];
        analyser.float_frequency_data(&mut db);
        let peak = db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);

        let mut bytes = [0u8; 128];
        analyser.byte_frequency_data(&mut bytes);
        assert!(bytes[16] > 0);
    }

    #[test]
    fn test_smoothing_converges() {
        let tap = SignalTap::new(256);
        let analyser = Analyser::new(tap.clone(), 256);
        tap.push_samples(&sine(1500.0, 24_000.0, 256));

        let mut first = [0.0f32; 128];
        analyser.float_frequency_data(&mut first);
        let mut later = [0.0f32; 128];
        for _ in 0..20 {
            analyser.float_frequency_data(&mut later);
        }
        assert!(later[16] > first[16]);

        analyser.reset();
        let mut after_reset = [0.0f32; 128];
        analyser.float_frequency_data(&mut after_reset);
        assert!((after_reset[16] - first[16]).abs() < 1e-3);
    }
}
