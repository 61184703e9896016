//! FFT analyser that turns float sample frames into the byte buffers the
//! render loop reads: centred time-domain bytes and dB-scaled magnitudes.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

pub struct Analyser {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let mut planner = FftPlanner::new();
        Self {
            size,
            fft: planner.plan_fft_forward(size),
            window: blackman_window(size),
            smoothed: vec![0.0; size / 2],
            scratch: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Re-plan for a new window size. Smoothing history is discarded.
    pub fn resize(&mut self, size: usize) {
        if size.max(2) != self.size {
            *self = Self::new(size);
        }
    }

    /// Fill `freq` with smoothed magnitudes of the newest `size` mono samples.
    /// Short input is zero-padded at the front.
    pub fn frequency_bytes(&mut self, mono: &[f32], freq: &mut [u8]) {
        let take = mono.len().min(self.size);
        let pad = self.size - take;
        let tail = &mono[mono.len() - take..];

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let n = self.size as f32;
        for (bin, out) in freq.iter_mut().enumerate() {
            let Some(prev) = self.smoothed.get_mut(bin) else {
                *out = 0;
                continue;
            };
            let magnitude = self.scratch[bin].norm() / n;
            *prev = SMOOTHING * *prev + (1.0 - SMOOTHING) * magnitude;
            *out = magnitude_to_byte(*prev);
        }
    }

    /// Fill both buffers from one block of stereo samples: the time buffer
    /// gets the newest left samples in its first half and right in its
    /// second; the frequency buffer gets the mono mix spectrum.
    pub fn fill(&mut self, left: &[f32], right: &[f32], time: &mut [u8], freq: &mut [u8]) {
        let half = time.len() / 2;
        let (time_l, time_r) = time.split_at_mut(half);
        write_time_bytes(left, time_l);
        write_time_bytes(right, &mut time_r[..half]);
        time_r[half..].fill(128);

        let mono: Vec<f32> = left.iter().zip(right).map(|(l, r)| (l + r) * 0.5).collect();
        self.frequency_bytes(&mono, freq);
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let denom = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / denom;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0;
    scaled.clamp(0.0, 255.0) as u8
}

/// Newest `out.len()` samples as centred bytes; missing samples read as silence.
fn write_time_bytes(samples: &[f32], out: &mut [u8]) {
    let take = samples.len().min(out.len());
    let pad = out.len() - take;
    out[..pad].fill(128);
    for (slot, &s) in out[pad..].iter_mut().zip(&samples[samples.len() - take..]) {
        *slot = (128.0 + s * 128.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, size: usize, amp: f32) -> Vec<f32> {
        (0..size)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq_bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_is_zero() {
        let mut a = Analyser::new(256);
        let mut freq = vec![9u8; 128];
        a.frequency_bytes(&vec![0.0; 256], &mut freq);
        assert!(freq.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut a = Analyser::new(256);
        let mut freq = vec![0u8; 128];
        let tone = sine(16, 256, 0.01);
        for _ in 0..30 {
            a.frequency_bytes(&tone, &mut freq);
        }
        let loudest = freq
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i);
        assert_eq!(loudest, Some(16));
        assert!(freq[16] > freq[64]);
    }

    #[test]
    fn test_time_bytes_are_centred() {
        let mut a = Analyser::new(64);
        let mut time = vec![0u8; 32];
        let mut freq = vec![0u8; 32];
        a.fill(&[0.0; 64], &[1.0; 64], &mut time, &mut freq);
        assert!(time[..16].iter().all(|&b| b == 128));
        assert!(time[16..].iter().all(|&b| b == 255));
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut out = [0u8; 4];
        write_time_bytes(&[-1.0], &mut out);
        assert_eq!(out, [128, 128, 128, 0]);
    }

    #[test]
    fn test_resize_replans() {
        let mut a = Analyser::new(128);
        a.resize(512);
        assert_eq!(a.size(), 512);
        let mut freq = vec![0u8; 256];
        a.frequency_bytes(&vec![0.0; 512], &mut freq);
    }
}
