//! Synthetic stereo source: a tone on the left, its fifth on the right, a
//! slow tremolo so the meters move, and a little noise.

use std::f32::consts::TAU;

use deck_core::{AudioBackend, BackendError, TrackRef};
use rand::Rng;

use crate::analyser::Analyser;

pub const SAMPLE_RATE: f32 = 44_100.0;

const TONE_LEVEL: f32 = 0.45;
const TREMOLO_HZ: f32 = 0.25;
const TREMOLO_DEPTH: f32 = 0.35;
const NOISE_LEVEL: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Playing,
    Paused,
    Stopped,
}

pub struct SyntheticBackend {
    tone_hz: f32,
    /// Samples generated since the last seek.
    position: u64,
    volume: f32,
    transport: Transport,
    analyser: Analyser,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SyntheticBackend {
    pub fn new(tone_hz: f32) -> Self {
        Self {
            tone_hz: tone_hz.clamp(20.0, SAMPLE_RATE / 2.0),
            position: 0,
            volume: 1.0,
            transport: Transport::Stopped,
            analyser: Analyser::new(2),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    pub fn position_secs(&self) -> f64 {
        self.position as f64 / SAMPLE_RATE as f64
    }

    fn generate(&mut self) {
        let n = self.analyser.size();
        self.left.resize(n, 0.0);
        self.right.resize(n, 0.0);

        if self.transport != Transport::Playing {
            self.left.fill(0.0);
            self.right.fill(0.0);
            return;
        }

        let mut rng = rand::thread_rng();
        for i in 0..n {
            let t = (self.position + i as u64) as f32 / SAMPLE_RATE;
            let tremolo = 1.0 - TREMOLO_DEPTH * (0.5 + 0.5 * (TAU * TREMOLO_HZ * t).sin());
            let gain = TONE_LEVEL * tremolo * self.volume;
            self.left[i] = gain * (TAU * self.tone_hz * t).sin()
                + NOISE_LEVEL * rng.gen_range(-1.0..1.0);
            self.right[i] = gain * (TAU * self.tone_hz * 1.5 * t).sin()
                + NOISE_LEVEL * rng.gen_range(-1.0..1.0);
        }
        self.position += n as u64;
    }
}

impl AudioBackend for SyntheticBackend {
    fn play(&mut self, _track: &TrackRef) -> Result<(), BackendError> {
        self.transport = Transport::Playing;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.transport = Transport::Paused;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.transport = Transport::Stopped;
        self.position = 0;
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.position = (seconds.max(0.0) * SAMPLE_RATE as f64) as u64;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        self.volume = volume;
        Ok(())
    }

    fn set_analysis_window_size(&mut self, size: usize) {
        self.analyser.resize(size);
    }

    fn read_samples(
        &mut self,
        time_domain: &mut [u8],
        freq_domain: &mut [u8],
    ) -> Result<(), BackendError> {
        self.generate();
        self.analyser
            .fill(&self.left, &self.right, time_domain, freq_domain);
        Ok(())
    }
}
