use clap::ValueEnum;
use deck_core::{AudioBackend, BackendError, TrackRef};
use deck_proto::config::SpectrumConfig;

use crate::capture::CaptureBackend;
use crate::synth::{self, SyntheticBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Generated stereo test tone
    Synth,
    /// Default input device
    Input,
}

/// The backend the lab drives, picked once at startup.
pub enum LabBackend {
    Synth(SyntheticBackend),
    Capture(CaptureBackend),
}

impl LabBackend {
    pub fn open(source: Source, tone_hz: f32) -> Self {
        match source {
            Source::Synth => LabBackend::Synth(SyntheticBackend::new(tone_hz)),
            Source::Input => LabBackend::Capture(CaptureBackend::open()),
        }
    }

    /// What the header shows and what `play` is handed.
    pub fn track(&self, tone_hz: f32) -> TrackRef {
        match self {
            LabBackend::Synth(_) => TrackRef::new("synth", format!("test tone {:.0} Hz", tone_hz)),
            LabBackend::Capture(_) => TrackRef::new("input", "default input"),
        }
    }

    /// Rate of the samples this backend analyses, when known.
    pub fn sample_rate(&self) -> Option<f32> {
        match self {
            LabBackend::Synth(_) => Some(synth::SAMPLE_RATE),
            LabBackend::Capture(b) => b.sample_rate(),
        }
    }

    /// Point the frequency mapping at the rate actually being analysed.
    pub fn apply_sample_rate(&self, spectrum: &mut SpectrumConfig) {
        if let Some(rate) = self.sample_rate() {
            if rate != spectrum.sample_rate {
                tracing::info!("spectrum sample rate {} -> {}", spectrum.sample_rate, rate);
            }
            spectrum.sample_rate = rate;
        }
    }

    pub fn position_secs(&self) -> Option<f64> {
        match self {
            LabBackend::Synth(s) => Some(s.position_secs()),
            LabBackend::Capture(_) => None,
        }
    }
}

impl AudioBackend for LabBackend {
    fn play(&mut self, track: &TrackRef) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.play(track),
            LabBackend::Capture(b) => b.play(track),
        }
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.pause(),
            LabBackend::Capture(b) => b.pause(),
        }
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.stop(),
            LabBackend::Capture(b) => b.stop(),
        }
    }

    fn seek(&mut self, seconds: f64) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.seek(seconds),
            LabBackend::Capture(b) => b.seek(seconds),
        }
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.set_volume(volume),
            LabBackend::Capture(b) => b.set_volume(volume),
        }
    }

    fn set_analysis_window_size(&mut self, size: usize) {
        match self {
            LabBackend::Synth(b) => b.set_analysis_window_size(size),
            LabBackend::Capture(b) => b.set_analysis_window_size(size),
        }
    }

    fn read_samples(
        &mut self,
        time_domain: &mut [u8],
        freq_domain: &mut [u8],
    ) -> Result<(), BackendError> {
        match self {
            LabBackend::Synth(b) => b.read_samples(time_domain, freq_domain),
            LabBackend::Capture(b) => b.read_samples(time_domain, freq_domain),
        }
    }
}
