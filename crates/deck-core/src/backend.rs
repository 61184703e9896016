//! The audio backend seam.
//!
//! Decoding and transport live outside the core. A backend plays tracks and,
//! once per tick, fills a time-domain and a frequency-domain byte buffer whose
//! length is half the configured analysis window.

use crate::error::BackendError;

/// Opaque handle to something playable. The catalog behind it is not ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub id: String,
    pub title: String,
}

impl TrackRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

pub trait AudioBackend {
    fn play(&mut self, track: &TrackRef) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    fn stop(&mut self) -> Result<(), BackendError>;
    fn seek(&mut self, seconds: f64) -> Result<(), BackendError>;
    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError>;

    /// Resize the analysis window. Subsequent reads use `size / 2` bins.
    fn set_analysis_window_size(&mut self, size: usize);

    /// Fill both buffers for this tick. Time-domain bytes are centred at 128
    /// (first half left channel, second half right); frequency bytes are
    /// magnitudes with 0 meaning silence.
    fn read_samples(&mut self, time_domain: &mut [u8], freq_domain: &mut [u8])
        -> Result<(), BackendError>;
}

/// Backend that accepts every command and always reads silence.
#[derive(Debug, Default)]
pub struct NullBackend {
    window_size: usize,
}

impl NullBackend {
    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

impl AudioBackend for NullBackend {
    fn play(&mut self, _track: &TrackRef) -> Result<(), BackendError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn seek(&mut self, _seconds: f64) -> Result<(), BackendError> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<(), BackendError> {
        Ok(())
    }

    fn set_analysis_window_size(&mut self, size: usize) {
        self.window_size = size;
    }

    fn read_samples(
        &mut self,
        time_domain: &mut [u8],
        freq_domain: &mut [u8],
    ) -> Result<(), BackendError> {
        time_domain.fill(128);
        freq_domain.fill(0);
        Ok(())
    }
}
