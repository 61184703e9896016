//! Live capture from the default input device.
//!
//! The cpal callback pushes stereo frames into a shared ring; reads take the
//! newest window from it. When no device can be opened the backend stays
//! usable and reports `Unavailable` on every read.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, Stream, StreamConfig};
use deck_core::{AudioBackend, BackendError, TrackRef};

use crate::analyser::Analyser;

/// Upper bound on buffered frames (the largest analysis window, twice over).
const RING_CAPACITY: usize = 4096;

type Ring = Arc<Mutex<VecDeque<(f32, f32)>>>;

pub struct CaptureBackend {
    stream: Result<Stream, BackendError>,
    sample_rate: Option<f32>,
    ring: Ring,
    analyser: Analyser,
    volume: f32,
    paused: bool,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl CaptureBackend {
    pub fn open() -> Self {
        let ring: Ring = Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY)));
        let (stream, sample_rate) = match open_stream(ring.clone()) {
            Ok((stream, rate)) => {
                tracing::info!("capture stream opened at {} Hz", rate);
                (Ok(stream), Some(rate))
            }
            Err(e) => {
                tracing::warn!("capture unavailable: {}", e);
                (Err(e), None)
            }
        };
        Self {
            stream,
            sample_rate,
            ring,
            analyser: Analyser::new(2),
            volume: 1.0,
            paused: true,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// The device's rate, once a stream is open.
    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }

    fn stream(&self) -> Result<&Stream, BackendError> {
        self.stream.as_ref().map_err(|e| e.clone())
    }
}

fn open_stream(ring: Ring) -> Result<(Stream, f32), BackendError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| BackendError::Unavailable("no input device".to_string()))?;
    let supported = device
        .default_input_config()
        .map_err(|e| BackendError::Unavailable(e.to_string()))?;

    tracing::info!(
        "capture device: {} ({:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        supported
    );

    let rate = supported.sample_rate().0 as f32;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, ring),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, ring),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, ring),
        other => Err(BackendError::Unavailable(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }?;
    Ok((stream, rate))
}

fn build_stream<T>(device: &cpal::Device, config: &StreamConfig, ring: Ring) -> Result<Stream, BackendError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels).max(1);
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let Ok(mut ring) = ring.lock() else {
                    return;
                };
                for frame in data.chunks(channels) {
                    let l = f32::from_sample_(frame[0]);
                    let r = frame.get(1).map_or(l, |&s| f32::from_sample_(s));
                    if ring.len() == RING_CAPACITY {
                        ring.pop_front();
                    }
                    ring.push_back((l, r));
                }
            },
            |err| tracing::warn!("capture stream error: {}", err),
            None,
        )
        .map_err(|e| BackendError::Unavailable(e.to_string()))?;
    stream
        .play()
        .map_err(|e| BackendError::Unavailable(e.to_string()))?;
    Ok(stream)
}

impl AudioBackend for CaptureBackend {
    /// Accepted even without a device; the fault surfaces on the first read.
    fn play(&mut self, _track: &TrackRef) -> Result<(), BackendError> {
        if let Ok(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| BackendError::Transport(e.to_string()))?;
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.paused = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.paused = true;
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }
        Ok(())
    }

    fn seek(&mut self, _seconds: f64) -> Result<(), BackendError> {
        Err(BackendError::Transport("live input cannot seek".to_string()))
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
        self.stream()?;

        let n = self.analyser.size();
        self.left.clear();
        self.right.clear();
        if !self.paused {
            let ring = self
                .ring
                .lock()
                .map_err(|_| BackendError::Read("capture ring poisoned".to_string()))?;
            let skip = ring.len().saturating_sub(n);
            for &(l, r) in ring.iter().skip(skip) {
                self.left.push(l * self.volume);
                self.right.push(r * self.volume);
            }
        }
        self.analyser
            .fill(&self.left, &self.right, time_domain, freq_domain);
        Ok(())
    }
}
