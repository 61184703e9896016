#![allow(dead_code)]

use std::time::{Duration, Instant};

use deck_core::{AudioBackend, BackendError, FrameRequest, FrameToken, RenderLoop};

/// Backend that fills every read with fixed bytes and records what it saw.
#[derive(Debug)]
pub struct ScriptedBackend {
    pub time_fill: fn(usize) -> u8,
    pub freq_fill: u8,
    pub fail_reads: bool,
    pub window_size: usize,
    pub last_read_len: Option<(usize, usize)>,
    pub reads: usize,
    pub commands: Vec<String>,
}

impl ScriptedBackend {
    pub fn silent() -> Self {
        Self {
            time_fill: |_| 128,
            freq_fill: 0,
            fail_reads: false,
            window_size: 0,
            last_read_len: None,
            reads: 0,
            commands: Vec::new(),
        }
    }

    /// Full-scale square wave with every bin at maximum.
    pub fn loud() -> Self {
        Self {
            time_fill: |i| if i % 2 == 0 { 0 } else { 255 },
            freq_fill: 255,
            ..Self::silent()
        }
    }
}

impl AudioBackend for ScriptedBackend {
    fn play(&mut self, track: &deck_core::TrackRef) -> Result<(), BackendError> {
        self.commands.push(format!("play {}", track.id));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.commands.push("pause".to_string());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.commands.push("stop".to_string());
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.commands.push(format!("seek {}", seconds));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        self.commands.push(format!("volume {}", volume));
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
        self.reads += 1;
        self.last_read_len = Some((time_domain.len(), freq_domain.len()));
        if self.fail_reads {
            // Scribble over the buffers; the engine must restore rest values
            time_domain.fill(7);
            freq_domain.fill(7);
            return Err(BackendError::Read("device gone".to_string()));
        }
        for (i, s) in time_domain.iter_mut().enumerate() {
            *s = (self.time_fill)(i);
        }
        freq_domain.fill(self.freq_fill);
        Ok(())
    }
}

/// Manually advanced monotonic clock.
pub struct Clock {
    pub now: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { now: Instant::now() }
    }

    pub fn advance(&mut self, ms: u64) -> Instant {
        self.now += Duration::from_millis(ms);
        self.now
    }
}

/// Drive frames every `frame_ms` for `total_ms`, polling timers each frame.
/// Returns the last request.
pub fn run_frames<B: AudioBackend>(
    engine: &mut RenderLoop<B>,
    token: FrameToken,
    clock: &mut Clock,
    frame_ms: u64,
    total_ms: u64,
) -> FrameRequest {
    let mut last = FrameRequest::Continue(token);
    let mut elapsed = 0;
    while elapsed < total_ms {
        let now = clock.advance(frame_ms);
        elapsed += frame_ms;
        last = engine.on_frame(token, now);
        engine.poll_timers(now);
        if last == FrameRequest::Halt {
            break;
        }
    }
    last
}
