//! The render loop: one cooperative frame callback that samples the backend,
//! drives the meters, spectrum and oscilloscope at their own cadences, and
//! lets the performance monitor trade quality for frame rate.
//!
//! The host owns the clock. It calls [`RenderLoop::on_frame`] once per frame
//! for as long as it is told to continue, and [`RenderLoop::poll_timers`]
//! on every tick of its event loop, playing or not.

use std::time::{Duration, Instant};

use deck_proto::config::{Config, PerformanceConfig, SpectrumConfig};
use deck_proto::state::{BackendStatus, EngineSnapshot, OscilloscopeState, ScopeMode};
use deck_proto::{QualityProfile, QualityTier};

use crate::backend::{AudioBackend, TrackRef};
use crate::error::BackendError;
use crate::meter::MeterBallistics;
use crate::perf::PerformanceMonitor;
use crate::scope::ScopeView;
use crate::spectrum::SpectrumMapper;
use crate::timer::{Throttle, Ticker};

/// Cadence of the decay-on-stop loop.
const DECAY_PERIOD: Duration = Duration::from_millis(16);
/// How often expired warnings are swept.
const EXPIRY_PERIOD: Duration = Duration::from_millis(250);

/// Startup settings for a [`RenderLoop`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub initial_tier: QualityTier,
    pub auto_adjust: bool,
    pub scope_mode: ScopeMode,
    pub performance: PerformanceConfig,
    pub spectrum: SpectrumConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_tier: config.quality.initial_tier,
            auto_adjust: config.quality.auto_adjust,
            scope_mode: config.scope.mode,
            performance: config.performance.clone(),
            spectrum: config.spectrum.clone(),
        }
    }
}

/// Identifies one run of the frame loop. Starting a new run invalidates
/// every older token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

/// What the host should do after a frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    /// Schedule another frame with this token.
    Continue(FrameToken),
    /// The loop is over; do not schedule again.
    Halt,
}

pub struct RenderLoop<B: AudioBackend> {
    backend: B,
    backend_status: BackendStatus,
    profile: QualityProfile,
    playing: bool,
    track: Option<TrackRef>,

    time_buf: Vec<u8>,
    freq_buf: Vec<u8>,

    meter: MeterBallistics,
    spectrum: SpectrumMapper,
    scope: ScopeView,
    monitor: PerformanceMonitor,

    meter_gate: Throttle,
    waveform_gate: Throttle,
    perf_gate: Throttle,
    decay: Ticker,
    expiry: Ticker,

    generation: u64,
    active_frame: Option<FrameToken>,
    frame_count: u64,
}

impl<B: AudioBackend> RenderLoop<B> {
    pub fn new(mut backend: B, settings: EngineSettings) -> Self {
        let profile = QualityProfile::for_tier(settings.initial_tier);
        let bins = profile.bin_count();
        backend.set_analysis_window_size(profile.analysis_window_size);

        Self {
            backend,
            backend_status: BackendStatus::Ok,
            profile,
            playing: false,
            track: None,
            time_buf: vec![128; bins],
            freq_buf: vec![0; bins],
            meter: MeterBallistics::new(),
            spectrum: SpectrumMapper::new(&settings.spectrum, bins, profile.waveform_bar_count),
            scope: ScopeView::new(
                &settings.spectrum,
                settings.scope_mode,
                bins,
                profile.display_buffer_size,
            ),
            monitor: PerformanceMonitor::new(settings.performance, settings.auto_adjust),
            meter_gate: Throttle::from_millis(profile.meter_update_interval_ms),
            waveform_gate: Throttle::from_millis(profile.waveform_update_interval_ms),
            perf_gate: Throttle::from_millis(profile.performance_check_interval_ms),
            decay: Ticker::new(DECAY_PERIOD),
            expiry: Ticker::new(EXPIRY_PERIOD),
            generation: 0,
            active_frame: None,
            frame_count: 0,
        }
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    /// Start playback and a fresh frame loop. The returned token drives
    /// [`on_frame`](Self::on_frame).
    pub fn play(&mut self, track: &TrackRef, now: Instant) -> Result<FrameToken, BackendError> {
        if let Err(e) = self.backend.play(track) {
            self.record_fault(&e);
            return Err(e);
        }
        tracing::info!("play {} ({})", track.title, track.id);
        self.decay.cancel();
        self.playing = true;
        self.track = Some(track.clone());
        Ok(self.start_frames(now))
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), BackendError> {
        tracing::info!("pause");
        self.halt(now);
        let result = self.backend.pause();
        self.transport_result(result)
    }

    pub fn stop(&mut self, now: Instant) -> Result<(), BackendError> {
        tracing::info!("stop");
        self.halt(now);
        self.track = None;
        let result = self.backend.stop();
        self.transport_result(result)
    }

    pub fn seek(&mut self, seconds: f64) -> Result<(), BackendError> {
        let result = self.backend.seek(seconds.max(0.0));
        self.transport_result(result)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        let result = self.backend.set_volume(volume.clamp(0.0, 1.0));
        self.transport_result(result)
    }

    fn halt(&mut self, now: Instant) {
        self.playing = false;
        self.active_frame = None;
        self.scope.clear();
        self.decay.start(now);
    }

    fn transport_result(&mut self, result: Result<(), BackendError>) -> Result<(), BackendError> {
        if let Err(e) = &result {
            self.record_fault(e);
        }
        result
    }

    // ── Frame loop ────────────────────────────────────────────────────────────

    /// Begin a new frame loop, invalidating any previous token.
    pub fn start_frames(&mut self, now: Instant) -> FrameToken {
        self.generation = self.generation.wrapping_add(1);
        let token = FrameToken(self.generation);
        self.active_frame = Some(token);
        self.frame_count = 0;
        self.meter_gate.reset();
        self.waveform_gate.reset();
        self.perf_gate.restart(now);
        self.monitor.rebase(now);
        token
    }

    pub fn is_frame_active(&self, token: FrameToken) -> bool {
        self.active_frame == Some(token)
    }

    /// One frame. Stale tokens and inactive playback halt the loop.
    pub fn on_frame(&mut self, token: FrameToken, now: Instant) -> FrameRequest {
        if !self.is_frame_active(token) {
            return FrameRequest::Halt;
        }
        if !self.playing {
            self.active_frame = None;
            return FrameRequest::Halt;
        }

        self.frame_count = self.frame_count.wrapping_add(1);
        self.monitor.record_frame();

        if self.perf_gate.ready(now) {
            let emitted = self.monitor.check(now, &self.profile, self.playing);
            if emitted > 0 && !self.expiry.is_armed() {
                self.expiry.start(now);
            }
        }

        let meter_due = self.meter_gate.ready(now);
        let skip = u64::from(self.monitor.frame_skip());
        let waveform_due = self.frame_count % (skip + 1) == 0 && self.waveform_gate.ready(now);

        if meter_due || waveform_due {
            self.read_samples();
        }
        if meter_due {
            self.meter.update(&self.time_buf);
        }
        if waveform_due {
            self.spectrum.process(&self.freq_buf);
            self.scope.render(&self.time_buf, &self.freq_buf);
        }

        FrameRequest::Continue(token)
    }

    fn read_samples(&mut self) {
        match self.backend.read_samples(&mut self.time_buf, &mut self.freq_buf) {
            Ok(()) => {
                if matches!(self.backend_status, BackendStatus::Faulted { .. }) {
                    tracing::info!("audio backend recovered");
                    self.backend_status = BackendStatus::Ok;
                }
            }
            Err(e) => {
                self.time_buf.fill(128);
                self.freq_buf.fill(0);
                self.record_fault(&e);
            }
        }
    }

    fn record_fault(&mut self, e: &BackendError) {
        if self.backend_status == BackendStatus::Ok {
            tracing::warn!("audio backend fault: {}", e);
        }
        self.backend_status = BackendStatus::Faulted {
            reason: e.to_string(),
        };
    }

    /// Service the low-frequency timers: decay-on-stop, warning expiry and
    /// due downgrades.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.decay.poll(now) {
            let meter_rest = self.meter.decay_step();
            self.spectrum.decay();
            if meter_rest && self.spectrum.is_at_rest() {
                self.decay.cancel();
            }
        }

        if self.expiry.poll(now) && !self.monitor.expire(now) {
            self.expiry.cancel();
        }

        if let Some(tier) = self.monitor.take_due_downgrade(now) {
            let from = self.profile.tier;
            if tier < from {
                tracing::info!("auto quality downgrade {} -> {}", from, tier);
                self.apply_tier(tier);
                self.monitor.tier_changed(from, tier, now, true);
                if !self.expiry.is_armed() {
                    self.expiry.start(now);
                }
            }
        }
    }

    pub fn has_pending_timers(&self) -> bool {
        self.decay.is_armed() || self.expiry.is_armed() || self.monitor.has_pending_downgrade()
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    pub fn set_tier(&mut self, tier: QualityTier, now: Instant) {
        let from = self.profile.tier;
        if tier == from {
            return;
        }
        tracing::info!("quality tier {} -> {}", from, tier);
        self.apply_tier(tier);
        self.monitor.tier_changed(from, tier, now, false);
    }

    /// Swap every size-dependent buffer to the new profile in one step.
    fn apply_tier(&mut self, tier: QualityTier) {
        let profile = QualityProfile::for_tier(tier);
        let bins = profile.bin_count();

        self.backend.set_analysis_window_size(profile.analysis_window_size);
        self.time_buf = vec![128; bins];
        self.freq_buf = vec![0; bins];
        self.spectrum.resize(bins, profile.waveform_bar_count);
        self.scope.resize(bins, profile.display_buffer_size);

        self.meter_gate
            .set_interval(Duration::from_millis(profile.meter_update_interval_ms));
        self.waveform_gate
            .set_interval(Duration::from_millis(profile.waveform_update_interval_ms));
        self.perf_gate
            .set_interval(Duration::from_millis(profile.performance_check_interval_ms));

        self.profile = profile;
    }

    pub fn set_mode(&mut self, mode: ScopeMode) {
        self.scope.set_mode(mode);
    }

    pub fn zoom_in(&mut self) -> bool {
        self.scope.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.scope.zoom_out()
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.scope.set_pan(pan);
    }

    pub fn drag(&mut self, delta_x: f32, width: f32) {
        self.scope.drag(delta_x, width);
    }

    pub fn amplitude_in(&mut self) -> bool {
        self.scope.amplitude_in()
    }

    pub fn amplitude_out(&mut self) -> bool {
        self.scope.amplitude_out()
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.spectrum.set_intensity(intensity);
    }

    pub fn set_auto_adjust(&mut self, enabled: bool) {
        self.monitor.set_auto_adjust(enabled);
    }

    // ── Read side ─────────────────────────────────────────────────────────────

    pub fn profile(&self) -> &QualityProfile {
        &self.profile
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn track(&self) -> Option<&TrackRef> {
        self.track.as_ref()
    }

    pub fn intensity(&self) -> f32 {
        self.spectrum.intensity()
    }

    pub fn auto_adjust(&self) -> bool {
        self.monitor.auto_adjust()
    }

    pub fn scope_state(&self) -> &OscilloscopeState {
        self.scope.state()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn backend_status(&self) -> &BackendStatus {
        &self.backend_status
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            playing: self.playing,
            profile: self.profile,
            meter: self.meter.state().clone(),
            scope: self.scope.state().clone(),
            spectrum: self.spectrum.values().to_vec(),
            warnings: self.monitor.warnings().to_vec(),
            performance: self.monitor.snapshot(),
            backend: self.backend_status.clone(),
            auto_adjust: self.monitor.auto_adjust(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn engine(tier: QualityTier) -> RenderLoop<NullBackend> {
        let settings = EngineSettings {
            initial_tier: tier,
            ..EngineSettings::default()
        };
        RenderLoop::new(NullBackend::default(), settings)
    }

    #[test]
    fn test_new_sizes_backend_window() {
        let e = engine(QualityTier::Medium);
        assert_eq!(e.backend().window_size(), 128);
        let snap = e.snapshot();
        assert_eq!(snap.spectrum.len(), 32);
        assert_eq!(snap.scope.display.len(), 256);
        assert!(!snap.playing);
    }

    #[test]
    fn test_play_then_frames_continue() {
        let mut e = engine(QualityTier::High);
        let t0 = Instant::now();
        let token = e.play(&TrackRef::new("1", "tone"), t0).unwrap();
        assert_eq!(e.on_frame(token, t0), FrameRequest::Continue(token));
        assert_eq!(e.on_frame(token, t0 + ms(16)), FrameRequest::Continue(token));
    }

    #[test]
    fn test_pause_halts_loop_and_arms_decay() {
        let mut e = engine(QualityTier::High);
        let t0 = Instant::now();
        let token = e.play(&TrackRef::new("1", "tone"), t0).unwrap();
        e.pause(t0 + ms(10)).unwrap();
        assert_eq!(e.on_frame(token, t0 + ms(20)), FrameRequest::Halt);
        assert!(e.has_pending_timers());
        e.poll_timers(t0 + ms(40));
        assert!(!e.has_pending_timers(), "decay at rest cancels itself");
    }

    #[test]
    fn test_restart_invalidates_old_token() {
        let mut e = engine(QualityTier::High);
        let t0 = Instant::now();
        let track = TrackRef::new("1", "tone");
        let first = e.play(&track, t0).unwrap();
        let second = e.play(&track, t0 + ms(5)).unwrap();
        assert_ne!(first, second);
        assert_eq!(e.on_frame(first, t0 + ms(10)), FrameRequest::Halt);
        assert_eq!(e.on_frame(second, t0 + ms(10)), FrameRequest::Continue(second));
    }

    #[test]
    fn test_set_tier_reallocates_everything() {
        let mut e = engine(QualityTier::Ultra);
        let t0 = Instant::now();
        e.set_tier(QualityTier::Low, t0);
        assert_eq!(e.backend().window_size(), 64);
        let snap = e.snapshot();
        assert_eq!(snap.profile.tier, QualityTier::Low);
        assert_eq!(snap.spectrum.len(), 16);
        assert_eq!(snap.scope.display.len(), 128);
        // Manual changes are not announced
        assert!(snap.warnings.is_empty());
    }

    #[test]
    fn test_settings_forward_to_scope_and_spectrum() {
        let mut e = engine(QualityTier::High);
        e.set_mode(ScopeMode::Freq);
        assert!(e.zoom_in());
        e.set_pan(30.0);
        e.drag(0.0, 100.0);
        assert!(e.amplitude_in());
        e.set_intensity(9.0);
        e.set_auto_adjust(false);

        let snap = e.snapshot();
        assert_eq!(snap.scope.mode, ScopeMode::Freq);
        assert_eq!(snap.scope.pan, 30.0);
        assert_eq!(e.intensity(), 4.0);
        assert!(!snap.auto_adjust);
    }

    #[test]
    fn test_read_getters_match_snapshot() {
        let mut e = engine(QualityTier::High);
        assert!(e.auto_adjust());
        e.set_auto_adjust(false);
        e.zoom_in();
        e.set_pan(45.0);
        e.set_mode(ScopeMode::Freq);

        assert!(!e.auto_adjust());
        let scope = e.scope_state();
        assert_eq!(scope.pan, 45.0);
        assert_eq!(scope.mode, ScopeMode::Freq);
        assert_eq!(*scope, e.snapshot().scope);
    }
}
