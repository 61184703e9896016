//! Oscilloscope view: zoom, pan and amplitude over the time or frequency
//! buffers, resampled to a fixed display length.

use std::collections::VecDeque;

use deck_proto::config::SpectrumConfig;
use deck_proto::state::{AmplitudeZoom, OscilloscopeState, ScopeMode, ZoomLevel};

use crate::spectrum::SpectrumMapper;

const CENTER: f32 = 128.0;
const TIME_GAIN: f32 = 0.8;
const FREQ_GAIN: f32 = 0.6;
const DRAG_SENSITIVITY: f32 = 0.5;

/// Time buffers retained for the wide view. Matches the widest sub-unit zoom.
const HISTORY_DEPTH: usize = 4;

#[derive(Debug, Clone)]
pub struct ScopeView {
    state: OscilloscopeState,
    history: VecDeque<Vec<u8>>,
    freq_mapper: SpectrumMapper,
}

impl ScopeView {
    pub fn new(config: &SpectrumConfig, mode: ScopeMode, bin_count: usize, display_len: usize) -> Self {
        let mut state = OscilloscopeState::new(display_len);
        state.mode = mode;
        Self {
            state,
            history: VecDeque::with_capacity(HISTORY_DEPTH),
            freq_mapper: SpectrumMapper::new(config, bin_count, bin_count.min(display_len)),
        }
    }

    pub fn state(&self) -> &OscilloscopeState {
        &self.state
    }

    pub fn display(&self) -> &[f32] {
        &self.state.display
    }

    /// Reallocate for a new profile. Display and history are zeroed.
    pub fn resize(&mut self, bin_count: usize, display_len: usize) {
        self.state.display = vec![0.0; display_len];
        self.history.clear();
        self.freq_mapper.resize(bin_count, bin_count.min(display_len));
    }

    /// Zero the display and forget buffered frames.
    pub fn clear(&mut self) {
        self.state.display.fill(0.0);
        self.history.clear();
    }

    pub fn set_mode(&mut self, mode: ScopeMode) {
        self.state.mode = mode;
    }

    /// Refresh the display from this tick's buffers.
    pub fn render(&mut self, time_domain: &[u8], freq_domain: &[u8]) {
        self.remember(time_domain);
        let amp = self.state.amplitude.factor();
        match self.state.mode {
            ScopeMode::Time => {
                let source = self.time_source(time_domain);
                let window = self.window_len(source.len(), time_domain.len());
                let start = self.window_start(source.len(), window);
                resample(&source, start, window, &mut self.state.display, |s| {
                    (s - CENTER) / CENTER * TIME_GAIN * amp
                });
            }
            ScopeMode::Freq => {
                let columns = self.freq_mapper.aggregate(freq_domain);
                let window = self.window_len(columns.len(), columns.len());
                let start = self.window_start(columns.len(), window);
                resample(&columns, start, window, &mut self.state.display, |v| {
                    ((v / 255.0) * 2.0 - 1.0) * FREQ_GAIN * amp
                });
            }
        }
    }

    fn remember(&mut self, time_domain: &[u8]) {
        if self.history.len() == HISTORY_DEPTH {
            self.history.pop_front();
        }
        self.history.push_back(time_domain.to_vec());
    }

    /// Samples the time window is cut from, oldest first.
    fn time_source(&self, newest: &[u8]) -> Vec<f32> {
        if self.state.zoom.factor() >= 1.0 {
            return newest.iter().map(|&s| s as f32).collect();
        }
        let buffers = (self.state.zoom.effective() as usize).min(self.history.len());
        self.history
            .iter()
            .skip(self.history.len() - buffers)
            .flat_map(|b| b.iter().map(|&s| s as f32))
            .collect()
    }

    /// Window length in source units; `unit_len` is one buffer's length.
    fn window_len(&self, source_len: usize, unit_len: usize) -> usize {
        let zoom = self.state.zoom;
        let wanted = if zoom.factor() >= 1.0 {
            (unit_len as f32 / zoom.effective()).floor() as usize
        } else {
            (unit_len as f32 * zoom.effective()) as usize
        };
        wanted.clamp(1, source_len.max(1)).min(source_len)
    }

    fn window_start(&self, source_len: usize, window: usize) -> usize {
        let room = source_len.saturating_sub(window);
        ((room as f32) * self.state.pan / 100.0).round() as usize
    }

    /// Step the zoom in. Returns `false` at the top of the range.
    pub fn zoom_in(&mut self) -> bool {
        match self.state.zoom.step_in() {
            Some(z) => {
                self.set_zoom(z);
                true
            }
            None => false,
        }
    }

    pub fn zoom_out(&mut self) -> bool {
        match self.state.zoom.step_out() {
            Some(z) => {
                self.set_zoom(z);
                true
            }
            None => false,
        }
    }

    fn set_zoom(&mut self, zoom: ZoomLevel) {
        self.state.zoom = zoom;
        if !zoom.is_magnified() {
            self.state.pan = 0.0;
        }
    }

    pub fn amplitude_in(&mut self) -> bool {
        self.step_amplitude(AmplitudeZoom::step_in)
    }

    pub fn amplitude_out(&mut self) -> bool {
        self.step_amplitude(AmplitudeZoom::step_out)
    }

    fn step_amplitude(&mut self, step: fn(AmplitudeZoom) -> Option<AmplitudeZoom>) -> bool {
        match step(self.state.amplitude) {
            Some(a) => {
                self.state.amplitude = a;
                true
            }
            None => false,
        }
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.state.pan = if self.state.zoom.is_magnified() && pan.is_finite() {
            pan.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Pan by a horizontal drag of `delta_x` over a viewport `width` wide.
    pub fn drag(&mut self, delta_x: f32, width: f32) {
        if !self.state.zoom.is_magnified() || width <= 0.0 {
            return;
        }
        let delta = delta_x / width * 100.0 * self.state.zoom.factor() * DRAG_SENSITIVITY;
        self.set_pan(self.state.pan - delta);
    }
}

/// Linear-interpolation resample of `source[start..start + window]` into `out`,
/// mapping each interpolated value through `f` and clamping to `[-1, 1]`.
fn resample(source: &[f32], start: usize, window: usize, out: &mut [f32], f: impl Fn(f32) -> f32) {
    if source.is_empty() || window == 0 {
        out.fill(0.0);
        return;
    }
    let last = source.len() - 1;
    let span = window.saturating_sub(1) as f32;
    let denom = out.len().saturating_sub(1).max(1) as f32;
    for (i, slot) in out.iter_mut().enumerate() {
        let pos = start as f32 + span * i as f32 / denom;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = pos - lo as f32;
        let v = source[lo] + (source[hi] - source[lo]) * frac.clamp(0.0, 1.0);
        *slot = f(v).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(mode: ScopeMode) -> ScopeView {
        ScopeView::new(&SpectrumConfig::default(), mode, 64, 128)
    }

    #[test]
    fn test_silence_renders_flat() {
        let mut v = view(ScopeMode::Time);
        v.render(&[128u8; 64], &[0u8; 64]);
        assert_eq!(v.display().len(), 128);
        assert!(v.display().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_freq_mode_silence_sits_at_bottom() {
        let mut v = view(ScopeMode::Freq);
        v.render(&[128u8; 64], &[0u8; 64]);
        assert!(v.display().iter().all(|&s| (s + FREQ_GAIN).abs() < 1e-6));
    }

    #[test]
    fn test_amplitude_scales_and_clamps() {
        let mut v = view(ScopeMode::Time);
        v.render(&[192u8; 64], &[0u8; 64]);
        let base = v.display()[0];
        assert!((base - 0.4).abs() < 1e-6);

        assert!(v.amplitude_in());
        v.render(&[192u8; 64], &[0u8; 64]);
        assert!((v.display()[0] - 0.8).abs() < 1e-6);

        while v.amplitude_in() {}
        assert_eq!(v.state().amplitude, AmplitudeZoom::X8);
        v.render(&[192u8; 64], &[0u8; 64]);
        assert!(v.display().iter().all(|&s| s == 1.0));
        assert!(!v.amplitude_in());
    }

    #[test]
    fn test_zoom_boundaries_are_noops() {
        let mut v = view(ScopeMode::Time);
        while v.zoom_in() {}
        assert_eq!(v.state().zoom, ZoomLevel::X16);
        assert!(!v.zoom_in());
        while v.zoom_out() {}
        assert_eq!(v.state().zoom, ZoomLevel::Quarter);
        assert!(!v.zoom_out());
    }

    #[test]
    fn test_pan_requires_magnification() {
        let mut v = view(ScopeMode::Time);
        v.set_pan(40.0);
        assert_eq!(v.state().pan, 0.0);

        v.zoom_in();
        v.set_pan(40.0);
        assert_eq!(v.state().pan, 40.0);
        v.set_pan(250.0);
        assert_eq!(v.state().pan, 100.0);
        v.set_pan(-3.0);
        assert_eq!(v.state().pan, 0.0);

        v.set_pan(70.0);
        v.zoom_out();
        assert_eq!(v.state().zoom, ZoomLevel::X1);
        assert_eq!(v.state().pan, 0.0);
    }

    #[test]
    fn test_drag_moves_pan_against_motion() {
        let mut v = view(ScopeMode::Time);
        v.drag(-50.0, 100.0);
        assert_eq!(v.state().pan, 0.0);

        v.zoom_in(); // 2x
        v.drag(-50.0, 100.0);
        assert!((v.state().pan - 50.0).abs() < 1e-4);
        v.drag(10.0, 0.0);
        assert!((v.state().pan - 50.0).abs() < 1e-4);
        v.drag(-1000.0, 100.0);
        assert_eq!(v.state().pan, 100.0);
    }

    #[test]
    fn test_zoomed_window_follows_pan() {
        let mut v = view(ScopeMode::Time);
        // Ramp from 64 up to 191: left half of the window is negative
        let ramp: Vec<u8> = (0..64u8).map(|i| 64 + i * 2).collect();
        v.zoom_in();
        v.zoom_in(); // 4x: 16-sample window

        v.render(&ramp, &[0u8; 64]);
        let first = v.display().to_vec();
        assert!(first.iter().all(|&s| s < 0.0));

        v.set_pan(100.0);
        v.render(&ramp, &[0u8; 64]);
        assert!(v.display().iter().all(|&s| s > 0.0));
    }

    #[test]
    fn test_wide_view_spans_history() {
        let mut v = view(ScopeMode::Time);
        v.zoom_out(); // 1/2x: two buffers wide
        v.render(&[0u8; 64], &[0u8; 64]);
        v.render(&[255u8; 64], &[0u8; 64]);
        let d = v.display();
        assert!(d[0] < -0.7);
        assert!(d[d.len() - 1] > 0.7);
    }

    #[test]
    fn test_resize_and_clear() {
        let mut v = view(ScopeMode::Time);
        v.render(&[200u8; 64], &[0u8; 64]);
        v.clear();
        assert!(v.display().iter().all(|&s| s == 0.0));

        v.resize(32, 64);
        assert_eq!(v.display().len(), 64);
        v.set_mode(ScopeMode::Freq);
        v.render(&[128u8; 32], &[255u8; 32]);
        assert!(v.display().iter().all(|&s| (s - FREQ_GAIN).abs() < 1e-6));
    }

    #[test]
    fn test_clear_forgets_wide_view_history() {
        let mut v = view(ScopeMode::Time);
        v.zoom_out(); // 1/2x
        v.render(&[255u8; 64], &[0u8; 64]);
        v.render(&[255u8; 64], &[0u8; 64]);
        v.clear();

        // Only the silent buffer after the clear is in view
        v.render(&[128u8; 64], &[0u8; 64]);
        assert!(v.display().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_empty_buffers_render_zero() {
        let mut v = view(ScopeMode::Time);
        v.render(&[], &[]);
        assert!(v.display().iter().all(|&s| s == 0.0));
    }
}
