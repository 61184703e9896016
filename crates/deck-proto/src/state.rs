//! Snapshot types shared between the analysis core and presentation layers.
//!
//! The render loop is the only writer of these values; front ends read
//! them through [`EngineSnapshot`] and never mutate them.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::quality::{QualityProfile, QualityTier};

/// Number of (left, right) pairs kept for the phase scope.
pub const PHASE_POINT_COUNT: usize = 8;

/// Rest value of the loudness proxy.
pub const LOUDNESS_FLOOR: f32 = -60.0;

// ── Meters ────────────────────────────────────────────────────────────────────

/// Ballistic levels for one channel. All values in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelLevels {
    pub vu: f32,
    pub vu_hold: f32,
    pub ppm: f32,
    pub ppm_hold: f32,
}

impl ChannelLevels {
    pub fn max_value(&self) -> f32 {
        self.vu.max(self.vu_hold).max(self.ppm).max(self.ppm_hold)
    }
}

/// One phase-scope point; both axes in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhasePoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterState {
    pub left: ChannelLevels,
    pub right: ChannelLevels,
    /// Smoothed loudness proxy, `LOUDNESS_FLOOR..=0`. Not a calibrated LUFS value.
    pub loudness: f32,
    /// Stereo correlation in `[-1, 1]`.
    pub correlation: f32,
    pub phase_points: Vec<PhasePoint>,
}

impl Default for MeterState {
    fn default() -> Self {
        Self {
            left: ChannelLevels::default(),
            right: ChannelLevels::default(),
            loudness: LOUDNESS_FLOOR,
            correlation: 0.0,
            phase_points: vec![PhasePoint::default(); PHASE_POINT_COUNT],
        }
    }
}

// ── Oscilloscope ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    #[default]
    Time,
    Freq,
}

impl ScopeMode {
    pub fn toggled(self) -> Self {
        match self {
            ScopeMode::Time => ScopeMode::Freq,
            ScopeMode::Freq => ScopeMode::Time,
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeMode::Time => f.write_str("time"),
            ScopeMode::Freq => f.write_str("freq"),
        }
    }
}

impl FromStr for ScopeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(ScopeMode::Time),
            "freq" | "frequency" => Ok(ScopeMode::Freq),
            other => anyhow::bail!("unknown scope mode '{}'", other),
        }
    }
}

/// Horizontal zoom steps. Sub-unit steps are the wide (zoomed-out) view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ZoomLevel {
    Quarter,
    Half,
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl ZoomLevel {
    const STEPS: [ZoomLevel; 7] = [
        ZoomLevel::Quarter,
        ZoomLevel::Half,
        ZoomLevel::X1,
        ZoomLevel::X2,
        ZoomLevel::X4,
        ZoomLevel::X8,
        ZoomLevel::X16,
    ];

    pub fn factor(self) -> f32 {
        match self {
            ZoomLevel::Quarter => 0.25,
            ZoomLevel::Half => 0.5,
            ZoomLevel::X1 => 1.0,
            ZoomLevel::X2 => 2.0,
            ZoomLevel::X4 => 4.0,
            ZoomLevel::X8 => 8.0,
            ZoomLevel::X16 => 16.0,
        }
    }

    /// Factor applied to window sizes; sub-unit steps are inverted.
    pub fn effective(self) -> f32 {
        let z = self.factor();
        if z >= 1.0 {
            z
        } else {
            1.0 / z
        }
    }

    /// True when the view is magnified past 1x, i.e. panning is meaningful.
    pub fn is_magnified(self) -> bool {
        self.factor() > 1.0
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Next step up, or `None` at the top of the set.
    pub fn step_in(self) -> Option<Self> {
        Self::STEPS.get(self.index() + 1).copied()
    }

    /// Next step down, or `None` at the bottom of the set.
    pub fn step_out(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::STEPS[i])
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomLevel::Quarter => f.write_str("1/4x"),
            ZoomLevel::Half => f.write_str("1/2x"),
            other => write!(f, "{}x", other.factor() as u32),
        }
    }
}

/// Vertical gain steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum AmplitudeZoom {
    #[default]
    X1,
    X2,
    X4,
    X8,
}

impl AmplitudeZoom {
    const STEPS: [AmplitudeZoom; 4] = [
        AmplitudeZoom::X1,
        AmplitudeZoom::X2,
        AmplitudeZoom::X4,
        AmplitudeZoom::X8,
    ];

    pub fn factor(self) -> f32 {
        match self {
            AmplitudeZoom::X1 => 1.0,
            AmplitudeZoom::X2 => 2.0,
            AmplitudeZoom::X4 => 4.0,
            AmplitudeZoom::X8 => 8.0,
        }
    }

    pub fn step_in(self) -> Option<Self> {
        Self::STEPS.get(self as usize + 1).copied()
    }

    pub fn step_out(self) -> Option<Self> {
        (self as usize).checked_sub(1).map(|i| Self::STEPS[i])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscilloscopeState {
    pub mode: ScopeMode,
    pub zoom: ZoomLevel,
    /// Percent of the pannable range, `[0, 100]`.
    pub pan: f32,
    pub amplitude: AmplitudeZoom,
    /// Display samples in `[-1, 1]`.
    pub display: Vec<f32>,
}

impl OscilloscopeState {
    pub fn new(display_len: usize) -> Self {
        Self {
            mode: ScopeMode::default(),
            zoom: ZoomLevel::default(),
            pan: 0.0,
            amplitude: AmplitudeZoom::default(),
            display: vec![0.0; display_len],
        }
    }
}

// ── Performance ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FpsLow,
    FpsCritical,
    MemoryHigh,
    CpuHigh,
    /// Confirmation of an automatic tier change.
    QualityAdjusted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceWarning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub suggested_tier: Option<QualityTier>,
    pub message: String,
    /// Monotonic creation time; drives expiry.
    #[serde(skip)]
    pub created_at: Instant,
    pub issued_at: chrono::DateTime<chrono::Local>,
}

impl PerformanceWarning {
    pub fn new(
        kind: WarningKind,
        severity: Severity,
        suggested_tier: Option<QualityTier>,
        message: impl Into<String>,
        now: Instant,
    ) -> Self {
        Self {
            kind,
            severity,
            suggested_tier,
            message: message.into(),
            created_at: now,
            issued_at: chrono::Local::now(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Latest performance readings; memory and CPU are heuristic estimates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub instant_fps: f32,
    pub average_fps: f32,
    pub memory_mb: f32,
    pub cpu_percent: f32,
    pub frame_skip: u32,
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    Ok,
    Faulted { reason: String },
}

/// Read-only view of the whole engine for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub playing: bool,
    pub profile: QualityProfile,
    pub meter: MeterState,
    pub scope: OscilloscopeState,
    pub spectrum: Vec<f32>,
    pub warnings: Vec<PerformanceWarning>,
    pub performance: PerformanceSnapshot,
    pub backend: BackendStatus,
    pub auto_adjust: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_steps_stop_at_bounds() {
        assert_eq!(ZoomLevel::X16.step_in(), None);
        assert_eq!(ZoomLevel::Quarter.step_out(), None);
        assert_eq!(ZoomLevel::X1.step_in(), Some(ZoomLevel::X2));
        assert_eq!(ZoomLevel::X1.step_out(), Some(ZoomLevel::Half));
    }

    #[test]
    fn test_effective_zoom_inverts_sub_unit() {
        assert_eq!(ZoomLevel::Quarter.effective(), 4.0);
        assert_eq!(ZoomLevel::Half.effective(), 2.0);
        assert_eq!(ZoomLevel::X8.effective(), 8.0);
        assert!(!ZoomLevel::Half.is_magnified());
        assert!(ZoomLevel::X2.is_magnified());
    }

    #[test]
    fn test_amplitude_steps() {
        assert_eq!(AmplitudeZoom::X8.step_in(), None);
        assert_eq!(AmplitudeZoom::X1.step_out(), None);
        assert_eq!(AmplitudeZoom::X2.step_in().map(|a| a.factor()), Some(4.0));
    }

    #[test]
    fn test_default_meter_at_rest() {
        let m = MeterState::default();
        assert_eq!(m.loudness, LOUDNESS_FLOOR);
        assert_eq!(m.phase_points.len(), PHASE_POINT_COUNT);
        assert_eq!(m.left.max_value(), 0.0);
    }

    #[test]
    fn test_backend_status_json() {
        let json = serde_json::to_string(&BackendStatus::Faulted {
            reason: "no device".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"status\":\"faulted\""));
        assert!(json.contains("no device"));
    }
}
