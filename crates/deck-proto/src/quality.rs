//! Quality tiers and the profile registry derived from them.
//!
//! A tier is the single knob the performance monitor turns. Every other
//! resolution parameter (analysis window, display buffer length, refresh
//! cadences, bar and segment counts) is looked up from it here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete quality tier. Ordered `Low < Medium < High < Ultra`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl Default for QualityTier {
    fn default() -> Self {
        QualityTier::High
    }
}

impl QualityTier {
    /// All tiers, highest first.
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Ultra,
        QualityTier::High,
        QualityTier::Medium,
        QualityTier::Low,
    ];

    /// Next cheaper tier. `Low` stays `Low`.
    pub fn lower(self) -> Self {
        match self {
            QualityTier::Ultra => QualityTier::High,
            QualityTier::High => QualityTier::Medium,
            QualityTier::Medium | QualityTier::Low => QualityTier::Low,
        }
    }

    /// Next richer tier. `Ultra` stays `Ultra`.
    pub fn higher(self) -> Self {
        match self {
            QualityTier::Low => QualityTier::Medium,
            QualityTier::Medium => QualityTier::High,
            QualityTier::High | QualityTier::Ultra => QualityTier::Ultra,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Ultra => "ultra",
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }

    /// Relative resource weight used by the performance estimators.
    pub fn cost_multiplier(self) -> f32 {
        match self {
            QualityTier::Ultra => 2.0,
            QualityTier::High => 1.5,
            QualityTier::Medium => 1.0,
            QualityTier::Low => 0.7,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ultra" => Ok(QualityTier::Ultra),
            "high" => Ok(QualityTier::High),
            "medium" | "med" => Ok(QualityTier::Medium),
            "low" => Ok(QualityTier::Low),
            other => anyhow::bail!("unknown quality tier '{}'", other),
        }
    }
}

/// Parameters derived from a [`QualityTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub tier: QualityTier,
    /// FFT size handed to the backend. Sample buffers hold half of this.
    pub analysis_window_size: usize,
    /// Length of the oscilloscope display buffer.
    pub display_buffer_size: usize,
    pub meter_update_interval_ms: u64,
    pub waveform_update_interval_ms: u64,
    pub performance_check_interval_ms: u64,
    /// Spectrum columns shown in the waveform bar display.
    pub waveform_bar_count: usize,
    pub meter_segment_count: usize,
    /// Frame rate this tier is expected to sustain.
    pub target_fps: u32,
}

impl QualityProfile {
    pub fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Ultra => Self {
                tier,
                analysis_window_size: 2048,
                display_buffer_size: 1024,
                meter_update_interval_ms: 16,
                waveform_update_interval_ms: 16,
                performance_check_interval_ms: 1000,
                waveform_bar_count: 128,
                meter_segment_count: 40,
                target_fps: 60,
            },
            QualityTier::High => Self {
                tier,
                analysis_window_size: 512,
                display_buffer_size: 512,
                meter_update_interval_ms: 33,
                waveform_update_interval_ms: 33,
                performance_check_interval_ms: 1000,
                waveform_bar_count: 64,
                meter_segment_count: 30,
                target_fps: 60,
            },
            QualityTier::Medium => Self {
                tier,
                analysis_window_size: 128,
                display_buffer_size: 256,
                meter_update_interval_ms: 50,
                waveform_update_interval_ms: 66,
                performance_check_interval_ms: 1000,
                waveform_bar_count: 32,
                meter_segment_count: 20,
                target_fps: 45,
            },
            QualityTier::Low => Self {
                tier,
                analysis_window_size: 64,
                display_buffer_size: 128,
                meter_update_interval_ms: 100,
                waveform_update_interval_ms: 100,
                performance_check_interval_ms: 1000,
                waveform_bar_count: 16,
                meter_segment_count: 12,
                target_fps: 30,
            },
        }
    }

    /// Number of bins in each per-tick sample buffer.
    pub fn bin_count(&self) -> usize {
        self.analysis_window_size / 2
    }
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self::for_tier(QualityTier::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_bars_non_decreasing_with_tier() {
        // ALL is ordered highest first
        for pair in QualityTier::ALL.windows(2) {
            let hi = QualityProfile::for_tier(pair[0]);
            let lo = QualityProfile::for_tier(pair[1]);
            assert!(hi.display_buffer_size >= lo.display_buffer_size);
            assert!(hi.waveform_bar_count >= lo.waveform_bar_count);
        }
    }

    #[test]
    fn test_higher_tiers_dominate() {
        for pair in QualityTier::ALL.windows(2) {
            let hi = QualityProfile::for_tier(pair[0]);
            let lo = QualityProfile::for_tier(pair[1]);
            assert!(hi.analysis_window_size > lo.analysis_window_size);
            assert!(hi.meter_segment_count > lo.meter_segment_count);
            assert!(hi.meter_update_interval_ms <= lo.meter_update_interval_ms);
            assert!(hi.waveform_update_interval_ms <= lo.waveform_update_interval_ms);
            assert!(hi.tier > lo.tier);
        }
    }

    #[test]
    fn test_medium_has_64_bins() {
        assert_eq!(QualityProfile::for_tier(QualityTier::Medium).bin_count(), 64);
    }

    #[test]
    fn test_lower_and_higher_saturate() {
        assert_eq!(QualityTier::Low.lower(), QualityTier::Low);
        assert_eq!(QualityTier::Ultra.higher(), QualityTier::Ultra);
        assert_eq!(QualityTier::High.lower(), QualityTier::Medium);
        assert!(QualityTier::Medium.lower() < QualityTier::Medium);
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!("ULTRA".parse::<QualityTier>().unwrap(), QualityTier::Ultra);
        assert_eq!(" med ".parse::<QualityTier>().unwrap(), QualityTier::Medium);
        assert!("potato".parse::<QualityTier>().is_err());
    }
}
