use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;
use super::quality::QualityTier;
use super::state::ScopeMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub lab: LabConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub initial_tier: QualityTier,
    /// Let the performance monitor downgrade the tier on critical warnings.
    #[serde(default = "default_auto_adjust")]
    pub auto_adjust: bool,
}

/// Thresholds and timings for the performance monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_critical_fps")]
    pub critical_fps: f32,
    #[serde(default = "default_low_fps")]
    pub low_fps: f32,
    /// Consecutive critical checks before a critical FPS warning.
    #[serde(default = "default_critical_streak")]
    pub critical_streak: u32,
    /// Consecutive low-average checks before a low FPS warning.
    #[serde(default = "default_low_streak")]
    pub low_streak: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_warning_ttl_ms")]
    pub warning_ttl_ms: u64,
    #[serde(default = "default_downgrade_delay_ms")]
    pub downgrade_delay_ms: u64,
    #[serde(default = "default_memory_warn_mb")]
    pub memory_warn_mb: f32,
    #[serde(default = "default_memory_critical_mb")]
    pub memory_critical_mb: f32,
    #[serde(default = "default_cpu_warn_pct")]
    pub cpu_warn_pct: f32,
    #[serde(default = "default_cpu_critical_pct")]
    pub cpu_critical_pct: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumConfig {
    #[serde(default = "default_min_hz")]
    pub min_hz: f32,
    #[serde(default = "default_max_hz")]
    pub max_hz: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub mode: ScopeMode,
}

/// Settings only the lab front end reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_tone_hz")]
    pub tone_hz: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            initial_tier: QualityTier::default(),
            auto_adjust: default_auto_adjust(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            critical_fps: default_critical_fps(),
            low_fps: default_low_fps(),
            critical_streak: default_critical_streak(),
            low_streak: default_low_streak(),
            cooldown_ms: default_cooldown_ms(),
            warning_ttl_ms: default_warning_ttl_ms(),
            downgrade_delay_ms: default_downgrade_delay_ms(),
            memory_warn_mb: default_memory_warn_mb(),
            memory_critical_mb: default_memory_critical_mb(),
            cpu_warn_pct: default_cpu_warn_pct(),
            cpu_critical_pct: default_cpu_critical_pct(),
        }
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            min_hz: default_min_hz(),
            max_hz: default_max_hz(),
            sample_rate: default_sample_rate(),
            intensity: default_intensity(),
        }
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            tone_hz: default_tone_hz(),
        }
    }
}

fn default_auto_adjust() -> bool {
    true
}

fn default_critical_fps() -> f32 {
    24.0
}

fn default_low_fps() -> f32 {
    45.0
}

fn default_critical_streak() -> u32 {
    3
}

fn default_low_streak() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_warning_ttl_ms() -> u64 {
    10_000
}

fn default_downgrade_delay_ms() -> u64 {
    500
}

fn default_memory_warn_mb() -> f32 {
    200.0
}

fn default_memory_critical_mb() -> f32 {
    280.0
}

fn default_cpu_warn_pct() -> f32 {
    60.0
}

fn default_cpu_critical_pct() -> f32 {
    80.0
}

fn default_min_hz() -> f32 {
    20.0
}

fn default_max_hz() -> f32 {
    20_000.0
}

fn default_sample_rate() -> f32 {
    44_100.0
}

fn default_intensity() -> f32 {
    1.0
}

fn default_frame_rate() -> u32 {
    60
}

fn default_tone_hz() -> f32 {
    440.0
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Only called to seed a missing file; user changes are never written back.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        tracing::info!("wrote default config to {}", config_path.display());
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.quality.auto_adjust);
        assert_eq!(config.quality.initial_tier, QualityTier::High);
        assert_eq!(config.performance.cooldown_ms, 5_000);
        assert_eq!(config.performance.warning_ttl_ms, 10_000);
        assert_eq!(config.performance.critical_streak, 3);
        assert_eq!(config.performance.low_streak, 5);
        // Ultra while playing estimates 160 MB and must sit below the warn line
        assert_eq!(config.performance.memory_warn_mb, 200.0);
        assert_eq!(config.performance.memory_critical_mb, 280.0);
        assert_eq!(config.scope.mode, ScopeMode::Time);
        assert!(Config::config_path().ends_with("deck/config.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [quality]
            initial_tier = "low"

            [performance]
            critical_fps = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(config.quality.initial_tier, QualityTier::Low);
        assert!(config.quality.auto_adjust);
        assert_eq!(config.performance.critical_fps, 20.0);
        assert_eq!(config.performance.low_fps, 45.0);
        assert_eq!(config.spectrum.max_hz, 20_000.0);
        assert_eq!(config.lab.frame_rate, 60);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.scope.mode = ScopeMode::Freq;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.scope.mode, ScopeMode::Freq);
    }
}
