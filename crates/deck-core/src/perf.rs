//! Frame-rate monitor with hysteresis, rate-limited warnings and automatic
//! quality downgrades.
//!
//! The monitor only *requests* a tier change: it schedules a pending
//! downgrade, and the render loop applies it when due and reports back
//! through [`PerformanceMonitor::tier_changed`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use deck_proto::config::PerformanceConfig;
use deck_proto::state::{PerformanceSnapshot, PerformanceWarning, Severity, WarningKind};
use deck_proto::{QualityProfile, QualityTier};

const HISTORY_LEN: usize = 10;

const BASE_MEMORY_MB: f32 = 64.0;
const BASE_CPU_PCT: f32 = 15.0;
const PLAYING_ACTIVITY: f32 = 1.25;
const IDLE_ACTIVITY: f32 = 1.0;

const SKIP_ONE_BELOW_FPS: f32 = 30.0;
const SKIP_TWO_BELOW_FPS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingDowngrade {
    tier: QualityTier,
    due: Instant,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    config: PerformanceConfig,
    auto_adjust: bool,

    frames: u32,
    last_check: Option<Instant>,
    history: VecDeque<f32>,
    snapshot: PerformanceSnapshot,

    critical_fps_count: u32,
    low_fps_count: u32,
    last_emitted: Option<Instant>,
    warnings: Vec<PerformanceWarning>,
    pending: Option<PendingDowngrade>,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig, auto_adjust: bool) -> Self {
        Self {
            config,
            auto_adjust,
            frames: 0,
            last_check: None,
            history: VecDeque::with_capacity(HISTORY_LEN),
            snapshot: PerformanceSnapshot::default(),
            critical_fps_count: 0,
            low_fps_count: 0,
            last_emitted: None,
            warnings: Vec::new(),
            pending: None,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    /// Start a fresh measurement window at `now` without touching counters.
    pub fn rebase(&mut self, now: Instant) {
        self.frames = 0;
        self.last_check = Some(now);
    }

    /// Run one performance check. Returns how many warnings were emitted.
    pub fn check(&mut self, now: Instant, profile: &QualityProfile, playing: bool) -> usize {
        let Some(last) = self.last_check else {
            self.rebase(now);
            return 0;
        };
        let elapsed = now.saturating_duration_since(last).as_secs_f32();
        if elapsed <= 0.0 {
            return 0;
        }

        let fps = self.frames as f32 / elapsed;
        self.rebase(now);

        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(fps);
        let average = self.history.iter().sum::<f32>() / self.history.len() as f32;

        let tier = profile.tier;
        let activity = if playing { PLAYING_ACTIVITY } else { IDLE_ACTIVITY };
        let target = profile.target_fps as f32;
        let load = if average >= target {
            1.0
        } else {
            target / average.max(1.0)
        };
        let memory_mb = BASE_MEMORY_MB * tier.cost_multiplier() * activity;
        let cpu_percent = (BASE_CPU_PCT * tier.cost_multiplier() * activity * load).min(100.0);

        self.snapshot = PerformanceSnapshot {
            instant_fps: fps,
            average_fps: average,
            memory_mb,
            cpu_percent,
            frame_skip: frame_skip_for(average),
        };

        if fps < self.config.critical_fps {
            self.critical_fps_count = self.critical_fps_count.saturating_add(1);
        } else {
            self.critical_fps_count = self.critical_fps_count.saturating_sub(1);
        }
        if average < self.config.low_fps {
            self.low_fps_count = self.low_fps_count.saturating_add(1);
        } else {
            self.low_fps_count = self.low_fps_count.saturating_sub(1);
        }

        tracing::debug!(
            fps,
            average,
            memory_mb,
            cpu_percent,
            critical = self.critical_fps_count,
            low = self.low_fps_count,
            "performance check"
        );

        let candidates = self.collect_warnings(now, tier);
        if candidates.is_empty() || self.in_cooldown(now) {
            return 0;
        }

        self.last_emitted = Some(now);
        let emitted = candidates.len();
        for w in &candidates {
            tracing::warn!(kind = ?w.kind, severity = ?w.severity, "{}", w.message);
        }
        self.schedule_downgrade(&candidates, tier, now);
        self.warnings.extend(candidates);
        emitted
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.last_emitted.is_some_and(|t| {
            now.saturating_duration_since(t) < Duration::from_millis(self.config.cooldown_ms)
        })
    }

    fn collect_warnings(&self, now: Instant, tier: QualityTier) -> Vec<PerformanceWarning> {
        let cfg = &self.config;
        let snap = &self.snapshot;
        let suggested = Some(tier.lower());
        let mut out = Vec::new();

        if self.critical_fps_count >= cfg.critical_streak {
            out.push(PerformanceWarning::new(
                WarningKind::FpsCritical,
                Severity::Critical,
                suggested,
                format!("frame rate critical: {:.0} fps", snap.instant_fps),
                now,
            ));
        }
        if self.low_fps_count >= cfg.low_streak {
            out.push(PerformanceWarning::new(
                WarningKind::FpsLow,
                Severity::Warning,
                suggested,
                format!("average frame rate low: {:.0} fps", snap.average_fps),
                now,
            ));
        }
        // Estimates ride on the average; one sample is not enough to grade
        if self.history.len() < cfg.critical_streak as usize {
            return out;
        }
        if let Some(severity) = grade(snap.memory_mb, cfg.memory_warn_mb, cfg.memory_critical_mb) {
            out.push(PerformanceWarning::new(
                WarningKind::MemoryHigh,
                severity,
                suggested,
                format!("memory estimate high: {:.0} MB", snap.memory_mb),
                now,
            ));
        }
        if let Some(severity) = grade(snap.cpu_percent, cfg.cpu_warn_pct, cfg.cpu_critical_pct) {
            out.push(PerformanceWarning::new(
                WarningKind::CpuHigh,
                severity,
                suggested,
                format!("cpu estimate high: {:.0}%", snap.cpu_percent),
                now,
            ));
        }
        out
    }

    fn schedule_downgrade(&mut self, emitted: &[PerformanceWarning], tier: QualityTier, now: Instant) {
        if !self.auto_adjust || self.pending.is_some() {
            return;
        }
        let target = emitted
            .iter()
            .filter(|w| w.is_critical())
            .filter_map(|w| w.suggested_tier)
            .filter(|&t| t < tier)
            .max();
        if let Some(target) = target {
            let due = now + Duration::from_millis(self.config.downgrade_delay_ms);
            tracing::info!("scheduling quality downgrade {} -> {}", tier, target);
            self.pending = Some(PendingDowngrade { tier: target, due });
        }
    }

    pub fn has_pending_downgrade(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending downgrade if its delay has elapsed.
    pub fn take_due_downgrade(&mut self, now: Instant) -> Option<QualityTier> {
        match self.pending {
            Some(p) if now >= p.due => {
                self.pending = None;
                Some(p.tier)
            }
            _ => None,
        }
    }

    /// Notify the monitor that the active tier changed.
    ///
    /// Clears hysteresis counters, fps history and any pending downgrade.
    /// `automatic` changes also push an informational confirmation, which is
    /// not subject to the cooldown and does not restart it.
    pub fn tier_changed(&mut self, from: QualityTier, to: QualityTier, now: Instant, automatic: bool) {
        self.critical_fps_count = 0;
        self.low_fps_count = 0;
        self.history.clear();
        self.pending = None;
        self.rebase(now);

        if automatic {
            self.warnings.push(PerformanceWarning::new(
                WarningKind::QualityAdjusted,
                Severity::Info,
                Some(to),
                format!("quality lowered from {} to {}", from, to),
                now,
            ));
        }
    }

    /// Drop warnings older than the configured lifetime. Returns `true` while
    /// any remain.
    pub fn expire(&mut self, now: Instant) -> bool {
        let ttl = Duration::from_millis(self.config.warning_ttl_ms);
        self.warnings
            .retain(|w| now.saturating_duration_since(w.created_at) < ttl);
        !self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[PerformanceWarning] {
        &self.warnings
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.snapshot
    }

    pub fn frame_skip(&self) -> u32 {
        self.snapshot.frame_skip
    }

    pub fn auto_adjust(&self) -> bool {
        self.auto_adjust
    }

    pub fn set_auto_adjust(&mut self, enabled: bool) {
        self.auto_adjust = enabled;
        if !enabled {
            self.pending = None;
        }
    }
}

fn grade(value: f32, warn: f32, critical: f32) -> Option<Severity> {
    if value >= critical {
        Some(Severity::Critical)
    } else if value >= warn {
        Some(Severity::Warning)
    } else {
        None
    }
}

fn frame_skip_for(average_fps: f32) -> u32 {
    if average_fps < SKIP_TWO_BELOW_FPS {
        2
    } else if average_fps < SKIP_ONE_BELOW_FPS {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    /// Drive `checks` one-second checks at a steady `fps`.
    fn run(m: &mut PerformanceMonitor, t: &mut Instant, profile: &QualityProfile, fps: u32, checks: usize) -> Vec<usize> {
        (0..checks)
            .map(|_| {
                for _ in 0..fps {
                    m.record_frame();
                }
                *t += SECOND;
                m.check(*t, profile, true)
            })
            .collect()
    }

    fn started(auto_adjust: bool) -> (PerformanceMonitor, Instant) {
        let mut m = PerformanceMonitor::new(PerformanceConfig::default(), auto_adjust);
        let t0 = Instant::now();
        assert_eq!(m.check(t0, &QualityProfile::for_tier(QualityTier::Medium), true), 0);
        (m, t0)
    }

    #[test]
    fn test_nominal_fps_is_quiet() {
        let (mut m, mut t) = started(true);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        let emitted = run(&mut m, &mut t, &profile, 60, 12);
        assert!(emitted.iter().all(|&n| n == 0));
        assert!(m.warnings().is_empty());
        assert_eq!(m.frame_skip(), 0);
        assert!((m.snapshot().average_fps - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_critical_needs_three_checks() {
        let (mut m, mut t) = started(false);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        let emitted = run(&mut m, &mut t, &profile, 20, 3);
        assert_eq!(emitted, vec![0, 0, 1]);
        let w = &m.warnings()[0];
        assert_eq!(w.kind, WarningKind::FpsCritical);
        assert_eq!(w.suggested_tier, Some(QualityTier::Low));
    }

    #[test]
    fn test_cooldown_limits_to_one_per_window() {
        let (mut m, mut t) = started(false);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        run(&mut m, &mut t, &profile, 20, 7);
        let critical = m
            .warnings()
            .iter()
            .filter(|w| w.kind == WarningKind::FpsCritical)
            .count();
        assert_eq!(critical, 1);

        // Cooldown over at check 8: critical and low are emitted together
        let emitted = run(&mut m, &mut t, &profile, 20, 1);
        assert_eq!(emitted, vec![2]);
    }

    #[test]
    fn test_hysteresis_decrements() {
        let (mut m, mut t) = started(false);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        run(&mut m, &mut t, &profile, 20, 2);
        run(&mut m, &mut t, &profile, 60, 1);
        // 2 - 1 = 1, so two more bad checks are needed
        run(&mut m, &mut t, &profile, 20, 1);
        assert!(m.warnings().is_empty());
        run(&mut m, &mut t, &profile, 20, 1);
        assert!(m
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::FpsCritical));
    }

    #[test]
    fn test_low_tier_suggests_low() {
        let (mut m, mut t) = started(true);
        let profile = QualityProfile::for_tier(QualityTier::Low);
        run(&mut m, &mut t, &profile, 10, 3);
        let w = m
            .warnings()
            .iter()
            .find(|w| w.kind == WarningKind::FpsCritical)
            .map(|w| w.suggested_tier);
        assert_eq!(w, Some(Some(QualityTier::Low)));
        assert!(!m.has_pending_downgrade());
    }

    #[test]
    fn test_auto_downgrade_after_delay() {
        let (mut m, mut t) = started(true);
        let profile = QualityProfile::for_tier(QualityTier::High);
        // 20 fps against a 60 fps target: fps and cpu go critical together
        assert_eq!(run(&mut m, &mut t, &profile, 20, 3), vec![0, 0, 2]);
        let kinds: Vec<_> = m.warnings().iter().map(|w| (w.kind, w.severity)).collect();
        assert_eq!(
            kinds,
            vec![
                (WarningKind::FpsCritical, Severity::Critical),
                (WarningKind::CpuHigh, Severity::Critical),
            ]
        );
        assert!(m.has_pending_downgrade());
        assert_eq!(m.take_due_downgrade(t + Duration::from_millis(499)), None);
        assert_eq!(
            m.take_due_downgrade(t + Duration::from_millis(500)),
            Some(QualityTier::Medium)
        );
        assert!(!m.has_pending_downgrade());

        m.tier_changed(QualityTier::High, QualityTier::Medium, t, true);
        let info = m.warnings().last().map(|w| (w.kind, w.severity));
        assert_eq!(info, Some((WarningKind::QualityAdjusted, Severity::Info)));
    }

    #[test]
    fn test_single_slow_check_is_not_graded() {
        let (mut m, mut t) = started(true);
        let profile = QualityProfile::for_tier(QualityTier::High);
        assert_eq!(run(&mut m, &mut t, &profile, 20, 1), vec![0]);
        assert!(m.snapshot().cpu_percent >= 80.0);
        assert_eq!(run(&mut m, &mut t, &profile, 60, 1), vec![0]);
        assert!(m.warnings().is_empty());
        assert!(!m.has_pending_downgrade());
    }

    #[test]
    fn test_slow_check_after_tier_change_is_not_graded() {
        let (mut m, mut t) = started(true);
        let high = QualityProfile::for_tier(QualityTier::High);
        run(&mut m, &mut t, &high, 60, 5);
        m.tier_changed(QualityTier::Ultra, QualityTier::High, t, false);
        assert_eq!(run(&mut m, &mut t, &high, 20, 1), vec![0]);
        assert!(!m.has_pending_downgrade());
    }

    #[test]
    fn test_ultra_at_full_rate_is_quiet() {
        let (mut m, mut t) = started(true);
        let ultra = QualityProfile::for_tier(QualityTier::Ultra);
        let emitted = run(&mut m, &mut t, &ultra, 60, 30);
        assert!(emitted.iter().all(|&n| n == 0));
        assert!(m.warnings().is_empty());
    }

    #[test]
    fn test_tier_change_resets_counters() {
        let (mut m, mut t) = started(false);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        run(&mut m, &mut t, &profile, 20, 2);
        m.tier_changed(QualityTier::Medium, QualityTier::Low, t, false);
        let low = QualityProfile::for_tier(QualityTier::Low);
        assert_eq!(run(&mut m, &mut t, &low, 20, 2), vec![0, 0]);
    }

    #[test]
    fn test_disabling_auto_adjust_drops_pending() {
        let (mut m, mut t) = started(true);
        let profile = QualityProfile::for_tier(QualityTier::Ultra);
        run(&mut m, &mut t, &profile, 10, 3);
        assert!(m.has_pending_downgrade());
        m.set_auto_adjust(false);
        assert_eq!(m.take_due_downgrade(t + SECOND), None);
    }

    #[test]
    fn test_expiry_after_ttl() {
        let (mut m, mut t) = started(false);
        let profile = QualityProfile::for_tier(QualityTier::Medium);
        run(&mut m, &mut t, &profile, 20, 3);
        assert!(m.expire(t + Duration::from_millis(9_999)));
        assert!(!m.expire(t + Duration::from_secs(10)));
        assert!(m.warnings().is_empty());
    }

    #[test]
    fn test_frame_skip_thresholds() {
        assert_eq!(frame_skip_for(45.0), 0);
        assert_eq!(frame_skip_for(29.0), 1);
        assert_eq!(frame_skip_for(19.0), 2);
    }

    #[test]
    fn test_estimates_follow_tier() {
        let (mut m, mut t) = started(false);
        let ultra = QualityProfile::for_tier(QualityTier::Ultra);
        run(&mut m, &mut t, &ultra, 60, 1);
        let s = m.snapshot();
        assert_eq!(s.memory_mb, 160.0);
        assert_eq!(s.cpu_percent, 37.5);
    }
}
