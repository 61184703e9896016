//! Meter ballistics: VU/PPM needles, peak holds, loudness, correlation and
//! phase-scope points smoothed from the time-domain buffer.
//!
//! VU averages (slow rise, quick fall); PPM follows peaks (fast rise, slow
//! fall). Both run on the meter tick cadence chosen by the quality profile.

use deck_proto::state::{ChannelLevels, MeterState, PhasePoint, LOUDNESS_FLOOR, PHASE_POINT_COUNT};

use crate::signal::{self, DEFAULT_STRIDE};

const VU_ATTACK: f32 = 0.3;
const VU_RELEASE: f32 = 0.9;
const PPM_ATTACK: f32 = 0.8;
const PPM_RELEASE: f32 = 0.95;
const VU_HOLD_DECAY: f32 = 0.98;
const PPM_HOLD_DECAY: f32 = 0.99;
const LOUDNESS_SMOOTHING: f32 = 0.95;
const CORRELATION_SMOOTHING: f32 = 0.9;
/// Upper bound on sample pairs read for correlation.
const CORRELATION_POINTS: usize = 32;

/// Per-step factor of the decay-on-stop loop.
const STOP_DECAY: f32 = 0.85;
/// Below this everything snaps to rest and the decay loop may halt.
const NEGLIGIBLE: f32 = 0.05;

/// Instantaneous measurements for one channel half.
#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    rms: f32,
    peak: f32,
}

impl Reading {
    fn of(half: &[u8]) -> Self {
        Self {
            rms: signal::rms(half, DEFAULT_STRIDE),
            peak: signal::peak(half, DEFAULT_STRIDE),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeterBallistics {
    state: MeterState,
}

impl MeterBallistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MeterState {
        &self.state
    }

    /// Advance one meter tick from a time-domain buffer (left half, right half).
    pub fn update(&mut self, time_domain: &[u8]) {
        let (left, right) = signal::split_channels(time_domain);
        let l = Reading::of(left);
        let r = Reading::of(right);

        apply_ballistics(&mut self.state.left, l);
        apply_ballistics(&mut self.state.right, r);

        let proxy = signal::loudness_proxy(l.rms, r.rms);
        self.state.loudness =
            self.state.loudness * LOUDNESS_SMOOTHING + proxy * (1.0 - LOUDNESS_SMOOTHING);

        let instant_corr = correlation(left, right);
        self.state.correlation = (self.state.correlation * CORRELATION_SMOOTHING
            + instant_corr * (1.0 - CORRELATION_SMOOTHING))
            .clamp(-1.0, 1.0);

        self.state.phase_points = phase_points(left, right);
    }

    /// One step of the decay-on-stop loop. Returns `true` once at rest.
    pub fn decay_step(&mut self) -> bool {
        for ch in [&mut self.state.left, &mut self.state.right] {
            ch.vu = settle(ch.vu * STOP_DECAY);
            ch.vu_hold = settle(ch.vu_hold * STOP_DECAY);
            ch.ppm = settle(ch.ppm * STOP_DECAY);
            ch.ppm_hold = settle(ch.ppm_hold * STOP_DECAY);
        }
        self.state.correlation = settle(self.state.correlation * STOP_DECAY);

        let above_floor = (self.state.loudness - LOUDNESS_FLOOR) * STOP_DECAY;
        self.state.loudness = LOUDNESS_FLOOR + settle(above_floor);

        for p in self.state.phase_points.iter_mut() {
            *p = PhasePoint::default();
        }

        self.is_at_rest()
    }

    pub fn is_at_rest(&self) -> bool {
        let channels_rest = [self.state.left, self.state.right]
            .iter()
            .all(|ch| ch.max_value() < NEGLIGIBLE);
        channels_rest
            && self.state.correlation.abs() < NEGLIGIBLE
            && self.state.loudness - LOUDNESS_FLOOR < NEGLIGIBLE
    }

    pub fn reset(&mut self) {
        self.state = MeterState::default();
    }
}

fn apply_ballistics(ch: &mut ChannelLevels, reading: Reading) {
    ch.vu = if reading.rms > ch.vu {
        ch.vu * (1.0 - VU_ATTACK) + reading.rms * VU_ATTACK
    } else {
        ch.vu * VU_RELEASE
    };
    ch.ppm = if reading.peak > ch.ppm {
        ch.ppm * (1.0 - PPM_ATTACK) + reading.peak * PPM_ATTACK
    } else {
        ch.ppm * PPM_RELEASE
    };

    ch.vu_hold = (ch.vu_hold * VU_HOLD_DECAY).max(reading.rms);
    ch.ppm_hold = (ch.ppm_hold * PPM_HOLD_DECAY).max(reading.peak);
}

fn settle(v: f32) -> f32 {
    if v.abs() < NEGLIGIBLE {
        0.0
    } else {
        v
    }
}

/// Mean of `l[i] * r[i]` over at most `CORRELATION_POINTS` evenly spaced pairs.
fn correlation(left: &[u8], right: &[u8]) -> f32 {
    let len = left.len().min(right.len());
    if len == 0 {
        return 0.0;
    }
    let points = len.min(CORRELATION_POINTS);
    let step = len / points;
    let sum: f32 = (0..points)
        .map(|k| {
            let i = k * step;
            signal::centered(left[i]) * signal::centered(right[i])
        })
        .sum();
    sum / points as f32
}

fn phase_points(left: &[u8], right: &[u8]) -> Vec<PhasePoint> {
    let len = left.len().min(right.len());
    if len == 0 {
        return vec![PhasePoint::default(); PHASE_POINT_COUNT];
    }
    (0..PHASE_POINT_COUNT)
        .map(|k| {
            let i = k * len / PHASE_POINT_COUNT;
            PhasePoint {
                x: signal::centered(left[i]).clamp(-1.0, 1.0),
                y: signal::centered(right[i]).clamp(-1.0, 1.0),
            }
        })
        .collect()
}
