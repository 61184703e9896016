//! Stateless level processors over unsigned 8-bit sample buffers.
//!
//! Samples are centred at 128. Every processor subsamples with a stride to
//! keep per-tick cost flat as the analysis window grows.

use deck_proto::state::LOUDNESS_FLOOR;

/// Default subsampling stride.
pub const DEFAULT_STRIDE: usize = 4;

/// Empirical gain that maps typical programme RMS onto the 0..100 meter scale.
const RMS_GAIN: f32 = 150.0;

const CENTER: f32 = 128.0;

/// Normalise one byte sample to roughly `[-1, 1)`.
#[inline]
pub fn centered(sample: u8) -> f32 {
    (sample as f32 - CENTER) / CENTER
}

/// Subsampled RMS of the buffer, scaled to `[0, 100]`. Empty buffers give 0.
pub fn rms(buffer: &[u8], stride: usize) -> f32 {
    let stride = stride.max(1);
    let mut sum_sq = 0.0_f32;
    let mut n = 0usize;
    for &s in buffer.iter().step_by(stride) {
        let v = centered(s);
        sum_sq += v * v;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    ((sum_sq / n as f32).sqrt() * RMS_GAIN).clamp(0.0, 100.0)
}

/// Subsampled maximum deviation from centre, scaled to `[0, 100]`.
pub fn peak(buffer: &[u8], stride: usize) -> f32 {
    let stride = stride.max(1);
    let max = buffer
        .iter()
        .step_by(stride)
        .map(|&s| centered(s).abs())
        .fold(0.0_f32, f32::max);
    (max * 100.0).clamp(0.0, 100.0)
}

/// Cheap loudness estimate from the two channel RMS values.
///
/// This is a placeholder heuristic, not a calibrated LUFS measurement.
pub fn loudness_proxy(left_rms: f32, right_rms: f32) -> f32 {
    let avg = (left_rms + right_rms) / 2.0;
    (-50.0 + avg * 0.3).clamp(LOUDNESS_FLOOR, 0.0)
}

/// Split an interleaved-by-halves buffer into (left, right).
pub fn split_channels(buffer: &[u8]) -> (&[u8], &[u8]) {
    buffer.split_at(buffer.len() / 2)
}
