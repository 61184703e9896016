//! Log-frequency column mapping over linear FFT bins.
//!
//! Each display column owns a contiguous window of bins. Windows never
//! overlap, every bin belongs to exactly one column, and every column has at
//! least one bin. The mapping is cached and rebuilt only when the bin count or
//! column count changes.

use std::ops::Range;

use deck_proto::config::SpectrumConfig;

const MIN_INTENSITY: f32 = 0.1;
const MAX_INTENSITY: f32 = 4.0;
const DECAY_FACTOR: f32 = 0.95;
const DECAY_OFFSET: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct SpectrumMapper {
    min_hz: f32,
    max_hz: f32,
    sample_rate: f32,
    intensity: f32,
    bin_count: usize,
    /// Start bin of every column; the last column ends at `bin_count`.
    starts: Vec<usize>,
    values: Vec<f32>,
}

impl SpectrumMapper {
    pub fn new(config: &SpectrumConfig, bin_count: usize, columns: usize) -> Self {
        let mut mapper = Self {
            min_hz: config.min_hz.max(1.0),
            max_hz: config.max_hz,
            sample_rate: config.sample_rate,
            intensity: config.intensity.clamp(MIN_INTENSITY, MAX_INTENSITY),
            bin_count: 0,
            starts: Vec::new(),
            values: Vec::new(),
        };
        mapper.resize(bin_count, columns);
        mapper
    }

    /// Rebuild the mapping if `(bin_count, columns)` differ from the cached
    /// shape. Column values are zeroed on any rebuild.
    pub fn resize(&mut self, bin_count: usize, columns: usize) {
        let columns = columns.min(bin_count);
        if bin_count == self.bin_count && columns == self.starts.len() {
            return;
        }
        self.bin_count = bin_count;
        self.starts = self.build_starts(bin_count, columns);
        self.values = vec![0.0; columns];
    }

    fn build_starts(&self, bin_count: usize, columns: usize) -> Vec<usize> {
        if columns == 0 {
            return Vec::new();
        }
        let nyquist = self.sample_rate / 2.0;
        let ratio = self.max_hz / self.min_hz;

        let mut starts = Vec::with_capacity(columns);
        let mut prev = 0usize;
        for i in 0..columns {
            let start = if i == 0 {
                0
            } else {
                let freq = self.min_hz * ratio.powf(i as f32 / columns as f32);
                let raw = (freq / nyquist * bin_count as f32).round() as usize;
                // Strictly increasing, and leave one bin for each remaining column
                raw.max(prev + 1).min(bin_count - (columns - i))
            };
            starts.push(start);
            prev = start;
        }
        starts
    }

    pub fn columns(&self) -> usize {
        self.starts.len()
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Bin range owned by each column, in column order.
    pub fn windows(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.starts.iter().enumerate().map(move |(i, &start)| {
            let end = self.starts.get(i + 1).copied().unwrap_or(self.bin_count);
            start..end
        })
    }

    /// Raw per-column averages in `0..=255`. Bins missing from a short input
    /// count as silence.
    pub fn aggregate(&self, freq_bins: &[u8]) -> Vec<f32> {
        self.windows()
            .map(|w| {
                let len = w.len();
                let sum: u32 = w
                    .map(|b| freq_bins.get(b).copied().unwrap_or(0) as u32)
                    .sum();
                sum as f32 / len as f32
            })
            .collect()
    }

    /// Map bins into display columns scaled to `[0, 100]`.
    pub fn process(&mut self, freq_bins: &[u8]) -> &[f32] {
        let averages = self.aggregate(freq_bins);
        for (v, avg) in self.values.iter_mut().zip(averages) {
            *v = (avg / 255.0 * 100.0 * self.intensity).clamp(0.0, 100.0);
        }
        &self.values
    }

    /// One step of the inactive fall-off.
    pub fn decay(&mut self) {
        for v in self.values.iter_mut() {
            *v = (*v * DECAY_FACTOR - DECAY_OFFSET).max(0.0);
        }
    }

    pub fn is_at_rest(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
    }

    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(bins: usize, columns: usize) -> SpectrumMapper {
        SpectrumMapper::new(&SpectrumConfig::default(), bins, columns)
    }

    fn assert_partition(m: &SpectrumMapper) {
        let mut expected_start = 0;
        for w in m.windows() {
            assert_eq!(w.start, expected_start, "gap or overlap at {:?}", w);
            assert!(!w.is_empty(), "empty window {:?}", w);
            expected_start = w.end;
        }
        assert_eq!(expected_start, m.bin_count());
    }

    #[test]
    fn test_windows_partition_bins_for_every_tier() {
        for (bins, cols) in [(1024, 128), (256, 64), (64, 32), (32, 16)] {
            let m = mapper(bins, cols);
            assert_eq!(m.columns(), cols);
            assert_partition(&m);
        }
    }

    #[test]
    fn test_columns_capped_at_bins() {
        let m = mapper(8, 32);
        assert_eq!(m.columns(), 8);
        assert!(m.windows().all(|w| w.len() == 1));
        assert_partition(&m);
    }

    #[test]
    fn test_zero_bins_is_empty() {
        let mut m = mapper(0, 16);
        assert_eq!(m.columns(), 0);
        assert!(m.process(&[]).is_empty());
    }

    #[test]
    fn test_process_scales_and_clamps() {
        let mut m = mapper(64, 32);
        let full = vec![255u8; 64];
        assert!(m.process(&full).iter().all(|&v| v == 100.0));

        m.set_intensity(0.5);
        assert!(m.process(&full).iter().all(|&v| (v - 50.0).abs() < 1e-3));

        m.set_intensity(10.0);
        assert_eq!(m.intensity(), MAX_INTENSITY);
        let quiet = vec![32u8; 64];
        assert!(m.process(&quiet).iter().all(|&v| v <= 100.0));
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let mut m = mapper(64, 32);
        assert!(m.process(&vec![0u8; 64]).iter().all(|&v| v == 0.0));
        assert!(m.is_at_rest());
    }

    #[test]
    fn test_decay_reaches_zero() {
        let mut m = mapper(64, 16);
        m.process(&vec![255u8; 64]);
        let mut steps = 0;
        while !m.is_at_rest() {
            m.decay();
            steps += 1;
            assert!(steps < 200);
        }
        assert!(m.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_resize_rebuilds_only_on_shape_change() {
        let mut m = mapper(256, 64);
        m.process(&vec![200u8; 256]);
        m.resize(256, 64);
        assert!(!m.is_at_rest(), "same shape must keep values");

        m.resize(32, 16);
        assert_eq!(m.columns(), 16);
        assert_eq!(m.values().len(), 16);
        assert!(m.is_at_rest());
        assert_partition(&m);
    }

    #[test]
    fn test_aggregate_treats_short_input_as_silence() {
        let m = mapper(64, 8);
        let agg = m.aggregate(&[]);
        assert_eq!(agg.len(), 8);
        assert!(agg.iter().all(|&v| v == 0.0));
    }
}
