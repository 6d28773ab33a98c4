use crate::{
    detectors::peaks::{Peak, PeakDetector, Peaks},
    error::{check_sample_rate, FeatureError},
    signal::{jerk, mean_std, TimeSeries},
};
use log::debug;
use serde::{Deserialize, Serialize};

pub const TIME_FEATURE_WIDTH: usize = 12;

/// The jerk signal is searched with a proportionally smaller threshold.
pub const JERK_DELTA_SCALE: f64 = 0.75;

pub const TIME_FEATURE_NAMES: [&str; TIME_FEATURE_WIDTH] = [
    "acc_mean_max_gap",
    "acc_mean_min_gap",
    "acc_mean_adjacent_gap",
    "acc_std_max_gap",
    "acc_std_min_gap",
    "acc_std_adjacent_gap",
    "jerk_mean_max_gap",
    "jerk_mean_min_gap",
    "jerk_mean_adjacent_gap",
    "jerk_std_max_gap",
    "jerk_std_min_gap",
    "jerk_std_adjacent_gap",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeFeatureConfig {
    /// Window length (seconds).
    pub window_s: f64,
    /// Prominence threshold for the raw signal.
    pub delta: f64,
}

impl Default for TimeFeatureConfig {
    fn default() -> Self {
        Self {
            window_s: 5.0,
            delta: 25.0,
        }
    }
}

impl TimeFeatureConfig {
    pub fn window_samples(&self, fs: f64) -> Result<usize, FeatureError> {
        check_sample_rate(fs)?;
        let samples = (self.window_s * fs).round();
        if !samples.is_finite() || samples < 1.0 {
            return Err(FeatureError::InvalidWindow {
                duration_s: self.window_s,
                fs,
            });
        }
        Ok(samples as usize)
    }
}

/// Timing statistics for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFeatureRow {
    pub window: usize,
    pub start_index: usize,
    pub values: [f64; TIME_FEATURE_WIDTH],
    /// Too few raw extrema; the six raw features are zero placeholders.
    pub raw_degenerate: bool,
    /// Too few jerk extrema; the six jerk features are zero placeholders.
    pub jerk_degenerate: bool,
}

/// Gaps (seconds) between successive extrema of one signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakIntervals {
    pub max_gaps: Vec<f64>,
    pub min_gaps: Vec<f64>,
    pub adjacent_gaps: Vec<f64>,
}

impl PeakIntervals {
    /// `([mean; 3], [std; 3])` in max, min, adjacent order.
    pub fn summary(&self) -> ([f64; 3], [f64; 3]) {
        let (m0, s0) = mean_std(&self.max_gaps);
        let (m1, s1) = mean_std(&self.min_gaps);
        let (m2, s2) = mean_std(&self.adjacent_gaps);
        ([m0, m1, m2], [s0, s1, s2])
    }
}

/// Interval sequences for a set of extrema, or `None` when fewer than two
/// maxima or minima survive truncation to equal length.
///
/// `timestamps[i]` is the time of sequence position `i`.
pub fn peak_intervals(peaks: &Peaks<f64>, timestamps: &[f64]) -> Option<PeakIntervals> {
    let peaks = peaks.truncated();
    if peaks.is_degenerate() {
        return None;
    }
    let at = |p: &Peak<f64>| timestamps[p.index];
    let gaps = |list: &[Peak<f64>]| {
        list.windows(2)
            .map(|w| at(&w[1]) - at(&w[0]))
            .collect::<Vec<_>>()
    };
    let max_first = peaks.maxima[0].index < peaks.minima[0].index;
    let adjacent_gaps = peaks
        .maxima
        .iter()
        .zip(&peaks.minima)
        .skip(1)
        .map(|(mx, mn)| if max_first { at(mn) - at(mx) } else { at(mx) - at(mn) })
        .collect();
    Some(PeakIntervals {
        max_gaps: gaps(&peaks.maxima),
        min_gaps: gaps(&peaks.minima),
        adjacent_gaps,
    })
}

/// Split `signal` into non-overlapping windows of `window_s` seconds and
/// summarise the peak timing of the raw and jerk signals in each.
///
/// A trailing partial window is discarded.
pub fn extract_windowed_time_features(
    signal: &[f64],
    timestamps: &[f64],
    fs: f64,
    cfg: &TimeFeatureConfig,
) -> Result<Vec<TimeFeatureRow>, FeatureError> {
    if signal.len() != timestamps.len() {
        return Err(FeatureError::LengthMismatch {
            signal: signal.len(),
            timestamps: timestamps.len(),
        });
    }
    let win = cfg.window_samples(fs)?;
    let raw_detector = PeakDetector::new(cfg.delta)?;
    let jerk_detector = PeakDetector::new(cfg.delta * JERK_DELTA_SCALE)?;

    let rows: Vec<TimeFeatureRow> = signal
        .chunks_exact(win)
        .zip(timestamps.chunks_exact(win))
        .enumerate()
        .map(|(window, (xs, ts))| {
            let raw = peak_intervals(&raw_detector.detect(xs), ts);
            let jerk_sig = jerk(xs);
            let jerk = peak_intervals(&jerk_detector.detect(&jerk_sig), &ts[1..]);

            let mut values = [0.0; TIME_FEATURE_WIDTH];
            if let Some(intervals) = &raw {
                let (means, stds) = intervals.summary();
                values[0..3].copy_from_slice(&means);
                values[3..6].copy_from_slice(&stds);
            }
            if let Some(intervals) = &jerk {
                let (means, stds) = intervals.summary();
                values[6..9].copy_from_slice(&means);
                values[9..12].copy_from_slice(&stds);
            }
            TimeFeatureRow {
                window,
                start_index: window * win,
                values,
                raw_degenerate: raw.is_none(),
                jerk_degenerate: jerk.is_none(),
            }
        })
        .collect();

    debug!(
        "time features: {} samples, window {} samples -> {} rows",
        signal.len(),
        win,
        rows.len()
    );
    Ok(rows)
}

/// Convenience wrapper deriving timestamps from the series' own rate.
pub fn time_features(
    ts: &TimeSeries,
    cfg: &TimeFeatureConfig,
) -> Result<Vec<TimeFeatureRow>, FeatureError> {
    extract_windowed_time_features(&ts.data, &ts.timestamps(), ts.fs, cfg)
}
