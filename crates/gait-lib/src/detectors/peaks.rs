use crate::error::FeatureError;
use num_traits::Float;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakKind {
    Max,
    Min,
}

/// A confirmed extremum of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak<T> {
    pub index: usize,
    pub value: T,
    pub kind: PeakKind,
}

/// Maxima and minima, each in increasing index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peaks<T> {
    pub maxima: Vec<Peak<T>>,
    pub minima: Vec<Peak<T>>,
}

impl<T> Default for Peaks<T> {
    fn default() -> Self {
        Self {
            maxima: Vec::new(),
            minima: Vec::new(),
        }
    }
}

impl<T: Copy> Peaks<T> {
    /// Drop trailing extrema from the longer list so both have equal length.
    pub fn truncated(&self) -> Peaks<T> {
        let n = self.maxima.len().min(self.minima.len());
        Peaks {
            maxima: self.maxima[..n].to_vec(),
            minima: self.minima[..n].to_vec(),
        }
    }

    /// Fewer than two maxima or two minima: no interval can be measured.
    pub fn is_degenerate(&self) -> bool {
        self.maxima.len() < 2 || self.minima.len() < 2
    }

    /// All extrema merged in index order.
    pub fn merged(&self) -> Vec<Peak<T>> {
        let mut all: Vec<Peak<T>> = self.maxima.iter().chain(&self.minima).copied().collect();
        all.sort_by_key(|p| p.index);
        all
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    Max,
    Min,
}

/// Hysteresis peak/valley detector with a minimum prominence `delta`.
#[derive(Debug, Clone, Copy)]
pub struct PeakDetector<T> {
    delta: T,
}

impl<T: Float> PeakDetector<T> {
    pub fn new(delta: T) -> Result<Self, FeatureError> {
        if !delta.is_finite() || delta <= T::zero() {
            return Err(FeatureError::InvalidDelta(delta.to_f64().unwrap_or(f64::NAN)));
        }
        Ok(Self { delta })
    }

    pub fn delta(&self) -> T {
        self.delta
    }

    /// Scan `x` once. The scan starts looking for a maximum; a candidate is
    /// confirmed as soon as the signal moves `delta` away from it in the
    /// opposite direction, which flips the state.
    pub fn detect(&self, x: &[T]) -> Peaks<T> {
        let mut peaks = Peaks::default();
        let mut state = Seek::Max;
        let mut hi = (0usize, T::neg_infinity());
        let mut lo = (0usize, T::infinity());

        for (i, &v) in x.iter().enumerate() {
            if v > hi.1 {
                hi = (i, v);
            }
            if v < lo.1 {
                lo = (i, v);
            }
            match state {
                Seek::Max if v <= hi.1 - self.delta => {
                    peaks.maxima.push(Peak {
                        index: hi.0,
                        value: hi.1,
                        kind: PeakKind::Max,
                    });
                    lo = (i, v);
                    state = Seek::Min;
                }
                Seek::Min if v >= lo.1 + self.delta => {
                    peaks.minima.push(Peak {
                        index: lo.0,
                        value: lo.1,
                        kind: PeakKind::Min,
                    });
                    hi = (i, v);
                    state = Seek::Max;
                }
                _ => {}
            }
        }
        peaks
    }
}

/// One-shot helper around [`PeakDetector`].
pub fn detect_peaks<T: Float>(x: &[T], delta: T) -> Result<Peaks<T>, FeatureError> {
    Ok(PeakDetector::new(delta)?.detect(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(fs: f64, period_s: f64, duration_s: f64, amplitude: f64) -> Vec<f64> {
        let n = (duration_s * fs) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * i as f64 / fs / period_s).sin())
            .collect()
    }

    #[test]
    fn rejects_non_positive_delta() {
        assert_eq!(
            PeakDetector::new(0.0).unwrap_err(),
            FeatureError::InvalidDelta(0.0)
        );
        assert!(PeakDetector::new(-1.0f32).is_err());
        assert!(PeakDetector::new(f64::NAN).is_err());
    }

    #[test]
    fn finds_simple_peak_and_valley() {
        let x = [0.0, 1.0, 3.0, 1.0, -2.0, 0.0, 2.0, 0.5];
        let peaks = detect_peaks(&x, 1.5).unwrap();
        assert_eq!(peaks.maxima.len(), 2);
        assert_eq!((peaks.maxima[0].index, peaks.maxima[0].value), (2, 3.0));
        assert_eq!((peaks.maxima[1].index, peaks.maxima[1].value), (6, 2.0));
        assert_eq!(peaks.minima.len(), 1);
        assert_eq!((peaks.minima[0].index, peaks.minima[0].value), (4, -2.0));
    }

    #[test]
    fn change_of_exactly_delta_confirms() {
        let peaks = detect_peaks(&[0.0, 2.0, 1.0], 1.0).unwrap();
        assert_eq!(peaks.maxima.len(), 1);
        assert_eq!(peaks.maxima[0].index, 1);
    }

    #[test]
    fn flat_signal_has_no_extrema() {
        let peaks = detect_peaks(&[1.0; 50], 0.1).unwrap();
        assert!(peaks.maxima.is_empty());
        assert!(peaks.minima.is_empty());
        assert!(peaks.is_degenerate());
    }

    #[test]
    fn large_delta_is_degenerate_not_error() {
        let x = sine(52.0, 1.0, 10.0, 1.0);
        let peaks = detect_peaks(&x, 5.0).unwrap();
        assert!(peaks.maxima.is_empty());
    }

    #[test]
    fn sinusoid_yields_one_max_per_period() {
        let fs = 52.0;
        let period = 0.75;
        let duration = 15.0;
        let x = sine(fs, period, duration, 2.0);
        let peaks = detect_peaks(&x, 0.5).unwrap();
        assert_eq!(peaks.maxima.len(), (duration / period).floor() as usize);
        for w in peaks.maxima.windows(2) {
            let spacing = (w[1].index - w[0].index) as f64 / fs;
            assert!((spacing - period).abs() <= 1.0 / fs, "spacing {spacing}");
        }
    }

    #[test]
    fn extrema_alternate_with_prominence() {
        let x: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64 * 0.05;
                (t * 1.3).sin() * 3.0 + (t * 7.1).cos() + (t * 0.2).sin()
            })
            .collect();
        let delta = 0.8;
        let peaks = detect_peaks(&x, delta).unwrap();
        let merged = peaks.merged();
        assert!(merged.len() > 4);
        for w in merged.windows(2) {
            assert!(w[0].index < w[1].index);
            assert_ne!(w[0].kind, w[1].kind);
            let (max, min) = if w[0].kind == PeakKind::Max {
                (w[0].value, w[1].value)
            } else {
                (w[1].value, w[0].value)
            };
            assert!(max - min >= delta);
        }
    }

    #[test]
    fn truncation_equalises_lengths() {
        let x = [0.0, 2.0, 0.0, 2.0, 0.0, 2.0];
        let peaks = detect_peaks(&x, 1.0).unwrap();
        assert_eq!(peaks.maxima.len(), 2);
        assert_eq!(peaks.minima.len(), 2);
        let x = [0.0, 2.0, 0.0, 2.0, 0.0];
        let peaks = detect_peaks(&x, 1.0).unwrap().truncated();
        assert_eq!(peaks.maxima.len(), peaks.minima.len());
    }

    #[test]
    fn works_on_f32() {
        let x: Vec<f32> = vec![0.0, 5.0, 0.0, 5.0, 0.0];
        let peaks = detect_peaks(&x, 1.0f32).unwrap();
        assert_eq!(peaks.maxima.len(), 2);
    }
}
