use crate::{
    detectors::peaks::PeakDetector,
    error::{check_sample_rate, FeatureError},
    signal::{mean, TimeSeries},
};
use log::debug;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Taper fraction of the analysis window.
const TUKEY_ALPHA: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralFeatureConfig {
    /// Frame length and FFT size (samples). Frames do not overlap.
    pub nfft: usize,
    /// Prominence threshold applied along the frequency axis.
    pub delta: f64,
    /// Number of peak frequencies reported per slice.
    pub n_peaks: usize,
}

impl Default for SpectralFeatureConfig {
    fn default() -> Self {
        Self {
            nfft: 256,
            delta: 50.0,
            n_peaks: 3,
        }
    }
}

/// One-sided power spectral density per non-overlapping frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrogram {
    /// Bin frequencies (Hz), `nfft / 2 + 1` entries; empty when no frame fits.
    pub freqs: Vec<f64>,
    /// Frame centre times (seconds).
    pub times: Vec<f64>,
    /// `power[slice][bin]`
    pub power: Vec<Vec<f64>>,
}

impl Spectrogram {
    pub fn slices(&self) -> usize {
        self.times.len()
    }
    pub fn bin_width(&self) -> f64 {
        self.freqs.get(1).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatureRow {
    pub slice: usize,
    pub time_s: f64,
    /// Peak frequencies in bin order, zero padded to `n_peaks`.
    pub values: Vec<f64>,
    /// How many of `values` are real detections.
    pub found: usize,
}

pub fn spectrogram(data: &[f64], fs: f64, nfft: usize) -> Result<Spectrogram, FeatureError> {
    check_sample_rate(fs)?;
    if nfft < 2 {
        return Err(FeatureError::InvalidFftLength(nfft));
    }
    if data.len() < nfft {
        return Ok(Spectrogram {
            freqs: Vec::new(),
            times: Vec::new(),
            power: Vec::new(),
        });
    }
    let bins = nfft / 2 + 1;
    let freqs: Vec<f64> = (0..bins).map(|k| k as f64 * fs / nfft as f64).collect();
    let window = tukey(nfft, TUKEY_ALPHA);
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(nfft);
    let mut spectrum = r2c.make_output_vec();
    let mut times = Vec::new();
    let mut power = Vec::new();

    for (slice, frame_in) in data.chunks_exact(nfft).enumerate() {
        let offset = mean(frame_in);
        let mut frame: Vec<f64> = frame_in
            .iter()
            .zip(&window)
            .map(|(x, w)| (x - offset) * w)
            .collect();
        r2c.process(&mut frame, &mut spectrum)
            .map_err(|e| FeatureError::Fft(e.to_string()))?;
        let column = spectrum
            .iter()
            .enumerate()
            .map(|(k, val)| {
                let p = val.norm_sqr() * scale;
                if k == 0 || (nfft % 2 == 0 && k == nfft / 2) {
                    p
                } else {
                    2.0 * p
                }
            })
            .collect();
        power.push(column);
        times.push((slice * nfft) as f64 / fs + (nfft / 2) as f64 / fs);
    }

    Ok(Spectrogram {
        freqs,
        times,
        power,
    })
}

/// First `n_peaks` spectral maxima (in bin order) of every slice.
pub fn spectral_peaks(
    spec: &Spectrogram,
    cfg: &SpectralFeatureConfig,
) -> Result<Vec<SpectralFeatureRow>, FeatureError> {
    if cfg.n_peaks == 0 {
        return Err(FeatureError::InvalidPeakCount);
    }
    let detector = PeakDetector::new(cfg.delta)?;
    let rows = spec
        .power
        .iter()
        .zip(&spec.times)
        .enumerate()
        .map(|(slice, (column, &time_s))| {
            let peaks = detector.detect(column);
            let mut values = vec![0.0; cfg.n_peaks];
            let found = peaks.maxima.len().min(cfg.n_peaks);
            for (slot, peak) in values.iter_mut().zip(&peaks.maxima) {
                *slot = spec.freqs[peak.index];
            }
            SpectralFeatureRow {
                slice,
                time_s,
                values,
                found,
            }
        })
        .collect();
    Ok(rows)
}

pub fn extract_spectral_features(
    signal: &[f64],
    fs: f64,
    cfg: &SpectralFeatureConfig,
) -> Result<Vec<SpectralFeatureRow>, FeatureError> {
    let spec = spectrogram(signal, fs, cfg.nfft)?;
    let rows = spectral_peaks(&spec, cfg)?;
    debug!(
        "spectral features: {} samples, nfft {} -> {} slices",
        signal.len(),
        cfg.nfft,
        rows.len()
    );
    Ok(rows)
}

pub fn spectral_features(
    ts: &TimeSeries,
    cfg: &SpectralFeatureConfig,
) -> Result<Vec<SpectralFeatureRow>, FeatureError> {
    extract_spectral_features(&ts.data, ts.fs, cfg)
}

/// Periodic Tukey window: flat top with cosine tapers over `alpha` of the length.
fn tukey(size: usize, alpha: f64) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = i as f64 / n;
            if x < alpha / 2.0 {
                0.5 * (1.0 - (2.0 * PI * x / alpha).cos())
            } else if x > 1.0 - alpha / 2.0 {
                0.5 * (1.0 - (2.0 * PI * (1.0 - x) / alpha).cos())
            } else {
                1.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tones(fs: f64, samples: usize, parts: &[(f64, f64)]) -> Vec<f64> {
        (0..samples)
            .map(|i| {
                let t = i as f64 / fs;
                parts
                    .iter()
                    .map(|(f, a)| a * (2.0 * PI * f * t).sin())
                    .sum::<f64>()
            })
            .collect()
    }

    #[test]
    fn grid_shape() {
        let spec = spectrogram(&vec![0.0; 1000], 52.0, 256).unwrap();
        assert_eq!(spec.freqs.len(), 129);
        assert_eq!(spec.slices(), 3);
        assert!((spec.bin_width() - 52.0 / 256.0).abs() < 1e-12);
        assert!((spec.times[0] - 128.0 / 52.0).abs() < 1e-12);
        assert!((spec.times[1] - 384.0 / 52.0).abs() < 1e-12);
    }

    #[test]
    fn short_signal_has_no_slices() {
        let rows =
            extract_spectral_features(&[1.0; 100], 52.0, &SpectralFeatureConfig::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn frame_longer_than_signal_allocates_nothing() {
        let spec = spectrogram(&[1.0; 300], 52.0, 1 << 40).unwrap();
        assert_eq!(spec.slices(), 0);
        assert!(spec.freqs.is_empty());
        let cfg = SpectralFeatureConfig {
            nfft: usize::MAX,
            ..Default::default()
        };
        assert!(extract_spectral_features(&[1.0; 300], 52.0, &cfg)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn tone_peak_within_one_bin() {
        let fs = 52.0;
        let f0 = 5.0;
        let x = tones(fs, 256 * 10, &[(f0, 1.0)]);
        let cfg = SpectralFeatureConfig {
            nfft: 256,
            delta: 0.5,
            n_peaks: 3,
        };
        let rows = extract_spectral_features(&x, fs, &cfg).unwrap();
        assert_eq!(rows.len(), 10);
        for row in rows {
            assert!(row.found >= 1);
            assert_eq!(row.values.len(), 3);
            assert!(
                (row.values[0] - f0).abs() <= fs / 256.0,
                "slice {} peak {}",
                row.slice,
                row.values[0]
            );
        }
    }

    #[test]
    fn peaks_reported_in_bin_order() {
        let fs = 52.0;
        let bin = fs / 256.0;
        let (low, high) = (15.0 * bin, 40.0 * bin);
        let x = tones(fs, 256 * 4, &[(low, 0.7), (high, 1.0)]);
        let cfg = SpectralFeatureConfig {
            nfft: 256,
            delta: 0.5,
            n_peaks: 4,
        };
        let rows = extract_spectral_features(&x, fs, &cfg).unwrap();
        for row in rows {
            assert_eq!(row.found, 2);
            assert!((row.values[0] - low).abs() < 1e-9);
            assert!((row.values[1] - high).abs() < 1e-9);
            assert_eq!(&row.values[2..], &[0.0, 0.0]);
        }
    }

    #[test]
    fn constant_signal_zero_pads() {
        let rows =
            extract_spectral_features(&[300.0; 512], 52.0, &SpectralFeatureConfig::default())
                .unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.found, 0);
            assert_eq!(row.values, vec![0.0; 3]);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(
            spectrogram(&[0.0; 10], 52.0, 1).unwrap_err(),
            FeatureError::InvalidFftLength(1)
        );
        let cfg = SpectralFeatureConfig {
            n_peaks: 0,
            ..Default::default()
        };
        assert_eq!(
            extract_spectral_features(&[0.0; 512], 52.0, &cfg).unwrap_err(),
            FeatureError::InvalidPeakCount
        );
    }

    #[test]
    fn tukey_tapers_to_zero() {
        let w = tukey(256, TUKEY_ALPHA);
        assert_eq!(w[0], 0.0);
        assert_eq!(w[128], 1.0);
        assert!(w[1] > 0.0 && w[1] < 0.01);
    }
}
