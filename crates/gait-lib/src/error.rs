use thiserror::Error;

/// Parameter and shape errors raised by the feature extractors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("prominence threshold must be positive and finite, got {0}")]
    InvalidDelta(f64),
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("a {duration_s} s window at {fs} Hz holds no samples")]
    InvalidWindow { duration_s: f64, fs: f64 },
    #[error("FFT length must be at least 2, got {0}")]
    InvalidFftLength(usize),
    #[error("peak count must be at least 1")]
    InvalidPeakCount,
    #[error("signal has {signal} samples but {timestamps} timestamps")]
    LengthMismatch { signal: usize, timestamps: usize },
    #[error("row width {found} does not match table width {expected}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("label stream has {found} entries, {needed} required")]
    LabelsTooShort { needed: usize, found: usize },
    #[error("FFT failed: {0}")]
    Fft(String),
}

pub(crate) fn check_sample_rate(fs: f64) -> Result<(), FeatureError> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(FeatureError::InvalidSampleRate(fs))
    }
}
