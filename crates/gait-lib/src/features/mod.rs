pub mod spectral;
pub mod time;

pub use spectral::{
    extract_spectral_features, spectral_features, spectral_peaks, spectrogram,
    SpectralFeatureConfig, SpectralFeatureRow, Spectrogram,
};
pub use time::{
    extract_windowed_time_features, peak_intervals, time_features, PeakIntervals,
    TimeFeatureConfig, TimeFeatureRow, TIME_FEATURE_NAMES, TIME_FEATURE_WIDTH,
};

use crate::{error::FeatureError, signal::Label};

/// Label of the centre sample of each of `count` consecutive blocks of
/// `width` samples (sample `k * width + width / 2` for block `k`).
pub fn center_labels(
    labels: &[Label],
    count: usize,
    width: usize,
) -> Result<Vec<Label>, FeatureError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let needed = (count - 1) * width + width / 2 + 1;
    if labels.len() < needed {
        return Err(FeatureError::LabelsTooShort {
            needed,
            found: labels.len(),
        });
    }
    Ok((0..count).map(|k| labels[k * width + width / 2]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_block_centres() {
        let labels = [1, 1, 2, 2, 3, 3, 3, 4, 4];
        assert_eq!(center_labels(&labels, 3, 3).unwrap(), vec![1, 3, 4]);
        assert!(center_labels(&labels, 0, 3).unwrap().is_empty());
    }

    #[test]
    fn short_stream_is_an_error() {
        assert_eq!(
            center_labels(&[1, 2, 3], 2, 4).unwrap_err(),
            FeatureError::LabelsTooShort {
                needed: 7,
                found: 3
            }
        );
    }
}
