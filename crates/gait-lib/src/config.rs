use crate::{
    error::{check_sample_rate, FeatureError},
    features::{SpectralFeatureConfig, TimeFeatureConfig},
    signal::{Channel, Label},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one extraction run over a set of recordings.
///
/// ```toml
/// sample_rate_hz = 52.0
/// channel = "y"
/// activity = 4
///
/// [time]
/// window_s = 5.0
/// delta = 25.0
///
/// [spectral]
/// nfft = 256
/// delta = 50.0
/// n_peaks = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sample_rate_hz: f64,
    pub channel: Channel,
    /// Restrict extraction to samples carrying this activity code.
    pub activity: Option<Label>,
    pub time: TimeFeatureConfig,
    pub spectral: SpectralFeatureConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 52.0,
            channel: Channel::Y,
            activity: None,
            time: TimeFeatureConfig::default(),
            spectral: SpectralFeatureConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        check_sample_rate(self.sample_rate_hz)?;
        self.time.window_samples(self.sample_rate_hz)?;
        for delta in [self.time.delta, self.spectral.delta] {
            if !(delta.is_finite() && delta > 0.0) {
                return Err(FeatureError::InvalidDelta(delta));
            }
        }
        if self.spectral.nfft < 2 {
            return Err(FeatureError::InvalidFftLength(self.spectral.nfft));
        }
        if self.spectral.n_peaks == 0 {
            return Err(FeatureError::InvalidPeakCount);
        }
        Ok(())
    }
}

pub fn parse_config(text: &str) -> Result<PipelineConfig> {
    let cfg: PipelineConfig = toml::from_str(text).context("parsing pipeline config")?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn read_config(path: &Path) -> Result<PipelineConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in {}", path.display()))
}
