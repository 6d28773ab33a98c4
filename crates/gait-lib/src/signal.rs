use serde::{Deserialize, Serialize};

/// Activity code attached to every sample of a recording.
pub type Label = i32;

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Sample times in seconds (`index / fs`).
    pub fn timestamps(&self) -> Vec<f64> {
        timestamps(self.data.len(), self.fs)
    }
}

pub fn timestamps(len: usize, fs: f64) -> Vec<f64> {
    (0..len).map(|i| i as f64 / fs).collect()
}

/// First discrete difference, one sample shorter than the input.
pub fn jerk(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Which accelerometer component a feature extractor runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    X,
    Y,
    Z,
    Magnitude,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Z => "z",
            Channel::Magnitude => "magnitude",
        }
    }
}

/// One subject's tri-axial recording with its per-sample activity labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub subject: u32,
    pub fs: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub labels: Vec<Label>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.labels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn channel(&self, channel: Channel) -> TimeSeries {
        let data = match channel {
            Channel::X => self.x.clone(),
            Channel::Y => self.y.clone(),
            Channel::Z => self.z.clone(),
            Channel::Magnitude => magnitude(&self.x, &self.y, &self.z),
        };
        TimeSeries { fs: self.fs, data }
    }

    /// Keep only the samples carrying `label`. Runs are concatenated and the
    /// sample clock restarts at zero, so timestamps derive from the new index.
    pub fn select_activity(&self, label: Label) -> Recording {
        let keep: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect();
        let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<_>>();
        Recording {
            subject: self.subject,
            fs: self.fs,
            x: pick(&self.x),
            y: pick(&self.y),
            z: pick(&self.z),
            labels: vec![label; keep.len()],
        }
    }
}

/// Euclidean norm of the mean-removed axes.
pub fn magnitude(x: &[f64], y: &[f64], z: &[f64]) -> Vec<f64> {
    let (mx, my, mz) = (mean(x), mean(y), mean(z));
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((a, b), c)| ((a - mx).powi(2) + (b - my).powi(2) + (c - mz).powi(2)).sqrt())
        .collect()
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Mean and population standard deviation.
pub(crate) fn mean_std(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    (m, var.sqrt())
}
