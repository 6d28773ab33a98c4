use crate::{
    config::PipelineConfig,
    dataset::FeatureTable,
    features::{center_labels, spectral_features, time_features},
    io::recording::load_recording,
    signal::Recording,
};
use anyhow::{Context, Result};
use log::{error, info, warn};
use rayon::prelude::*;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Time-domain and spectral feature tables of one recording.
#[derive(Debug, Clone)]
pub struct RecordingFeatures {
    pub subject: u32,
    pub time: FeatureTable,
    pub spectral: FeatureTable,
}

/// Validate `cfg` against `rec` and apply the activity filter.
fn select<'a>(rec: &'a Recording, cfg: &PipelineConfig) -> Result<Cow<'a, Recording>> {
    cfg.validate()?;
    if rec.fs != cfg.sample_rate_hz {
        anyhow::bail!(
            "subject {} recorded at {} Hz, configuration expects {} Hz",
            rec.subject,
            rec.fs,
            cfg.sample_rate_hz
        );
    }
    Ok(match cfg.activity {
        Some(activity) => Cow::Owned(rec.select_activity(activity)),
        None => Cow::Borrowed(rec),
    })
}

fn time_table_of(rec: &Recording, cfg: &PipelineConfig) -> Result<FeatureTable> {
    let ts = rec.channel(cfg.channel);
    let rows = time_features(&ts, &cfg.time)?;
    let win = cfg.time.window_samples(ts.fs)?;
    let labels = center_labels(&rec.labels, rows.len(), win)?;
    let table = FeatureTable::from_time_rows(rec.subject, &rows, &labels)?;

    let degenerate = table.records.iter().filter(|r| r.degenerate).count();
    if !table.is_empty() && degenerate * 2 > table.len() {
        warn!(
            "subject {}: {}/{} windows without enough extrema (delta {})",
            rec.subject,
            degenerate,
            table.len(),
            cfg.time.delta
        );
    }
    Ok(table)
}

fn spectral_table_of(rec: &Recording, cfg: &PipelineConfig) -> Result<FeatureTable> {
    let ts = rec.channel(cfg.channel);
    let rows = spectral_features(&ts, &cfg.spectral)?;
    let labels = center_labels(&rec.labels, rows.len(), cfg.spectral.nfft)?;
    Ok(FeatureTable::from_spectral_rows(
        rec.subject,
        cfg.channel,
        cfg.spectral.n_peaks,
        &rows,
        &labels,
    )?)
}

/// Windowed time-domain features of one recording, one row per window.
pub fn time_table(rec: &Recording, cfg: &PipelineConfig) -> Result<FeatureTable> {
    let rec = select(rec, cfg)?;
    time_table_of(&rec, cfg)
}

/// Spectral peak features of one recording, one row per spectrogram slice.
pub fn spectral_table(rec: &Recording, cfg: &PipelineConfig) -> Result<FeatureTable> {
    let rec = select(rec, cfg)?;
    spectral_table_of(&rec, cfg)
}

pub fn extract_recording(rec: &Recording, cfg: &PipelineConfig) -> Result<RecordingFeatures> {
    let rec = select(rec, cfg)?;
    let time = time_table_of(&rec, cfg)?;
    let spectral = spectral_table_of(&rec, cfg)?;
    info!(
        "subject {}: {} samples -> {} windows, {} spectral slices",
        rec.subject,
        rec.len(),
        time.len(),
        spectral.len()
    );
    Ok(RecordingFeatures {
        subject: rec.subject,
        time,
        spectral,
    })
}

pub fn process_file(path: &Path, cfg: &PipelineConfig) -> Result<RecordingFeatures> {
    let rec = load_recording(path, cfg.sample_rate_hz)?;
    extract_recording(&rec, cfg).with_context(|| format!("extracting {}", path.display()))
}

#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub struct BatchOutput {
    pub time: FeatureTable,
    pub spectral: FeatureTable,
    /// Subjects merged into the tables, ascending.
    pub subjects: Vec<u32>,
    pub failures: Vec<BatchFailure>,
}

/// Extract every file independently (in parallel) and merge the successful
/// ones in ascending subject order. A failing file is reported in
/// `failures` and contributes nothing to the tables.
pub fn run_batch(paths: &[PathBuf], cfg: &PipelineConfig) -> Result<BatchOutput> {
    cfg.validate()?;
    let results: Vec<(PathBuf, Result<RecordingFeatures>)> = paths
        .par_iter()
        .map(|path| (path.clone(), process_file(path, cfg)))
        .collect();

    let mut done = Vec::new();
    let mut failures = Vec::new();
    for (path, result) in results {
        match result {
            Ok(features) => done.push(features),
            Err(err) => {
                error!("{}: {:#}", path.display(), err);
                failures.push(BatchFailure { path, error: err });
            }
        }
    }
    done.sort_by_key(|f| f.subject);

    let mut time = FeatureTable::new(FeatureTable::time_columns());
    let mut spectral = FeatureTable::new(FeatureTable::spectral_columns(
        cfg.channel,
        cfg.spectral.n_peaks,
    ));
    let mut subjects = Vec::with_capacity(done.len());
    for features in done {
        subjects.push(features.subject);
        time.append(features.time)?;
        spectral.append(features.spectral)?;
    }
    Ok(BatchOutput {
        time,
        spectral,
        subjects,
        failures,
    })
}
