use crate::{
    io::text::read_label_file,
    signal::{Label, Recording},
};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::path::{Path, PathBuf};

/// Raw tri-axial samples as stored on disk.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Activity column embedded in the sample file, when present.
    pub activity: Option<Vec<Label>>,
}

impl SampleTable {
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Read a headerless `sequence, x, y, z[, activity]` CSV.
pub fn read_samples_csv(path: &Path) -> Result<SampleTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut table = SampleTable::default();
    let mut activity = Vec::new();
    let mut has_activity = None;
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 1;
        let record =
            record.with_context(|| format!("{} line {}: reading record", path.display(), line))?;
        if record.len() < 4 {
            anyhow::bail!(
                "{} line {}: expected at least 4 columns, found {}",
                path.display(),
                line,
                record.len()
            );
        }
        let wants_activity = *has_activity.get_or_insert(record.len() >= 5);
        table.x.push(parse_field(&record, 1, path, line)?);
        table.y.push(parse_field(&record, 2, path, line)?);
        table.z.push(parse_field(&record, 3, path, line)?);
        if wants_activity {
            activity.push(parse_field(&record, 4, path, line)?);
        }
    }
    if table.is_empty() {
        anyhow::bail!("{}: no samples found", path.display());
    }
    if has_activity == Some(true) {
        table.activity = Some(activity);
    }
    debug!("read {} samples from {}", table.len(), path.display());
    Ok(table)
}

fn parse_field<T>(record: &StringRecord, col: usize, path: &Path, line: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = record
        .get(col)
        .ok_or_else(|| anyhow::anyhow!("{} line {}: missing column {}", path.display(), line, col))?;
    raw.parse::<T>().with_context(|| {
        format!(
            "{} line {}: column {} is not numeric: {:?}",
            path.display(),
            line,
            col,
            raw
        )
    })
}

/// Numeric subject id taken from the file stem (`7.csv` → 7).
pub fn subject_id(path: &Path) -> Result<u32> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("{} has no file stem", path.display()))?;
    stem.parse()
        .with_context(|| format!("{}: file stem {:?} is not a subject number", path.display(), stem))
}

/// Sibling label file of a sample file (`7.csv` → `7.txt`).
pub fn label_path(samples: &Path) -> PathBuf {
    samples.with_extension("txt")
}

/// Load a subject's samples and pair them 1:1 with the sibling label file.
pub fn load_recording(path: &Path, fs: f64) -> Result<Recording> {
    if !(fs.is_finite() && fs > 0.0) {
        anyhow::bail!("sampling rate must be positive, got {}", fs);
    }
    let subject = subject_id(path)?;
    let samples = read_samples_csv(path)?;
    let labels_at = label_path(path);
    let labels = read_label_file(&labels_at)?;
    if labels.len() != samples.len() {
        anyhow::bail!(
            "{} has {} labels but {} has {} samples",
            labels_at.display(),
            labels.len(),
            path.display(),
            samples.len()
        );
    }
    Ok(Recording {
        subject,
        fs,
        x: samples.x,
        y: samples.y,
        z: samples.z,
        labels,
    })
}
