use crate::{io::write_atomic, signal::Label};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Parse newline-delimited floating point series, ignoring blank/comment lines.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

/// Parse a label file: exactly one integer activity code per line.
///
/// Unlike sample series, blank lines are rejected because every line stands
/// for one sample.
pub fn parse_labels(text: &str) -> Result<Vec<Label>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        let val: Label = trimmed
            .parse()
            .with_context(|| format!("line {} is not an activity label: {:?}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no activity labels found");
    }
    Ok(out)
}

pub fn read_label_file(path: &Path) -> Result<Vec<Label>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_labels(&text).with_context(|| format!("parsing labels in {}", path.display()))
}

pub fn write_labels<W: Write + ?Sized>(out: &mut W, labels: &[Label]) -> Result<()> {
    for label in labels {
        writeln!(out, "{}", label)?;
    }
    Ok(())
}

/// Write one label per line, replacing `path` only once the whole stream is on disk.
pub fn write_label_file(path: &Path, labels: &[Label]) -> Result<()> {
    write_atomic(path, |out| write_labels(out, labels))
}
