use crate::{
    io::{recording::read_samples_csv, text::write_label_file},
    segments::SegmentError,
    signal::Label,
};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Curated `(label, approx_start, approx_end)` triple; contributes
/// `approx_end - approx_start` samples, none when the end precedes the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Label, usize, usize)", into = "(Label, usize, usize)")]
pub struct Boundary {
    pub label: Label,
    pub start: usize,
    pub end: usize,
}

impl From<(Label, usize, usize)> for Boundary {
    fn from((label, start, end): (Label, usize, usize)) -> Self {
        Self { label, start, end }
    }
}

impl From<Boundary> for (Label, usize, usize) {
    fn from(b: Boundary) -> Self {
        (b.label, b.start, b.end)
    }
}

/// Move every interior boundary by `offset` samples: the first entry's end,
/// both ends of the middle entries and the last entry's start.
pub fn shift_interior_boundaries(boundaries: &[Boundary], offset: i64) -> Vec<Boundary> {
    let shift = |v: usize| (v as i64 + offset).max(0) as usize;
    let last = boundaries.len().saturating_sub(1);
    boundaries
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if boundaries.len() < 2 {
                return *b;
            }
            Boundary {
                label: b.label,
                start: if i == 0 { b.start } else { shift(b.start) },
                end: if i == last { b.end } else { shift(b.end) },
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    #[serde(skip)]
    pub labels: Vec<Label>,
    pub sample_count: usize,
    /// Labels produced from the boundary list before padding/truncation.
    pub synthesized: usize,
    /// Labels copied from the tail of the original stream.
    pub padded: usize,
    /// Synthesized labels dropped past `sample_count`.
    pub truncated: usize,
}

/// Synthesize a label stream of exactly `sample_count` entries.
///
/// A short result is completed with the trailing labels of `original`; a
/// long one is cut at `sample_count`. Boundary values are taken as-is, so an
/// inverted triple adds no samples.
pub fn repair_labels(
    boundaries: &[Boundary],
    original: &[Label],
    sample_count: usize,
) -> Result<RepairOutcome, SegmentError> {
    let mut labels = Vec::with_capacity(sample_count);
    let mut synthesized: usize = 0;
    for (index, b) in boundaries.iter().enumerate() {
        if b.end < b.start {
            warn!(
                "boundary {} ({}, {}, {}) ends before it starts, skipped",
                index, b.label, b.start, b.end
            );
        }
        let span = b.end.saturating_sub(b.start);
        synthesized = synthesized.saturating_add(span);
        let room = sample_count - labels.len();
        labels.extend(std::iter::repeat(b.label).take(span.min(room)));
    }
    let mut padded = 0;
    let mut truncated = 0;
    if synthesized < sample_count {
        padded = sample_count - synthesized;
        if original.len() < padded {
            return Err(SegmentError::ShortOriginal {
                needed: padded,
                available: original.len(),
            });
        }
        labels.extend_from_slice(&original[original.len() - padded..]);
    } else {
        truncated = synthesized - sample_count;
    }
    Ok(RepairOutcome {
        labels,
        sample_count,
        synthesized,
        padded,
        truncated,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectCorrection {
    pub subject: u32,
    pub segments: Vec<Boundary>,
}

/// Boundary lists per subject, read from TOML:
///
/// ```toml
/// [[correction]]
/// subject = 2
/// segments = [[1, 0, 46592], [2, 46593, 50232], [3, 50233, 61096]]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionTable {
    #[serde(default, rename = "correction")]
    pub corrections: Vec<SubjectCorrection>,
}

impl CorrectionTable {
    pub fn get(&self, subject: u32) -> Option<&[Boundary]> {
        self.corrections
            .iter()
            .find(|c| c.subject == subject)
            .map(|c| c.segments.as_slice())
    }

    pub fn subjects(&self) -> Vec<u32> {
        self.corrections.iter().map(|c| c.subject).collect()
    }
}

pub fn parse_corrections(text: &str) -> Result<CorrectionTable> {
    let table: CorrectionTable = toml::from_str(text).context("parsing correction table")?;
    let mut seen = BTreeSet::new();
    for c in &table.corrections {
        if !seen.insert(c.subject) {
            anyhow::bail!("subject {} listed more than once", c.subject);
        }
    }
    Ok(table)
}

pub fn read_corrections(path: &Path) -> Result<CorrectionTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corrections {}", path.display()))?;
    parse_corrections(&contents).with_context(|| format!("in {}", path.display()))
}

/// Rewrite the label file for one sample file. The sample file's embedded
/// activity column is the original stream and its row count is the target
/// length.
pub fn repair_label_file(samples: &Path, boundaries: &[Boundary], out: &Path) -> Result<RepairOutcome> {
    let table = read_samples_csv(samples)?;
    let original = table.activity.with_context(|| {
        format!("{} has no activity column to repair from", samples.display())
    })?;
    let outcome = repair_labels(boundaries, &original, table.x.len())
        .with_context(|| format!("repairing labels for {}", samples.display()))?;
    if outcome.padded > 0 {
        info!(
            "{}: appended {} trailing labels from the original stream",
            samples.display(),
            outcome.padded
        );
    }
    if outcome.truncated > 0 {
        warn!(
            "{}: boundary list overshoots by {} samples, truncated",
            samples.display(),
            outcome.truncated
        );
    }
    write_label_file(out, &outcome.labels)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{check_partition, extract_segments};

    fn b(label: Label, start: usize, end: usize) -> Boundary {
        Boundary { label, start, end }
    }

    #[test]
    fn pads_from_original_tail() {
        let original = [9, 9, 9, 9, 9, 9, 9, 9, 3, 4];
        let out = repair_labels(&[b(1, 0, 5), b(2, 5, 8)], &original, 10).unwrap();
        assert_eq!(out.labels, vec![1, 1, 1, 1, 1, 2, 2, 2, 3, 4]);
        assert_eq!((out.synthesized, out.padded, out.truncated), (8, 2, 0));
    }

    #[test]
    fn truncates_overshoot() {
        let out = repair_labels(&[b(1, 0, 6), b(2, 6, 12)], &[0; 10], 10).unwrap();
        assert_eq!(out.labels.len(), 10);
        assert_eq!(out.truncated, 2);
        assert_eq!(&out.labels[6..], &[2, 2, 2, 2]);
    }

    #[test]
    fn inclusive_curated_ends_lose_one_sample_each() {
        let out = repair_labels(&[b(1, 0, 4), b(2, 5, 9)], &[7; 10], 10).unwrap();
        assert_eq!(out.labels, vec![1, 1, 1, 1, 2, 2, 2, 2, 7, 7]);
    }

    #[test]
    fn output_always_matches_sample_count() {
        let bounds = [b(1, 0, 30), b(2, 30, 45), b(3, 45, 90)];
        for n in [0, 1, 44, 90, 91, 200] {
            let original = vec![5; 200];
            let out = repair_labels(&bounds, &original, n).unwrap();
            assert_eq!(out.labels.len(), n);
            check_partition(&extract_segments(&out.labels), n).unwrap();
        }
    }

    #[test]
    fn inverted_boundary_contributes_nothing() {
        let bounds = [b(1, 0, 4), b(3, 6, 5), b(6, 5, 8)];
        let out = repair_labels(&bounds, &[9; 10], 10).unwrap();
        assert_eq!(out.labels, vec![1, 1, 1, 1, 6, 6, 6, 9, 9, 9]);
        assert_eq!((out.synthesized, out.padded, out.truncated), (7, 3, 0));
    }

    #[test]
    fn oversized_span_is_capped_at_sample_count() {
        let out = repair_labels(&[b(2, 0, usize::MAX), b(5, 0, 3)], &[], 6).unwrap();
        assert_eq!(out.labels, vec![2; 6]);
        assert_eq!(out.synthesized, usize::MAX);
        assert_eq!(out.truncated, usize::MAX - 6);
    }

    #[test]
    fn rejects_short_original() {
        assert_eq!(
            repair_labels(&[b(1, 0, 2)], &[0; 3], 10).unwrap_err(),
            SegmentError::ShortOriginal {
                needed: 8,
                available: 3
            }
        );
    }

    #[test]
    fn shifts_interior_boundaries() {
        let bounds = [b(1, 0, 10), b(2, 11, 20), b(3, 21, 30)];
        let shifted = shift_interior_boundaries(&bounds, -3);
        assert_eq!(shifted, vec![b(1, 0, 7), b(2, 8, 17), b(3, 18, 30)]);
        assert_eq!(shift_interior_boundaries(&bounds[..1], 5), vec![b(1, 0, 10)]);
    }

    #[test]
    fn parses_correction_table() {
        let table = parse_corrections(
            r#"
[[correction]]
subject = 2
segments = [[1, 0, 46592], [2, 46593, 50232]]

[[correction]]
subject = 5
segments = [[1, 0, 30979]]
"#,
        )
        .unwrap();
        assert_eq!(table.subjects(), vec![2, 5]);
        assert_eq!(
            table.get(2).unwrap(),
            &[b(1, 0, 46592), b(2, 46593, 50232)]
        );
        assert!(table.get(3).is_none());
    }

    #[test]
    fn duplicate_subject_is_rejected() {
        let text = "[[correction]]\nsubject = 1\nsegments = []\n[[correction]]\nsubject = 1\nsegments = []\n";
        assert!(parse_corrections(text).is_err());
    }

    #[test]
    fn repairs_file_in_place_format() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("1.csv");
        let rows: String = (0..12)
            .map(|i| format!("{},1,2,3,{}\n", i, if i < 10 { 1 } else { 6 }))
            .collect();
        std::fs::write(&samples, rows).unwrap();
        let out = dir.path().join("1.txt");
        let outcome = repair_label_file(&samples, &[b(1, 0, 4), b(3, 4, 9)], &out).unwrap();
        assert_eq!(outcome.padded, 3);
        let written = crate::io::text::read_label_file(&out).unwrap();
        assert_eq!(written, vec![1, 1, 1, 1, 3, 3, 3, 3, 3, 1, 6, 6]);
    }
}
