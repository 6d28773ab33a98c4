use crate::signal::Label;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximal run of one label, `start..=end` over the sample index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub label: Label,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("segment {index} starts at {start}, expected {expected}")]
    Discontinuous {
        index: usize,
        start: usize,
        expected: usize,
    },
    #[error("segment {index} ends at {end} before its start {start}")]
    Inverted {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("segments {index} and {} both carry label {label}", .index + 1)]
    RepeatedLabel { index: usize, label: Label },
    #[error("segments cover {covered} samples but the stream has {expected}")]
    Coverage { covered: usize, expected: usize },
    #[error("padding needs {needed} trailing labels but the original stream has {available}")]
    ShortOriginal { needed: usize, available: usize },
}

/// Collapse a per-sample label stream into contiguous segments.
pub fn extract_segments(labels: &[Label]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let Some(&first) = labels.first() else {
        return segments;
    };
    let mut current = Segment {
        label: first,
        start: 0,
        end: 0,
    };
    for (i, &label) in labels.iter().enumerate().skip(1) {
        if label != current.label {
            current.end = i - 1;
            segments.push(current);
            current = Segment {
                label,
                start: i,
                end: i,
            };
        }
    }
    current.end = labels.len() - 1;
    segments.push(current);
    segments
}

/// Verify that `segments` partition `[0, len)` with alternating labels.
pub fn check_partition(segments: &[Segment], len: usize) -> Result<(), SegmentError> {
    let mut expected = 0;
    for (index, seg) in segments.iter().enumerate() {
        if seg.start != expected {
            return Err(SegmentError::Discontinuous {
                index,
                start: seg.start,
                expected,
            });
        }
        if seg.end < seg.start {
            return Err(SegmentError::Inverted {
                index,
                start: seg.start,
                end: seg.end,
            });
        }
        if let Some(next) = segments.get(index + 1) {
            if next.label == seg.label {
                return Err(SegmentError::RepeatedLabel {
                    index,
                    label: seg.label,
                });
            }
        }
        expected = seg.end + 1;
    }
    if expected != len {
        return Err(SegmentError::Coverage {
            covered: expected,
            expected: len,
        });
    }
    Ok(())
}

/// First and last index carrying `label`.
pub fn activity_span(labels: &[Label], label: Label) -> Option<(usize, usize)> {
    let first = labels.iter().position(|&l| l == label)?;
    let last = labels.iter().rposition(|&l| l == label)?;
    Some((first, last))
}

/// Expand segments back into a per-sample stream.
pub fn expand_segments(segments: &[Segment]) -> Vec<Label> {
    segments
        .iter()
        .flat_map(|s| std::iter::repeat(s.label).take(s.len()))
        .collect()
}
