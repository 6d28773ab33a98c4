use crate::{
    error::FeatureError,
    features::{SpectralFeatureRow, TimeFeatureRow, TIME_FEATURE_NAMES},
    signal::{Channel, Label},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One feature vector with the subject and activity it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub subject: u32,
    pub activity: Label,
    pub values: Vec<f64>,
    /// Some values are zero placeholders for missing extrema.
    pub degenerate: bool,
}

/// Fixed-width feature matrix with per-row subject/activity labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn time_columns() -> Vec<String> {
        TIME_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    pub fn spectral_columns(channel: Channel, n_peaks: usize) -> Vec<String> {
        (0..n_peaks)
            .map(|i| format!("{}_pk{}", channel.name(), i))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: FeatureRecord) -> Result<(), FeatureError> {
        if record.values.len() != self.width() {
            return Err(FeatureError::WidthMismatch {
                expected: self.width(),
                found: record.values.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn append(&mut self, other: FeatureTable) -> Result<(), FeatureError> {
        if other.width() != self.width() {
            return Err(FeatureError::WidthMismatch {
                expected: self.width(),
                found: other.width(),
            });
        }
        self.records.extend(other.records);
        Ok(())
    }

    pub fn from_time_rows(
        subject: u32,
        rows: &[TimeFeatureRow],
        labels: &[Label],
    ) -> Result<Self, FeatureError> {
        check_labels(rows.len(), labels)?;
        let mut table = Self::new(Self::time_columns());
        for (row, &activity) in rows.iter().zip(labels) {
            table.push(FeatureRecord {
                subject,
                activity,
                values: row.values.to_vec(),
                degenerate: row.raw_degenerate || row.jerk_degenerate,
            })?;
        }
        Ok(table)
    }

    pub fn from_spectral_rows(
        subject: u32,
        channel: Channel,
        n_peaks: usize,
        rows: &[SpectralFeatureRow],
        labels: &[Label],
    ) -> Result<Self, FeatureError> {
        check_labels(rows.len(), labels)?;
        let mut table = Self::new(Self::spectral_columns(channel, n_peaks));
        for (row, &activity) in rows.iter().zip(labels) {
            table.push(FeatureRecord {
                subject,
                activity,
                values: row.values.clone(),
                degenerate: row.found < n_peaks,
            })?;
        }
        Ok(table)
    }

    pub fn features(&self) -> Vec<Vec<f64>> {
        self.records.iter().map(|r| r.values.clone()).collect()
    }
    pub fn subjects(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.subject as Label).collect()
    }
    pub fn activities(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.activity).collect()
    }

    /// `subject,activity,<columns>,degenerate` with a header row.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec!["subject".to_string(), "activity".to_string()];
        header.extend(self.columns.iter().cloned());
        header.push("degenerate".to_string());
        writer.write_record(&header)?;
        for record in &self.records {
            let mut fields = vec![record.subject.to_string(), record.activity.to_string()];
            fields.extend(record.values.iter().map(|v| v.to_string()));
            fields.push(u8::from(record.degenerate).to_string());
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn check_labels(rows: usize, labels: &[Label]) -> Result<(), FeatureError> {
    if labels.len() < rows {
        return Err(FeatureError::LabelsTooShort {
            needed: rows,
            found: labels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectral_row(slice: usize, values: Vec<f64>, found: usize) -> SpectralFeatureRow {
        SpectralFeatureRow {
            slice,
            time_s: 0.0,
            values,
            found,
        }
    }

    #[test]
    fn builds_spectral_table_and_writes_csv() {
        let rows = vec![
            spectral_row(0, vec![1.5, 3.0], 2),
            spectral_row(1, vec![2.0, 0.0], 1),
        ];
        let table = FeatureTable::from_spectral_rows(7, Channel::Magnitude, 2, &rows, &[4, 4])
            .unwrap();
        assert_eq!(table.columns, vec!["magnitude_pk0", "magnitude_pk1"]);
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "subject,activity,magnitude_pk0,magnitude_pk1,degenerate");
        assert_eq!(lines[1], "7,4,1.5,3,0");
        assert_eq!(lines[2], "7,4,2,0,1");
    }

    #[test]
    fn width_is_enforced() {
        let mut table = FeatureTable::new(vec!["a".into(), "b".into()]);
        let err = table
            .push(FeatureRecord {
                subject: 1,
                activity: 1,
                values: vec![1.0],
                degenerate: false,
            })
            .unwrap_err();
        assert_eq!(err, FeatureError::WidthMismatch { expected: 2, found: 1 });
        assert!(table
            .append(FeatureTable::new(FeatureTable::time_columns()))
            .is_err());
    }

    #[test]
    fn time_rows_carry_degenerate_flag() {
        let row = TimeFeatureRow {
            window: 0,
            start_index: 0,
            values: [0.0; 12],
            raw_degenerate: false,
            jerk_degenerate: true,
        };
        let table = FeatureTable::from_time_rows(3, &[row], &[2]).unwrap();
        assert_eq!(table.width(), 12);
        assert!(table.records[0].degenerate);
        assert_eq!(table.activities(), vec![2]);
        assert_eq!(table.subjects(), vec![3]);
        assert!(FeatureTable::from_time_rows(3, &[], &[]).unwrap().is_empty());
    }
}
