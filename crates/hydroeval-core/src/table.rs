/// Labeled wide tables.
///
/// Every consolidated output of the pipeline — parameter summaries, metric
/// tables, ET replay tables — is a rectangle of f64 values with labeled rows
/// and columns plus a name for the row-key column. `WideTable` keeps labels
/// and values in one structure so they cannot drift apart between assembly
/// and persistence.
use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use tempfile::NamedTempFile;

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    index_label: String,
    row_labels: Vec<String>,
    column_labels: Vec<String>,
    values: Array2<f64>,
}

impl WideTable {
    /// Assemble a table. Label lengths must match the value dimensions.
    pub fn new(
        index_label: impl Into<String>,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        assert_eq!(
            row_labels.len(),
            values.nrows(),
            "row labels must match value rows"
        );
        assert_eq!(
            column_labels.len(),
            values.ncols(),
            "column labels must match value columns"
        );
        Self {
            index_label: index_label.into(),
            row_labels,
            column_labels,
            values,
        }
    }

    pub fn index_label(&self) -> &str {
        &self.index_label
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    /// View of one column by label.
    pub fn column(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
        let j = self.column_labels.iter().position(|c| c == label)?;
        Some(self.values.index_axis(Axis(1), j))
    }

    /// View of one row by label.
    pub fn row(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
        let i = self.row_labels.iter().position(|r| r == label)?;
        Some(self.values.index_axis(Axis(0), i))
    }

    /// Transposed copy: rows become columns, under a new row-key name.
    pub fn transposed(&self, index_label: impl Into<String>) -> WideTable {
        WideTable {
            index_label: index_label.into(),
            row_labels: self.column_labels.clone(),
            column_labels: self.row_labels.clone(),
            values: self.values.t().to_owned(),
        }
    }

    /// Write the table as delimited text: header row of `index_label` plus
    /// column labels, then one record per row. The file is staged next to
    /// its destination and atomically renamed into place, so a failed write
    /// leaves no partial file behind.
    pub fn write_csv(&self, path: &Path) -> EvalResult<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(d) => NamedTempFile::new_in(d)?,
            None => NamedTempFile::new()?,
        };
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            let mut header = Vec::with_capacity(1 + self.column_labels.len());
            header.push(self.index_label.clone());
            header.extend(self.column_labels.iter().cloned());
            writer.write_record(&header)?;
            for (label, row) in self.row_labels.iter().zip(self.values.rows()) {
                let mut record = Vec::with_capacity(1 + row.len());
                record.push(label.clone());
                record.extend(row.iter().map(|v| v.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| EvalError::Io(e.error))?;
        Ok(())
    }

    /// Read a table previously written by [`WideTable::write_csv`].
    pub fn read_csv(path: &Path) -> EvalResult<WideTable> {
        if !path.exists() {
            return Err(EvalError::MissingInput {
                path: path.display().to_string(),
            });
        }
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(EvalError::MalformedRecord {
                origin: source,
                reason: "empty header row".into(),
            });
        }
        let index_label = headers[0].to_string();
        let column_labels: Vec<String> = headers.iter().skip(1).map(String::from).collect();

        let mut row_labels = Vec::new();
        let mut flat = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(EvalError::MalformedRecord {
                    origin: source,
                    reason: format!(
                        "record has {} fields, header has {}",
                        record.len(),
                        headers.len()
                    ),
                });
            }
            row_labels.push(record[0].to_string());
            for field in record.iter().skip(1) {
                let value = field.parse::<f64>().map_err(|_| EvalError::MalformedRecord {
                    origin: source.clone(),
                    reason: format!("non-numeric value '{field}'"),
                })?;
                flat.push(value);
            }
        }

        let values = Array2::from_shape_vec((row_labels.len(), column_labels.len()), flat)
            .map_err(|e| EvalError::MalformedRecord {
                origin: source,
                reason: e.to_string(),
            })?;
        Ok(WideTable {
            index_label,
            row_labels,
            column_labels,
            values,
        })
    }
}
