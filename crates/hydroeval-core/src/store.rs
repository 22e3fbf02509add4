/// Persistent per-basin parameter storage.
///
/// The store owns one delimited text file per basin holding that basin's
/// best normalized parameter vector: one header row, one value column, all
/// values in the optimizer's [0, 1] space. Calibration is idempotent per
/// basin, so `save` replaces any existing file, and the replacement is
/// atomic — an interrupted write never leaves a truncated file to be
/// mistaken for stale results on the next run.
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tempfile::NamedTempFile;

use crate::error::{EvalError, EvalResult};
use crate::model_config::ModelSpec;
use crate::table::WideTable;
use crate::BasinId;

/// Suffix of each per-basin parameter file.
pub const PARAM_FILE_SUFFIX: &str = "_calibrate_params.txt";

/// Consolidated normalized-parameter summary file name.
pub const PARAMS_SUMMARY_FILE: &str = "basins_params.csv";

/// The selected normalized parameter vector for one basin, together with
/// the optimizer field names that fix its ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct BestParameterRecord {
    pub basin: BasinId,
    pub param_fields: Vec<String>,
    pub values: Vec<f64>,
    pub objective: f64,
}

#[derive(Debug, Clone)]
pub struct ParameterStore {
    dir: PathBuf,
}

impl ParameterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one basin's parameter file.
    pub fn param_file(&self, basin: &BasinId) -> PathBuf {
        self.dir.join(format!("{basin}{PARAM_FILE_SUFFIX}"))
    }

    /// Write one basin's normalized vector, replacing any existing file.
    pub fn save(&self, basin: &BasinId, values: &[f64]) -> EvalResult<()> {
        let path = self.param_file(basin);
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer.write_record(["value"])?;
            for v in values {
                writer.write_record([v.to_string()])?;
            }
            writer.flush()?;
        }
        tmp.persist(&path).map_err(|e| EvalError::Io(e.error))?;
        log::debug!("saved {} parameter values for basin {basin}", values.len());
        Ok(())
    }

    /// Read one basin's normalized vector.
    pub fn load(&self, basin: &BasinId) -> EvalResult<Vec<f64>> {
        let path = self.param_file(basin);
        if !path.exists() {
            return Err(EvalError::MissingParameterFile {
                basin: basin.to_string(),
                path: path.display().to_string(),
            });
        }
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)?;
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = record.get(0).unwrap_or_default();
            let value = field.parse::<f64>().map_err(|_| EvalError::MalformedRecord {
                origin: source.clone(),
                reason: format!("non-numeric parameter value '{field}'"),
            })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Stack every basin's vector row-wise, in the given basin order.
    ///
    /// All vectors must have the same length as the first basin's.
    pub fn load_all(&self, basins: &[BasinId]) -> EvalResult<Array2<f64>> {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(basins.len());
        let mut width = None;
        for basin in basins {
            let values = self.load(basin)?;
            let expected = *width.get_or_insert(values.len());
            if values.len() != expected {
                return Err(EvalError::InconsistentParameterLength {
                    basin: basin.to_string(),
                    expected,
                    got: values.len(),
                });
            }
            rows.push(values);
        }
        let width = width.unwrap_or(0);
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((basins.len(), width), flat)
            .expect("row stacking preserves shape"))
    }

    /// Consolidate every basin's stored vector into one table labeled with
    /// the model's declared parameter order, and persist it.
    ///
    /// The returned table has parameter-name rows and basin columns; it is
    /// assembled basin-major and transposed before writing, so the persisted
    /// `basins_params.csv` matches the returned orientation.
    pub fn summarize(&self, basins: &[BasinId], spec: &ModelSpec) -> EvalResult<WideTable> {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(basins.len());
        for basin in basins {
            let values = self.load(basin)?;
            if values.len() != spec.n_params() {
                return Err(EvalError::InconsistentParameterLength {
                    basin: basin.to_string(),
                    expected: spec.n_params(),
                    got: values.len(),
                });
            }
            rows.push(values);
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let by_basin = WideTable::new(
            "basin",
            basins.iter().map(BasinId::to_string).collect(),
            spec.param_names.iter().map(|n| n.to_string()).collect(),
            Array2::from_shape_vec((basins.len(), spec.n_params()), flat)
                .expect("row stacking preserves shape"),
        );
        let by_param = by_basin.transposed("param");
        let path = self.dir.join(PARAMS_SUMMARY_FILE);
        by_param.write_csv(&path)?;
        log::info!(
            "wrote {} x {} parameter summary to {}",
            by_param.n_rows(),
            by_param.n_columns(),
            path.display()
        );
        Ok(by_param)
    }
}
