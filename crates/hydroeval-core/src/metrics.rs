/// Cross-basin metric aggregation.
///
/// Each basin directory under a results root carries one train and one test
/// metrics document (metric name → scalar). Aggregation reads every basin
/// independently, then merges the per-basin mappings into two wide tables
/// (metric rows × basin columns) in one explicit step. A basin with a
/// missing file, or a metric set that disagrees with the first basin's, is
/// a hard error: dropping or padding a basin would silently corrupt every
/// cross-basin comparison downstream.
use std::fs;
use std::path::Path;

use ndarray::Array2;
use tempfile::NamedTempFile;

use crate::error::{EvalError, EvalResult};
use crate::stats::MetricSet;
use crate::table::WideTable;
use crate::BasinId;

pub const TRAIN_METRICS_FILE: &str = "train_metrics.json";
pub const TEST_METRICS_FILE: &str = "test_metrics.json";

/// Aggregated table file names, one per split.
pub const METRICS_SUMMARY_TRAIN_FILE: &str = "basins_metrics_train.csv";
pub const METRICS_SUMMARY_TEST_FILE: &str = "basins_metrics_test.csv";

/// Both metric sets for one basin.
#[derive(Debug, Clone)]
pub struct BasinMetrics {
    pub basin: BasinId,
    pub train: MetricSet,
    pub test: MetricSet,
}

/// List basin directories under the results root, sorted by name.
///
/// Sorting removes any dependence on filesystem enumeration order, so the
/// column order of aggregated tables is reproducible across machines.
pub fn discover_basins(result_dir: &Path) -> EvalResult<Vec<BasinId>> {
    if !result_dir.is_dir() {
        return Err(EvalError::MissingInput {
            path: result_dir.display().to_string(),
        });
    }
    let mut basins = Vec::new();
    for entry in fs::read_dir(result_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            basins.push(BasinId::new(entry.file_name().to_string_lossy()));
        }
    }
    basins.sort();
    Ok(basins)
}

fn read_metric_file(path: &Path, basin: &BasinId, split: &str) -> EvalResult<MetricSet> {
    if !path.exists() {
        return Err(EvalError::MissingMetricsFile {
            basin: basin.to_string(),
            split: split.into(),
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read one basin's train and test metric documents.
pub fn read_basin_metrics(result_dir: &Path, basin: &BasinId) -> EvalResult<BasinMetrics> {
    let basin_dir = result_dir.join(basin.as_str());
    Ok(BasinMetrics {
        basin: basin.clone(),
        train: read_metric_file(&basin_dir.join(TRAIN_METRICS_FILE), basin, "train")?,
        test: read_metric_file(&basin_dir.join(TEST_METRICS_FILE), basin, "test")?,
    })
}

fn write_json_atomic(path: &Path, value: &MetricSet) -> EvalResult<()> {
    let dir = path.parent().expect("metric file has a parent directory");
    let tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file(), value)?;
    tmp.persist(path).map_err(|e| EvalError::Io(e.error))?;
    Ok(())
}

/// Write one basin's metric documents, creating its directory if needed.
pub fn write_basin_metrics(
    result_dir: &Path,
    basin: &BasinId,
    train: &MetricSet,
    test: &MetricSet,
) -> EvalResult<()> {
    let basin_dir = result_dir.join(basin.as_str());
    fs::create_dir_all(&basin_dir)?;
    write_json_atomic(&basin_dir.join(TRAIN_METRICS_FILE), train)?;
    write_json_atomic(&basin_dir.join(TEST_METRICS_FILE), test)?;
    Ok(())
}

/// Merge per-basin metric sets into one metric × basin table.
///
/// The first basin fixes the metric-name rows; every later basin must carry
/// exactly that set.
fn merge(split: &str, basins: &[BasinId], sets: &[&MetricSet]) -> EvalResult<WideTable> {
    let names: Vec<String> = match sets.first() {
        Some(first) => first.keys().cloned().collect(),
        None => Vec::new(),
    };
    for (basin, set) in basins.iter().zip(sets) {
        for key in set.keys() {
            if !names.iter().any(|n| n == key) {
                return Err(EvalError::MetricSchemaMismatch {
                    basin: basin.to_string(),
                    split: split.into(),
                    metric: key.clone(),
                });
            }
        }
        for name in &names {
            if !set.contains_key(name) {
                return Err(EvalError::MetricSchemaMismatch {
                    basin: basin.to_string(),
                    split: split.into(),
                    metric: name.clone(),
                });
            }
        }
    }

    let mut values = Array2::zeros((names.len(), basins.len()));
    for (j, set) in sets.iter().enumerate() {
        for (i, name) in names.iter().enumerate() {
            values[[i, j]] = set[name];
        }
    }
    Ok(WideTable::new(
        "metric",
        names,
        basins.iter().map(BasinId::to_string).collect(),
        values,
    ))
}

/// Aggregate the given basins' metric documents into train and test tables,
/// columns in the given basin order.
pub fn aggregate(result_dir: &Path, basins: &[BasinId]) -> EvalResult<(WideTable, WideTable)> {
    let per_basin: Vec<BasinMetrics> = basins
        .iter()
        .map(|b| read_basin_metrics(result_dir, b))
        .collect::<EvalResult<_>>()?;

    let train_sets: Vec<&MetricSet> = per_basin.iter().map(|m| &m.train).collect();
    let test_sets: Vec<&MetricSet> = per_basin.iter().map(|m| &m.test).collect();
    let train = merge("train", basins, &train_sets)?;
    let test = merge("test", basins, &test_sets)?;
    Ok((train, test))
}

/// Discover basins (sorted), aggregate, and persist both tables under the
/// results root.
pub fn aggregate_dir(result_dir: &Path) -> EvalResult<(WideTable, WideTable)> {
    let basins = discover_basins(result_dir)?;
    log::info!("aggregating metrics for {} basins", basins.len());
    let (train, test) = aggregate(result_dir, &basins)?;
    train.write_csv(&result_dir.join(METRICS_SUMMARY_TRAIN_FILE))?;
    test.write_csv(&result_dir.join(METRICS_SUMMARY_TEST_FILE))?;
    Ok((train, test))
}
