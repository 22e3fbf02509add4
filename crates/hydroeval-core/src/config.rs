/// Run configuration documents.
///
/// A calibration run leaves behind `args.json` (the warm-up length and the
/// model's runtime parameters) in its results directory, and one
/// `data_info_fold{fold}_{split}.json` per fold and split next to it (the
/// time and basin labels of the archived forcing). Both are read once per
/// replay invocation.
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EvalError, EvalResult};
use crate::BasinId;

pub const ARGS_FILE: &str = "args.json";

/// Evaluation split of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Model section of `args.json`: the model name plus whatever runtime
/// parameters the simulator was configured with. The extra fields are kept
/// verbatim — they belong to the simulator, not to this pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelRunConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Contents of `args.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub warmup_length: usize,
    pub model: ModelRunConfig,
}

impl RunConfig {
    /// Load the run configuration from a results directory.
    pub fn load(result_dir: &Path) -> EvalResult<Self> {
        let path = result_dir.join(ARGS_FILE);
        if !path.exists() {
            return Err(EvalError::MissingInput {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DataInfoFile {
    time: Vec<String>,
    basin: Vec<String>,
}

/// Time and basin labels of one fold/split's archived forcing period.
#[derive(Debug, Clone)]
pub struct DataInfo {
    pub time: Vec<String>,
    pub basins: Vec<BasinId>,
}

impl DataInfo {
    /// Load `data_info_fold{fold}_{split}.json` from the experiment
    /// directory (the parent of the results directory).
    pub fn load(exp_dir: &Path, fold: usize, split: Split) -> EvalResult<Self> {
        let path = exp_dir.join(format!("data_info_fold{fold}_{}.json", split.as_str()));
        if !path.exists() {
            return Err(EvalError::MissingInput {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let file: DataInfoFile = serde_json::from_str(&content)?;
        Ok(Self {
            time: file.time,
            basins: file.basin.into_iter().map(BasinId::new).collect(),
        })
    }
}
