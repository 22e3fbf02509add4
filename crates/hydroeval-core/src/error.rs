//! Typed errors for the evaluation pipeline.
//!
//! Failures fall into three classes, all fatal: missing inputs (a basin's
//! file or directory is absent), schema mismatches (metric sets or vector
//! lengths disagree across basins), and alignment violations (warm-up offset
//! vs. forcing length). None of them is retriable — the pipeline runs over
//! already-computed artifacts, so every error names the basin or path needed
//! to diagnose the run that produced them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    // -- missing inputs --
    #[error("missing input file: {path}")]
    MissingInput { path: String },

    #[error("no calibrated parameter file for basin '{basin}' at {path}")]
    MissingParameterFile { basin: String, path: String },

    #[error("no {split} metrics file for basin '{basin}' at {path}")]
    MissingMetricsFile {
        basin: String,
        split: String,
        path: String,
    },

    #[error("no drainage area for basin '{basin}'")]
    MissingBasinArea { basin: String },

    #[error("parameter table has no column for basin '{basin}'")]
    MissingParameterColumn { basin: String },

    // -- optimizer output --
    #[error("optimizer population from {origin} contains no records")]
    EmptyPopulation { origin: String },

    #[error("malformed optimizer result table {origin}: {reason}")]
    MalformedRecord { origin: String, reason: String },

    // -- schema mismatches --
    #[error("basin '{basin}' stored {got} parameter values, expected {expected}")]
    InconsistentParameterLength {
        basin: String,
        expected: usize,
        got: usize,
    },

    #[error("parameter vector has {got} values but the bound table declares {expected}")]
    ParameterCountMismatch { expected: usize, got: usize },

    #[error("basin '{basin}' {split} metrics disagree with the first basin on metric '{metric}'")]
    MetricSchemaMismatch {
        basin: String,
        split: String,
        metric: String,
    },

    #[error("unknown model '{name}'")]
    UnknownModel { name: String },

    // -- alignment --
    #[error("warm-up length {warmup} consumes the whole {split} forcing period ({forcing_len} steps)")]
    WarmupExceedsForcing {
        split: String,
        warmup: usize,
        forcing_len: usize,
    },

    #[error("{split} replay for basin '{basin}' produced {got} reportable rows, expected {expected}")]
    WarmupAlignment {
        split: String,
        basin: String,
        expected: usize,
        got: usize,
    },

    #[error("flow series is tagged '{found}' but the conversion expects '{expected}'")]
    UnitMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("misaligned grid: {reason}")]
    GridMismatch { reason: String },

    // -- I/O wrappers --
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("delimited table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Netcdf(#[from] netcdf::error::Error),
}

pub type EvalResult<T> = Result<T, EvalError>;
