/// Best-candidate selection from optimizer output.
///
/// The external optimizer writes one record per evaluated candidate: the
/// normalized parameter vector spread over `par`-prefixed columns plus one
/// objective-score column (`like1`, lower is better). Selection scans the
/// population in stored order and keeps the first record with the minimum
/// objective, so ties resolve the same way on every run.
use std::path::Path;

use crate::error::{EvalError, EvalResult};
use crate::store::{BestParameterRecord, ParameterStore};
use crate::BasinId;

/// Column-name prefix marking parameter fields in the optimizer table.
pub const PARAM_FIELD_PREFIX: &str = "par";

/// Objective-score column written by the optimizer.
pub const OBJECTIVE_FIELD: &str = "like1";

/// One evaluated candidate: normalized parameters plus its objective score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub objective: f64,
    pub params: Vec<f64>,
}

/// The full candidate population for one basin, in the optimizer's stored
/// record order.
#[derive(Debug, Clone)]
pub struct OptimizerPopulation {
    source: String,
    param_fields: Vec<String>,
    records: Vec<Candidate>,
}

impl OptimizerPopulation {
    /// Build a population from already-parsed records. `param_fields` must
    /// follow the optimizer's column-name convention.
    pub fn new(
        source: impl Into<String>,
        param_fields: Vec<String>,
        records: Vec<Candidate>,
    ) -> EvalResult<Self> {
        let source = source.into();
        if param_fields.is_empty()
            || !param_fields
                .iter()
                .all(|f| f.starts_with(PARAM_FIELD_PREFIX))
        {
            return Err(EvalError::MalformedRecord {
                origin: source,
                reason: format!("no '{PARAM_FIELD_PREFIX}'-prefixed parameter fields"),
            });
        }
        Ok(Self {
            source,
            param_fields,
            records,
        })
    }

    /// Parse the optimizer's result file.
    pub fn from_csv(path: &Path) -> EvalResult<Self> {
        if !path.exists() {
            return Err(EvalError::MissingInput {
                path: path.display().to_string(),
            });
        }
        let source = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?.clone();

        let objective_idx = headers
            .iter()
            .position(|h| h == OBJECTIVE_FIELD)
            .ok_or_else(|| EvalError::MalformedRecord {
                origin: source.clone(),
                reason: format!("no '{OBJECTIVE_FIELD}' objective field"),
            })?;
        let param_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(PARAM_FIELD_PREFIX))
            .map(|(i, h)| (i, h.to_string()))
            .collect();
        if param_columns.is_empty() {
            return Err(EvalError::MalformedRecord {
                origin: source,
                reason: format!("no '{PARAM_FIELD_PREFIX}'-prefixed parameter fields"),
            });
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let parse = |i: usize| -> EvalResult<f64> {
                record
                    .get(i)
                    .and_then(|v| v.parse::<f64>().ok())
                    .ok_or_else(|| EvalError::MalformedRecord {
                        origin: source.clone(),
                        reason: format!("non-numeric field in column {i}"),
                    })
            };
            let objective = parse(objective_idx)?;
            let params = param_columns
                .iter()
                .map(|(i, _)| parse(*i))
                .collect::<EvalResult<Vec<f64>>>()?;
            records.push(Candidate { objective, params });
        }

        let param_fields = param_columns.into_iter().map(|(_, name)| name).collect();
        Ok(Self {
            source,
            param_fields,
            records,
        })
    }

    /// Parameter column names, in stored order.
    pub fn param_fields(&self) -> &[String] {
        &self.param_fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The candidate with the minimum objective value. Ties break toward the
    /// earliest stored record; the scan never reorders the population.
    pub fn select_best(&self) -> EvalResult<(&Candidate, usize)> {
        let mut best: Option<(usize, &Candidate)> = None;
        for (i, candidate) in self.records.iter().enumerate() {
            let better = match best {
                None => true,
                Some((_, current)) => candidate.objective < current.objective,
            };
            if better {
                best = Some((i, candidate));
            }
        }
        let (index, candidate) = best.ok_or_else(|| EvalError::EmptyPopulation {
            origin: self.source.clone(),
        })?;
        Ok((candidate, index))
    }
}

/// Select the best candidate for `basin` and persist it through the store.
pub fn select_and_save(
    store: &ParameterStore,
    basin: &BasinId,
    population: &OptimizerPopulation,
) -> EvalResult<BestParameterRecord> {
    let (candidate, index) = population.select_best()?;
    log::info!(
        "basin {basin}: best of {} candidates is record {index} (objective {})",
        population.len(),
        candidate.objective
    );
    store.save(basin, &candidate.params)?;
    Ok(BestParameterRecord {
        basin: basin.clone(),
        param_fields: population.param_fields.clone(),
        values: candidate.params.clone(),
        objective: candidate.objective,
    })
}
