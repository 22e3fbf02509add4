//! Accuracy statistics for calibrated streamflow.
//!
//! All metrics take observed and simulated slices over the same time window
//! and return a scalar score. `compute_metrics` bundles them into the named
//! mapping that the per-basin metric files carry.

use std::collections::BTreeMap;

use crate::error::{EvalError, EvalResult};
use crate::units::FlowSeries;
use crate::BasinId;

/// Metric name → scalar value for one basin and one evaluation split.
pub type MetricSet = BTreeMap<String, f64>;

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Nash-Sutcliffe Efficiency. Range: (-inf, 1], 1 = perfect.
///
/// Returns -inf when the observed series has zero variance.
pub fn nse(observed: &[f64], simulated: &[f64]) -> f64 {
    let mean_obs = mean(observed);
    let numerator: f64 = observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).powi(2))
        .sum();
    let denominator: f64 = observed.iter().map(|o| (o - mean_obs).powi(2)).sum();
    if denominator == 0.0 {
        return f64::NEG_INFINITY;
    }
    1.0 - numerator / denominator
}

/// Kling-Gupta Efficiency. Range: (-inf, 1], 1 = perfect.
pub fn kge(observed: &[f64], simulated: &[f64]) -> f64 {
    let n = observed.len() as f64;
    let mean_o = mean(observed);
    let mean_s = mean(simulated);
    let std_o = (observed.iter().map(|o| (o - mean_o).powi(2)).sum::<f64>() / n).sqrt();
    let std_s = (simulated.iter().map(|s| (s - mean_s).powi(2)).sum::<f64>() / n).sqrt();

    let r = if std_o == 0.0 || std_s == 0.0 {
        0.0
    } else {
        observed
            .iter()
            .zip(simulated)
            .map(|(o, s)| (o - mean_o) * (s - mean_s))
            .sum::<f64>()
            / (n * std_o * std_s)
    };
    let alpha = if std_o == 0.0 { 0.0 } else { std_s / std_o };
    let beta = if mean_o == 0.0 { 0.0 } else { mean_s / mean_o };

    1.0 - ((r - 1.0).powi(2) + (alpha - 1.0).powi(2) + (beta - 1.0).powi(2)).sqrt()
}

/// Root Mean Square Error. Range: [0, inf), 0 = perfect.
pub fn rmse(observed: &[f64], simulated: &[f64]) -> f64 {
    let mse = observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).powi(2))
        .sum::<f64>()
        / observed.len() as f64;
    mse.sqrt()
}

/// Percent Bias. Optimal = 0. Positive = overestimation.
///
/// Returns +inf when the observed series sums to zero.
pub fn pbias(observed: &[f64], simulated: &[f64]) -> f64 {
    let sum_obs: f64 = observed.iter().sum();
    if sum_obs == 0.0 {
        return f64::INFINITY;
    }
    let diff_sum: f64 = simulated.iter().zip(observed).map(|(s, o)| s - o).sum();
    100.0 * diff_sum / sum_obs
}

/// Mean Absolute Error. Range: [0, inf), 0 = perfect.
pub fn mae(observed: &[f64], simulated: &[f64]) -> f64 {
    observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).abs())
        .sum::<f64>()
        / observed.len() as f64
}

/// All shipped metrics for one basin over one split.
pub fn compute_metrics(observed: &[f64], simulated: &[f64]) -> MetricSet {
    let mut set = MetricSet::new();
    set.insert("NSE".into(), nse(observed, simulated));
    set.insert("KGE".into(), kge(observed, simulated));
    set.insert("RMSE".into(), rmse(observed, simulated));
    set.insert("PBIAS".into(), pbias(observed, simulated));
    set.insert("MAE".into(), mae(observed, simulated));
    set
}

/// Per-basin metrics for a pair of aligned flow series.
///
/// Observed and simulated must share basin order and time index; anything
/// else would score one basin's simulation against another's observations.
pub fn evaluate_series(
    observed: &FlowSeries,
    simulated: &FlowSeries,
) -> EvalResult<Vec<(BasinId, MetricSet)>> {
    if observed.basins() != simulated.basins() {
        return Err(EvalError::GridMismatch {
            reason: "observed and simulated series list different basins".into(),
        });
    }
    if observed.times() != simulated.times() {
        return Err(EvalError::GridMismatch {
            reason: "observed and simulated series cover different time indices".into(),
        });
    }
    Ok(observed
        .basins()
        .iter()
        .enumerate()
        .map(|(j, basin)| {
            let obs = observed.values().column(j).to_vec();
            let sim = simulated.values().column(j).to_vec();
            (basin.clone(), compute_metrics(&obs, &sim))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const OBS: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn nse_perfect_match() {
        assert_relative_eq!(nse(&OBS, &OBS), 1.0);
    }

    #[test]
    fn nse_mean_simulation_gives_zero() {
        let sim = [3.0; 5];
        assert_relative_eq!(nse(&OBS, &sim), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn nse_constant_observed_returns_neg_inf() {
        let obs = [5.0; 5];
        assert_eq!(nse(&obs, &OBS), f64::NEG_INFINITY);
    }

    #[test]
    fn kge_perfect_match() {
        assert_relative_eq!(kge(&OBS, &OBS), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn kge_bias_reduces_score() {
        let sim = [2.0, 3.0, 4.0, 5.0, 6.0];
        assert!(kge(&OBS, &sim) < 1.0);
    }

    #[test]
    fn rmse_constant_error() {
        let sim = [2.0, 3.0, 4.0, 5.0, 6.0];
        assert_relative_eq!(rmse(&OBS, &sim), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn pbias_sign_follows_over_and_underestimation() {
        let over = [2.0, 3.0, 4.0, 5.0, 6.0];
        let under = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert!(pbias(&OBS, &over) > 0.0);
        assert!(pbias(&OBS, &under) < 0.0);
    }

    #[test]
    fn pbias_zero_observed_returns_inf() {
        let obs = [0.0; 5];
        assert_eq!(pbias(&obs, &OBS), f64::INFINITY);
    }

    #[test]
    fn mae_symmetric_error() {
        let obs = [2.0, 2.0];
        let sim = [1.0, 3.0];
        assert_relative_eq!(mae(&obs, &sim), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn compute_metrics_has_stable_names() {
        let set = compute_metrics(&OBS, &OBS);
        let names: Vec<&str> = set.keys().map(String::as_str).collect();
        assert_eq!(names, ["KGE", "MAE", "NSE", "PBIAS", "RMSE"]);
        assert_relative_eq!(set["NSE"], 1.0);
        assert_relative_eq!(set["RMSE"], 0.0);
    }
}
