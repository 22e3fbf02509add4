/// Normalized ⇄ physical parameter mapping.
///
/// The optimizer searches the unit cube; the model consumes physical values.
/// Each parameter maps affinely through its declared (low, high) bound:
/// `physical = lo + normalized * (hi - lo)`. The i-th normalized value must
/// correspond to the i-th declared parameter — these functions take the
/// bound slice and the vector together so a caller cannot pair a vector
/// with the wrong order.
use ndarray::Array2;

use crate::error::{EvalError, EvalResult};
use crate::model_config::ModelSpec;
use crate::store::ParameterStore;
use crate::table::WideTable;
use crate::BasinId;

/// Consolidated physical-parameter summary file name.
pub const RENORMALIZED_SUMMARY_FILE: &str = "basins_renormalization_params.csv";

/// Map a normalized vector into physical units.
pub fn denormalize(normalized: &[f64], bounds: &[(f64, f64)]) -> EvalResult<Vec<f64>> {
    if normalized.len() != bounds.len() {
        return Err(EvalError::ParameterCountMismatch {
            expected: bounds.len(),
            got: normalized.len(),
        });
    }
    Ok(normalized
        .iter()
        .zip(bounds)
        .map(|(x, (lo, hi))| lo + x * (hi - lo))
        .collect())
}

/// Inverse affine map: recover normalized values from physical ones.
///
/// A degenerate bound (`hi == lo`) carries no information and maps to 0.
pub fn normalize(physical: &[f64], bounds: &[(f64, f64)]) -> EvalResult<Vec<f64>> {
    if physical.len() != bounds.len() {
        return Err(EvalError::ParameterCountMismatch {
            expected: bounds.len(),
            got: physical.len(),
        });
    }
    Ok(physical
        .iter()
        .zip(bounds)
        .map(|(p, (lo, hi))| {
            if hi == lo {
                0.0
            } else {
                (p - lo) / (hi - lo)
            }
        })
        .collect())
}

/// Denormalize every basin's stored vector and assemble the physical-value
/// table: parameter-name rows in the bound table's declared order, basin
/// columns in the given order. The table is persisted alongside the store.
pub fn denormalize_all(
    store: &ParameterStore,
    basins: &[BasinId],
    spec: &ModelSpec,
) -> EvalResult<WideTable> {
    let n = spec.n_params();
    let mut values = Array2::zeros((n, basins.len()));
    for (j, basin) in basins.iter().enumerate() {
        let stored = store.load(basin)?;
        if stored.len() != n {
            return Err(EvalError::InconsistentParameterLength {
                basin: basin.to_string(),
                expected: n,
                got: stored.len(),
            });
        }
        let physical = denormalize(&stored, spec.param_bounds)?;
        for (i, v) in physical.into_iter().enumerate() {
            values[[i, j]] = v;
        }
    }

    let table = WideTable::new(
        "param",
        spec.param_names.iter().map(|s| s.to_string()).collect(),
        basins.iter().map(BasinId::to_string).collect(),
        values,
    );
    let path = store.dir().join(RENORMALIZED_SUMMARY_FILE);
    table.write_csv(&path)?;
    log::info!(
        "wrote physical parameter table for {} basins to {}",
        basins.len(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_config;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    const BOUNDS: &[(f64, f64)] = &[(0.0, 10.0), (100.0, 200.0), (-1.0, 1.0)];

    #[test]
    fn denormalize_maps_unit_interval_to_bounds() {
        let physical = denormalize(&[0.0, 0.5, 1.0], BOUNDS).unwrap();
        assert_relative_eq!(physical[0], 0.0);
        assert_relative_eq!(physical[1], 150.0);
        assert_relative_eq!(physical[2], 1.0);
    }

    #[test]
    fn values_stay_within_declared_bounds() {
        let spec = model_config::model_spec("xaj").unwrap();
        let normalized: Vec<f64> = (0..spec.n_params()).map(|i| i as f64 / 14.0).collect();
        let physical = denormalize(&normalized, spec.param_bounds).unwrap();
        for (v, (lo, hi)) in physical.iter().zip(spec.param_bounds) {
            assert!(lo <= v && v <= hi);
        }
    }

    #[test]
    fn round_trip_recovers_physical_vector() {
        let physical = [7.3, 112.0, -0.4];
        let normalized = normalize(&physical, BOUNDS).unwrap();
        let back = denormalize(&normalized, BOUNDS).unwrap();
        for (a, b) in physical.iter().zip(&back) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn degenerate_bound_normalizes_to_zero() {
        let bounds = &[(5.0, 5.0)];
        assert_eq!(normalize(&[5.0], bounds).unwrap(), vec![0.0]);
        assert_eq!(denormalize(&[0.0], bounds).unwrap(), vec![5.0]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(matches!(
            denormalize(&[0.5], BOUNDS),
            Err(EvalError::ParameterCountMismatch { expected: 3, got: 1 })
        ));
        assert!(matches!(
            normalize(&[0.5, 0.5, 0.5, 0.5], BOUNDS),
            Err(EvalError::ParameterCountMismatch { expected: 3, got: 4 })
        ));
    }

    #[test]
    fn denormalize_all_orders_rows_by_declared_names() {
        let dir = TempDir::new().unwrap();
        let store = ParameterStore::new(dir.path());
        let spec = model_config::model_spec("xaj").unwrap();
        let b1 = BasinId::new("b1");
        let b2 = BasinId::new("b2");
        store.save(&b1, &vec![0.0; spec.n_params()]).unwrap();
        store.save(&b2, &vec![1.0; spec.n_params()]).unwrap();

        let table = denormalize_all(&store, &[b1, b2], spec).unwrap();
        assert_eq!(table.row_labels().len(), spec.n_params());
        assert_eq!(table.row_labels()[0], "K");
        assert_eq!(table.column_labels(), ["b1", "b2"]);
        // All-zeros basin sits at every lower bound, all-ones at every upper.
        for (i, (lo, hi)) in spec.param_bounds.iter().enumerate() {
            assert_relative_eq!(table.values()[[i, 0]], *lo);
            assert_relative_eq!(table.values()[[i, 1]], *hi);
        }

        let persisted =
            WideTable::read_csv(&dir.path().join(RENORMALIZED_SUMMARY_FILE)).unwrap();
        assert_eq!(persisted.column_labels(), ["b1", "b2"]);
    }
}
