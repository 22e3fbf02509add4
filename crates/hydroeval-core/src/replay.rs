/// Calibrated-model replay.
///
/// Re-runs the simulator with stored calibrated parameters against archived
/// train/test forcing to regenerate evapotranspiration series for reporting.
/// The simulator consumes the first `warmup_length` steps of each forcing
/// period to stabilize state, so each output table has exactly
/// `period length - warmup_length` rows; any other row count means the
/// forcing data and the stored parameters have drifted apart, which is
/// fatal rather than something to pad over.
use std::path::Path;

use ndarray::{Array2, Axis};

use crate::error::{EvalError, EvalResult};
use crate::table::WideTable;
use crate::traits::RainfallRunoffModel;
use crate::BasinId;

/// ET replay output file names, one per split.
pub const ET_TRAIN_FILE: &str = "basin_etsim_train.csv";
pub const ET_TEST_FILE: &str = "basin_etsim_test.csv";

/// Precipitation and PET grids for one split, shared across basins.
///
/// Both grids are time-major: `precip[[t, j]]` is basin `basins[j]` at time
/// `times[t]`.
#[derive(Debug, Clone)]
pub struct ForcingGrid {
    times: Vec<String>,
    basins: Vec<BasinId>,
    precip: Array2<f64>,
    pet: Array2<f64>,
}

impl ForcingGrid {
    /// Assemble and validate a forcing grid.
    ///
    /// Both grids must match the time/basin label lengths, and neither may
    /// contain NaN — a NaN forcing value would poison every later timestep
    /// of the simulation silently.
    pub fn new(
        times: Vec<String>,
        basins: Vec<BasinId>,
        precip: Array2<f64>,
        pet: Array2<f64>,
    ) -> EvalResult<Self> {
        let shape = (times.len(), basins.len());
        for (name, grid) in [("precip", &precip), ("pet", &pet)] {
            if grid.dim() != shape {
                return Err(EvalError::GridMismatch {
                    reason: format!(
                        "{name} grid is {:?} but there are {} times and {} basins",
                        grid.dim(),
                        times.len(),
                        basins.len()
                    ),
                });
            }
            if grid.iter().any(|v| v.is_nan()) {
                return Err(EvalError::GridMismatch {
                    reason: format!("{name} grid contains NaN values"),
                });
            }
        }
        Ok(Self {
            times,
            basins,
            precip,
            pet,
        })
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    pub fn basins(&self) -> &[BasinId] {
        &self.basins
    }

    pub fn n_steps(&self) -> usize {
        self.times.len()
    }

    /// One basin's (precip, pet) series.
    fn basin_forcing(&self, basin: &BasinId) -> Option<(Vec<f64>, Vec<f64>)> {
        let j = self.basins.iter().position(|b| b == basin)?;
        Some((
            self.precip.index_axis(Axis(1), j).to_vec(),
            self.pet.index_axis(Axis(1), j).to_vec(),
        ))
    }
}

fn replay_split<M: RainfallRunoffModel>(
    model: &M,
    basins: &[BasinId],
    params: &WideTable,
    forcing: &ForcingGrid,
    warmup_length: usize,
    split: &str,
) -> EvalResult<WideTable> {
    let n_steps = forcing.n_steps();
    if warmup_length >= n_steps {
        return Err(EvalError::WarmupExceedsForcing {
            split: split.into(),
            warmup: warmup_length,
            forcing_len: n_steps,
        });
    }
    let n_report = n_steps - warmup_length;

    let mut values = Array2::zeros((n_report, basins.len()));
    for (j, basin) in basins.iter().enumerate() {
        let column = params
            .column(basin.as_str())
            .ok_or_else(|| EvalError::MissingParameterColumn {
                basin: basin.to_string(),
            })?
            .to_vec();
        let (precip, pet) =
            forcing
                .basin_forcing(basin)
                .ok_or_else(|| EvalError::GridMismatch {
                    reason: format!("{split} forcing has no basin '{basin}'"),
                })?;

        let fluxes = model.run(&column, &precip, &pet, warmup_length)?;
        if fluxes.actual_et.len() != n_report {
            return Err(EvalError::WarmupAlignment {
                split: split.into(),
                basin: basin.to_string(),
                expected: n_report,
                got: fluxes.actual_et.len(),
            });
        }
        for (t, v) in fluxes.actual_et.iter().enumerate() {
            values[[t, j]] = *v;
        }
    }

    Ok(WideTable::new(
        "time",
        forcing.times[warmup_length..].to_vec(),
        basins.iter().map(BasinId::to_string).collect(),
        values,
    ))
}

/// Replay the calibrated model for every basin over both splits and keep
/// the evapotranspiration series.
///
/// `params` is the physical parameter table (parameter rows, basin
/// columns). Returns one time × basin table per split, basin columns in
/// the given order; row labels are the post-warm-up time labels.
pub fn replay<M: RainfallRunoffModel>(
    model: &M,
    basins: &[BasinId],
    params: &WideTable,
    forcing_train: &ForcingGrid,
    forcing_test: &ForcingGrid,
    warmup_length: usize,
) -> EvalResult<(WideTable, WideTable)> {
    log::info!(
        "replaying {} for {} basins (warm-up {warmup_length})",
        model.name(),
        basins.len()
    );
    let train = replay_split(model, basins, params, forcing_train, warmup_length, "train")?;
    let test = replay_split(model, basins, params, forcing_test, warmup_length, "test")?;
    Ok((train, test))
}

/// Persist both replay tables under the results root.
pub fn save_et_outputs(
    result_dir: &Path,
    train: &WideTable,
    test: &WideTable,
) -> EvalResult<()> {
    train.write_csv(&result_dir.join(ET_TRAIN_FILE))?;
    test.write_csv(&result_dir.join(ET_TEST_FILE))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SimulatedFluxes;
    use ndarray::Array2;

    /// Fixed-coefficient stand-in for the real simulator: streamflow is a
    /// fraction of precipitation, ET is the remainder capped by PET.
    struct CoefficientModel;

    impl RainfallRunoffModel for CoefficientModel {
        fn name(&self) -> &str {
            "coefficient"
        }

        fn run(
            &self,
            params: &[f64],
            precip: &[f64],
            pet: &[f64],
            warmup_length: usize,
        ) -> EvalResult<SimulatedFluxes> {
            let c = params[0];
            let window = warmup_length..precip.len();
            let streamflow = precip[window.clone()].iter().map(|p| c * p).collect();
            let actual_et = precip[window.clone()]
                .iter()
                .zip(&pet[window])
                .map(|(p, e)| ((1.0 - c) * p).min(*e))
                .collect();
            Ok(SimulatedFluxes {
                streamflow,
                actual_et,
            })
        }
    }

    /// A model that ignores the warm-up convention and reports every step.
    struct MisalignedModel;

    impl RainfallRunoffModel for MisalignedModel {
        fn name(&self) -> &str {
            "misaligned"
        }

        fn run(
            &self,
            _params: &[f64],
            precip: &[f64],
            _pet: &[f64],
            _warmup_length: usize,
        ) -> EvalResult<SimulatedFluxes> {
            Ok(SimulatedFluxes {
                streamflow: precip.to_vec(),
                actual_et: precip.to_vec(),
            })
        }
    }

    fn grid(n_steps: usize, basins: &[BasinId]) -> ForcingGrid {
        let times = (0..n_steps).map(|t| format!("t{t:03}")).collect();
        let precip = Array2::from_elem((n_steps, basins.len()), 10.0);
        let pet = Array2::from_elem((n_steps, basins.len()), 3.0);
        ForcingGrid::new(times, basins.to_vec(), precip, pet).unwrap()
    }

    fn param_table(basins: &[BasinId], c: f64) -> WideTable {
        WideTable::new(
            "param",
            vec!["C".into()],
            basins.iter().map(BasinId::to_string).collect(),
            Array2::from_elem((1, basins.len()), c),
        )
    }

    #[test]
    fn output_rows_equal_forcing_minus_warmup() {
        let basins = vec![BasinId::new("b1"), BasinId::new("b2")];
        let params = param_table(&basins, 0.4);
        let train = grid(100, &basins);
        let test = grid(50, &basins);

        let (et_train, et_test) =
            replay(&CoefficientModel, &basins, &params, &train, &test, 10).unwrap();
        assert_eq!(et_train.n_rows(), 90);
        assert_eq!(et_test.n_rows(), 40);
        assert_eq!(et_train.column_labels(), ["b1", "b2"]);
        assert_eq!(et_train.row_labels()[0], "t010");
    }

    #[test]
    fn warmup_longer_than_forcing_fails() {
        let basins = vec![BasinId::new("b1")];
        let params = param_table(&basins, 0.4);
        let short = grid(5, &basins);
        let long = grid(100, &basins);

        let err = replay(&CoefficientModel, &basins, &params, &short, &long, 10).unwrap_err();
        match err {
            EvalError::WarmupExceedsForcing { split, warmup, forcing_len } => {
                assert_eq!(split, "train");
                assert_eq!(warmup, 10);
                assert_eq!(forcing_len, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn misaligned_model_output_is_fatal() {
        let basins = vec![BasinId::new("b1")];
        let params = param_table(&basins, 0.4);
        let forcing = grid(20, &basins);

        let err =
            replay(&MisalignedModel, &basins, &params, &forcing, &forcing, 5).unwrap_err();
        match err {
            EvalError::WarmupAlignment { basin, expected, got, .. } => {
                assert_eq!(basin, "b1");
                assert_eq!(expected, 15);
                assert_eq!(got, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn basin_without_parameter_column_is_fatal() {
        let basins = vec![BasinId::new("b1"), BasinId::new("b2")];
        let params = param_table(&basins[..1], 0.4);
        let forcing = grid(20, &basins);

        let err =
            replay(&CoefficientModel, &basins, &params, &forcing, &forcing, 5).unwrap_err();
        assert!(matches!(err, EvalError::MissingParameterColumn { .. }));
    }

    #[test]
    fn et_values_follow_the_model() {
        let basins = vec![BasinId::new("b1")];
        let params = param_table(&basins, 0.4);
        let forcing = grid(10, &basins);

        let (et_train, _) =
            replay(&CoefficientModel, &basins, &params, &forcing, &forcing, 2).unwrap();
        // (1 - 0.4) * 10 = 6, capped by pet = 3.
        assert_eq!(et_train.values()[[0, 0]], 3.0);
    }

    #[test]
    fn forcing_grid_rejects_nan() {
        let basins = vec![BasinId::new("b1")];
        let mut precip = Array2::from_elem((3, 1), 1.0);
        precip[[1, 0]] = f64::NAN;
        let pet = Array2::from_elem((3, 1), 1.0);
        let err = ForcingGrid::new(
            vec!["t0".into(), "t1".into(), "t2".into()],
            basins,
            precip,
            pet,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::GridMismatch { .. }));
    }

    #[test]
    fn forcing_grid_rejects_shape_disagreement() {
        let basins = vec![BasinId::new("b1")];
        let precip = Array2::from_elem((3, 1), 1.0);
        let pet = Array2::from_elem((2, 1), 1.0);
        let err = ForcingGrid::new(
            vec!["t0".into(), "t1".into(), "t2".into()],
            basins,
            precip,
            pet,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::GridMismatch { .. }));
    }

    #[test]
    fn saved_tables_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let basins = vec![BasinId::new("b1")];
        let params = param_table(&basins, 0.5);
        let forcing = grid(8, &basins);
        let (train, test) =
            replay(&CoefficientModel, &basins, &params, &forcing, &forcing, 3).unwrap();
        save_et_outputs(dir.path(), &train, &test).unwrap();
        let back = WideTable::read_csv(&dir.path().join(ET_TRAIN_FILE)).unwrap();
        assert_eq!(&back, &train);
    }
}
