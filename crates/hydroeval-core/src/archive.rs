/// Evaluation results archive.
///
/// One gridded dataset per run: simulated and observed discharge (m³/s)
/// plus precipitation and potential ET (mm/day), all on a single
/// basin × time grid, written as `<model>_evaluation_results.nc`. All four
/// members must already be aligned — the archive is a container, not a
/// re-gridding step.
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{EvalError, EvalResult};
use crate::units::FlowSeries;
use crate::BasinId;

const MM_PER_DAY: &str = "mm/day";

#[derive(Debug, Clone)]
pub struct EvaluationArchive {
    basins: Vec<BasinId>,
    times: Vec<String>,
    qsim: Array2<f64>,
    qobs: Array2<f64>,
    prcp: Array2<f64>,
    pet: Array2<f64>,
    flow_units: &'static str,
}

impl EvaluationArchive {
    /// Assemble the archive from converted flow series and the forcing
    /// grids they were evaluated against.
    pub fn new(
        qsim: &FlowSeries,
        qobs: &FlowSeries,
        prcp: Array2<f64>,
        pet: Array2<f64>,
    ) -> EvalResult<Self> {
        if qsim.basins() != qobs.basins() || qsim.times() != qobs.times() {
            return Err(EvalError::GridMismatch {
                reason: "simulated and observed flow are on different grids".into(),
            });
        }
        if qsim.unit() != qobs.unit() {
            return Err(EvalError::UnitMismatch {
                expected: qsim.unit().label(),
                found: qobs.unit().label(),
            });
        }
        let shape = (qsim.times().len(), qsim.basins().len());
        for (name, grid) in [("prcp", &prcp), ("pet", &pet)] {
            if grid.dim() != shape {
                return Err(EvalError::GridMismatch {
                    reason: format!("{name} grid is {:?}, flow grid is {shape:?}", grid.dim()),
                });
            }
        }
        Ok(Self {
            basins: qsim.basins().to_vec(),
            times: qsim.times().to_vec(),
            qsim: qsim.values().clone(),
            qobs: qobs.values().clone(),
            prcp,
            pet,
            flow_units: qsim.unit().label(),
        })
    }

    pub fn basins(&self) -> &[BasinId] {
        &self.basins
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    /// Write the archive under the results root, replacing any previous
    /// file for the same model atomically.
    pub fn save(&self, result_dir: &Path, model_name: &str) -> EvalResult<PathBuf> {
        let path = result_dir.join(format!("{model_name}_evaluation_results.nc"));
        let staged = result_dir.join(format!(".{model_name}_evaluation_results.nc.tmp"));

        {
            let mut file = netcdf::create(&staged)?;
            file.add_dimension("time", self.times.len())?;
            file.add_dimension("basin", self.basins.len())?;
            file.add_attribute("basin_ids", self.join_basins().as_str())?;
            file.add_attribute("time_index", self.times.join(";").as_str())?;

            let variables: [(&str, &Array2<f64>, &str); 4] = [
                ("qsim", &self.qsim, self.flow_units),
                ("qobs", &self.qobs, self.flow_units),
                ("prcp", &self.prcp, MM_PER_DAY),
                ("pet", &self.pet, MM_PER_DAY),
            ];
            for (name, grid, units) in variables {
                let mut var = file.add_variable::<f64>(name, &["time", "basin"])?;
                var.add_attribute("units", units)?;
                let flat: Vec<f64> = grid.iter().copied().collect();
                var.put_values(&flat, None, None)?;
            }
        }

        std::fs::rename(&staged, &path)?;
        log::info!("wrote evaluation archive to {}", path.display());
        Ok(path)
    }

    fn join_basins(&self) -> String {
        self.basins
            .iter()
            .map(BasinId::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::FlowUnit;
    use ndarray::array;

    fn flow(unit: FlowUnit, values: Array2<f64>) -> FlowSeries {
        FlowSeries::new(
            "flow",
            vec![BasinId::new("b1"), BasinId::new("b2")],
            vec!["t0".into(), "t1".into()],
            unit,
            values,
        )
        .unwrap()
    }

    #[test]
    fn archive_requires_aligned_grids() {
        let qsim = flow(FlowUnit::CubicMetersPerSecond, array![[1.0, 2.0], [3.0, 4.0]]);
        let qobs = flow(FlowUnit::CubicMetersPerSecond, array![[1.1, 2.1], [3.1, 4.1]]);
        let prcp = array![[0.0, 0.0], [5.0, 5.0]];
        let pet = array![[1.0, 1.0], [1.0, 1.0]];
        let archive = EvaluationArchive::new(&qsim, &qobs, prcp, pet).unwrap();
        assert_eq!(archive.basins().len(), 2);
        assert_eq!(archive.times().len(), 2);
    }

    #[test]
    fn mismatched_forcing_shape_is_rejected() {
        let qsim = flow(FlowUnit::CubicMetersPerSecond, array![[1.0, 2.0], [3.0, 4.0]]);
        let qobs = flow(FlowUnit::CubicMetersPerSecond, array![[1.1, 2.1], [3.1, 4.1]]);
        let prcp = array![[0.0, 0.0]];
        let pet = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            EvaluationArchive::new(&qsim, &qobs, prcp, pet),
            Err(EvalError::GridMismatch { .. })
        ));
    }

    #[test]
    fn mismatched_flow_units_are_rejected() {
        let qsim = flow(FlowUnit::CubicMetersPerSecond, array![[1.0, 2.0], [3.0, 4.0]]);
        let qobs = flow(FlowUnit::MmPerDay, array![[1.1, 2.1], [3.1, 4.1]]);
        let prcp = array![[0.0, 0.0], [5.0, 5.0]];
        let pet = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            EvaluationArchive::new(&qsim, &qobs, prcp, pet),
            Err(EvalError::UnitMismatch { .. })
        ));
    }
}
