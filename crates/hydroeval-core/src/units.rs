/// Streamflow unit conversion.
///
/// The model works in depth units (mm of water over the basin per day);
/// reporting works in volumetric flow (m³/s). The two are related through
/// the basin drainage area:
///
///   q [m³/s] = depth [mm/day] · area [km²] · 10⁶ [m²/km²] · 10⁻³ [m/mm] / 86400 [s/day]
///
/// which collapses to `area_km2 / 86.4`. The forward and inverse mappings
/// use the same factor, so a round trip is exact up to floating rounding.
use std::collections::BTreeMap;

use ndarray::{Array2, Array3, ArrayView1, Axis};

use crate::error::{EvalError, EvalResult};
use crate::BasinId;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SQUARE_METERS_PER_KM2: f64 = 1.0e6;
const METERS_PER_MM: f64 = 1.0e-3;

/// Discharge units used across the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowUnit {
    /// Model-internal depth rate.
    MmPerDay,
    /// Physical volumetric flow.
    CubicMetersPerSecond,
}

impl FlowUnit {
    pub fn label(self) -> &'static str {
        match self {
            FlowUnit::MmPerDay => "mm/day",
            FlowUnit::CubicMetersPerSecond => "m^3/s",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "mm/day" | "mm/d" => Some(FlowUnit::MmPerDay),
            "m^3/s" | "m3/s" => Some(FlowUnit::CubicMetersPerSecond),
            _ => None,
        }
    }
}

/// Basin → drainage area in km².
#[derive(Debug, Clone, Default)]
pub struct BasinAreas(BTreeMap<BasinId, f64>);

impl BasinAreas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, basin: BasinId, area_km2: f64) {
        self.0.insert(basin, area_km2);
    }

    pub fn get(&self, basin: &BasinId) -> Option<f64> {
        self.0.get(basin).copied()
    }
}

impl FromIterator<(BasinId, f64)> for BasinAreas {
    fn from_iter<I: IntoIterator<Item = (BasinId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A basin × time discharge grid tagged with its unit.
///
/// `values` is time-major: `values[[t, j]]` is basin `basins[j]` at time
/// `times[t]`. The attribute map carries free-form metadata that conversion
/// must pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSeries {
    name: String,
    basins: Vec<BasinId>,
    times: Vec<String>,
    unit: FlowUnit,
    attrs: BTreeMap<String, String>,
    values: Array2<f64>,
}

impl FlowSeries {
    /// Assemble a series; the value grid must match the label lengths.
    pub fn new(
        name: impl Into<String>,
        basins: Vec<BasinId>,
        times: Vec<String>,
        unit: FlowUnit,
        values: Array2<f64>,
    ) -> EvalResult<Self> {
        if values.nrows() != times.len() || values.ncols() != basins.len() {
            return Err(EvalError::GridMismatch {
                reason: format!(
                    "value grid is {}x{} but there are {} times and {} basins",
                    values.nrows(),
                    values.ncols(),
                    times.len(),
                    basins.len()
                ),
            });
        }
        Ok(Self {
            name: name.into(),
            basins,
            times,
            unit,
            attrs: BTreeMap::new(),
            values,
        })
    }

    /// Wrap raw simulator output. Simulated discharge arrives as a
    /// [time × basin × channel] array whose channel axis must have extent 1;
    /// it is collapsed to scalar-per-time here.
    pub fn from_simulation(
        name: impl Into<String>,
        basins: Vec<BasinId>,
        times: Vec<String>,
        unit: FlowUnit,
        raw: Array3<f64>,
    ) -> EvalResult<Self> {
        if raw.len_of(Axis(2)) != 1 {
            return Err(EvalError::GridMismatch {
                reason: format!(
                    "simulated discharge has channel extent {}, expected 1",
                    raw.len_of(Axis(2))
                ),
            });
        }
        let collapsed = raw.index_axis(Axis(2), 0).to_owned();
        Self::new(name, basins, times, unit, collapsed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basins(&self) -> &[BasinId] {
        &self.basins
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    pub fn unit(&self) -> FlowUnit {
        self.unit
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// View of one basin's series.
    pub fn basin_series(&self, basin: &BasinId) -> Option<ArrayView1<'_, f64>> {
        let j = self.basins.iter().position(|b| b == basin)?;
        Some(self.values.index_axis(Axis(1), j))
    }
}

fn depth_to_volume_factor(area_km2: f64) -> f64 {
    area_km2 * SQUARE_METERS_PER_KM2 * METERS_PER_MM / SECONDS_PER_DAY
}

/// Convert a discharge grid between the model unit and the physical target.
///
/// `inverse == false` maps model units (mm/day) to `target`; `inverse ==
/// true` applies the exact reverse mapping. Every basin in the series must
/// have a drainage area. Attributes, basin order, and the time index pass
/// through unchanged; only the values and the unit tag differ.
pub fn convert(
    series: &FlowSeries,
    areas: &BasinAreas,
    target: FlowUnit,
    inverse: bool,
) -> EvalResult<FlowSeries> {
    let (expected_source, result_unit) = if inverse {
        (target, FlowUnit::MmPerDay)
    } else {
        (FlowUnit::MmPerDay, target)
    };
    if series.unit != expected_source {
        return Err(EvalError::UnitMismatch {
            expected: expected_source.label(),
            found: series.unit.label(),
        });
    }
    if series.unit == result_unit {
        return Ok(series.clone());
    }

    let factors: Vec<f64> = series
        .basins
        .iter()
        .map(|basin| {
            areas
                .get(basin)
                .map(depth_to_volume_factor)
                .ok_or_else(|| EvalError::MissingBasinArea {
                    basin: basin.to_string(),
                })
        })
        .collect::<EvalResult<_>>()?;

    let mut values = series.values.clone();
    for (j, factor) in factors.iter().enumerate() {
        let mut column = values.index_axis_mut(Axis(1), j);
        if inverse {
            column.mapv_inplace(|v| v / factor);
        } else {
            column.mapv_inplace(|v| v * factor);
        }
    }

    let mut converted = series.clone();
    converted.values = values;
    converted.unit = result_unit;
    Ok(converted)
}

/// Prepare the simulated/observed discharge pair for reporting.
///
/// Wraps raw simulated output onto the observed grid (inheriting the
/// observed unit tag and attributes), then converts both series to m³/s.
pub fn convert_streamflow_units(
    observed: &FlowSeries,
    qsim: Array3<f64>,
    areas: &BasinAreas,
) -> EvalResult<(FlowSeries, FlowSeries)> {
    let mut simulated = FlowSeries::from_simulation(
        observed.name.clone(),
        observed.basins.clone(),
        observed.times.clone(),
        observed.unit,
        qsim,
    )?;
    simulated.attrs = observed.attrs.clone();

    let target = FlowUnit::CubicMetersPerSecond;
    let sim_flow = convert(&simulated, areas, target, false)?;
    let obs_flow = convert(observed, areas, target, false)?;
    Ok((sim_flow, obs_flow))
}
