/// Model parameter contracts.
///
/// Each calibratable model declares an ordered parameter-name list and a
/// matching list of (low, high) physical bounds. The optimizer searches the
/// normalized [0, 1] cube; the i-th normalized value always corresponds to
/// the i-th declared name. Everything downstream (storage, denormalization,
/// summaries, replay) relies on this declared order, never on the order of
/// any intermediate map.
use crate::error::{EvalError, EvalResult};

/// Declared contract of one model: names and bounds share one index space.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub name: &'static str,
    pub param_names: &'static [&'static str],
    pub param_bounds: &'static [(f64, f64)],
}

impl ModelSpec {
    /// Number of calibrated parameters.
    pub fn n_params(&self) -> usize {
        self.param_names.len()
    }
}

// -- XAJ (Xinanjiang) --

/// Parameter names in declared order.
///
/// - `K`: PET-to-actual-ET correction coefficient [-]
/// - `B`: tension water capacity distribution exponent [-]
/// - `IM`: impervious area fraction [-]
/// - `UM`/`LM`/`DM`: upper/lower/deep tension water capacity [mm]
/// - `C`: deep-layer evapotranspiration coefficient [-]
/// - `SM`: free water storage capacity [mm]
/// - `EX`: free water distribution exponent [-]
/// - `KI`/`KG`: interflow/groundwater outflow coefficients [-]
/// - `CS`: channel routing recession constant [-]
/// - `L`: routing lag [timesteps]
/// - `CI`/`CG`: interflow/groundwater recession constants [-]
pub const XAJ_PARAM_NAMES: &[&str] = &[
    "K", "B", "IM", "UM", "LM", "DM", "C", "SM", "EX", "KI", "KG", "CS", "L", "CI", "CG",
];

/// Physical bounds as (low, high), in `XAJ_PARAM_NAMES` order.
pub const XAJ_PARAM_BOUNDS: &[(f64, f64)] = &[
    (0.1, 1.0),    // K
    (0.1, 0.4),    // B
    (0.01, 0.1),   // IM
    (0.0, 20.0),   // UM
    (60.0, 90.0),  // LM
    (60.0, 120.0), // DM
    (0.0, 0.2),    // C
    (1.0, 100.0),  // SM
    (1.0, 1.5),    // EX
    (0.0, 0.7),    // KI
    (0.0, 0.7),    // KG
    (0.0, 1.0),    // CS
    (1.0, 10.0),   // L
    (0.0, 0.9),    // CI
    (0.98, 0.998), // CG
];

pub const XAJ: ModelSpec = ModelSpec {
    name: "xaj",
    param_names: XAJ_PARAM_NAMES,
    param_bounds: XAJ_PARAM_BOUNDS,
};

// -- XAJ with mizuRoute-style gamma-kernel routing --

/// Variant that replaces the `CS`/`L` channel routing with a two-parameter
/// gamma unit hydrograph (`A` shape, `THETA` timescale).
pub const XAJ_MZ_PARAM_NAMES: &[&str] = &[
    "K", "B", "IM", "UM", "LM", "DM", "C", "SM", "EX", "KI", "KG", "A", "THETA", "CI", "CG",
];

pub const XAJ_MZ_PARAM_BOUNDS: &[(f64, f64)] = &[
    (0.1, 1.0),    // K
    (0.1, 0.4),    // B
    (0.01, 0.1),   // IM
    (0.0, 20.0),   // UM
    (60.0, 90.0),  // LM
    (60.0, 120.0), // DM
    (0.0, 0.2),    // C
    (1.0, 100.0),  // SM
    (1.0, 1.5),    // EX
    (0.0, 0.7),    // KI
    (0.0, 0.7),    // KG
    (0.0, 2.9),    // A
    (0.0, 6.5),    // THETA
    (0.0, 0.9),    // CI
    (0.98, 0.998), // CG
];

pub const XAJ_MZ: ModelSpec = ModelSpec {
    name: "xaj_mz",
    param_names: XAJ_MZ_PARAM_NAMES,
    param_bounds: XAJ_MZ_PARAM_BOUNDS,
};

/// All registered model contracts.
pub const MODELS: &[ModelSpec] = &[XAJ, XAJ_MZ];

/// Look up a model contract by name.
pub fn model_spec(name: &str) -> EvalResult<&'static ModelSpec> {
    MODELS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| EvalError::UnknownModel { name: name.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_bounds_stay_in_lockstep() {
        for spec in MODELS {
            assert_eq!(
                spec.param_names.len(),
                spec.param_bounds.len(),
                "{} names/bounds length mismatch",
                spec.name
            );
        }
    }

    #[test]
    fn bounds_are_ordered() {
        for spec in MODELS {
            for (name, (lo, hi)) in spec.param_names.iter().zip(spec.param_bounds) {
                assert!(lo <= hi, "{}.{name} has inverted bounds", spec.name);
            }
        }
    }

    #[test]
    fn lookup_by_name() {
        let spec = model_spec("xaj").unwrap();
        assert_eq!(spec.n_params(), 15);
        assert_eq!(spec.param_names[0], "K");
    }

    #[test]
    fn unknown_model_is_an_error() {
        assert!(matches!(
            model_spec("gr4j"),
            Err(EvalError::UnknownModel { .. })
        ));
    }
}
