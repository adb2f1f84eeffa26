//! Vertical wind-profile models.
//!
//! Pure numeric functions, no I/O and no state:
//! - Power law: `v2 = v1 * (h2/h1)^alpha`
//! - Logarithmic law: `v2 = v1 * ln(h2/z0) / ln(h1/z0)`
//!
//! Both laws return exactly `v1` when the reference and target heights are
//! equal, so round-tripping through either model is lossless.

use crate::error::{Result, WindError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileModel {
    PowerLaw,
    Logarithmic,
}

/// Terrain classes with their usual power-law exponent and roughness length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainClass {
    /// Open sea, large lakes.
    SmoothLake,
    /// Lawns, open fields.
    ShortGrass,
    /// Vegetation up to ~0.3m.
    LowVegetation,
    /// Occasional scattered trees.
    Shrubs,
    /// Many trees, few buildings.
    TreesBuildings,
    /// Suburbs, residential areas.
    Residential,
    /// Tall buildings, city centers.
    Urban,
}

impl TerrainClass {
    pub const fn all() -> &'static [TerrainClass] {
        &[
            TerrainClass::SmoothLake,
            TerrainClass::ShortGrass,
            TerrainClass::LowVegetation,
            TerrainClass::Shrubs,
            TerrainClass::TreesBuildings,
            TerrainClass::Residential,
            TerrainClass::Urban,
        ]
    }

    /// Power-law exponent for this terrain.
    pub fn alpha(self) -> f64 {
        match self {
            TerrainClass::SmoothLake => 0.10,
            TerrainClass::ShortGrass => 0.14,
            TerrainClass::LowVegetation => 0.16,
            TerrainClass::Shrubs => 0.20,
            TerrainClass::TreesBuildings => 0.22,
            TerrainClass::Residential => 0.28,
            TerrainClass::Urban => 0.35,
        }
    }

    /// Roughness length z0 in meters for this terrain.
    pub fn roughness_length(self) -> f64 {
        match self {
            TerrainClass::SmoothLake => 0.0002,
            TerrainClass::ShortGrass => 0.008,
            TerrainClass::LowVegetation => 0.03,
            TerrainClass::Shrubs => 0.1,
            TerrainClass::TreesBuildings => 0.25,
            TerrainClass::Residential => 1.5,
            TerrainClass::Urban => 3.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TerrainClass::SmoothLake => "Smooth surface (lake/ocean)",
            TerrainClass::ShortGrass => "Short grass",
            TerrainClass::LowVegetation => "Low vegetation",
            TerrainClass::Shrubs => "Shrubs and occasional trees",
            TerrainClass::TreesBuildings => "Trees and buildings",
            TerrainClass::Residential => "Residential area",
            TerrainClass::Urban => "Dense urban area",
        }
    }
}

/// Wind speed at `h2` by the power law: `v2 = v1 * (h2/h1)^alpha`.
///
/// `alpha` is typically in [0, 1]; values outside that range are accepted
/// here and only flagged by [`validate_parameters`].
pub fn power_law(v1: f64, h1: f64, h2: f64, alpha: f64) -> Result<f64> {
    if h1 <= 0.0 || h2 <= 0.0 {
        return Err(WindError::invalid(format!(
            "heights must be positive (h1={h1}, h2={h2})"
        )));
    }
    if v1 < 0.0 {
        return Err(WindError::invalid(format!(
            "wind speed must be non-negative (v1={v1})"
        )));
    }
    if h1 == h2 {
        return Ok(v1);
    }
    Ok(v1 * (h2 / h1).powf(alpha))
}

/// Wind speed at `h2` by the logarithmic law: `v2 = v1 * ln(h2/z0) / ln(h1/z0)`.
///
/// The log profile is undefined at or below the roughness length, so both
/// heights must strictly exceed `z0`.
pub fn logarithmic_law(v1: f64, h1: f64, h2: f64, z0: f64) -> Result<f64> {
    if z0 <= 0.0 {
        return Err(WindError::invalid(format!(
            "roughness length must be positive (z0={z0})"
        )));
    }
    if h1 <= z0 || h2 <= z0 {
        return Err(WindError::invalid(format!(
            "heights must exceed the roughness length (h1={h1}, h2={h2}, z0={z0})"
        )));
    }
    if v1 < 0.0 {
        return Err(WindError::invalid(format!(
            "wind speed must be non-negative (v1={v1})"
        )));
    }
    if h1 == h2 {
        return Ok(v1);
    }
    Ok(v1 * (h2 / z0).ln() / (h1 / z0).ln())
}

/// Outcome of a pre-validation pass: `ok == true` may still carry an advisory
/// message (e.g. an exponent outside its recommended range).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterCheck {
    pub ok: bool,
    pub message: Option<String>,
}

impl ParameterCheck {
    fn pass() -> Self {
        ParameterCheck { ok: true, message: None }
    }

    fn fail(message: impl Into<String>) -> Self {
        ParameterCheck { ok: false, message: Some(message.into()) }
    }

    fn advisory(message: impl Into<String>) -> Self {
        ParameterCheck { ok: true, message: Some(message.into()) }
    }
}

/// Centralized precondition check so callers can validate without invoking the
/// math and catching errors. `value` is the exponent for the power law and the
/// roughness length for the logarithmic law.
pub fn validate_parameters(h1: f64, h2: f64, value: f64, model: ProfileModel) -> ParameterCheck {
    match model {
        ProfileModel::PowerLaw => {
            if h1 <= 0.0 || h2 <= 0.0 {
                return ParameterCheck::fail(format!(
                    "heights must be positive (h1={h1}, h2={h2})"
                ));
            }
            if !(0.0..=1.0).contains(&value) {
                return ParameterCheck::advisory(format!(
                    "exponent {value} is outside the recommended range [0, 1]"
                ));
            }
            ParameterCheck::pass()
        }
        ProfileModel::Logarithmic => {
            if value <= 0.0 {
                return ParameterCheck::fail(format!(
                    "roughness length must be positive (z0={value})"
                ));
            }
            if h1 <= value || h2 <= value {
                return ParameterCheck::fail(format!(
                    "heights must exceed the roughness length (h1={h1}, h2={h2}, z0={value})"
                ));
            }
            ParameterCheck::pass()
        }
    }
}

/// Both models evaluated with shared inputs. The models are not required to
/// agree; which one to trust is caller policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelComparison {
    pub power_law: f64,
    pub logarithmic: f64,
}

impl ModelComparison {
    pub fn divergence(&self) -> f64 {
        (self.power_law - self.logarithmic).abs()
    }
}

pub fn compare_models(v1: f64, h1: f64, h2: f64, alpha: f64, z0: f64) -> Result<ModelComparison> {
    Ok(ModelComparison {
        power_law: power_law(v1, h1, h2, alpha)?,
        logarithmic: logarithmic_law(v1, h1, h2, z0)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_at_equal_heights() {
        assert_eq!(power_law(7.3, 42.0, 42.0, 0.22).unwrap(), 7.3);
        assert_eq!(logarithmic_law(7.3, 42.0, 42.0, 0.15).unwrap(), 7.3);
    }

    #[test]
    fn power_law_monotonic_in_target_height() {
        let mut previous = power_law(5.0, 10.0, 11.0, 0.2).unwrap();
        for h2 in [20.0, 40.0, 80.0, 160.0] {
            let v = power_law(5.0, 10.0, h2, 0.2).unwrap();
            assert!(v > previous, "expected increase at h2={h2}");
            previous = v;
        }
    }

    #[test]
    fn power_law_rejects_bad_preconditions() {
        assert!(power_law(5.0, 0.0, 50.0, 0.2).is_err());
        assert!(power_law(5.0, 10.0, -1.0, 0.2).is_err());
        assert!(power_law(-5.0, 10.0, 50.0, 0.2).is_err());
    }

    #[test]
    fn logarithmic_law_rejects_heights_at_or_below_roughness() {
        assert!(logarithmic_law(5.0, 0.1, 50.0, 0.1).is_err());
        assert!(logarithmic_law(5.0, 10.0, 0.05, 0.1).is_err());
        assert!(logarithmic_law(5.0, 10.0, 50.0, 0.0).is_err());
        assert!(logarithmic_law(5.0, 10.0, 50.0, -0.1).is_err());
    }

    #[test]
    fn validate_flags_exponent_outside_recommended_range() {
        let check = validate_parameters(10.0, 80.0, 1.4, ProfileModel::PowerLaw);
        assert!(check.ok);
        assert!(check.message.is_some());

        // But the math itself still accepts it.
        assert!(power_law(5.0, 10.0, 80.0, 1.4).is_ok());
    }

    #[test]
    fn validate_rejects_log_heights_below_roughness() {
        let check = validate_parameters(0.05, 80.0, 0.1, ProfileModel::Logarithmic);
        assert!(!check.ok);
    }

    #[test]
    fn comparison_scenario_10m_to_80m() {
        // v1=10 m/s at 10m: power law with alpha=0.20 gives 10 * 8^0.2,
        // logarithmic with z0=0.1 gives 10 * ln(800)/ln(100).
        let cmp = compare_models(10.0, 10.0, 80.0, 0.20, 0.1).unwrap();
        assert!((cmp.power_law - 15.157).abs() < 0.01);
        assert!((cmp.logarithmic - 14.515).abs() < 0.01);
        assert!(cmp.divergence() > 0.0);
    }

    #[test]
    fn terrain_presets_are_ordered_by_surface_complexity() {
        let classes = TerrainClass::all();
        for pair in classes.windows(2) {
            assert!(pair[0].alpha() < pair[1].alpha());
            assert!(pair[0].roughness_length() < pair[1].roughness_length());
        }
    }
}
