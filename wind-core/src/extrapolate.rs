//! Estimates wind speed at heights that were never directly measured, on top
//! of a set of same-timestamp observations at known heights.
//!
//! Reference selection is deterministic: the closest height at or below the
//! target wins; only when nothing sits below does the closest height above
//! get used. This minimizes the extrapolation distance and is the single
//! tie-break rule.

use crate::{
    error::{Result, WindError},
    model::Observation,
    profile::{self, ProfileModel, TerrainClass},
};

/// Model parameters for a single estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParameters {
    pub alpha: f64,
    pub roughness_length: f64,
}

impl From<TerrainClass> for ProfileParameters {
    fn from(terrain: TerrainClass) -> Self {
        ProfileParameters {
            alpha: terrain.alpha(),
            roughness_length: terrain.roughness_length(),
        }
    }
}

/// Both model estimates for the same target, without picking a winner.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEstimates {
    pub power_law: Observation,
    pub logarithmic: Observation,
}

/// Estimates wind speed at `target_height` from same-timestamp observations.
///
/// The returned observation carries only the estimated wind speed; temperature
/// and humidity are measurements tied to the reference height and are not
/// propagated to a height where they were never taken.
pub fn estimate(
    observations: &[Observation],
    target_height: f64,
    model: ProfileModel,
    params: ProfileParameters,
) -> Result<Observation> {
    let reference = select_reference(observations, target_height)?;

    let wind_speed = match model {
        ProfileModel::PowerLaw => profile::power_law(
            reference.wind_speed,
            reference.height_m,
            target_height,
            params.alpha,
        ),
        ProfileModel::Logarithmic => profile::logarithmic_law(
            reference.wind_speed,
            reference.height_m,
            target_height,
            params.roughness_length,
        ),
    }
    .map_err(|cause| WindError::Extrapolation {
        timestamp: reference.timestamp,
        from_height: reference.height_m,
        to_height: target_height,
        cause: Box::new(cause),
    })?;

    Ok(Observation {
        timestamp: reference.timestamp,
        height_m: target_height,
        wind_speed,
        temperature: None,
        humidity: None,
        source: reference.source,
    })
}

/// Runs both profile laws against the same reference observation.
pub fn compare(
    observations: &[Observation],
    target_height: f64,
    alpha: f64,
    roughness_length: f64,
) -> Result<ModelEstimates> {
    let params = ProfileParameters { alpha, roughness_length };
    Ok(ModelEstimates {
        power_law: estimate(observations, target_height, ProfileModel::PowerLaw, params)?,
        logarithmic: estimate(observations, target_height, ProfileModel::Logarithmic, params)?,
    })
}

/// [`compare`] parameterized by a terrain class instead of raw coefficients.
pub fn compare_for_terrain(
    observations: &[Observation],
    target_height: f64,
    terrain: TerrainClass,
) -> Result<ModelEstimates> {
    compare(observations, target_height, terrain.alpha(), terrain.roughness_length())
}

fn select_reference(observations: &[Observation], target_height: f64) -> Result<&Observation> {
    let first = observations
        .first()
        .ok_or_else(|| WindError::invalid("at least one known-height observation is required"))?;

    if observations.iter().any(|o| o.timestamp != first.timestamp) {
        return Err(WindError::invalid(
            "observations must share a single timestamp to anchor an estimate",
        ));
    }

    let below = observations
        .iter()
        .filter(|o| o.height_m <= target_height)
        .max_by(|a, b| a.height_m.total_cmp(&b.height_m));
    let above = observations
        .iter()
        .filter(|o| o.height_m > target_height)
        .min_by(|a, b| a.height_m.total_cmp(&b.height_m));

    below
        .or(above)
        .ok_or_else(|| WindError::invalid("no reference observation available"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKey;
    use chrono::{TimeZone, Utc};

    fn obs(hour: u32, height: f64, speed: f64) -> Observation {
        Observation {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            height_m: height,
            wind_speed: speed,
            temperature: Some(22.0),
            humidity: Some(60.0),
            source: SourceKey::NasaPower,
        }
    }

    #[test]
    fn closest_height_below_target_is_preferred() {
        // alpha=1 makes the estimate linear in h2/h1, so the chosen reference
        // is visible in the result: 10.0 * 100/50 = 20 from the 50m anchor.
        let observations = [obs(0, 10.0, 3.0), obs(0, 50.0, 10.0)];
        let params = ProfileParameters { alpha: 1.0, roughness_length: 0.1 };

        let est = estimate(&observations, 100.0, ProfileModel::PowerLaw, params).unwrap();
        assert_eq!(est.wind_speed, 20.0);
        assert_eq!(est.height_m, 100.0);
    }

    #[test]
    fn height_above_is_used_only_when_nothing_sits_below() {
        let observations = [obs(0, 10.0, 4.0), obs(0, 50.0, 10.0)];
        let params = ProfileParameters { alpha: 1.0, roughness_length: 0.1 };

        // Target below every measurement: the 10m anchor wins, 4.0 * 5/10 = 2.
        let est = estimate(&observations, 5.0, ProfileModel::PowerLaw, params).unwrap();
        assert_eq!(est.wind_speed, 2.0);
    }

    #[test]
    fn exact_height_match_returns_the_measured_speed() {
        let observations = [obs(0, 10.0, 4.0), obs(0, 50.0, 10.0)];
        let params = ProfileParameters { alpha: 0.2, roughness_length: 0.1 };

        let est = estimate(&observations, 50.0, ProfileModel::PowerLaw, params).unwrap();
        assert_eq!(est.wind_speed, 10.0);
    }

    #[test]
    fn estimated_observations_do_not_carry_reference_measurements() {
        let observations = [obs(0, 10.0, 4.0)];
        let params = ProfileParameters { alpha: 0.2, roughness_length: 0.1 };

        let est = estimate(&observations, 80.0, ProfileModel::PowerLaw, params).unwrap();
        assert_eq!(est.temperature, None);
        assert_eq!(est.humidity, None);
        assert_eq!(est.source, SourceKey::NasaPower);
    }

    #[test]
    fn mixed_timestamps_are_rejected() {
        let observations = [obs(0, 10.0, 4.0), obs(1, 50.0, 10.0)];
        let params = ProfileParameters { alpha: 0.2, roughness_length: 0.1 };

        let err = estimate(&observations, 80.0, ProfileModel::PowerLaw, params).unwrap_err();
        assert!(matches!(err, WindError::InvalidParameter { .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = estimate(
            &[],
            80.0,
            ProfileModel::PowerLaw,
            ProfileParameters { alpha: 0.2, roughness_length: 0.1 },
        )
        .unwrap_err();
        assert!(matches!(err, WindError::InvalidParameter { .. }));
    }

    #[test]
    fn math_failures_are_wrapped_with_timestamp_and_heights() {
        // Roughness above both heights makes the log profile undefined.
        let observations = [obs(0, 10.0, 4.0)];
        let params = ProfileParameters { alpha: 0.2, roughness_length: 30.0 };

        let err = estimate(&observations, 80.0, ProfileModel::Logarithmic, params).unwrap_err();
        match err {
            WindError::Extrapolation { from_height, to_height, timestamp, .. } => {
                assert_eq!(from_height, 10.0);
                assert_eq!(to_height, 80.0);
                assert_eq!(timestamp, observations[0].timestamp);
            }
            other => panic!("expected Extrapolation, got {other:?}"),
        }
    }

    #[test]
    fn compare_surfaces_both_models_without_picking_a_winner() {
        let observations = [obs(0, 10.0, 10.0)];

        let estimates = compare(&observations, 80.0, 0.20, 0.1).unwrap();
        assert!((estimates.power_law.wind_speed - 15.157).abs() < 0.01);
        assert!((estimates.logarithmic.wind_speed - 14.515).abs() < 0.01);
        assert_ne!(estimates.power_law.wind_speed, estimates.logarithmic.wind_speed);
    }

    #[test]
    fn terrain_parameterization_matches_the_preset_table() {
        let observations = [obs(0, 10.0, 10.0)];

        let by_terrain =
            compare_for_terrain(&observations, 80.0, TerrainClass::Shrubs).unwrap();
        let by_values = compare(&observations, 80.0, 0.20, 0.1).unwrap();
        assert_eq!(by_terrain.power_law.wind_speed, by_values.power_law.wind_speed);
    }
}
