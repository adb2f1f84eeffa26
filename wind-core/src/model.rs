use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceKey;

/// One measured or estimated wind/atmospheric data point.
///
/// Timestamps are always timezone-aware UTC instants. Naive timestamps are
/// converted at the normalization boundary and cannot appear here, so a
/// collection of observations never mixes aware and naive instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Physical capture height in meters.
    pub height_m: f64,
    /// Wind speed in m/s, non-negative.
    pub wind_speed: f64,
    /// Air temperature in °C, present only if requested and available.
    pub temperature: Option<f64>,
    /// Relative humidity in %, present only if requested and available.
    pub humidity: Option<f64>,
    pub source: SourceKey,
}

/// Parameters for one historical fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Capture heights in meters; each must belong to the source's supported set.
    pub heights: Vec<u32>,
    pub include_temperature: bool,
    pub include_humidity: bool,
}

/// What a fetch actually returned, independent of what was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedParameters {
    pub wind_speed: bool,
    pub temperature: bool,
    pub humidity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchMetadata {
    pub source: SourceKey,
    pub latitude: f64,
    pub longitude: f64,
    /// `included.x == true` guarantees at least one observation carries a
    /// non-null value for `x`.
    pub included: IncludedParameters,
    pub total_count: usize,
    pub heights_present: Vec<u32>,
    /// Malformed or missing rows dropped during normalization.
    pub skipped_records: usize,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// The unit returned by a source client call. Immutable once assembled; the
/// persistence/UI layer consumes it as plain data and owns durability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// Ordered by timestamp, then height.
    pub observations: Vec<Observation>,
    pub metadata: FetchMetadata,
}

impl FetchResult {
    /// Deterministic assembly regardless of the order sub-results arrived in:
    /// stable sort by (timestamp, height), metadata derived from the
    /// observations that actually survived normalization.
    ///
    /// `availability` is the validator's verdict on the raw payload; a flag is
    /// kept only if some observation still carries a value for it, which
    /// upholds the `included` guarantee even when every row of an available
    /// series was dropped as malformed.
    pub fn assemble(
        mut observations: Vec<Observation>,
        source: SourceKey,
        latitude: f64,
        longitude: f64,
        skipped_records: usize,
        availability: IncludedParameters,
    ) -> Self {
        observations.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.height_m.total_cmp(&b.height_m))
        });

        let mut heights_present: Vec<u32> = observations
            .iter()
            .map(|o| o.height_m.round() as u32)
            .collect();
        heights_present.sort_unstable();
        heights_present.dedup();

        let included = IncludedParameters {
            wind_speed: availability.wind_speed && !observations.is_empty(),
            temperature: availability.temperature
                && observations.iter().any(|o| o.temperature.is_some()),
            humidity: availability.humidity && observations.iter().any(|o| o.humidity.is_some()),
        };

        let metadata = FetchMetadata {
            source,
            latitude,
            longitude,
            included,
            total_count: observations.len(),
            heights_present,
            skipped_records,
            period_start: observations.first().map(|o| o.timestamp),
            period_end: observations.last().map(|o| o.timestamp),
        };

        FetchResult {
            observations,
            metadata,
        }
    }

    /// Observations grouped by capture height, keyed in whole meters.
    pub fn by_height(&self) -> BTreeMap<u32, Vec<&Observation>> {
        let mut grouped: BTreeMap<u32, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            grouped
                .entry(obs.height_m.round() as u32)
                .or_default()
                .push(obs);
        }
        grouped
    }
}
