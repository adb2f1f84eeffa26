//! Converts provider-native records into canonical [`Observation`]s.
//!
//! Every timestamp leaving this module is a timezone-aware UTC instant. When a
//! source string carries no offset it is declared UTC at parse time, never left
//! naive, so a normalized collection cannot mix aware and naive instants.
//!
//! Malformed or missing rows are skipped and counted; a fetch never fails
//! because of isolated bad rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::{model::Observation, source::SourceKey};

/// Kilometers-per-hour in one meter-per-second.
pub const KMH_PER_MS: f64 = 3.6;

/// Parses an hour-indexed compact timestamp (`YYYYMMDDHH`), the convention
/// used by hour-keyed archives with an implicit UTC time standard. A date-only
/// key (`YYYYMMDD`) falls back to noon.
pub fn parse_compact_hour(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() >= 10 {
        let date = NaiveDate::parse_from_str(raw.get(..8)?, "%Y%m%d").ok()?;
        let hour: u32 = raw.get(8..10)?.parse().ok()?;
        return date.and_hms_opt(hour, 0, 0).map(|ndt| ndt.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
    date.and_hms_opt(12, 0, 0).map(|ndt| ndt.and_utc())
}

/// Parses an ISO-8601 hour timestamp into a UTC instant. Strings with an
/// explicit offset are converted; offset-less strings are declared UTC here.
pub fn parse_iso_hour(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(ndt.and_utc());
        }
    }
    None
}

/// One per-height wind series keyed by compact time strings.
#[derive(Debug, Clone, Copy)]
pub struct KeyedSeries<'a> {
    pub height_m: u32,
    pub values: &'a Map<String, Value>,
}

/// One per-height wind series as a positional array parallel to a time axis.
#[derive(Debug, Clone, Copy)]
pub struct ParallelSeries<'a> {
    pub height_m: u32,
    pub values: &'a [Value],
    /// Provider-native speeds are divided by this to get m/s (1.0 when the
    /// provider already reports m/s).
    pub speed_divisor: f64,
}

#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub observations: Vec<Observation>,
    pub skipped: usize,
}

/// Normalizes time-keyed series (one map per height, `YYYYMMDDHH` keys).
/// Temperature and humidity series, when present, are joined on the same time
/// key. `sentinel` is the provider's missing-value marker.
pub fn from_keyed_series(
    source: SourceKey,
    series: &[KeyedSeries<'_>],
    temperature: Option<&Map<String, Value>>,
    humidity: Option<&Map<String, Value>>,
    sentinel: Option<f64>,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for height_series in series {
        for (key, value) in height_series.values {
            let timestamp = parse_compact_hour(key);
            let speed = numeric(value, sentinel).filter(|v| *v >= 0.0);

            let (Some(timestamp), Some(wind_speed)) = (timestamp, speed) else {
                batch.skipped += 1;
                continue;
            };

            batch.observations.push(Observation {
                timestamp,
                height_m: f64::from(height_series.height_m),
                wind_speed,
                temperature: lookup(temperature, key, sentinel),
                humidity: lookup(humidity, key, sentinel),
                source,
            });
        }
    }

    batch
}

/// Normalizes positional series sharing one ISO time axis. A malformed time
/// entry drops one record per height riding on it.
pub fn from_parallel_series(
    source: SourceKey,
    times: &[Value],
    series: &[ParallelSeries<'_>],
    temperature: Option<&[Value]>,
    humidity: Option<&[Value]>,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for (index, raw_time) in times.iter().enumerate() {
        let timestamp = raw_time.as_str().and_then(parse_iso_hour);

        for height_series in series {
            let native = height_series
                .values
                .get(index)
                .and_then(Value::as_f64)
                .filter(|v| *v >= 0.0);

            let (Some(timestamp), Some(native)) = (timestamp, native) else {
                batch.skipped += 1;
                continue;
            };

            batch.observations.push(Observation {
                timestamp,
                height_m: f64::from(height_series.height_m),
                wind_speed: native / height_series.speed_divisor,
                temperature: temperature.and_then(|v| v.get(index)).and_then(Value::as_f64),
                humidity: humidity.and_then(|v| v.get(index)).and_then(Value::as_f64),
                source,
            });
        }
    }

    batch
}

fn lookup(series: Option<&Map<String, Value>>, key: &str, sentinel: Option<f64>) -> Option<f64> {
    series.and_then(|map| map.get(key)).and_then(|v| numeric(v, sentinel))
}

fn numeric(value: &Value, sentinel: Option<f64>) -> Option<f64> {
    let v = value.as_f64()?;
    if sentinel.is_some_and(|s| (v - s).abs() < f64::EPSILON) {
        return None;
    }
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn compact_hour_round_trips_to_the_same_instant() {
        let parsed = parse_compact_hour("2024010514").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 5, 14, 0, 0).unwrap());
        assert_eq!(parsed.format("%Y%m%d%H").to_string(), "2024010514");
    }

    #[test]
    fn compact_date_only_falls_back_to_noon() {
        let parsed = parse_compact_hour("20240105").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
    }

    #[test]
    fn compact_hour_rejects_garbage() {
        assert!(parse_compact_hour("not-a-date").is_none());
        assert!(parse_compact_hour("2024").is_none());
        assert!(parse_compact_hour("20240105xx").is_none());
    }

    #[test]
    fn offsetless_iso_is_declared_utc() {
        let naive = parse_iso_hour("2024-01-05T14:00").unwrap();
        let explicit = parse_iso_hour("2024-01-05T14:00:00+00:00").unwrap();
        assert_eq!(naive, explicit);
        assert_eq!(naive.timezone(), Utc);
    }

    #[test]
    fn explicit_offset_is_converted_to_utc() {
        let parsed = parse_iso_hour("2024-01-05T14:00:00-03:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 5, 17, 0, 0).unwrap());
    }

    #[test]
    fn keyed_series_skips_sentinel_and_bad_keys() {
        let wind = json!({
            "2024010100": 5.0,
            "2024010101": -999.0,
            "bogus": 6.0,
        });
        let series = [KeyedSeries { height_m: 10, values: wind.as_object().unwrap() }];

        let batch = from_keyed_series(SourceKey::NasaPower, &series, None, None, Some(-999.0));
        assert_eq!(batch.observations.len(), 1);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.observations[0].wind_speed, 5.0);
    }

    #[test]
    fn keyed_series_joins_temperature_and_humidity_on_time_key() {
        let wind = json!({ "2024010100": 5.0, "2024010101": 6.0 });
        let temperature = json!({ "2024010100": 23.4, "2024010101": -999.0 });
        let humidity = json!({ "2024010100": 55.2 });
        let series = [KeyedSeries { height_m: 50, values: wind.as_object().unwrap() }];

        let batch = from_keyed_series(
            SourceKey::NasaPower,
            &series,
            temperature.as_object(),
            humidity.as_object(),
            Some(-999.0),
        );

        assert_eq!(batch.observations.len(), 2);
        assert_eq!(batch.observations[0].temperature, Some(23.4));
        assert_eq!(batch.observations[0].humidity, Some(55.2));
        // Sentinel temperature and absent humidity stay None, not placeholders.
        assert_eq!(batch.observations[1].temperature, None);
        assert_eq!(batch.observations[1].humidity, None);
    }

    #[test]
    fn parallel_series_converts_native_units() {
        let times = [json!("2024-01-05T00:00"), json!("2024-01-05T01:00")];
        let speeds = [json!(36.0), json!(18.0)];
        let series = [ParallelSeries { height_m: 10, values: &speeds, speed_divisor: KMH_PER_MS }];

        let batch = from_parallel_series(SourceKey::OpenMeteo, &times, &series, None, None);
        assert_eq!(batch.observations.len(), 2);
        assert!((batch.observations[0].wind_speed - 10.0).abs() < 1e-9);
        assert!((batch.observations[1].wind_speed - 5.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_series_counts_null_rows_per_height() {
        let times = [json!("2024-01-05T00:00"), json!("not a time")];
        let speeds_10 = [json!(10.0), json!(20.0)];
        let speeds_80 = [json!(null), json!(30.0)];
        let series = [
            ParallelSeries { height_m: 10, values: &speeds_10, speed_divisor: 1.0 },
            ParallelSeries { height_m: 80, values: &speeds_80, speed_divisor: 1.0 },
        ];

        let batch = from_parallel_series(SourceKey::OpenMeteo, &times, &series, None, None);
        // Valid: 10m at hour 0. Skipped: null 80m row plus both heights on the
        // malformed time entry.
        assert_eq!(batch.observations.len(), 1);
        assert_eq!(batch.skipped, 3);
    }
}
