use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Config,
    error::{Result, WindError},
    model::{FetchRequest, FetchResult},
    source::{nasa_power::NasaPowerSource, open_meteo::OpenMeteoSource},
};

pub mod nasa_power;
pub mod open_meteo;

/// Canonical identifier of an originating data source.
///
/// `Unknown` is a valid but unattributed source, not an error: downstream
/// consumers keep such observations rather than dropping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    NasaPower,
    OpenMeteo,
    Inmet,
    Manual,
    Unknown,
}

impl SourceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::NasaPower => "nasa_power",
            SourceKey::OpenMeteo => "open_meteo",
            SourceKey::Inmet => "inmet",
            SourceKey::Manual => "manual",
            SourceKey::Unknown => "unknown",
        }
    }

    pub const fn all() -> &'static [SourceKey] {
        &[
            SourceKey::NasaPower,
            SourceKey::OpenMeteo,
            SourceKey::Inmet,
            SourceKey::Manual,
            SourceKey::Unknown,
        ]
    }

    /// Sources with a remote client behind them.
    pub const fn remote() -> &'static [SourceKey] {
        &[SourceKey::NasaPower, SourceKey::OpenMeteo]
    }

    /// Resolves provider-reported or user-entered labels to a canonical key.
    ///
    /// Case, spacing and punctuation variants ("NASA_POWER", "Nasa Power",
    /// "nasa-power") all map to the same key. Unrecognized labels map to
    /// [`SourceKey::Unknown`] instead of failing.
    pub fn canonical(raw: &str) -> SourceKey {
        let mut folded = String::with_capacity(raw.len());
        for c in raw.trim().to_lowercase().chars() {
            let c = if matches!(c, '-' | ' ' | '.') { '_' } else { c };
            if c == '_' && folded.ends_with('_') {
                continue;
            }
            folded.push(c);
        }

        match folded.as_str() {
            "nasa_power" | "nasapower" | "nasa" => SourceKey::NasaPower,
            "open_meteo" | "openmeteo" => SourceKey::OpenMeteo,
            "inmet" => SourceKey::Inmet,
            "manual" | "manual_entry" => SourceKey::Manual,
            _ => SourceKey::Unknown,
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing for user-facing inputs: unlike [`SourceKey::canonical`],
/// an unrecognized label is an error here.
impl TryFrom<&str> for SourceKey {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match SourceKey::canonical(value) {
            SourceKey::Unknown => Err(anyhow::anyhow!(
                "Unknown source '{value}'. Supported sources: nasa_power, open_meteo, inmet, manual."
            )),
            key => Ok(key),
        }
    }
}

/// A physical quantity a source can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    WindSpeed,
    Temperature,
    Humidity,
}

impl Parameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::WindSpeed => "wind_speed",
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
        }
    }
}

/// Static per-source metadata, constructed once per client instance.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub key: SourceKey,
    pub display_name: &'static str,
    pub base_url: &'static str,
    /// Finite enumerated set of capture heights the archive serves.
    pub supported_heights: &'static [u32],
    pub supported_parameters: &'static [Parameter],
    pub earliest_date: NaiveDate,
    /// Typical delay before the newest records appear in the archive.
    pub publication_lag_days: i64,
}

/// Result of a pre-flight availability check. No data fetch is involved.
#[derive(Debug, Clone)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub reason: Option<String>,
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

/// Contract shared by every historical data source.
#[async_trait]
pub trait HistoricalSource: Send + Sync + Debug {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Fetches and normalizes observations for the request window.
    ///
    /// Request-shape errors (`UnsupportedHeight`, `InvalidDateRange`,
    /// `InvalidParameter`) are raised before any network I/O. Transport and
    /// provider failures surface as `SourceUnavailable` and are not retried.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult>;

    fn supported_heights(&self) -> &[u32] {
        self.descriptor().supported_heights
    }

    fn supported_parameters(&self) -> &[Parameter] {
        self.descriptor().supported_parameters
    }

    /// Checks a date window against the archive bounds (earliest record,
    /// publication lag). Pure metadata, safe to call any time.
    fn check_availability(&self, start: NaiveDate, end: NaiveDate) -> AvailabilityCheck {
        let descriptor = self.descriptor();
        let earliest = descriptor.earliest_date;
        let latest = Utc::now().date_naive() - Duration::days(descriptor.publication_lag_days);

        let reason = if start > end {
            Some(format!("start {start} is after end {end}"))
        } else if start < earliest {
            Some(format!(
                "start {start} predates the {} archive (earliest: {earliest})",
                descriptor.display_name
            ))
        } else if end > latest {
            Some(format!(
                "end {end} is beyond the published window (latest: {latest})"
            ))
        } else {
            None
        };

        AvailabilityCheck { available: reason.is_none(), reason, earliest, latest }
    }
}

/// Shared request validation, run by every client before issuing I/O.
pub(crate) fn validate_request(
    request: &FetchRequest,
    descriptor: &SourceDescriptor,
) -> Result<()> {
    if !(-90.0..=90.0).contains(&request.latitude) {
        return Err(WindError::invalid(format!(
            "latitude {} must be between -90 and 90",
            request.latitude
        )));
    }
    if !(-180.0..=180.0).contains(&request.longitude) {
        return Err(WindError::invalid(format!(
            "longitude {} must be between -180 and 180",
            request.longitude
        )));
    }
    if request.start_date > request.end_date {
        return Err(WindError::InvalidDateRange {
            start: request.start_date,
            end: request.end_date,
        });
    }
    if request.heights.is_empty() {
        return Err(WindError::invalid("at least one capture height is required"));
    }
    for height in &request.heights {
        if !descriptor.supported_heights.contains(height) {
            return Err(WindError::UnsupportedHeight {
                key: descriptor.key,
                height: *height,
                supported: descriptor.supported_heights.to_vec(),
            });
        }
    }
    Ok(())
}

/// Maps a reqwest failure (timeout included) onto the error taxonomy.
pub(crate) fn transport_error(key: SourceKey, err: &reqwest::Error) -> WindError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    WindError::SourceUnavailable {
        key,
        status: err.status().map(|s| s.as_u16()),
        reason,
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}

/// Constructs a remote client for an explicit source key.
pub fn source_from_key(key: SourceKey, config: &Config) -> anyhow::Result<Box<dyn HistoricalSource>> {
    let boxed: Box<dyn HistoricalSource> = match key {
        SourceKey::NasaPower => Box::new(NasaPowerSource::new(&config.http_options(key))?),
        SourceKey::OpenMeteo => Box::new(OpenMeteoSource::new(&config.http_options(key))?),
        other => anyhow::bail!(
            "'{other}' has no remote client. Remote sources: nasa_power, open_meteo."
        ),
    };

    Ok(boxed)
}

/// Constructs the default source from config, using the `default_source` field.
pub fn default_source_from_config(config: &Config) -> anyhow::Result<Box<dyn HistoricalSource>> {
    let key = config.default_source_key()?;
    source_from_key(key, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_collapses_label_variants() {
        for raw in ["NASA_POWER", "nasa-power", "Nasa Power", "  nasa  power ", "NASA"] {
            assert_eq!(SourceKey::canonical(raw), SourceKey::NasaPower, "raw: {raw:?}");
        }
        for raw in ["open_meteo", "Open-Meteo", "OPEN METEO", "OpenMeteo"] {
            assert_eq!(SourceKey::canonical(raw), SourceKey::OpenMeteo, "raw: {raw:?}");
        }
        assert_eq!(SourceKey::canonical("INMET"), SourceKey::Inmet);
        assert_eq!(SourceKey::canonical("Manual Entry"), SourceKey::Manual);
    }

    #[test]
    fn canonical_maps_unrecognized_labels_to_unknown() {
        assert_eq!(SourceKey::canonical("weather-station-42"), SourceKey::Unknown);
        assert_eq!(SourceKey::canonical(""), SourceKey::Unknown);
    }

    #[test]
    fn source_key_as_str_roundtrip() {
        for key in SourceKey::all() {
            if *key == SourceKey::Unknown {
                continue;
            }
            let parsed = SourceKey::try_from(key.as_str()).expect("roundtrip should succeed");
            assert_eq!(*key, parsed);
        }
    }

    #[test]
    fn strict_parsing_rejects_unknown_labels() {
        let err = SourceKey::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown source"));
    }

    #[test]
    fn source_from_key_rejects_non_remote_sources() {
        let cfg = Config::default();
        let err = source_from_key(SourceKey::Manual, &cfg).unwrap_err();
        assert!(err.to_string().contains("no remote client"));
    }

    #[test]
    fn remote_sources_construct_from_default_config() {
        let cfg = Config::default();
        for key in SourceKey::remote() {
            let source = source_from_key(*key, &cfg).expect("client should build");
            assert_eq!(source.descriptor().key, *key);
        }
    }
}
