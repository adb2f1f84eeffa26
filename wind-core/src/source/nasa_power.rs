//! NASA-POWER-like historical source.
//!
//! The archive serves hourly satellite-derived records keyed by compact UTC
//! time strings (`YYYYMMDDHH`). Wind speed is available at exactly two
//! heights: 10m (`WS10M`) and 50m (`WS50M`). Temperature (`T2M`) and relative
//! humidity (`RH2M`) ride along on request. Missing values are reported with
//! a `-999` sentinel.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    availability::{self, ParameterProbe},
    config::HttpOptions,
    error::{Result, WindError},
    model::{FetchRequest, FetchResult},
    normalize::{self, KeyedSeries},
    source::{
        HistoricalSource, Parameter, SourceDescriptor, SourceKey, transport_error,
        truncate_body, validate_request,
    },
};

const BASE_URL: &str = "https://power.larc.nasa.gov/api/temporal/hourly/point";
const SUPPORTED_HEIGHTS: &[u32] = &[10, 50];
const SUPPORTED_PARAMETERS: &[Parameter] =
    &[Parameter::WindSpeed, Parameter::Temperature, Parameter::Humidity];
const MISSING_SENTINEL: f64 = -999.0;

const TEMPERATURE_CODE: &str = "T2M";
const HUMIDITY_CODE: &str = "RH2M";

#[derive(Debug, Clone)]
pub struct NasaPowerSource {
    descriptor: SourceDescriptor,
    http: Client,
}

impl NasaPowerSource {
    pub fn new(options: &HttpOptions) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client for NASA POWER: {e}"))?;

        Ok(Self {
            descriptor: SourceDescriptor {
                key: SourceKey::NasaPower,
                display_name: "NASA POWER",
                base_url: BASE_URL,
                supported_heights: SUPPORTED_HEIGHTS,
                supported_parameters: SUPPORTED_PARAMETERS,
                earliest_date: NaiveDate::from_ymd_opt(1981, 1, 1)
                    .expect("1981-01-01 is a valid date"),
                publication_lag_days: 7,
            },
            http,
        })
    }
}

/// Archive parameter code for a supported wind-speed height.
fn wind_code(height: u32) -> Option<&'static str> {
    match height {
        10 => Some("WS10M"),
        50 => Some("WS50M"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct NasaResponse {
    properties: NasaProperties,
}

#[derive(Debug, Deserialize)]
struct NasaProperties {
    #[serde(default)]
    parameter: Map<String, Value>,
}

/// Turns the parsed `properties.parameter` map into a [`FetchResult`].
/// Pure with respect to the network, so provider stubs exercise it directly.
fn process_payload(parameter: &Map<String, Value>, request: &FetchRequest) -> Result<FetchResult> {
    let mut probes = vec![
        ParameterProbe::new(Parameter::Temperature, TEMPERATURE_CODE, request.include_temperature),
        ParameterProbe::new(Parameter::Humidity, HUMIDITY_CODE, request.include_humidity),
    ];
    for height in &request.heights {
        if let Some(code) = wind_code(*height) {
            probes.push(ParameterProbe::new(Parameter::WindSpeed, code, true));
        }
    }

    let report = availability::validate(parameter, &probes);

    let mut series = Vec::new();
    for height in &request.heights {
        let values = wind_code(*height)
            .and_then(|code| report.series_for(code))
            .and_then(Value::as_object);
        if let Some(values) = values {
            series.push(KeyedSeries { height_m: *height, values });
        }
    }

    let temperature = report.series_for(TEMPERATURE_CODE).and_then(Value::as_object);
    let humidity = report.series_for(HUMIDITY_CODE).and_then(Value::as_object);

    let batch = normalize::from_keyed_series(
        SourceKey::NasaPower,
        &series,
        temperature,
        humidity,
        Some(MISSING_SENTINEL),
    );

    Ok(FetchResult::assemble(
        batch.observations,
        SourceKey::NasaPower,
        request.latitude,
        request.longitude,
        batch.skipped,
        report.included(),
    ))
}

#[async_trait]
impl HistoricalSource for NasaPowerSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        validate_request(request, &self.descriptor)?;

        let mut codes: Vec<&str> =
            request.heights.iter().filter_map(|h| wind_code(*h)).collect();
        if request.include_temperature {
            codes.push(TEMPERATURE_CODE);
        }
        if request.include_humidity {
            codes.push(HUMIDITY_CODE);
        }

        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("start", request.start_date.format("%Y%m%d").to_string()),
                ("end", request.end_date.format("%Y%m%d").to_string()),
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("community", "RE".to_string()),
                ("parameters", codes.join(",")),
                ("format", "JSON".to_string()),
                ("time-standard", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SourceKey::NasaPower, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WindError::SourceUnavailable {
                key: SourceKey::NasaPower,
                status: Some(status.as_u16()),
                reason: truncate_body(&body),
            });
        }

        let parsed: NasaResponse = response.json().await.map_err(|e| WindError::SourceUnavailable {
            key: SourceKey::NasaPower,
            status: None,
            reason: format!("malformed JSON payload: {e}"),
        })?;

        process_payload(&parsed.properties.parameter, request)
    }
}
