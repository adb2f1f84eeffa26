//! Open-Meteo-like historical source.
//!
//! The archive serves hourly reanalysis records as a `hourly.time` axis of
//! offset-less ISO strings (UTC by request) with parallel value arrays, one
//! per parameter code. Wind speed is available at 10m, 80m, 120m and 180m and
//! arrives in km/h, converted to m/s during normalization.

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
    normalize::{self, KMH_PER_MS, ParallelSeries},
    source::{
        HistoricalSource, Parameter, SourceDescriptor, SourceKey, transport_error,
        truncate_body, validate_request,
    },
};

const BASE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const SUPPORTED_HEIGHTS: &[u32] = &[10, 80, 120, 180];
const SUPPORTED_PARAMETERS: &[Parameter] =
    &[Parameter::WindSpeed, Parameter::Temperature, Parameter::Humidity];

const TEMPERATURE_CODE: &str = "temperature_2m";
const HUMIDITY_CODE: &str = "relative_humidity_2m";

#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    descriptor: SourceDescriptor,
    http: Client,
}

impl OpenMeteoSource {
    pub fn new(options: &HttpOptions) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client for Open-Meteo: {e}"))?;

        Ok(Self {
            descriptor: SourceDescriptor {
                key: SourceKey::OpenMeteo,
                display_name: "Open-Meteo",
                base_url: BASE_URL,
                supported_heights: SUPPORTED_HEIGHTS,
                supported_parameters: SUPPORTED_PARAMETERS,
                earliest_date: NaiveDate::from_ymd_opt(1940, 1, 1)
                    .expect("1940-01-01 is a valid date"),
                publication_lag_days: 1,
            },
            http,
        })
    }
}

fn wind_code(height: u32) -> String {
    format!("wind_speed_{height}m")
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    hourly: Map<String, Value>,
}

/// Turns the parsed `hourly` block into a [`FetchResult`]. Pure with respect
/// to the network, so provider stubs exercise it directly.
fn process_payload(hourly: &Map<String, Value>, request: &FetchRequest) -> Result<FetchResult> {
    let codes: Vec<String> = request.heights.iter().map(|h| wind_code(*h)).collect();

    let mut probes = vec![
        ParameterProbe::new(Parameter::Temperature, TEMPERATURE_CODE, request.include_temperature),
        ParameterProbe::new(Parameter::Humidity, HUMIDITY_CODE, request.include_humidity),
    ];
    for code in &codes {
        probes.push(ParameterProbe::new(Parameter::WindSpeed, code, true));
    }

    let report = availability::validate(hourly, &probes);

    let times: &[Value] = hourly
        .get("time")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice);
    if times.is_empty() {
        return Err(WindError::SourceUnavailable {
            key: SourceKey::OpenMeteo,
            status: None,
            reason: "response contained no hourly time axis".to_string(),
        });
    }

    let mut series = Vec::new();
    for (height, code) in request.heights.iter().zip(&codes) {
        let values = report.series_for(code).and_then(Value::as_array);
        if let Some(values) = values {
            series.push(ParallelSeries {
                height_m: *height,
                values,
                speed_divisor: KMH_PER_MS,
            });
        }
    }

    let temperature = report
        .series_for(TEMPERATURE_CODE)
        .and_then(Value::as_array)
        .map(Vec::as_slice);
    let humidity = report
        .series_for(HUMIDITY_CODE)
        .and_then(Value::as_array)
        .map(Vec::as_slice);

    let batch =
        normalize::from_parallel_series(SourceKey::OpenMeteo, times, &series, temperature, humidity);

    Ok(FetchResult::assemble(
        batch.observations,
        SourceKey::OpenMeteo,
        request.latitude,
        request.longitude,
        batch.skipped,
        report.included(),
    ))
}

#[async_trait]
impl HistoricalSource for OpenMeteoSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult> {
        validate_request(request, &self.descriptor)?;

        let mut hourly: Vec<String> = request.heights.iter().map(|h| wind_code(*h)).collect();
        if request.include_temperature {
            hourly.push(TEMPERATURE_CODE.to_string());
        }
        if request.include_humidity {
            hourly.push(HUMIDITY_CODE.to_string());
        }

        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("start_date", request.start_date.format("%Y-%m-%d").to_string()),
                ("end_date", request.end_date.format("%Y-%m-%d").to_string()),
                ("hourly", hourly.join(",")),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SourceKey::OpenMeteo, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WindError::SourceUnavailable {
                key: SourceKey::OpenMeteo,
                status: Some(status.as_u16()),
                reason: truncate_body(&body),
            });
        }

        let parsed: OpenMeteoResponse =
            response.json().await.map_err(|e| WindError::SourceUnavailable {
                key: SourceKey::OpenMeteo,
                status: None,
                reason: format!("malformed JSON payload: {e}"),
            })?;

        process_payload(&parsed.hourly, request)
    }
}
