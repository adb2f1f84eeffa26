//! Decides which requested physical quantities a raw provider payload
//! actually carries.
//!
//! A parameter counts as available only when all three hold: it was requested,
//! the provider returned its key, and the container behind the key is
//! non-empty. A key that is present but maps to `{}`, `[]` or `null` is NOT
//! available; treating it as such is how the data-collection layer used to end
//! up persisting placeholder values.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{model::IncludedParameters, source::Parameter};

/// What to look for in a raw payload: a physical quantity, the provider's key
/// for it, and whether the caller asked for it at all.
#[derive(Debug, Clone, Copy)]
pub struct ParameterProbe<'a> {
    pub parameter: Parameter,
    pub provider_key: &'a str,
    pub requested: bool,
}

impl<'a> ParameterProbe<'a> {
    pub fn new(parameter: Parameter, provider_key: &'a str, requested: bool) -> Self {
        ParameterProbe { parameter, provider_key, requested }
    }
}

/// Verdict for every probe, plus the filtered sub-payload: series are exposed
/// for available parameters only, never padded with placeholders.
#[derive(Debug)]
pub struct AvailabilityReport<'a> {
    flags: BTreeMap<Parameter, bool>,
    series: BTreeMap<&'a str, &'a Value>,
}

impl<'a> AvailabilityReport<'a> {
    /// True if any probe for this parameter passed (wind speed is probed once
    /// per height; one populated height is enough).
    pub fn is_available(&self, parameter: Parameter) -> bool {
        self.flags.get(&parameter).copied().unwrap_or(false)
    }

    /// The raw series behind a provider key, present only if its probe passed.
    pub fn series_for(&self, provider_key: &str) -> Option<&'a Value> {
        self.series.get(provider_key).copied()
    }

    pub fn included(&self) -> IncludedParameters {
        IncludedParameters {
            wind_speed: self.is_available(Parameter::WindSpeed),
            temperature: self.is_available(Parameter::Temperature),
            humidity: self.is_available(Parameter::Humidity),
        }
    }
}

/// Runs every probe against the payload map (keyed by provider parameter code).
pub fn validate<'a>(
    payload: &'a Map<String, Value>,
    probes: &[ParameterProbe<'a>],
) -> AvailabilityReport<'a> {
    let mut flags: BTreeMap<Parameter, bool> = BTreeMap::new();
    let mut series: BTreeMap<&'a str, &'a Value> = BTreeMap::new();

    for probe in probes {
        let value = payload.get(probe.provider_key);
        let available = probe.requested && value.is_some_and(is_non_empty);

        let flag = flags.entry(probe.parameter).or_insert(false);
        *flag |= available;

        if available {
            if let Some(value) = value {
                series.insert(probe.provider_key, value);
            }
        }
    }

    AvailabilityReport { flags, series }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
