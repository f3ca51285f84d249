//! Raw trial record → indexable document mapping.
//!
//! [`map_trial`] flattens one ClinicalTrials.gov-style study record into a
//! [`TrialDocument`]. The mapping is total: every missing section, missing
//! field, or value of the wrong JSON type resolves to a documented default.
//! There is no error path.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | strings | `""` |
//! | `startDate` / `completionDate` | `null` |
//! | lists | `[]` |
//! | `healthyVolunteers` | `false` |
//! | `minimumAge` | `0` |
//! | `maximumAge` | `999` |
//!
//! Ages are parsed from free text such as `"65 Years"` by taking the leading
//! integer. The unit is discarded, so `"6 Months"` indexes as `6`.

use serde_json::Value;

use crate::models::{Intervention, Location, TrialDocument};

/// Default `minimumAge` when the record has none or it does not parse.
pub const DEFAULT_MINIMUM_AGE: i64 = 0;
/// Default `maximumAge` when the record has none or it does not parse.
pub const DEFAULT_MAXIMUM_AGE: i64 = 999;

static EMPTY: Value = Value::Null;

/// Map one raw trial record into a [`TrialDocument`].
pub fn map_trial(raw: &Value) -> TrialDocument {
    let protocol = section(raw, "protocolSection");
    let identification = section(protocol, "identificationModule");
    let status = section(protocol, "statusModule");
    let eligibility = section(protocol, "eligibilityModule");

    TrialDocument {
        nct_id: string_field(identification, "nctId"),
        brief_title: string_field(identification, "briefTitle"),
        official_title: string_field(identification, "officialTitle"),
        conditions: extract_conditions(protocol),
        overall_status: string_field(status, "overallStatus"),
        start_date: extract_date(status, "startDateStruct"),
        completion_date: extract_date(status, "completionDateStruct"),
        interventions: extract_interventions(protocol),
        eligibility_criteria: string_field(eligibility, "eligibilityCriteria"),
        healthy_volunteers: eligibility
            .get("healthyVolunteers")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        gender: string_field(eligibility, "sex"),
        minimum_age: parse_age(
            eligibility.get("minimumAge").and_then(Value::as_str),
            DEFAULT_MINIMUM_AGE,
        ),
        maximum_age: parse_age(
            eligibility.get("maximumAge").and_then(Value::as_str),
            DEFAULT_MAXIMUM_AGE,
        ),
        locations: extract_locations(protocol),
    }
}

/// Parse the leading integer of an age string like `"65 Years"`.
///
/// Returns `default` for `None`, an empty string, or a non-numeric first
/// token.
pub fn parse_age(age: Option<&str>, default: i64) -> i64 {
    age.and_then(|s| s.split_whitespace().next())
        .and_then(|token| token.parse::<i64>().ok())
        .unwrap_or(default)
}

/// Read `module[key].date` without validating its format.
pub fn extract_date(module: &Value, key: &str) -> Option<String> {
    section(module, key)
        .get("date")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_conditions(protocol: &Value) -> Vec<String> {
    let mut conditions: Vec<String> = Vec::new();
    for item in array_field(section(protocol, "conditionsModule"), "conditions") {
        if let Some(c) = item.as_str() {
            if !conditions.iter().any(|seen| seen == c) {
                conditions.push(c.to_string());
            }
        }
    }
    conditions
}

fn extract_interventions(protocol: &Value) -> Vec<Intervention> {
    array_field(section(protocol, "armsInterventionsModule"), "interventions")
        .iter()
        .map(|item| Intervention {
            kind: string_field(item, "type"),
            name: string_field(item, "name"),
        })
        .collect()
}

fn extract_locations(protocol: &Value) -> Vec<Location> {
    array_field(section(protocol, "contactsLocationsModule"), "locations")
        .iter()
        .map(|item| Location {
            facility: string_field(item, "facility"),
            city: string_field(item, "city"),
            state: string_field(item, "state"),
            country: string_field(item, "country"),
        })
        .collect()
}

/// Nested object lookup; anything that is not an object yields `null`.
fn section<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).filter(|v| v.is_object()).unwrap_or(&EMPTY)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
