use napi::Result as NapiResult;
use napi_derive::napi;

use bond_analytics_core::fixed_income::analysis::{self, BondAnalysisInput};
use bond_analytics_core::fixed_income::{schedule, sensitivity, valuation};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Every entry point accepts the same request record: bond terms plus the
/// optional `valuation_date` and `shift_range`.
fn parse_request(input_json: &str) -> NapiResult<BondAnalysisInput> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn valuation_date(request: &BondAnalysisInput) -> chrono::NaiveDate {
    request
        .valuation_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive())
}

// ---------------------------------------------------------------------------
// Bond analytics
// ---------------------------------------------------------------------------

#[napi]
pub fn value_bond(input_json: String) -> NapiResult<String> {
    let request = parse_request(&input_json)?;
    let output = valuation::value_bond_on(&request.terms, valuation_date(&request))
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn cash_flow_schedule(input_json: String) -> NapiResult<String> {
    let request = parse_request(&input_json)?;
    let output = schedule::generate_schedule(&request.terms, valuation_date(&request))
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_curve(input_json: String) -> NapiResult<String> {
    let request = parse_request(&input_json)?;
    let range = request.shift_range.unwrap_or_default();
    let output =
        sensitivity::sensitivity_curve_on(&request.terms, &range, valuation_date(&request))
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_bond(input_json: String) -> NapiResult<String> {
    let request = parse_request(&input_json)?;
    let output = analysis::analyze_bond(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
