use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use bond_analytics_core::fixed_income::analysis::{self, BondAnalysisInput};
use bond_analytics_core::fixed_income::schedule;
use bond_analytics_core::fixed_income::sensitivity::{self, ShiftRange};
use bond_analytics_core::fixed_income::valuation;
use bond_analytics_core::types::with_metadata;

use crate::input;

/// Arguments for bond valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Valuation date (YYYY-MM-DD); defaults to the request's date, then today
    #[arg(long)]
    pub valuation_date: Option<NaiveDate>,
}

/// Arguments for the cash-flow schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Valuation date (YYYY-MM-DD); defaults to the request's date, then today
    #[arg(long)]
    pub valuation_date: Option<NaiveDate>,
}

/// Yield-shift overrides shared by the sensitivity and analyze commands
#[derive(Args, Default)]
pub struct ShiftArgs {
    /// Smallest yield shift as a decimal (e.g. -0.05)
    #[arg(long, allow_hyphen_values = true)]
    pub shift_min: Option<Decimal>,

    /// Largest yield shift as a decimal (e.g. 0.05)
    #[arg(long, allow_hyphen_values = true)]
    pub shift_max: Option<Decimal>,

    /// Step between shifts (e.g. 0.005 for 50 bp)
    #[arg(long)]
    pub shift_step: Option<Decimal>,
}

/// Arguments for the price-vs-yield curve
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Valuation date (YYYY-MM-DD); defaults to the request's date, then today
    #[arg(long)]
    pub valuation_date: Option<NaiveDate>,

    #[command(flatten)]
    pub shifts: ShiftArgs,
}

/// Arguments for the combined analysis report
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Valuation date (YYYY-MM-DD); defaults to the request's date, then today
    #[arg(long)]
    pub valuation_date: Option<NaiveDate>,

    #[command(flatten)]
    pub shifts: ShiftArgs,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = read_request(&args.input, "bond valuation")?;
    let valuation_date = resolve_date(&request, args.valuation_date);

    let result = valuation::value_bond_on(&request.terms, valuation_date)?;

    let mut warnings = Vec::new();
    if request.terms.has_fractional_maturity() {
        warnings.push(format!(
            "Maturity rounded up to {} full periods",
            result.total_periods
        ));
    }

    let output = with_metadata(
        "Bond Valuation (PV of period-discounted cash flows)",
        &request.terms,
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = read_request(&args.input, "cash-flow schedule")?;
    let valuation_date = resolve_date(&request, args.valuation_date);

    let events = schedule::generate_schedule(&request.terms, valuation_date)?;

    let output = with_metadata(
        "Cash-Flow Schedule (bullet bond, whole-month payment dates)",
        &serde_json::json!({
            "terms": request.terms,
            "valuation_date": valuation_date,
        }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        events,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = read_request(&args.input, "yield sensitivity")?;
    let valuation_date = resolve_date(&request, args.valuation_date);
    let range = apply_shift_overrides(request.shift_range, &args.shifts);

    let points = sensitivity::sensitivity_curve_on(&request.terms, &range, valuation_date)?;

    let mut warnings = Vec::new();
    if points.is_empty() {
        warnings.push("Every shifted yield is zero or negative; curve is empty".to_string());
    }

    let output = with_metadata(
        "Yield Sensitivity (full re-valuation per parallel shift)",
        &serde_json::json!({
            "terms": request.terms,
            "shift_range": range,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        points,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request = read_request(&args.input, "bond analysis")?;
    if args.valuation_date.is_some() {
        request.valuation_date = args.valuation_date;
    }
    if args.shifts.is_set() || request.shift_range.is_some() {
        request.shift_range = Some(apply_shift_overrides(request.shift_range, &args.shifts));
    }

    let result = analysis::analyze_bond(&request)?;
    Ok(serde_json::to_value(result)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_request(
    path: &Option<String>,
    label: &str,
) -> Result<BondAnalysisInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = path {
        input::file::read_json(path)
    } else if let Some(request) = input::stdin::read_stdin()? {
        Ok(request)
    } else {
        Err(format!("--input <file.json> or stdin required for {label}").into())
    }
}

/// Command-line date, then the request's date, then today.
fn resolve_date(request: &BondAnalysisInput, flag: Option<NaiveDate>) -> NaiveDate {
    flag.or(request.valuation_date)
        .unwrap_or_else(|| Utc::now().date_naive())
}

impl ShiftArgs {
    fn is_set(&self) -> bool {
        self.shift_min.is_some() || self.shift_max.is_some() || self.shift_step.is_some()
    }
}

/// Individual flags replace the matching bound of the request's range.
fn apply_shift_overrides(base: Option<ShiftRange>, shifts: &ShiftArgs) -> ShiftRange {
    let base = base.unwrap_or_default();
    ShiftRange {
        min: shifts.shift_min.unwrap_or(base.min),
        max: shifts.shift_max.unwrap_or(base.max),
        step: shifts.shift_step.unwrap_or(base.step),
    }
}
