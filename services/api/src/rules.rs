use chrono::{NaiveDate, Utc};
use clap::Args;
use claim_resolution::error::AppError;
use claim_resolution::workflows::analysis::viability::{score, ViabilityInputs};
use claim_resolution::workflows::analysis::{StrategyStatus, STRATEGY_RULES, VIABILITY_RULES};
use serde_json::{json, Value};

#[derive(Args, Debug)]
pub(crate) struct ViabilityArgs {
    /// Grand total of the generated estimate
    #[arg(long)]
    pub(crate) estimated_total: f64,
    /// Policy deductible
    #[arg(long, default_value_t = 0.0)]
    pub(crate) deductible: f64,
    /// Loss type as recorded on the claim, e.g. wind or water
    #[arg(long)]
    pub(crate) loss_type: Option<String>,
    /// Free-text policy exclusions
    #[arg(long)]
    pub(crate) exclusions: Option<String>,
    /// Date of loss (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) incident_date: Option<NaiveDate>,
    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct StrategyArgs {
    /// Contractor (generated) estimate total
    #[arg(long)]
    pub(crate) contractor: f64,
    /// Carrier estimate total; omit when no usable carrier figure exists
    #[arg(long)]
    pub(crate) carrier: Option<f64>,
    /// The carrier has denied coverage outright
    #[arg(long, default_value_t = false)]
    pub(crate) coverage_denied: bool,
}

/// Scores viability with the versioned rule table, without touching the store or a model.
pub(crate) fn run_viability(args: ViabilityArgs) -> Result<(), AppError> {
    print_json(&viability_report(args))
}

pub(crate) fn run_strategy(args: StrategyArgs) -> Result<(), AppError> {
    print_json(&strategy_report(&args))
}

fn viability_report(args: ViabilityArgs) -> Value {
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let inputs = ViabilityInputs {
        loss_type: args.loss_type,
        incident_date: args.incident_date,
        deductible: args.deductible,
        exclusions: args.exclusions,
        estimated_total: args.estimated_total,
    };
    let scored = score(&inputs, &VIABILITY_RULES, today);
    json!({ "as_of": today, "score": scored })
}

fn strategy_report(args: &StrategyArgs) -> Value {
    let status = STRATEGY_RULES.derive(args.contractor, args.carrier, args.coverage_denied);
    let delta = args.carrier.map(|carrier| args.contractor - carrier);
    json!({
        "status": status,
        "delta": delta,
        "needs_documents": status == StrategyStatus::NeedDocs,
        "rules": STRATEGY_RULES,
    })
}

fn print_json(value: &Value) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
