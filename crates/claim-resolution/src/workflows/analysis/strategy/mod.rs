//! PM Brain settlement-disposition classifier.
//!
//! The model writes the narrative (summary, delta drivers, coverage disputes, next steps);
//! [`StrategyRules`] decides the status. A status outside the four known values is a hard
//! failure and is never coerced.

mod rules;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub use rules::{StrategyRules, STRATEGY_RULES};

use super::domain::{round_cents, CarrierEstimate, GeneratedEstimate, PolicySnapshot};
use crate::llm::validate::{require_finite, require_text};
use crate::llm::{parse_json_response, CompletionRequest, ValidationError};

pub const CLASSIFICATION_TEMPERATURE: f32 = 0.1;
const CLASSIFICATION_MAX_TOKENS: u32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyStatus {
    Close,
    DisputeOffer,
    LegalReview,
    NeedDocs,
}

impl StrategyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyStatus::Close => "CLOSE",
            StrategyStatus::DisputeOffer => "DISPUTE_OFFER",
            StrategyStatus::LegalReview => "LEGAL_REVIEW",
            StrategyStatus::NeedDocs => "NEED_DOCS",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "CLOSE" => Ok(Self::Close),
            "DISPUTE_OFFER" => Ok(Self::DisputeOffer),
            "LEGAL_REVIEW" => Ok(Self::LegalReview),
            "NEED_DOCS" => Ok(Self::NeedDocs),
            other => Err(ValidationError::InvalidClassification(other.to_string())),
        }
    }
}

/// Line item contributing materially to the gap between the two estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaDriver {
    pub line_item: String,
    pub contractor_price: f64,
    pub carrier_price: f64,
    pub delta: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageDisputeKind {
    Denied,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageDispute {
    pub item: String,
    pub status: CoverageDisputeKind,
    pub contractor_position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmBrainAnalysis {
    pub status: StrategyStatus,
    pub summary: String,
    pub contractor_total: f64,
    pub carrier_total: f64,
    pub delta: f64,
    pub delta_drivers: Vec<DeltaDriver>,
    pub coverage_disputes: Vec<CoverageDispute>,
    pub required_next_steps: Vec<String>,
    pub legal_threshold_met: bool,
    /// Status the model proposed, kept for audit when it disagrees with the rules.
    pub model_status: StrategyStatus,
    pub rules_version: String,
}

/// Authoritative numbers for the classification, taken from stored estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyInputs {
    pub contractor_total: f64,
    /// `None` when the carrier data cannot be read as a line-item estimate.
    pub carrier_total: Option<f64>,
}

impl StrategyInputs {
    pub fn from_estimates(
        estimate: &GeneratedEstimate,
        carrier: Option<&CarrierEstimate>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            contractor_total: estimate.total()?,
            carrier_total: carrier
                .and_then(CarrierEstimate::line_item_estimate)
                .map(|parsed| parsed.total),
        })
    }
}

pub fn build_request(
    policy: &PolicySnapshot,
    estimate: &GeneratedEstimate,
    carrier: Option<&CarrierEstimate>,
    rules: &StrategyRules,
) -> CompletionRequest {
    let carrier_data = carrier
        .and_then(|estimate| estimate.parsed_data.clone())
        .unwrap_or(serde_json::Value::Null);

    let prompt = format!(
        "Classify the carrier's settlement offer for this property-insurance claim.\n\n\
         POLICY AND CLAIM:\n{policy}\n\n\
         CONTRACTOR ESTIMATE (independently generated):\n{estimate}\n\n\
         CARRIER ESTIMATE (parsed from the carrier's document; null means none was provided):\n{carrier}\n\n\
         {rules}\n\n\
         Respond with exactly one JSON object of this shape:\n{schema}",
        policy = json!(policy),
        estimate = json!(estimate),
        carrier = carrier_data,
        rules = rules.prompt_block(),
        schema = response_schema(),
    );

    CompletionRequest::new(SYSTEM_PROMPT, prompt)
        .temperature(CLASSIFICATION_TEMPERATURE)
        .max_tokens(CLASSIFICATION_MAX_TOKENS)
}

const SYSTEM_PROMPT: &str = "You are a senior property-insurance claim strategist working for the \
policyholder's property manager. You compare a contractor estimate with the carrier's estimate and \
decide the next move. Respond with a single JSON object and nothing else: no markdown, no prose.";

fn response_schema() -> &'static str {
    r#"{
  "status": "CLOSE | DISPUTE_OFFER | LEGAL_REVIEW | NEED_DOCS",
  "summary": "two to four sentences for the property manager",
  "contractor_total": 0.0,
  "carrier_total": 0.0,
  "delta": 0.0,
  "delta_drivers": [{"line_item": "", "contractor_price": 0.0, "carrier_price": 0.0, "delta": 0.0, "reason": ""}],
  "coverage_disputes": [{"item": "", "status": "denied | partial", "contractor_position": ""}],
  "required_next_steps": [""],
  "legal_threshold_met": false
}"#
}

#[derive(Deserialize)]
struct RawAnalysis {
    status: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    delta_drivers: Vec<RawDeltaDriver>,
    #[serde(default)]
    coverage_disputes: Vec<RawCoverageDispute>,
    #[serde(default)]
    required_next_steps: Vec<String>,
}

#[derive(Deserialize)]
struct RawDeltaDriver {
    line_item: Option<String>,
    contractor_price: Option<f64>,
    carrier_price: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawCoverageDispute {
    item: Option<String>,
    status: CoverageDisputeKind,
    #[serde(default)]
    contractor_position: Option<String>,
}

/// Validates a completion and applies the rule table to it.
pub fn interpret(
    text: &str,
    inputs: &StrategyInputs,
    rules: &StrategyRules,
) -> Result<PmBrainAnalysis, ValidationError> {
    let raw: RawAnalysis = parse_json_response(text)?;

    let model_status = match raw.status {
        Some(status) => StrategyStatus::parse(&status)?,
        None => return Err(ValidationError::MissingField("status")),
    };
    let summary = require_text(raw.summary, "summary")?;

    let mut delta_drivers = raw
        .delta_drivers
        .into_iter()
        .map(|driver| {
            let contractor_price =
                require_finite(driver.contractor_price, "delta_drivers.contractor_price")?;
            let carrier_price = require_finite(driver.carrier_price, "delta_drivers.carrier_price")?;
            Ok(DeltaDriver {
                line_item: require_text(driver.line_item, "delta_drivers.line_item")?,
                contractor_price,
                carrier_price,
                delta: round_cents(contractor_price - carrier_price),
                reason: driver.reason.unwrap_or_default().trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;
    delta_drivers.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));

    let coverage_disputes = raw
        .coverage_disputes
        .into_iter()
        .map(|dispute| {
            Ok(CoverageDispute {
                item: require_text(dispute.item, "coverage_disputes.item")?,
                status: dispute.status,
                contractor_position: dispute
                    .contractor_position
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let coverage_denied = coverage_disputes
        .iter()
        .any(|dispute| dispute.status == CoverageDisputeKind::Denied);
    let status = rules.derive(inputs.contractor_total, inputs.carrier_total, coverage_denied);
    if status != model_status {
        warn!(
            model_status = model_status.as_str(),
            status = status.as_str(),
            "model classification overridden by rule table"
        );
    }

    let carrier_total = inputs.carrier_total.unwrap_or(0.0);
    Ok(PmBrainAnalysis {
        status,
        summary,
        contractor_total: round_cents(inputs.contractor_total),
        carrier_total: round_cents(carrier_total),
        delta: round_cents(inputs.contractor_total - carrier_total),
        delta_drivers,
        coverage_disputes,
        required_next_steps: raw
            .required_next_steps
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect(),
        legal_threshold_met: status == StrategyStatus::LegalReview,
        model_status,
        rules_version: rules.version.to_string(),
    })
}
