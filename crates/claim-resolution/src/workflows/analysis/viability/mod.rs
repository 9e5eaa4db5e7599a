//! Viability decision engine.
//!
//! Economics and coverage scores come from [`ViabilityRules`]; the model contributes the
//! risk narrative and next steps. Model scores are range-checked and then replaced.

mod rules;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub use rules::{CoverageAssessment, ViabilityRules, VIABILITY_RULES};

use super::domain::{round_cents, GeneratedEstimate, PolicySnapshot};
use crate::llm::validate::{require, require_finite, require_text};
use crate::llm::{parse_json_response, CompletionRequest, ValidationError};

pub const VIABILITY_TEMPERATURE: f32 = 0.1;
const VIABILITY_MAX_TOKENS: u32 = 2_000;
const STALE_INCIDENT_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Pursue,
    PursueWithConditions,
    DoNotPursue,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Pursue => "PURSUE",
            Recommendation::PursueWithConditions => "PURSUE_WITH_CONDITIONS",
            Recommendation::DoNotPursue => "DO_NOT_PURSUE",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "PURSUE" => Ok(Self::Pursue),
            "PURSUE_WITH_CONDITIONS" => Ok(Self::PursueWithConditions),
            "DO_NOT_PURSUE" => Ok(Self::DoNotPursue),
            other => Err(ValidationError::InvalidRecommendation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityAnalysis {
    pub recommendation: Recommendation,
    pub net_estimated_recovery: f64,
    pub economics_score: u8,
    pub coverage_score: u8,
    pub risks: Vec<String>,
    pub next_steps: Vec<String>,
    pub summary: String,
    pub rules_version: String,
    /// Recommendation the model proposed, when it was asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_recommendation: Option<Recommendation>,
}

/// Facts the scoring rules consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ViabilityInputs {
    pub loss_type: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub deductible: f64,
    pub exclusions: Option<String>,
    pub estimated_total: f64,
}

impl ViabilityInputs {
    /// Fails with `MissingField("total")` when the estimate carries no grand total.
    pub fn new(policy: &PolicySnapshot, estimate: &GeneratedEstimate) -> Result<Self, ValidationError> {
        Ok(Self {
            loss_type: policy.loss_type.clone(),
            incident_date: policy.incident_date,
            deductible: policy.deductible,
            exclusions: policy.exclusions.clone(),
            estimated_total: estimate.total()?,
        })
    }

    pub fn net_recovery(&self) -> f64 {
        round_cents(self.estimated_total - self.deductible)
    }
}

/// Deterministic part of the analysis, independent of any model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViabilityScore {
    pub net_estimated_recovery: f64,
    pub economics_score: u8,
    pub coverage_score: u8,
    pub recommendation: Recommendation,
    pub risks: Vec<String>,
    pub rules_version: &'static str,
}

pub fn score(inputs: &ViabilityInputs, rules: &ViabilityRules, today: NaiveDate) -> ViabilityScore {
    let net = inputs.net_recovery();
    let assessment =
        CoverageAssessment::assess(inputs.loss_type.as_deref(), inputs.exclusions.as_deref());
    let economics_score = rules.economics_score(net);
    let coverage_score = rules.coverage_score(&assessment);

    let mut risks = Vec::new();
    if assessment.excluded_by_name {
        risks.push("Policy exclusions explicitly name this loss type.".to_string());
    }
    if assessment.ambiguous {
        risks.push("Exclusion wording leaves coverage for this loss ambiguous.".to_string());
    }
    if assessment.water_loss {
        risks.push(
            "Water losses are often denied as long-term seepage; document the sudden cause."
                .to_string(),
        );
    }
    if net <= 0.0 {
        risks.push("Estimated repairs do not exceed the deductible.".to_string());
    }
    if let Some(incident) = inputs.incident_date {
        if (today - incident).num_days() > STALE_INCIDENT_DAYS {
            risks.push(
                "Incident is more than a year old; check the policy's suit-limitation clause."
                    .to_string(),
            );
        }
    }

    ViabilityScore {
        net_estimated_recovery: net,
        economics_score,
        coverage_score,
        recommendation: rules.recommend(coverage_score, economics_score, net),
        risks,
        rules_version: rules.version,
    }
}

pub fn build_request(inputs: &ViabilityInputs, rules: &ViabilityRules) -> CompletionRequest {
    let facts = json!({
        "loss_type": inputs.loss_type,
        "incident_date": inputs.incident_date,
        "deductible": inputs.deductible,
        "exclusions": inputs.exclusions,
        "estimated_total": inputs.estimated_total,
    });

    let prompt = format!(
        "Assess whether this property-insurance claim is worth pursuing.\n\n\
         CLAIM FACTS:\n{facts}\n\n\
         {rules}\n\n\
         Respond with exactly one JSON object of this shape:\n{schema}",
        rules = rules.prompt_block(),
        schema = RESPONSE_SCHEMA,
    );

    CompletionRequest::new(SYSTEM_PROMPT, prompt)
        .temperature(VIABILITY_TEMPERATURE)
        .max_tokens(VIABILITY_MAX_TOKENS)
}

const SYSTEM_PROMPT: &str = "You are a public adjuster screening property-insurance claims for a \
property manager. Apply the scoring rules exactly. Respond with a single JSON object and nothing \
else: no markdown, no prose.";

const RESPONSE_SCHEMA: &str = r#"{
  "recommendation": "PURSUE | PURSUE_WITH_CONDITIONS | DO_NOT_PURSUE",
  "net_estimated_recovery": 0.0,
  "economics_score": 0,
  "coverage_score": 0,
  "risks": [""],
  "next_steps": [""],
  "summary": "two to three sentences"
}"#;

#[derive(Deserialize)]
struct RawViability {
    recommendation: Option<String>,
    economics_score: Option<f64>,
    coverage_score: Option<f64>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    next_steps: Vec<String>,
    summary: Option<String>,
}

/// Validates a completion and replaces its arithmetic with the rule table's.
pub fn interpret(
    text: &str,
    inputs: &ViabilityInputs,
    rules: &ViabilityRules,
    today: NaiveDate,
) -> Result<ViabilityAnalysis, ValidationError> {
    let raw: RawViability = parse_json_response(text)?;

    let model_recommendation = Recommendation::parse(&require(raw.recommendation, "recommendation")?)?;
    check_score(raw.economics_score, "economics_score")?;
    check_score(raw.coverage_score, "coverage_score")?;
    let summary = require_text(raw.summary, "summary")?;

    let scored = score(inputs, rules, today);
    if scored.recommendation != model_recommendation {
        warn!(
            model_recommendation = model_recommendation.as_str(),
            recommendation = scored.recommendation.as_str(),
            "model recommendation overridden by rule table"
        );
    }

    let mut risks = scored.risks;
    for risk in raw.risks.into_iter().map(|risk| risk.trim().to_string()) {
        if !risk.is_empty() && !risks.contains(&risk) {
            risks.push(risk);
        }
    }

    Ok(ViabilityAnalysis {
        recommendation: scored.recommendation,
        net_estimated_recovery: scored.net_estimated_recovery,
        economics_score: scored.economics_score,
        coverage_score: scored.coverage_score,
        risks,
        next_steps: raw
            .next_steps
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect(),
        summary,
        rules_version: rules.version.to_string(),
        model_recommendation: Some(model_recommendation),
    })
}

fn check_score(value: Option<f64>, field: &'static str) -> Result<(), ValidationError> {
    let value = require_finite(value, field)?;
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}
