//! Supplement-request (dispute) letter drafting.
//!
//! Only a report whose cached classification is exactly `DISPUTE_OFFER` may produce a
//! letter; every other status has a different next step.

use serde_json::json;

use super::domain::{AuditReport, ClaimFacts};
use super::strategy::{PmBrainAnalysis, StrategyStatus};
use crate::llm::{CompletionRequest, ValidationError};

pub const DISPUTE_TEMPERATURE: f32 = 0.3;
const DISPUTE_MAX_TOKENS: u32 = 3_000;

/// Reason a report cannot produce a dispute letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeGate {
    Unclassified,
    WrongStatus(StrategyStatus),
}

impl DisputeGate {
    pub fn message(&self) -> String {
        match self {
            DisputeGate::Unclassified => {
                "claim has not been classified; run the strategy classifier first".to_string()
            }
            DisputeGate::WrongStatus(status) => format!(
                "dispute letters require status DISPUTE_OFFER, current status is {}",
                status.as_str()
            ),
        }
    }
}

pub fn eligible_analysis(report: &AuditReport) -> Result<&PmBrainAnalysis, DisputeGate> {
    match report.pm_brain.as_ref() {
        None => Err(DisputeGate::Unclassified),
        Some(analysis) if analysis.status == StrategyStatus::DisputeOffer => Ok(analysis),
        Some(analysis) => Err(DisputeGate::WrongStatus(analysis.status)),
    }
}

pub fn build_request(
    facts: &ClaimFacts,
    analysis: &PmBrainAnalysis,
    report: &AuditReport,
) -> CompletionRequest {
    let context = json!({
        "property_address": facts.property_address,
        "carrier_name": facts.policy.carrier_name,
        "policy_number": facts.policy.policy_number,
        "claim_number": facts.policy.claim_number,
        "incident_date": facts.policy.incident_date,
        "loss_type": facts.policy.loss_type,
        "contractor_total": analysis.contractor_total,
        "carrier_total": analysis.carrier_total,
        "delta": analysis.delta,
        "delta_drivers": analysis.delta_drivers,
        "discrepancies": report.comparison.as_ref().map(|comparison| &comparison.discrepancies),
    });

    let prompt = format!(
        "Draft a professional supplement request letter to the carrier's adjuster disputing the \
         settlement offer on this claim. Cite each delta driver with both prices and the reason, \
         request re-inspection or a revised estimate, and keep a firm but cooperative tone. \
         Return only the letter text.\n\nCLAIM CONTEXT:\n{context}"
    );

    CompletionRequest::new(SYSTEM_PROMPT, prompt)
        .temperature(DISPUTE_TEMPERATURE)
        .max_tokens(DISPUTE_MAX_TOKENS)
}

const SYSTEM_PROMPT: &str = "You write supplement requests to property-insurance carriers on behalf \
of property managers. Write plain text only, with no markdown.";

pub fn interpret(text: &str) -> Result<String, ValidationError> {
    let letter = text
        .trim()
        .trim_start_matches("```text")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if letter.is_empty() {
        Err(ValidationError::Empty("dispute_letter"))
    } else {
        Ok(letter.to_string())
    }
}
