use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClaimId, ReportId};
use crate::llm::Completion;

/// Per-1k-token rates used for billing visibility, not invoicing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenPricing {
    pub version: &'static str,
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

pub const TOKEN_PRICING: TokenPricing = TokenPricing {
    version: "pricing-v1",
    prompt_per_1k: 0.005,
    completion_per_1k: 0.015,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeteredOperation {
    EstimateGeneration,
    Comparison,
    StrategyClassification,
    ViabilityScoring,
    DisputeLetter,
}

impl MeteredOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeteredOperation::EstimateGeneration => "estimate_generation",
            MeteredOperation::Comparison => "comparison",
            MeteredOperation::StrategyClassification => "strategy_classification",
            MeteredOperation::ViabilityScoring => "viability_scoring",
            MeteredOperation::DisputeLetter => "dispute_letter",
        }
    }
}

/// One row of `api_usage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub claim_id: ClaimId,
    pub report_id: Option<ReportId>,
    pub operation: MeteredOperation,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub estimated_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn from_completion(
        claim_id: &ClaimId,
        report_id: Option<&ReportId>,
        operation: MeteredOperation,
        completion: &Completion,
        pricing: &TokenPricing,
        now: DateTime<Utc>,
    ) -> Self {
        let usage = completion.usage;
        let cost = f64::from(usage.prompt_tokens) / 1_000.0 * pricing.prompt_per_1k
            + f64::from(usage.completion_tokens) / 1_000.0 * pricing.completion_per_1k;

        Self {
            claim_id: claim_id.clone(),
            report_id: report_id.cloned(),
            operation,
            model: completion.model.clone(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            estimated_cost: (cost * 10_000.0).round() / 10_000.0,
            created_at: now,
        }
    }
}
