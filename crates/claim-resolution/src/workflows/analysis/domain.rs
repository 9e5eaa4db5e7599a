use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::strategy::PmBrainAnalysis;
use super::viability::ViabilityAnalysis;
use crate::llm::ValidationError;

/// Identifier wrapper for claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn generate() -> Self {
        Self(format!("rpt_{}", Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Policy and claim metadata the classifiers reason over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub carrier_name: Option<String>,
    pub policy_number: Option<String>,
    pub claim_number: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub deductible: f64,
    pub exclusions: Option<String>,
    pub loss_type: Option<String>,
}

/// Claim facts resolved through claim → property → organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimFacts {
    pub claim_id: ClaimId,
    pub organization_id: OrganizationId,
    pub property_address: String,
    pub created_by: UserId,
    pub policy: PolicySnapshot,
}

/// Structured inspection record feeding estimate generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSheet {
    pub id: String,
    pub claim_id: ClaimId,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub unit_price: f64,
    pub total: f64,
}

/// Independently generated repair estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEstimate {
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub overhead_and_profit: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

impl GeneratedEstimate {
    /// Grand total; reports written before totals were enforced may lack it.
    pub fn total(&self) -> Result<f64, ValidationError> {
        match self.total {
            Some(total) if total.is_finite() => Ok(total),
            Some(total) => Err(ValidationError::OutOfRange {
                field: "total",
                value: total,
            }),
            None => Err(ValidationError::MissingField("total")),
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.subtotal
            .unwrap_or_else(|| self.line_items.iter().map(|item| item.total).sum())
    }
}

/// Carrier estimate as uploaded and parsed by the document pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierEstimate {
    pub id: String,
    pub claim_id: ClaimId,
    pub parsed_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCarrierEstimate {
    pub line_items: Vec<LineItem>,
    pub total: f64,
}

#[derive(Deserialize)]
struct CarrierPayload {
    #[serde(default)]
    line_items: Vec<LineItem>,
    #[serde(default)]
    total: Option<f64>,
}

impl CarrierEstimate {
    /// Typed view of the parsed data, or `None` when it is empty, garbled, or not a
    /// line-item estimate. A $0 offer on real line items is still an estimate.
    pub fn line_item_estimate(&self) -> Option<ParsedCarrierEstimate> {
        let payload: CarrierPayload =
            serde_json::from_value(self.parsed_data.clone()?).ok()?;
        if payload.line_items.is_empty() {
            return None;
        }

        let total = payload
            .total
            .unwrap_or_else(|| payload.line_items.iter().map(|item| item.total).sum());
        if !total.is_finite() || total < 0.0 {
            return None;
        }

        Some(ParsedCarrierEstimate {
            line_items: payload.line_items,
            total,
        })
    }
}

/// One line item with a non-trivial pricing gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub item: String,
    pub industry_price: f64,
    pub carrier_price: f64,
    pub delta: f64,
    pub justification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_industry: f64,
    pub total_carrier: f64,
    pub total_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ComparisonSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One generated-estimate attempt for a claim, mutated in place by each analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: ReportId,
    pub claim_id: ClaimId,
    pub scope_sheet_id: String,
    pub carrier_estimate_id: Option<String>,
    pub generated_estimate: Option<GeneratedEstimate>,
    pub comparison: Option<ComparisonResult>,
    pub viability: Option<ViabilityAnalysis>,
    pub pm_brain: Option<PmBrainAnalysis>,
    pub dispute_letter: Option<String>,
    pub status: ReportStatus,
    pub error_message: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn pending(
        claim_id: ClaimId,
        scope_sheet_id: String,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReportId::generate(),
            claim_id,
            scope_sheet_id,
            carrier_estimate_id: None,
            generated_estimate: None,
            comparison: None,
            viability: None,
            pm_brain: None,
            dispute_letter: None,
            status: ReportStatus::Pending,
            error_message: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercased, whitespace-collapsed key for matching line items across estimates.
pub(crate) fn normalize_item(description: &str) -> String {
    description
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
