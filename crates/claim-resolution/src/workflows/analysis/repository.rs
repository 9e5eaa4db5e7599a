use super::domain::{
    AuditReport, CarrierEstimate, ClaimFacts, ClaimId, OrganizationId, ScopeSheet,
};
use super::metering::UsageRecord;
use crate::store::StoreError;

/// Reads and writes the analysis workflow needs from the relational store.
pub trait AnalysisRepository: Send + Sync {
    /// Claim facts, only when the claim's property belongs to `organization_id`.
    fn claim_facts(
        &self,
        claim_id: &ClaimId,
        organization_id: &OrganizationId,
    ) -> Result<Option<ClaimFacts>, StoreError>;

    /// A specific scope sheet, or the claim's most recent one when `scope_sheet_id` is `None`.
    fn scope_sheet(
        &self,
        claim_id: &ClaimId,
        scope_sheet_id: Option<&str>,
    ) -> Result<Option<ScopeSheet>, StoreError>;

    fn latest_carrier_estimate(&self, claim_id: &ClaimId)
        -> Result<Option<CarrierEstimate>, StoreError>;

    fn latest_report(&self, claim_id: &ClaimId) -> Result<Option<AuditReport>, StoreError>;

    fn latest_completed_report(&self, claim_id: &ClaimId)
        -> Result<Option<AuditReport>, StoreError>;

    fn insert_report(&self, report: &AuditReport) -> Result<(), StoreError>;

    fn update_report(&self, report: &AuditReport) -> Result<(), StoreError>;

    fn record_usage(&self, usage: &UsageRecord) -> Result<(), StoreError>;
}
