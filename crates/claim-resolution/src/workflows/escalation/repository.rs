use chrono::{DateTime, Utc};

use super::domain::{
    ApprovalRequestId, ApprovalToken, ClaimSnapshot, IssueApprovalInput, LegalApprovalRequest,
    PhotoDocument, UserContact,
};
use super::notify::NotificationRecord;
use crate::store::StoreError;
use crate::workflows::analysis::domain::{ClaimId, OrganizationId, UserId};
use crate::workflows::analysis::repository::AnalysisRepository;

/// Store operations behind the approval state machine.
///
/// Every transition is a compare-and-swap on `status = 'pending'`; the boolean results
/// report whether this caller won the transition.
pub trait EscalationRepository: AnalysisRepository {
    /// Claim snapshot, scoped to `organization_id` when one is given.
    fn claim_snapshot(
        &self,
        claim_id: &ClaimId,
        organization_id: Option<&OrganizationId>,
    ) -> Result<Option<ClaimSnapshot>, StoreError>;

    /// Confirmed contractor photos in upload order.
    fn contractor_photos(&self, claim_id: &ClaimId) -> Result<Vec<PhotoDocument>, StoreError>;

    fn user_contact(&self, user_id: &UserId) -> Result<Option<UserContact>, StoreError>;

    /// Writes the request and the denormalised claim escalation fields atomically.
    fn issue_request(
        &self,
        request: &LegalApprovalRequest,
        contacts: &IssueApprovalInput,
    ) -> Result<(), StoreError>;

    fn request_by_token(
        &self,
        token: &ApprovalToken,
    ) -> Result<Option<LegalApprovalRequest>, StoreError>;

    fn request_for_claim(
        &self,
        claim_id: &ClaimId,
        request_id: &ApprovalRequestId,
    ) -> Result<Option<LegalApprovalRequest>, StoreError>;

    /// `pending → expired` when the expiry has passed at `now`.
    fn expire_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// `pending → declined` and claim escalation status `declined`.
    fn decline_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// `pending → approved` (only while unexpired) and claim escalation status `approved`,
    /// in one transaction.
    fn approve_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Every request for the claim, newest first.
    fn approval_history(&self, claim_id: &ClaimId)
        -> Result<Vec<LegalApprovalRequest>, StoreError>;
}

/// Audit trail for notification outcomes.
pub trait NotificationLog: Send + Sync {
    fn record_notification(&self, record: &NotificationRecord) -> Result<(), StoreError>;
}
