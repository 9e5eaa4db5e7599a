use chrono::{DateTime, NaiveDate, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ResolutionError;
use crate::workflows::analysis::domain::{ClaimId, UserId};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRequestId(pub String);

impl ApprovalRequestId {
    pub fn generate() -> Self {
        Self(format!("lar_{}", Uuid::new_v4().simple()))
    }
}

/// Single-use, URL-embeddable homeowner token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalToken(pub String);

impl ApprovalToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

impl std::fmt::Debug for ApprovalToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApprovalToken(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Declined,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Declined => "declined",
            ApprovalStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "declined" => Some(Self::Declined),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Decline,
}

impl std::str::FromStr for ApprovalAction {
    type Err = ResolutionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "approve" => Ok(Self::Approve),
            "decline" => Ok(Self::Decline),
            other => Err(ResolutionError::InvalidArgument(format!(
                "action must be 'approve' or 'decline', got '{other}'"
            ))),
        }
    }
}

/// Claim-level escalation column, denormalised for list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    PendingApproval,
    Approved,
    Declined,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::PendingApproval => "pending_approval",
            EscalationStatus::Approved => "approved",
            EscalationStatus::Declined => "declined",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalApprovalRequest {
    pub id: ApprovalRequestId,
    pub claim_id: ClaimId,
    pub token: ApprovalToken,
    pub homeowner_name: String,
    pub homeowner_email: String,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LegalApprovalRequest {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn summary(&self) -> ApprovalSummary {
        ApprovalSummary {
            id: self.id.clone(),
            claim_id: self.claim_id.clone(),
            homeowner_name: self.homeowner_name.clone(),
            homeowner_email: self.homeowner_email.clone(),
            status: self.status,
            expires_at: self.expires_at,
            responded_at: self.responded_at,
            created_at: self.created_at,
        }
    }
}

/// Owner-facing view of a request; never includes the token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalSummary {
    pub id: ApprovalRequestId,
    pub claim_id: ClaimId,
    pub homeowner_name: String,
    pub homeowner_email: String,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Contact details a property manager supplies when escalating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueApprovalInput {
    pub legal_partner_name: String,
    pub legal_partner_email: String,
    pub homeowner_name: String,
    pub homeowner_email: String,
}

impl IssueApprovalInput {
    pub fn validate(self) -> Result<Self, ResolutionError> {
        let trimmed = Self {
            legal_partner_name: self.legal_partner_name.trim().to_string(),
            legal_partner_email: self.legal_partner_email.trim().to_string(),
            homeowner_name: self.homeowner_name.trim().to_string(),
            homeowner_email: self.homeowner_email.trim().to_string(),
        };

        for (field, value) in [
            ("legal_partner_name", &trimmed.legal_partner_name),
            ("homeowner_name", &trimmed.homeowner_name),
        ] {
            if value.is_empty() {
                return Err(ResolutionError::InvalidArgument(format!("{field} is required")));
            }
        }
        for (field, value) in [
            ("legal_partner_email", &trimmed.legal_partner_email),
            ("homeowner_email", &trimmed.homeowner_email),
        ] {
            if !looks_like_email(value) {
                return Err(ResolutionError::InvalidArgument(format!(
                    "{field} is not a valid email address"
                )));
            }
        }
        Ok(trimmed)
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Claim and property facts rendered into the legal package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSnapshot {
    pub claim_id: ClaimId,
    pub claim_number: Option<String>,
    pub property_address: String,
    pub loss_type: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub adjuster_name: Option<String>,
    pub carrier_name: Option<String>,
    pub policy_number: Option<String>,
    pub created_by: UserId,
    pub escalation_status: Option<EscalationStatus>,
    pub legal_partner_name: Option<String>,
    pub legal_partner_email: Option<String>,
    /// Homeowner address recorded when escalation was requested.
    pub owner_email: Option<String>,
}

impl ClaimSnapshot {
    pub fn display_number(&self) -> &str {
        self.claim_number.as_deref().unwrap_or(&self.claim_id.0)
    }
}

/// Confirmed contractor photo awaiting download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoDocument {
    pub id: String,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContact {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Homeowner-facing view resolved from a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalView {
    pub request_id: ApprovalRequestId,
    pub status: ApprovalStatus,
    pub homeowner_name: String,
    pub property_address: String,
    pub claim_number: String,
    pub legal_partner_name: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Legal package delivery details returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageReceipt {
    pub file_name: String,
    pub size_bytes: usize,
    pub photo_count: usize,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseOutcome {
    pub request_id: ApprovalRequestId,
    pub status: ApprovalStatus,
    pub escalation_status: EscalationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageReceipt>,
}

/// Result of issuing a request; the link is only ever handed to the homeowner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedApproval {
    pub request: ApprovalSummary,
    #[serde(skip)]
    pub approval_url: String,
}
