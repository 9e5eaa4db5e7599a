use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::artifact::{ArtifactAssembler, GeneratedArtifact};
use super::domain::{
    ApprovalAction, ApprovalRequestId, ApprovalStatus, ApprovalSummary, ApprovalToken,
    ApprovalView, ClaimSnapshot, EscalationStatus, IssueApprovalInput, IssuedApproval,
    LegalApprovalRequest, PackageReceipt, ResponseOutcome,
};
use super::notify::{NotificationDispatcher, NotificationKind, OutboundEmail};
use super::repository::EscalationRepository;
use crate::clock::Clock;
use crate::config::EscalationConfig;
use crate::error::ResolutionError;
use crate::workflows::analysis::domain::{AuditReport, ClaimId};
use crate::workflows::identity::Caller;

/// Link and expiry settings for issued requests.
#[derive(Debug, Clone)]
pub struct EscalationSettings {
    pub public_base_url: String,
    pub approval_ttl: chrono::Duration,
}

impl EscalationSettings {
    pub fn approval_url(&self, token: &ApprovalToken) -> String {
        format!(
            "{}/api/v1/legal-approval/{}",
            self.public_base_url.trim_end_matches('/'),
            token.0
        )
    }
}

impl From<&EscalationConfig> for EscalationSettings {
    fn from(config: &EscalationConfig) -> Self {
        Self {
            public_base_url: config.public_base_url.clone(),
            approval_ttl: chrono::Duration::days(config.approval_ttl_days),
        }
    }
}

/// Homeowner approval state machine plus legal-package dispatch.
pub struct LegalEscalationService<R> {
    repository: Arc<R>,
    assembler: Arc<ArtifactAssembler>,
    notifier: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    settings: EscalationSettings,
}

impl<R> LegalEscalationService<R>
where
    R: EscalationRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        assembler: Arc<ArtifactAssembler>,
        notifier: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            repository,
            assembler,
            notifier,
            clock,
            settings,
        }
    }

    pub fn notifier(&self) -> &Arc<NotificationDispatcher> {
        &self.notifier
    }

    /// Creates a pending request and invites the homeowner on a detached task.
    pub fn issue(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
        input: IssueApprovalInput,
    ) -> Result<IssuedApproval, ResolutionError> {
        let input = input.validate()?;
        let snapshot = self.owned_snapshot(caller, claim_id)?;
        self.completed_report(claim_id)?;

        let now = self.clock.now();
        let request = LegalApprovalRequest {
            id: ApprovalRequestId::generate(),
            claim_id: claim_id.clone(),
            token: ApprovalToken::generate(),
            homeowner_name: input.homeowner_name.clone(),
            homeowner_email: input.homeowner_email.clone(),
            status: ApprovalStatus::Pending,
            expires_at: now + self.settings.approval_ttl,
            responded_at: None,
            created_at: now,
        };
        self.repository.issue_request(&request, &input)?;

        let approval_url = self.settings.approval_url(&request.token);
        info!(
            claim_id = %claim_id.0,
            request_id = %request.id.0,
            expires_at = %request.expires_at,
            "legal approval requested"
        );

        self.notifier.send_detached(
            NotificationKind::HomeownerInvite,
            claim_id,
            homeowner_invite(&snapshot, &input, &request, &approval_url),
        );

        Ok(IssuedApproval {
            request: request.summary(),
            approval_url,
        })
    }

    /// Resolves a token for the homeowner, expiring it first if its window has passed.
    pub fn resolve(&self, token: &ApprovalToken) -> Result<ApprovalView, ResolutionError> {
        let request = self.current_request(token)?;
        let snapshot = self
            .repository
            .claim_snapshot(&request.claim_id, None)?
            .ok_or_else(|| ResolutionError::NotFound(format!("claim {}", request.claim_id.0)))?;

        Ok(ApprovalView {
            request_id: request.id.clone(),
            status: request.status,
            homeowner_name: request.homeowner_name.clone(),
            property_address: snapshot.property_address.clone(),
            claim_number: snapshot.display_number().to_string(),
            legal_partner_name: snapshot.legal_partner_name.clone(),
            expires_at: request.expires_at,
            responded_at: request.responded_at,
        })
    }

    /// Applies the homeowner's `approve` or `decline`.
    ///
    /// Approval assembles the package before the state transition commits, so an assembly
    /// failure leaves both the request and the claim untouched. Once committed, a failed
    /// legal-partner send is reported as [`ResolutionError::Delivery`].
    pub async fn respond(
        &self,
        token: &ApprovalToken,
        action: &str,
    ) -> Result<ResponseOutcome, ResolutionError> {
        let action: ApprovalAction = action.parse()?;
        let request = self.current_request(token)?;
        ensure_actionable(&request)?;

        match action {
            ApprovalAction::Decline => self.decline(&request),
            ApprovalAction::Approve => self.approve(&request).await,
        }
    }

    /// Re-sends the package for an approved request without touching its state.
    pub async fn resend_package(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
        request_id: &ApprovalRequestId,
    ) -> Result<PackageReceipt, ResolutionError> {
        let snapshot = self.owned_snapshot(caller, claim_id)?;
        let request = self
            .repository
            .request_for_claim(claim_id, request_id)?
            .ok_or_else(|| ResolutionError::NotFound(format!("approval request {}", request_id.0)))?;
        if request.status != ApprovalStatus::Approved {
            return Err(ResolutionError::PreconditionFailed(format!(
                "approval request is {}, only approved requests can be re-sent",
                request.status.as_str()
            )));
        }

        let partner_email = partner_email(&snapshot)?;
        let artifact = self.assemble(&snapshot).await?;
        let receipt = receipt(&artifact, &partner_email);
        self.notifier
            .send_now(
                NotificationKind::LegalPackage,
                claim_id,
                legal_package(&snapshot, artifact, &partner_email),
            )
            .await
            .map_err(ResolutionError::Delivery)?;

        info!(claim_id = %claim_id.0, request_id = %request_id.0, "legal package re-sent");
        Ok(receipt)
    }

    /// Every request issued for the claim, newest first.
    pub fn history(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
    ) -> Result<Vec<ApprovalSummary>, ResolutionError> {
        self.owned_snapshot(caller, claim_id)?;
        let now = self.clock.now();
        let mut summaries = Vec::new();
        for mut request in self.repository.approval_history(claim_id)? {
            self.observe_expiry(&mut request, now)?;
            summaries.push(request.summary());
        }
        Ok(summaries)
    }

    fn decline(&self, request: &LegalApprovalRequest) -> Result<ResponseOutcome, ResolutionError> {
        let now = self.clock.now();
        if !self.repository.decline_request(&request.id, now)? {
            return Err(lost_transition(request, now));
        }

        info!(
            claim_id = %request.claim_id.0,
            request_id = %request.id.0,
            "homeowner declined legal escalation"
        );
        Ok(ResponseOutcome {
            request_id: request.id.clone(),
            status: ApprovalStatus::Declined,
            escalation_status: EscalationStatus::Declined,
            package: None,
        })
    }

    async fn approve(&self, request: &LegalApprovalRequest) -> Result<ResponseOutcome, ResolutionError> {
        let claim_id = &request.claim_id;
        let snapshot = self
            .repository
            .claim_snapshot(claim_id, None)?
            .ok_or_else(|| ResolutionError::NotFound(format!("claim {}", claim_id.0)))?;
        let partner_email = partner_email(&snapshot)?;
        let artifact = self.assemble(&snapshot).await?;

        let now = self.clock.now();
        if !self.repository.approve_request(&request.id, now)? {
            return Err(lost_transition(request, now));
        }
        info!(
            claim_id = %claim_id.0,
            request_id = %request.id.0,
            photos = artifact.photo_count,
            "homeowner approved legal escalation"
        );

        let receipt = receipt(&artifact, &partner_email);
        self.notifier
            .send_now(
                NotificationKind::LegalPackage,
                claim_id,
                legal_package(&snapshot, artifact, &partner_email),
            )
            .await
            .map_err(ResolutionError::Delivery)?;

        self.confirm_to_owner(&snapshot, &receipt);

        Ok(ResponseOutcome {
            request_id: request.id.clone(),
            status: ApprovalStatus::Approved,
            escalation_status: EscalationStatus::Approved,
            package: Some(receipt),
        })
    }

    async fn assemble(&self, snapshot: &ClaimSnapshot) -> Result<GeneratedArtifact, ResolutionError> {
        let report = self.completed_report(&snapshot.claim_id)?;
        let photos = self.repository.contractor_photos(&snapshot.claim_id)?;
        let artifact = self
            .assembler
            .assemble(snapshot, &report, &photos, self.clock.now())
            .await?;
        Ok(artifact)
    }

    fn confirm_to_owner(&self, snapshot: &ClaimSnapshot, receipt: &PackageReceipt) {
        let recipient = match self.repository.user_contact(&snapshot.created_by) {
            Ok(Some(contact)) => contact.email,
            Ok(None) => {
                warn!(
                    claim_id = %snapshot.claim_id.0,
                    user_id = %snapshot.created_by.0,
                    "claim creator not found, skipping package confirmation"
                );
                return;
            }
            Err(err) => {
                warn!(claim_id = %snapshot.claim_id.0, error = %err, "claim creator lookup failed");
                return;
            }
        };

        self.notifier.send_detached(
            NotificationKind::PmConfirmation,
            &snapshot.claim_id,
            OutboundEmail {
                to: recipient,
                subject: format!("Legal package sent for claim {}", snapshot.display_number()),
                body: format!(
                    "The homeowner approved legal escalation for {}.\n\n\
                     {} ({} photos, {} bytes) was sent to {}.\n",
                    snapshot.property_address,
                    receipt.file_name,
                    receipt.photo_count,
                    receipt.size_bytes,
                    receipt.recipient
                ),
                attachment: None,
            },
        );
    }

    fn owned_snapshot(&self, caller: &Caller, claim_id: &ClaimId) -> Result<ClaimSnapshot, ResolutionError> {
        self.repository
            .claim_snapshot(claim_id, Some(&caller.organization_id))?
            .ok_or_else(|| ResolutionError::NotFound(format!("claim {}", claim_id.0)))
    }

    fn completed_report(&self, claim_id: &ClaimId) -> Result<AuditReport, ResolutionError> {
        self.repository.latest_completed_report(claim_id)?.ok_or_else(|| {
            ResolutionError::PreconditionFailed(
                "the claim has no completed audit report to escalate".to_string(),
            )
        })
    }

    /// Token lookup with lazy expiry applied.
    fn current_request(&self, token: &ApprovalToken) -> Result<LegalApprovalRequest, ResolutionError> {
        let mut request = self
            .repository
            .request_by_token(token)?
            .ok_or_else(|| ResolutionError::NotFound("approval request".to_string()))?;
        self.observe_expiry(&mut request, self.clock.now())?;
        Ok(request)
    }

    fn observe_expiry(
        &self,
        request: &mut LegalApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<(), ResolutionError> {
        if request.status.is_terminal() || !request.is_expired_at(now) {
            return Ok(());
        }

        if self.repository.expire_request(&request.id, now)? {
            info!(
                claim_id = %request.claim_id.0,
                request_id = %request.id.0,
                "legal approval request expired"
            );
            request.status = ApprovalStatus::Expired;
        } else if let Some(latest) = self
            .repository
            .request_for_claim(&request.claim_id, &request.id)?
        {
            // Another caller moved it first.
            *request = latest;
        }
        Ok(())
    }
}

fn ensure_actionable(request: &LegalApprovalRequest) -> Result<(), ResolutionError> {
    if !request.status.is_terminal() {
        return Ok(());
    }
    let message = match request.status {
        ApprovalStatus::Expired => "approval request has expired".to_string(),
        status => format!(
            "approval request is no longer pending (status: {})",
            status.as_str()
        ),
    };
    Err(ResolutionError::PreconditionFailed(message))
}

fn lost_transition(request: &LegalApprovalRequest, now: DateTime<Utc>) -> ResolutionError {
    if request.is_expired_at(now) {
        ResolutionError::PreconditionFailed("approval request has expired".to_string())
    } else {
        ResolutionError::PreconditionFailed("approval request is no longer pending".to_string())
    }
}

fn partner_email(snapshot: &ClaimSnapshot) -> Result<String, ResolutionError> {
    snapshot.legal_partner_email.clone().ok_or_else(|| {
        ResolutionError::PreconditionFailed("the claim has no legal partner on record".to_string())
    })
}

fn receipt(artifact: &GeneratedArtifact, recipient: &str) -> PackageReceipt {
    PackageReceipt {
        file_name: artifact.file_name.clone(),
        size_bytes: artifact.bytes.len(),
        photo_count: artifact.photo_count,
        recipient: recipient.to_string(),
    }
}

fn homeowner_invite(
    snapshot: &ClaimSnapshot,
    input: &IssueApprovalInput,
    request: &LegalApprovalRequest,
    approval_url: &str,
) -> OutboundEmail {
    OutboundEmail {
        to: input.homeowner_email.clone(),
        subject: format!("Your approval is needed for claim {}", snapshot.display_number()),
        body: format!(
            "Hello {},\n\n\
             Your property manager recommends referring the insurance claim for {} to {} \
             for legal review. Nothing is shared until you approve.\n\n\
             Review and respond here: {}\n\n\
             This link expires on {}.\n",
            input.homeowner_name,
            snapshot.property_address,
            input.legal_partner_name,
            approval_url,
            request.expires_at.format("%B %-d, %Y")
        ),
        attachment: None,
    }
}

fn legal_package(snapshot: &ClaimSnapshot, artifact: GeneratedArtifact, recipient: &str) -> OutboundEmail {
    let partner = snapshot.legal_partner_name.as_deref().unwrap_or("Counsel");
    OutboundEmail {
        to: recipient.to_string(),
        subject: format!("Claim referral: {} ({})", snapshot.property_address, snapshot.display_number()),
        body: format!(
            "{partner},\n\n\
             The homeowner has approved referral of this claim for legal review.\n\n\
             Property: {}\n\
             Claim number: {}\n\
             Carrier: {}\n\
             Loss type: {}\n\n\
             The attached archive contains the discrepancy report and {} contractor photos.\n",
            snapshot.property_address,
            snapshot.display_number(),
            snapshot.carrier_name.as_deref().unwrap_or("unknown"),
            snapshot.loss_type.as_deref().unwrap_or("unspecified"),
            artifact.photo_count
        ),
        attachment: Some(artifact.into_attachment()),
    }
}
