//! Legal escalation: the homeowner approval state machine, legal package assembly and
//! the notification cascade that delivers it.

pub mod artifact;
pub mod domain;
pub mod notify;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use artifact::{ArtifactAssembler, ArtifactError, GeneratedArtifact};
pub use domain::{
    ApprovalAction, ApprovalRequestId, ApprovalStatus, ApprovalSummary, ApprovalToken,
    ApprovalView, ClaimSnapshot, EscalationStatus, IssueApprovalInput, IssuedApproval,
    LegalApprovalRequest, PackageReceipt, PhotoDocument, ResponseOutcome, UserContact,
};
pub use notify::{
    EmailError, EmailSender, NotificationDispatcher, NotificationKind, NotificationOutcome,
    NotificationRecord, OutboundEmail,
};
pub use repository::{EscalationRepository, NotificationLog};
pub use router::escalation_router;
pub use service::{EscalationSettings, LegalEscalationService};
pub use storage::{BlobFetcher, ObjectStorage, StorageError};
