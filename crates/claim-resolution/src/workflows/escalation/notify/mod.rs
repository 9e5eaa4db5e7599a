//! Notification cascade.
//!
//! Every send is bounded by a timeout and its outcome is written to the notification log.
//! Detached sends run on spawned tasks whose handles are kept so shutdown (and tests) can
//! wait for them with [`NotificationDispatcher::drain`]; the triggering operation never
//! observes their result.

mod email;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use email::{Attachment, EmailError, EmailSender, HttpEmailSender, LogEmailSender, OutboundEmail};

use super::repository::NotificationLog;
use crate::clock::Clock;
use crate::workflows::analysis::domain::ClaimId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    HomeownerInvite,
    LegalPackage,
    PmConfirmation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::HomeownerInvite => "homeowner_invite",
            NotificationKind::LegalPackage => "legal_package",
            NotificationKind::PmConfirmation => "pm_confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Failed,
    TimedOut,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Sent => "sent",
            NotificationOutcome::Failed => "failed",
            NotificationOutcome::TimedOut => "timed_out",
        }
    }
}

/// One row of `notification_log`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub claim_id: ClaimId,
    pub kind: NotificationKind,
    pub recipient: String,
    pub outcome: NotificationOutcome,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NotificationDispatcher {
    sender: Arc<dyn EmailSender>,
    log: Arc<dyn NotificationLog>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        log: Arc<dyn NotificationLog>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            sender,
            log,
            clock,
            timeout,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Sends and waits, returning the delivery error to the caller.
    pub async fn send_now(
        &self,
        kind: NotificationKind,
        claim_id: &ClaimId,
        email: OutboundEmail,
    ) -> Result<(), EmailError> {
        deliver(
            self.sender.clone(),
            self.log.clone(),
            self.clock.clone(),
            self.timeout,
            kind,
            claim_id.clone(),
            email,
        )
        .await
    }

    /// Sends on a detached task; failures are logged and recorded, never returned.
    pub fn send_detached(&self, kind: NotificationKind, claim_id: &ClaimId, email: OutboundEmail) {
        let sender = self.sender.clone();
        let log = self.log.clone();
        let clock = self.clock.clone();
        let timeout = self.timeout;
        let claim_id = claim_id.clone();
        let task = tokio::spawn(async move {
            // Outcome is recorded inside `deliver`.
            let _ = deliver(sender, log, clock, timeout, kind, claim_id, email).await;
        });

        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.retain(|task| !task.is_finished());
                tasks.push(task);
            }
            Err(_) => warn!(kind = kind.as_str(), "notification task registry poisoned"),
        }
    }

    /// Waits for every detached send started so far.
    pub async fn drain(&self) {
        let pending: Vec<_> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => return,
        };
        for task in pending {
            if let Err(err) = task.await {
                warn!(error = %err, "notification task aborted");
            }
        }
    }
}

async fn deliver(
    sender: Arc<dyn EmailSender>,
    log: Arc<dyn NotificationLog>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    kind: NotificationKind,
    claim_id: ClaimId,
    email: OutboundEmail,
) -> Result<(), EmailError> {
    let recipient = email.to.clone();
    let result = match tokio::time::timeout(timeout, sender.send(email)).await {
        Ok(result) => result,
        Err(_) => Err(EmailError::TimedOut(timeout)),
    };

    let (outcome, error) = match &result {
        Ok(()) => (NotificationOutcome::Sent, None),
        Err(err @ EmailError::TimedOut(_)) => (NotificationOutcome::TimedOut, Some(err.to_string())),
        Err(err) => (NotificationOutcome::Failed, Some(err.to_string())),
    };

    match &error {
        None => info!(claim_id = %claim_id.0, kind = kind.as_str(), "notification sent"),
        Some(error) => warn!(
            claim_id = %claim_id.0,
            kind = kind.as_str(),
            outcome = outcome.as_str(),
            error = %error,
            "notification not delivered"
        ),
    }

    let record = NotificationRecord {
        claim_id,
        kind,
        recipient,
        outcome,
        error,
        created_at: clock.now(),
    };
    if let Err(err) = log.record_notification(&record) {
        warn!(error = %err, kind = kind.as_str(), "failed to record notification outcome");
    }

    result
}
