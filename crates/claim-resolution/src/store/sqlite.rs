use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::schema::{CONFIRMED, PHOTO_CATEGORY, SCHEMA};
use super::StoreError;
use crate::workflows::analysis::domain::{
    AuditReport, CarrierEstimate, ClaimFacts, ClaimId, OrganizationId, PolicySnapshot, ReportId,
    ReportStatus, ScopeSheet, UserId,
};
use crate::workflows::analysis::envelope;
use crate::workflows::analysis::metering::UsageRecord;
use crate::workflows::analysis::repository::AnalysisRepository;
use crate::workflows::escalation::domain::{
    ApprovalRequestId, ApprovalStatus, ApprovalToken, ClaimSnapshot, EscalationStatus,
    IssueApprovalInput, LegalApprovalRequest, PhotoDocument, UserContact,
};
use crate::workflows::escalation::notify::NotificationRecord;
use crate::workflows::escalation::repository::{EscalationRepository, NotificationLog};

/// Single-connection SQLite store. Callers are serialised by the mutex, and multi-table
/// writes run inside one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema. `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::initialise(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialise(Connection::open_in_memory()?)
    }

    fn initialise(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cheap liveness probe for readiness checks.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.lock()?.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

pub(super) fn encode_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn decode_time(
    table: &'static str,
    column: &'static str,
    raw: &str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            table,
            column,
            value: raw.to_string(),
        })
}

fn decode_optional_time(
    table: &'static str,
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.map(|raw| decode_time(table, column, &raw)).transpose()
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>, StoreError> {
    Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
}

fn encode_json<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>, StoreError> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

const REPORT_COLUMNS: &str = "id, claim_id, scope_sheet_id, carrier_estimate_id, generated_estimate, \
     comparison_data, viability_analysis, pm_brain_analysis, dispute_letter, status, error_message, \
     created_by, created_at, updated_at";

struct ReportRow {
    id: String,
    claim_id: String,
    scope_sheet_id: String,
    carrier_estimate_id: Option<String>,
    generated_estimate: Option<String>,
    comparison_data: Option<String>,
    viability_analysis: Option<String>,
    pm_brain_analysis: Option<String>,
    dispute_letter: Option<String>,
    status: String,
    error_message: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            claim_id: row.get(1)?,
            scope_sheet_id: row.get(2)?,
            carrier_estimate_id: row.get(3)?,
            generated_estimate: row.get(4)?,
            comparison_data: row.get(5)?,
            viability_analysis: row.get(6)?,
            pm_brain_analysis: row.get(7)?,
            dispute_letter: row.get(8)?,
            status: row.get(9)?,
            error_message: row.get(10)?,
            created_by: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_report(self) -> Result<AuditReport, StoreError> {
        let status = ReportStatus::parse(&self.status).ok_or_else(|| StoreError::Corrupt {
            table: "audit_reports",
            column: "status",
            value: self.status.clone(),
        })?;

        Ok(AuditReport {
            id: ReportId(self.id),
            claim_id: ClaimId(self.claim_id),
            scope_sheet_id: self.scope_sheet_id,
            carrier_estimate_id: self.carrier_estimate_id,
            generated_estimate: decode_json(self.generated_estimate)?,
            comparison: decode_json(self.comparison_data)?,
            viability: self
                .viability_analysis
                .map(|raw| envelope::open(&raw))
                .transpose()?,
            pm_brain: self
                .pm_brain_analysis
                .map(|raw| envelope::open(&raw))
                .transpose()?,
            dispute_letter: self.dispute_letter,
            status,
            error_message: self.error_message,
            created_by: UserId(self.created_by),
            created_at: decode_time("audit_reports", "created_at", &self.created_at)?,
            updated_at: decode_time("audit_reports", "updated_at", &self.updated_at)?,
        })
    }
}

/// Serialised analysis columns shared by insert and update.
struct ReportBlobs {
    generated_estimate: Option<String>,
    comparison_data: Option<String>,
    viability_analysis: Option<String>,
    pm_brain_analysis: Option<String>,
}

impl ReportBlobs {
    fn encode(report: &AuditReport) -> Result<Self, StoreError> {
        Ok(Self {
            generated_estimate: encode_json(report.generated_estimate.as_ref())?,
            comparison_data: encode_json(report.comparison.as_ref())?,
            viability_analysis: report.viability.as_ref().map(envelope::seal).transpose()?,
            pm_brain_analysis: report.pm_brain.as_ref().map(envelope::seal).transpose()?,
        })
    }
}

const REQUEST_COLUMNS: &str = "id, claim_id, token, homeowner_name, homeowner_email, status, \
     expires_at, responded_at, created_at";

struct RequestRow {
    id: String,
    claim_id: String,
    token: String,
    homeowner_name: String,
    homeowner_email: String,
    status: String,
    expires_at: String,
    responded_at: Option<String>,
    created_at: String,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            claim_id: row.get(1)?,
            token: row.get(2)?,
            homeowner_name: row.get(3)?,
            homeowner_email: row.get(4)?,
            status: row.get(5)?,
            expires_at: row.get(6)?,
            responded_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_request(self) -> Result<LegalApprovalRequest, StoreError> {
        const TABLE: &str = "legal_approval_requests";
        let status = ApprovalStatus::parse(&self.status).ok_or_else(|| StoreError::Corrupt {
            table: TABLE,
            column: "status",
            value: self.status.clone(),
        })?;

        Ok(LegalApprovalRequest {
            id: ApprovalRequestId(self.id),
            claim_id: ClaimId(self.claim_id),
            token: ApprovalToken(self.token),
            homeowner_name: self.homeowner_name,
            homeowner_email: self.homeowner_email,
            status,
            expires_at: decode_time(TABLE, "expires_at", &self.expires_at)?,
            responded_at: decode_optional_time(TABLE, "responded_at", self.responded_at)?,
            created_at: decode_time(TABLE, "created_at", &self.created_at)?,
        })
    }
}

fn collect_requests(rows: Vec<RequestRow>) -> Result<Vec<LegalApprovalRequest>, StoreError> {
    rows.into_iter().map(RequestRow::into_request).collect()
}

impl AnalysisRepository for SqliteStore {
    fn claim_facts(
        &self,
        claim_id: &ClaimId,
        organization_id: &OrganizationId,
    ) -> Result<Option<ClaimFacts>, StoreError> {
        let conn = self.lock()?;
        let facts = conn
            .query_row(
                "SELECT c.id, p.organization_id, p.address, c.created_by, pol.carrier_name, \
                        pol.policy_number, c.claim_number, c.incident_date, \
                        COALESCE(pol.deductible, 0), pol.exclusions, c.loss_type \
                 FROM claims c \
                 JOIN properties p ON p.id = c.property_id \
                 LEFT JOIN policies pol ON pol.id = c.policy_id \
                 WHERE c.id = ?1 AND p.organization_id = ?2",
                params![claim_id.0, organization_id.0],
                |row| {
                    Ok(ClaimFacts {
                        claim_id: ClaimId(row.get(0)?),
                        organization_id: OrganizationId(row.get(1)?),
                        property_address: row.get(2)?,
                        created_by: UserId(row.get(3)?),
                        policy: PolicySnapshot {
                            carrier_name: row.get(4)?,
                            policy_number: row.get(5)?,
                            claim_number: row.get(6)?,
                            incident_date: row.get::<_, Option<NaiveDate>>(7)?,
                            deductible: row.get(8)?,
                            exclusions: row.get(9)?,
                            loss_type: row.get(10)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(facts)
    }

    fn scope_sheet(
        &self,
        claim_id: &ClaimId,
        scope_sheet_id: Option<&str>,
    ) -> Result<Option<ScopeSheet>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, claim_id, data FROM scope_sheets \
                 WHERE claim_id = ?1 AND (?2 IS NULL OR id = ?2) \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![claim_id.0, scope_sheet_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        row.map(|(id, claim_id, data)| {
            Ok(ScopeSheet {
                id,
                claim_id: ClaimId(claim_id),
                data: serde_json::from_str(&data)?,
            })
        })
        .transpose()
    }

    fn latest_carrier_estimate(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Option<CarrierEstimate>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, claim_id, parsed_data, created_at FROM carrier_estimates \
                 WHERE claim_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![claim_id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, claim_id, parsed_data, created_at)| {
            Ok(CarrierEstimate {
                id,
                claim_id: ClaimId(claim_id),
                // Garbled parser output is kept as a string so classification can report NEED_DOCS.
                parsed_data: parsed_data.map(|raw| {
                    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
                }),
                created_at: decode_time("carrier_estimates", "created_at", &created_at)?,
            })
        })
        .transpose()
    }

    fn latest_report(&self, claim_id: &ClaimId) -> Result<Option<AuditReport>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM audit_reports WHERE claim_id = ?1 \
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![claim_id.0],
                ReportRow::from_row,
            )
            .optional()?;
        row.map(ReportRow::into_report).transpose()
    }

    fn latest_completed_report(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Option<AuditReport>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM audit_reports \
                     WHERE claim_id = ?1 AND status = ?2 \
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![claim_id.0, ReportStatus::Completed.as_str()],
                ReportRow::from_row,
            )
            .optional()?;
        row.map(ReportRow::into_report).transpose()
    }

    fn insert_report(&self, report: &AuditReport) -> Result<(), StoreError> {
        let blobs = ReportBlobs::encode(report)?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO audit_reports ({REPORT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                report.id.0,
                report.claim_id.0,
                report.scope_sheet_id,
                report.carrier_estimate_id,
                blobs.generated_estimate,
                blobs.comparison_data,
                blobs.viability_analysis,
                blobs.pm_brain_analysis,
                report.dispute_letter,
                report.status.as_str(),
                report.error_message,
                report.created_by.0,
                encode_time(report.created_at),
                encode_time(report.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_report(&self, report: &AuditReport) -> Result<(), StoreError> {
        let blobs = ReportBlobs::encode(report)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE audit_reports SET carrier_estimate_id = ?2, generated_estimate = ?3, \
                 comparison_data = ?4, viability_analysis = ?5, pm_brain_analysis = ?6, \
                 dispute_letter = ?7, status = ?8, error_message = ?9, updated_at = ?10 \
             WHERE id = ?1",
            params![
                report.id.0,
                report.carrier_estimate_id,
                blobs.generated_estimate,
                blobs.comparison_data,
                blobs.viability_analysis,
                blobs.pm_brain_analysis,
                report.dispute_letter,
                report.status.as_str(),
                report.error_message,
                encode_time(report.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingRow {
                table: "audit_reports",
                id: report.id.0.clone(),
            });
        }
        Ok(())
    }

    fn record_usage(&self, usage: &UsageRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO api_usage (claim_id, report_id, operation, model, prompt_tokens, \
                 completion_tokens, estimated_cost, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                usage.claim_id.0,
                usage.report_id.as_ref().map(|id| id.0.as_str()),
                usage.operation.as_str(),
                usage.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.estimated_cost,
                encode_time(usage.created_at),
            ],
        )?;
        Ok(())
    }
}

impl EscalationRepository for SqliteStore {
    fn claim_snapshot(
        &self,
        claim_id: &ClaimId,
        organization_id: Option<&OrganizationId>,
    ) -> Result<Option<ClaimSnapshot>, StoreError> {
        let conn = self.lock()?;
        let snapshot = conn
            .query_row(
                "SELECT c.id, c.claim_number, p.address, c.loss_type, c.incident_date, \
                        c.adjuster_name, pol.carrier_name, pol.policy_number, c.created_by, \
                        c.escalation_status, c.legal_partner_name, c.legal_partner_email, \
                        c.owner_email \
                 FROM claims c \
                 JOIN properties p ON p.id = c.property_id \
                 LEFT JOIN policies pol ON pol.id = c.policy_id \
                 WHERE c.id = ?1 AND (?2 IS NULL OR p.organization_id = ?2)",
                params![claim_id.0, organization_id.map(|id| id.0.as_str())],
                |row| {
                    let snapshot = ClaimSnapshot {
                        claim_id: ClaimId(row.get(0)?),
                        claim_number: row.get(1)?,
                        property_address: row.get(2)?,
                        loss_type: row.get(3)?,
                        incident_date: row.get::<_, Option<NaiveDate>>(4)?,
                        adjuster_name: row.get(5)?,
                        carrier_name: row.get(6)?,
                        policy_number: row.get(7)?,
                        created_by: UserId(row.get(8)?),
                        escalation_status: None,
                        legal_partner_name: row.get(10)?,
                        legal_partner_email: row.get(11)?,
                        owner_email: row.get(12)?,
                    };
                    Ok((snapshot, row.get::<_, Option<String>>(9)?))
                },
            )
            .optional()?;

        snapshot
            .map(|(mut snapshot, raw_status)| {
                snapshot.escalation_status = raw_status
                    .map(|raw| {
                        EscalationStatus::parse(&raw).ok_or(StoreError::Corrupt {
                            table: "claims",
                            column: "escalation_status",
                            value: raw,
                        })
                    })
                    .transpose()?;
                Ok(snapshot)
            })
            .transpose()
    }

    fn contractor_photos(&self, claim_id: &ClaimId) -> Result<Vec<PhotoDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, file_name, storage_key, content_type, uploaded_at FROM documents \
             WHERE claim_id = ?1 AND category = ?2 AND status = ?3 \
             ORDER BY uploaded_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![claim_id.0, PHOTO_CATEGORY, CONFIRMED], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, file_name, storage_key, content_type, uploaded_at)| {
                Ok(PhotoDocument {
                    id,
                    file_name,
                    storage_key,
                    content_type,
                    uploaded_at: decode_time("documents", "uploaded_at", &uploaded_at)?,
                })
            })
            .collect()
    }

    fn user_contact(&self, user_id: &UserId) -> Result<Option<UserContact>, StoreError> {
        let conn = self.lock()?;
        let contact = conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                params![user_id.0],
                |row| {
                    Ok(UserContact {
                        id: UserId(row.get(0)?),
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(contact)
    }

    fn issue_request(
        &self,
        request: &LegalApprovalRequest,
        contacts: &IssueApprovalInput,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO legal_approval_requests ({REQUEST_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                request.id.0,
                request.claim_id.0,
                request.token.0,
                request.homeowner_name,
                request.homeowner_email,
                request.status.as_str(),
                encode_time(request.expires_at),
                request.responded_at.map(encode_time),
                encode_time(request.created_at),
            ],
        )?;
        let changed = tx.execute(
            "UPDATE claims SET legal_partner_name = ?2, legal_partner_email = ?3, \
                 owner_email = ?4, escalation_status = ?5 \
             WHERE id = ?1",
            params![
                request.claim_id.0,
                contacts.legal_partner_name,
                contacts.legal_partner_email,
                contacts.homeowner_email,
                EscalationStatus::PendingApproval.as_str(),
            ],
        )?;
        if changed == 0 {
            // Dropping `tx` rolls the insert back.
            return Err(StoreError::MissingRow {
                table: "claims",
                id: request.claim_id.0.clone(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn request_by_token(
        &self,
        token: &ApprovalToken,
    ) -> Result<Option<LegalApprovalRequest>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM legal_approval_requests WHERE token = ?1"),
                params![token.0],
                RequestRow::from_row,
            )
            .optional()?;
        row.map(RequestRow::into_request).transpose()
    }

    fn request_for_claim(
        &self,
        claim_id: &ClaimId,
        request_id: &ApprovalRequestId,
    ) -> Result<Option<LegalApprovalRequest>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {REQUEST_COLUMNS} FROM legal_approval_requests \
                     WHERE id = ?1 AND claim_id = ?2"
                ),
                params![request_id.0, claim_id.0],
                RequestRow::from_row,
            )
            .optional()?;
        row.map(RequestRow::into_request).transpose()
    }

    fn expire_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE legal_approval_requests SET status = ?2 \
             WHERE id = ?1 AND status = ?3 AND expires_at <= ?4",
            params![
                request_id.0,
                ApprovalStatus::Expired.as_str(),
                ApprovalStatus::Pending.as_str(),
                encode_time(now),
            ],
        )?;
        Ok(changed == 1)
    }

    fn decline_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.respond(request_id, ApprovalStatus::Declined, EscalationStatus::Declined, now)
    }

    fn approve_request(
        &self,
        request_id: &ApprovalRequestId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.respond(request_id, ApprovalStatus::Approved, EscalationStatus::Approved, now)
    }

    fn approval_history(
        &self,
        claim_id: &ClaimId,
    ) -> Result<Vec<LegalApprovalRequest>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM legal_approval_requests WHERE claim_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![claim_id.0], RequestRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        collect_requests(rows)
    }
}

impl SqliteStore {
    /// Compare-and-swap `pending → terminal` for an unexpired request, flipping the claim's
    /// escalation status in the same transaction.
    fn respond(
        &self,
        request_id: &ApprovalRequestId,
        status: ApprovalStatus,
        escalation: EscalationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let now = encode_time(now);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let won = tx.execute(
            "UPDATE legal_approval_requests SET status = ?2, responded_at = ?4 \
             WHERE id = ?1 AND status = ?3 AND expires_at > ?4",
            params![
                request_id.0,
                status.as_str(),
                ApprovalStatus::Pending.as_str(),
                now
            ],
        )?;
        if won == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE claims SET escalation_status = ?2 \
             WHERE id = (SELECT claim_id FROM legal_approval_requests WHERE id = ?1)",
            params![request_id.0, escalation.as_str()],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

impl NotificationLog for SqliteStore {
    fn record_notification(&self, record: &NotificationRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notification_log (claim_id, kind, recipient, outcome, error, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.claim_id.0,
                record.kind.as_str(),
                record.recipient,
                record.outcome.as_str(),
                record.error,
                encode_time(record.created_at),
            ],
        )?;
        Ok(())
    }
}
