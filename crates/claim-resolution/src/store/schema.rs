/// Idempotent DDL applied on every open.
///
/// Timestamps are fixed-width RFC 3339 UTC text so string comparison orders them.
pub(super) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id              TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    address         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS policies (
    id            TEXT PRIMARY KEY,
    property_id   TEXT NOT NULL REFERENCES properties(id),
    carrier_name  TEXT,
    policy_number TEXT,
    deductible    REAL NOT NULL DEFAULT 0,
    exclusions    TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS claims (
    id                  TEXT PRIMARY KEY,
    property_id         TEXT NOT NULL REFERENCES properties(id),
    policy_id           TEXT REFERENCES policies(id),
    claim_number        TEXT,
    loss_type           TEXT,
    incident_date       TEXT,
    adjuster_name       TEXT,
    created_by          TEXT NOT NULL,
    escalation_status   TEXT,
    legal_partner_name  TEXT,
    legal_partner_email TEXT,
    owner_email         TEXT,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scope_sheets (
    id         TEXT PRIMARY KEY,
    claim_id   TEXT NOT NULL REFERENCES claims(id),
    data       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS carrier_estimates (
    id          TEXT PRIMARY KEY,
    claim_id    TEXT NOT NULL REFERENCES claims(id),
    parsed_data TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id           TEXT PRIMARY KEY,
    claim_id     TEXT NOT NULL REFERENCES claims(id),
    category     TEXT NOT NULL,
    status       TEXT NOT NULL,
    file_name    TEXT NOT NULL,
    storage_key  TEXT NOT NULL,
    content_type TEXT,
    uploaded_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_reports (
    id                  TEXT PRIMARY KEY,
    claim_id            TEXT NOT NULL REFERENCES claims(id),
    scope_sheet_id      TEXT NOT NULL,
    carrier_estimate_id TEXT,
    generated_estimate  TEXT,
    comparison_data     TEXT,
    viability_analysis  TEXT,
    pm_brain_analysis   TEXT,
    dispute_letter      TEXT,
    status              TEXT NOT NULL,
    error_message       TEXT,
    created_by          TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS audit_reports_claim_created
    ON audit_reports (claim_id, created_at);

CREATE TABLE IF NOT EXISTS legal_approval_requests (
    id              TEXT PRIMARY KEY,
    claim_id        TEXT NOT NULL REFERENCES claims(id),
    token           TEXT NOT NULL UNIQUE,
    homeowner_name  TEXT NOT NULL,
    homeowner_email TEXT NOT NULL,
    status          TEXT NOT NULL,
    expires_at      TEXT NOT NULL,
    responded_at    TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_usage (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    claim_id          TEXT NOT NULL,
    report_id         TEXT,
    operation         TEXT NOT NULL,
    model             TEXT NOT NULL,
    prompt_tokens     INTEGER NOT NULL,
    completion_tokens INTEGER NOT NULL,
    estimated_cost    REAL NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    claim_id   TEXT NOT NULL,
    kind       TEXT NOT NULL,
    recipient  TEXT NOT NULL,
    outcome    TEXT NOT NULL,
    error      TEXT,
    created_at TEXT NOT NULL
);
"#;

pub(super) const PHOTO_CATEGORY: &str = "contractor_photo";
pub(super) const CONFIRMED: &str = "confirmed";
