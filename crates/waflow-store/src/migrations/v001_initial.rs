//! v001 -- Initial schema creation.
//!
//! One table: `users`.  Instances are not a table of their own; the owned
//! set is a JSON array column on the owning row.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (tenants)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id                 TEXT PRIMARY KEY NOT NULL,   -- UUID v4, assigned by the auth layer
    email              TEXT NOT NULL UNIQUE,
    role               TEXT NOT NULL DEFAULT 'user',
    plan               TEXT NOT NULL DEFAULT 'free',
    plan_status        TEXT NOT NULL DEFAULT 'active',
    current_period_end TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    provider_api_key   TEXT,                        -- per-tenant provider credential
    instances          TEXT NOT NULL DEFAULT '[]',  -- JSON array of instance names
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
"#;

/// Apply the v001 schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
