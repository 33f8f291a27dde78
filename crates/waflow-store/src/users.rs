//! CRUD operations for [`UserRecord`] rows.
//!
//! Instance-set mutations run inside a transaction so that concurrent
//! connections never observe a half-applied set, and the quota-guarded
//! append re-checks the set size against the limit at write time.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use waflow_shared::{Plan, PlanStatus};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::UserRecord;

/// Outcome of a quota-guarded instance append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Name appended to the set.
    Added,
    /// Name was already present; the set is unchanged.
    AlreadyPresent,
    /// The set is at the given limit; the set is unchanged.
    AtLimit(usize),
}

const SELECT_COLS: &str = "id, email, role, plan, plan_status, current_period_end, \
                           provider_api_key, instances, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new tenant record.
    pub fn create_user(&self, user: &UserRecord) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, role, plan, plan_status, current_period_end,
                                    provider_api_key, instances, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.role,
                    user.plan.as_str(),
                    user.plan_status.as_str(),
                    user.current_period_end.to_rfc3339(),
                    user.provider_api_key,
                    serde_json::to_string(&user.instances)?,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, ref msg)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    // The id and email columns are both unique; which one
                    // collided decides the error the caller sees.
                    match msg {
                        Some(m) if m.contains("users.email") => StoreError::EmailTaken,
                        _ => StoreError::AlreadyExists,
                    }
                }
                other => StoreError::Sqlite(other),
            })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single tenant by id.
    pub fn get_user(&self, id: Uuid) -> Result<UserRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace the tenant's provider credential (`None` clears it).
    pub fn update_provider_api_key(&self, id: Uuid, key: Option<&str>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET provider_api_key = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), key, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Move the tenant to a new plan and refresh the billing period.
    pub fn update_subscription(
        &self,
        id: Uuid,
        plan: Plan,
        status: PlanStatus,
        period_end: DateTime<Utc>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET plan = ?2, plan_status = ?3, current_period_end = ?4,
                              updated_at = ?5
             WHERE id = ?1",
            params![
                id.to_string(),
                plan.as_str(),
                status.as_str(),
                period_end.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Append `name` to the tenant's instance set, unless the set already
    /// holds `limit` entries or the name is already a member.
    ///
    /// Read and write happen inside one transaction so the size check
    /// cannot be interleaved with another writer on a second connection.
    pub fn append_instance(&self, id: Uuid, name: &str, limit: usize) -> Result<AppendOutcome> {
        let tx = self.conn().unchecked_transaction()?;

        let mut instances = load_instances(&tx, id)?;
        if instances.iter().any(|i| i == name) {
            return Ok(AppendOutcome::AlreadyPresent);
        }
        if instances.len() >= limit {
            return Ok(AppendOutcome::AtLimit(limit));
        }

        instances.push(name.to_string());
        store_instances(&tx, id, &instances)?;
        tx.commit()?;
        Ok(AppendOutcome::Added)
    }

    /// Remove `name` from the tenant's instance set.  Returns `true` if the
    /// name was a member.
    pub fn remove_instance(&self, id: Uuid, name: &str) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;

        let mut instances = load_instances(&tx, id)?;
        let before = instances.len();
        instances.retain(|i| i != name);
        if instances.len() == before {
            return Ok(false);
        }

        store_instances(&tx, id, &instances)?;
        tx.commit()?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_instances(conn: &rusqlite::Connection, id: Uuid) -> Result<Vec<String>> {
    let raw: String = conn
        .query_row(
            "SELECT instances FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Sqlite(other),
        })?;
    Ok(serde_json::from_str(&raw)?)
}

fn store_instances(conn: &rusqlite::Connection, id: Uuid, instances: &[String]) -> Result<()> {
    conn.execute(
        "UPDATE users SET instances = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            serde_json::to_string(instances)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Map a `rusqlite::Row` to a [`UserRecord`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    let id_str: String = row.get(0)?;
    let email: String = row.get(1)?;
    let role: String = row.get(2)?;
    let plan_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let period_end_str: String = row.get(5)?;
    let provider_api_key: Option<String> = row.get(6)?;
    let instances_str: String = row.get(7)?;
    let created_str: String = row.get(8)?;
    let updated_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;
    let plan = Plan::parse(&plan_str)
        .ok_or_else(|| conversion_err(3, format!("unknown plan: {plan_str}")))?;
    let plan_status = PlanStatus::parse(&status_str)
        .ok_or_else(|| conversion_err(4, format!("unknown plan status: {status_str}")))?;
    let current_period_end = parse_ts(5, &period_end_str)?;
    let instances: Vec<String> =
        serde_json::from_str(&instances_str).map_err(|e| conversion_err(7, e))?;
    let created_at = parse_ts(8, &created_str)?;
    let updated_at = parse_ts(9, &updated_str)?;

    Ok(UserRecord {
        id,
        email,
        role,
        plan,
        plan_status,
        current_period_end,
        provider_api_key,
        instances,
        created_at,
        updated_at,
    })
}

fn parse_ts(col: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(col, e))
}

fn conversion_err(
    col: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database) -> UserRecord {
        let user = UserRecord::new(Uuid::new_v4(), "tenant@example.com".into(), "user".into());
        db.create_user(&user).unwrap();
        user
    }

    #[test]
    fn create_and_fetch() {
        let db = open_db();
        let user = seed_user(&db);

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.email, "tenant@example.com");
        assert_eq!(fetched.plan, Plan::Free);
        assert!(fetched.instances.is_empty());
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = open_db();
        assert!(matches!(
            db.get_user(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let db = open_db();
        let user = seed_user(&db);
        assert!(matches!(
            db.create_user(&user),
            Err(StoreError::AlreadyExists)
        ));
    }

    #[test]
    fn duplicate_email_under_new_id_rejected() {
        let db = open_db();
        let user = seed_user(&db);

        let other = UserRecord::new(Uuid::new_v4(), user.email.clone(), "user".into());
        assert!(matches!(
            db.create_user(&other),
            Err(StoreError::EmailTaken)
        ));
    }

    #[test]
    fn append_respects_limit() {
        let db = open_db();
        let user = seed_user(&db);

        assert_eq!(
            db.append_instance(user.id, "bot1", 1).unwrap(),
            AppendOutcome::Added
        );
        assert_eq!(
            db.append_instance(user.id, "bot2", 1).unwrap(),
            AppendOutcome::AtLimit(1)
        );

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.instances, vec!["bot1"]);
    }

    #[test]
    fn append_dedupes() {
        let db = open_db();
        let user = seed_user(&db);

        db.append_instance(user.id, "bot1", 10).unwrap();
        assert_eq!(
            db.append_instance(user.id, "bot1", 10).unwrap(),
            AppendOutcome::AlreadyPresent
        );
        assert_eq!(db.get_user(user.id).unwrap().instances.len(), 1);
    }

    #[test]
    fn remove_instance_membership() {
        let db = open_db();
        let user = seed_user(&db);

        db.append_instance(user.id, "bot1", 10).unwrap();
        assert!(db.remove_instance(user.id, "bot1").unwrap());
        assert!(!db.remove_instance(user.id, "bot1").unwrap());
        assert!(db.get_user(user.id).unwrap().instances.is_empty());
    }

    #[test]
    fn subscription_update_persists() {
        let db = open_db();
        let user = seed_user(&db);
        let period_end = Utc::now() + chrono::Duration::days(30);

        db.update_subscription(user.id, Plan::Pro, PlanStatus::Active, period_end)
            .unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.plan, Plan::Pro);
        assert_eq!(fetched.plan_status, PlanStatus::Active);
        assert_eq!(
            fetched.current_period_end.timestamp(),
            period_end.timestamp()
        );
    }

    #[test]
    fn api_key_update() {
        let db = open_db();
        let user = seed_user(&db);

        db.update_provider_api_key(user.id, Some("evo-key-0123456789"))
            .unwrap();
        assert_eq!(
            db.get_user(user.id).unwrap().provider_api_key.as_deref(),
            Some("evo-key-0123456789")
        );

        db.update_provider_api_key(user.id, None).unwrap();
        assert!(db.get_user(user.id).unwrap().provider_api_key.is_none());

        assert!(matches!(
            db.update_provider_api_key(Uuid::new_v4(), Some("k".repeat(12).as_str())),
            Err(StoreError::NotFound)
        ));
    }
}
