use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, LeadChanges, LeadRow, LeadStatus, NewLead, StatusCounts};
use crate::validation::{ValidationErrors, MSG_DUPLICATE_EMAIL};

/// Persistence for lead records.
///
/// Implementations must keep email uniqueness (case-insensitive) as a hard
/// constraint and return listings newest-created-first.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persists an already validated lead and returns the stored record.
    async fn create(&self, lead: NewLead) -> Result<Lead, AppError>;

    async fn get(&self, id: i64) -> Result<Lead, AppError>;

    /// Case-insensitive email lookup, optionally ignoring one lead.
    async fn find_by_email(
        &self,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<Lead>, AppError>;

    /// All leads whose name, email or company contains `filter`, ignoring case.
    async fn list(&self, filter: Option<&str>) -> Result<Vec<Lead>, AppError>;

    async fn recent(&self, limit: usize) -> Result<Vec<Lead>, AppError>;

    async fn status_counts(&self) -> Result<StatusCounts, AppError>;

    /// Overwrites the mutable fields and refreshes `updated_at`.
    async fn update(&self, id: i64, changes: LeadChanges) -> Result<Lead, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

pub(crate) fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Lead {} não encontrado", id))
}

pub(crate) fn duplicate_email() -> AppError {
    AppError::Validation(ValidationErrors::single("email", MSG_DUPLICATE_EMAIL))
}

const LEAD_COLUMNS: &str =
    "id, name, email, phone, company, role, status, notes, created_at, updated_at";

/// Postgres-backed lead storage.
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps the `lower(email)` unique index violation to the form-level error.
fn map_write_error(err: sqlx::Error, context: String) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            tracing::warn!("Unique email constraint hit while {}", context);
            return duplicate_email();
        }
    }
    AppError::WithContext {
        source: Box::new(AppError::DatabaseError(err)),
        context,
    }
}

fn into_lead(row: LeadRow) -> Result<Lead, AppError> {
    let id = row.id;
    Lead::try_from(row)
        .map_err(|e| AppError::InternalError(format!("Corrupt lead row {}: {}", id, e)))
}

fn into_leads(rows: Vec<LeadRow>) -> Result<Vec<Lead>, AppError> {
    rows.into_iter().map(into_lead).collect()
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn create(&self, lead: NewLead) -> Result<Lead, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            INSERT INTO leads (name, email, phone, company, role, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.role)
        .bind(lead.status.as_str())
        .bind(&lead.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, format!("inserting lead {}", lead.email)))?;

        tracing::info!("✓ Lead {} stored", row.id);
        into_lead(row)
    }

    async fn get(&self, id: i64) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading lead {}", id))?
        .ok_or_else(|| not_found(id))?;

        into_lead(row)
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            SELECT {} FROM leads
            WHERE lower(email) = lower($1)
              AND ($2::BIGINT IS NULL OR id <> $2)
            LIMIT 1
            "#,
            LEAD_COLUMNS
        ))
        .bind(email)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await
        .context("looking up lead by email")?;

        row.map(into_lead).transpose()
    }

    async fn list(&self, filter: Option<&str>) -> Result<Vec<Lead>, AppError> {
        // strpos avoids having to escape LIKE wildcards in user input
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            SELECT {} FROM leads
            WHERE $1::TEXT IS NULL
               OR strpos(lower(name), lower($1)) > 0
               OR strpos(lower(email), lower($1)) > 0
               OR strpos(lower(COALESCE(company, '')), lower($1)) > 0
            ORDER BY created_at DESC, id DESC
            "#,
            LEAD_COLUMNS
        ))
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .context("listing leads")?;

        into_leads(rows)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads ORDER BY created_at DESC, id DESC LIMIT $1",
            LEAD_COLUMNS
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("loading recent leads")?;

        into_leads(rows)
    }

    async fn status_counts(&self) -> Result<StatusCounts, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM leads GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .context("counting leads by status")?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.parse::<LeadStatus>() {
                Ok(status) => counts.add(status, count),
                Err(e) => tracing::warn!("Skipping {} leads: {}", count, e),
            }
        }
        Ok(counts)
    }

    async fn update(&self, id: i64, changes: LeadChanges) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET name = $2,
                email = $3,
                phone = $4,
                company = $5,
                role = $6,
                status = $7,
                notes = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.company)
        .bind(&changes.role)
        .bind(changes.status.as_str())
        .bind(&changes.notes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, format!("updating lead {}", id)))?
        .ok_or_else(|| not_found(id))?;

        tracing::info!("✓ Lead {} updated", id);
        into_lead(row)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting lead {}", id))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tracing::info!("✓ Lead {} deleted", id);
        Ok(())
    }
}
