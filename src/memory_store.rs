use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db_storage::{duplicate_email, not_found, LeadStore};
use crate::errors::AppError;
use crate::models::{Lead, LeadChanges, NewLead, StatusCounts};
use crate::query;

/// Process-local lead storage, used when no database is configured and in tests.
///
/// The write lock spans the uniqueness check and the write, so concurrent
/// creates with the same email cannot both succeed.
#[derive(Default)]
pub struct MemoryLeadStore {
    inner: RwLock<MemState>,
}

#[derive(Default)]
struct MemState {
    next_id: i64,
    leads: Vec<Lead>,
}

impl MemState {
    fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> bool {
        self.leads
            .iter()
            .any(|l| Some(l.id) != exclude_id && l.email.to_lowercase() == email.to_lowercase())
    }
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by id so insertion order is stable.
fn sort_newest_first(leads: &mut [Lead]) {
    leads.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn create(&self, lead: NewLead) -> Result<Lead, AppError> {
        let mut state = self.inner.write().await;
        if state.email_taken(&lead.email, None) {
            return Err(duplicate_email());
        }

        state.next_id += 1;
        let now = Utc::now();
        let stored = Lead {
            id: state.next_id,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            company: lead.company,
            role: lead.role,
            status: lead.status,
            notes: lead.notes,
            created_at: now,
            updated_at: now,
        };
        state.leads.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Lead, AppError> {
        let state = self.inner.read().await;
        state
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<Lead>, AppError> {
        let state = self.inner.read().await;
        let email = email.to_lowercase();
        Ok(state
            .leads
            .iter()
            .find(|l| Some(l.id) != exclude_id && l.email.to_lowercase() == email)
            .cloned())
    }

    async fn list(&self, filter: Option<&str>) -> Result<Vec<Lead>, AppError> {
        let state = self.inner.read().await;
        let mut leads: Vec<Lead> = state
            .leads
            .iter()
            .filter(|l| filter.map_or(true, |q| query::matches(l, q)))
            .cloned()
            .collect();
        sort_newest_first(&mut leads);
        Ok(leads)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Lead>, AppError> {
        let mut leads = self.list(None).await?;
        leads.truncate(limit);
        Ok(leads)
    }

    async fn status_counts(&self) -> Result<StatusCounts, AppError> {
        let state = self.inner.read().await;
        let mut counts = StatusCounts::default();
        for lead in &state.leads {
            counts.add(lead.status, 1);
        }
        Ok(counts)
    }

    async fn update(&self, id: i64, changes: LeadChanges) -> Result<Lead, AppError> {
        let mut state = self.inner.write().await;
        if !state.leads.iter().any(|l| l.id == id) {
            return Err(not_found(id));
        }
        if state.email_taken(&changes.email, Some(id)) {
            return Err(duplicate_email());
        }

        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found(id))?;
        lead.name = changes.name;
        lead.email = changes.email;
        lead.phone = changes.phone;
        lead.company = changes.company;
        lead.role = changes.role;
        lead.status = changes.status;
        lead.notes = changes.notes;
        lead.updated_at = Utc::now();
        Ok(lead.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.inner.write().await;
        let before = state.leads.len();
        state.leads.retain(|l| l.id != id);
        if state.leads.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
