//! Lead lifecycle: validate, persist, notify.

use serde::Serialize;
use std::sync::Arc;

use crate::db_storage::LeadStore;
use crate::errors::AppError;
use crate::flash::Flash;
use crate::models::{Lead, LeadForm, StatusCounts};
use crate::query::{self, Page, PAGE_SIZE};
use crate::validation::{validate_lead, FormKind};
use crate::webhook_client::{DispatchOutcome, WebhookClient};

/// Leads shown on the dashboard.
pub const RECENT_LEADS: usize = 5;

/// A committed lead plus what happened when the webhook was told about it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub lead: Lead,
    pub outcome: DispatchOutcome,
}

impl Registration {
    /// Message for the user. The lead is committed whatever the outcome, so
    /// webhook trouble is only ever a warning.
    pub fn flash(&self) -> Flash {
        match &self.outcome {
            DispatchOutcome::Acknowledged | DispatchOutcome::Unacknowledged => {
                Flash::success("Lead cadastrado com sucesso!")
            }
            DispatchOutcome::Rejected(code) => Flash::warning(format!(
                "Lead cadastrado, mas o webhook retornou status {}",
                code
            )),
            DispatchOutcome::Failed(reason) => Flash::warning(format!(
                "Lead cadastrado, mas erro ao enviar webhook: {}",
                reason
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub recent: Vec<Lead>,
}

#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
    webhook: WebhookClient,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, webhook: WebhookClient) -> Self {
        Self { store, webhook }
    }

    pub fn store(&self) -> &dyn LeadStore {
        self.store.as_ref()
    }

    /// Validates and stores a new lead, then notifies the webhook.
    ///
    /// Only validation and storage errors are returned; the notification
    /// result travels in [`Registration::outcome`].
    pub async fn register(&self, form: &LeadForm) -> Result<Registration, AppError> {
        let new_lead = validate_lead(self.store(), form, FormKind::Create, None).await?;
        let lead = self.store.create(new_lead).await?;
        tracing::info!("Lead {} registered ({})", lead.id, lead.email);

        let outcome = self.webhook.notify_lead_created(&lead).await;
        Ok(Registration { lead, outcome })
    }

    /// Validates and applies an edit. No notification is sent.
    pub async fn update(&self, id: i64, form: &LeadForm) -> Result<Lead, AppError> {
        self.store.get(id).await?;
        let changes = validate_lead(self.store(), form, FormKind::Edit, Some(id)).await?;
        self.store.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.store.delete(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Lead, AppError> {
        self.store.get(id).await
    }

    /// Filtered listing, cut into pages of [`PAGE_SIZE`].
    pub async fn list_page(
        &self,
        raw_query: Option<&str>,
        page: usize,
    ) -> Result<Page<Lead>, AppError> {
        let filter = query::normalize_query(raw_query);
        let leads = self.store.list(filter.as_deref()).await?;
        Ok(Page::paginate(leads, page, PAGE_SIZE))
    }

    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        Ok(Dashboard {
            counts: self.store.status_counts().await?,
            recent: self.store.recent(RECENT_LEADS).await?,
        })
    }
}
