use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use minijinja::{context, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::form_urlencoded;

use crate::errors::AppError;
use crate::flash::{self, Flash};
use crate::models::{LeadForm, LeadStatus};
use crate::query;
use crate::services::LeadService;
use crate::templates::Templates;
use crate::validation::ValidationErrors;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead lifecycle: storage plus webhook notification.
    pub service: LeadService,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

/// Query string of the listing page. `page` stays a string so that
/// `?page=abc` falls back to the first page instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<String>,
}

#[derive(Serialize)]
struct StatusOption {
    value: &'static str,
    label: &'static str,
}

fn status_options() -> Vec<StatusOption> {
    LeadStatus::ALL
        .iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            label: s.label(),
        })
        .collect()
}

/// `&q=...` suffix for pagination links.
fn search_param(query: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("&q={}", encoded)
}

/// Renders a page, consuming any pending flash message.
fn render(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    template: &str,
    ctx: Value,
) -> Result<Response, AppError> {
    let flash = Flash::from_headers(headers);
    let consumed = flash.is_some();
    let html = state
        .templates
        .render(template, context! { flash => flash, ..ctx })?;

    let mut response = (status, html).into_response();
    if consumed {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, flash::clear_cookie());
    }
    Ok(response)
}

/// 302 to `location`, carrying `flash` to the next page.
fn redirect(location: &'static str, flash: Flash) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    headers.insert(header::LOCATION, HeaderValue::from_static(location));
    headers.insert(header::SET_COOKIE, flash.set_cookie());
    response
}

/// Re-renders the form with field errors, or propagates anything else.
fn form_or_error(
    state: &AppState,
    headers: &HeaderMap,
    err: AppError,
    ctx: Value,
) -> Result<Response, AppError> {
    match err.validation_errors() {
        Some(errors) => render(
            state,
            headers,
            StatusCode::OK,
            "lead_form.html",
            context! { errors => errors, ..ctx },
        ),
        None => Err(err),
    }
}

/// Health check endpoint. Plain `OK`, no storage round-trip.
pub async fn health() -> &'static str {
    "OK"
}

/// GET /
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let dashboard = state.service.dashboard().await?;
    render(
        &state,
        &headers,
        StatusCode::OK,
        "dashboard.html",
        context! { counts => dashboard.counts, recent => dashboard.recent },
    )
}

/// GET /cadastrar/
pub async fn create_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    render(
        &state,
        &headers,
        StatusCode::OK,
        "lead_form.html",
        context! {
            form => LeadForm::default(),
            errors => ValidationErrors::new(),
            action => "/cadastrar/",
        },
    )
}

/// POST /cadastrar/
///
/// Stores the lead and notifies the webhook. Webhook trouble never undoes
/// the registration; it only changes the flash message.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LeadForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cadastrar/ - email: {}", form.email.trim());

    match state.service.register(&form).await {
        Ok(registration) => Ok(redirect("/", registration.flash())),
        Err(err) => {
            tracing::debug!("Lead registration rejected: {}", err);
            form_or_error(
                &state,
                &headers,
                err,
                context! { form => form, action => "/cadastrar/" },
            )
        }
    }
}

/// GET /lista/?q=&page=
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let query = query::normalize_query(params.q.as_deref());
    let requested = query::parse_page_number(params.page.as_deref());
    let page = state.service.list_page(query.as_deref(), requested).await?;

    // Pagination links keep the active search.
    let query_param = query.as_deref().map(search_param).unwrap_or_default();

    render(
        &state,
        &headers,
        StatusCode::OK,
        "lead_list.html",
        context! { page => page, query => query, query_param => query_param },
    )
}

/// GET /visualizar/:id/
pub async fn view_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let lead = state.service.get(id).await?;
    render(
        &state,
        &headers,
        StatusCode::OK,
        "lead_detail.html",
        context! { lead => lead },
    )
}

/// GET /editar/:id/
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let lead = state.service.get(id).await?;
    render(
        &state,
        &headers,
        StatusCode::OK,
        "lead_form.html",
        context! {
            form => LeadForm::from(&lead),
            errors => ValidationErrors::new(),
            statuses => status_options(),
            action => format!("/editar/{}/", id),
            lead => lead,
        },
    )
}

/// POST /editar/:id/
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<LeadForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /editar/{}/", id);

    match state.service.update(id, &form).await {
        Ok(_) => Ok(redirect("/lista/", Flash::success("Lead atualizado com sucesso!"))),
        Err(err) if err.validation_errors().is_some() => {
            let lead = state.service.get(id).await?;
            form_or_error(
                &state,
                &headers,
                err,
                context! {
                    form => form,
                    statuses => status_options(),
                    action => format!("/editar/{}/", id),
                    lead => lead,
                },
            )
        }
        Err(err) => Err(err),
    }
}

/// GET /excluir/:id/
pub async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let lead = state.service.get(id).await?;
    render(
        &state,
        &headers,
        StatusCode::OK,
        "lead_delete.html",
        context! { lead => lead },
    )
}

/// POST /excluir/:id/
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    tracing::info!("POST /excluir/{}/", id);
    state.service.delete(id).await?;
    Ok(redirect("/lista/", Flash::success("Lead excluído com sucesso!")))
}

/// Fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("Página não encontrada".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_is_302_with_flash_cookie() {
        let response = redirect("/", Flash::success("Lead cadastrado com sucesso!"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .starts_with("leads_flash="));
    }

    #[test]
    fn test_status_options_cover_every_status() {
        let values: Vec<&str> = status_options().iter().map(|o| o.value).collect();
        assert_eq!(values, ["new", "contacted", "qualified", "converted"]);
    }
}
