//! Shared helpers for router-level tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use url::form_urlencoded;

use leads_system::app;
use leads_system::flash::Flash;
use leads_system::handlers::AppState;
use leads_system::memory_store::MemoryLeadStore;
use leads_system::models::{LeadStatus, NewLead};
use leads_system::services::LeadService;
use leads_system::templates::Templates;
use leads_system::webhook_client::WebhookClient;

pub const WEBHOOK_PATH: &str = "/webhook/leads";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryLeadStore>,
}

impl TestApp {
    /// App backed by an empty in-memory store, notifying `webhook_base` + [`WEBHOOK_PATH`].
    pub fn new(webhook_base: &str) -> Self {
        Self::with_timeout(webhook_base, Duration::from_secs(2))
    }

    pub fn with_timeout(webhook_base: &str, timeout: Duration) -> Self {
        let store = Arc::new(MemoryLeadStore::new());
        let webhook = WebhookClient::with_timeout(
            format!("{}{}", webhook_base, WEBHOOK_PATH),
            "admin".to_string(),
            "admin123".to_string(),
            timeout,
        )
        .expect("webhook client");

        let state = Arc::new(AppState {
            service: LeadService::new(store.clone(), webhook),
            templates: Arc::new(Templates::new().expect("templates compile")),
        });

        Self {
            router: app::router(state),
            store,
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` part of the response's `Set-Cookie` header.
pub fn cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// The flash a redirect response hands to the next page.
pub fn flash_of(response: &Response<Body>) -> Option<Flash> {
    let pair = cookie_pair(response)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(&pair).ok()?);
    Flash::from_headers(&headers)
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn new_lead(name: &str, email: &str, company: Option<&str>) -> NewLead {
    NewLead {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        company: company.map(str::to_string),
        role: None,
        status: LeadStatus::New,
        notes: None,
    }
}
