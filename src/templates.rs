//! HTML page rendering.
//!
//! Templates are compiled into the binary and use Jinja2 syntax (via
//! minijinja). `.html` templates are auto-escaped.

use axum::response::Html;
use chrono::DateTime;
use minijinja::Environment;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{self, LeadStatus};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("lead_form.html", include_str!("../templates/lead_form.html")),
    ("lead_list.html", include_str!("../templates/lead_list.html")),
    ("lead_detail.html", include_str!("../templates/lead_detail.html")),
    ("lead_delete.html", include_str!("../templates/lead_delete.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("datetime", datetime);
        env.add_filter("status_label", status_label);
        env.add_filter("short_name", short_name);
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, AppError> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}

/// `2026-10-16T12:30:00Z` → `16/10/2026 12:30`. Unparseable input passes through.
fn datetime(value: String) -> String {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or(value)
}

fn status_label(value: String) -> String {
    value
        .parse::<LeadStatus>()
        .map(|s| s.label().to_string())
        .unwrap_or(value)
}

fn short_name(value: String) -> String {
    models::short_name(&value).to_string()
}
