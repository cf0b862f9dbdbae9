//! Lead validation.
//!
//! A submitted [`LeadForm`] runs through [`LEAD_CHECKS`] in order. Each check
//! normalizes one group of fields into a draft or records a field error. The
//! email uniqueness check runs last, against the store, and only when the
//! email passed its syntax check.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::db_storage::LeadStore;
use crate::errors::AppError;
use crate::models::{LeadForm, LeadStatus, NewLead};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 200;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PHONE_MAX_CHARS: usize = 20;
pub const COMPANY_MAX_CHARS: usize = 200;
pub const ROLE_MAX_CHARS: usize = 100;
pub const NOTES_MAX_CHARS: usize = 5000;

const MSG_REQUIRED: &str = "Este campo é obrigatório.";
const MSG_NAME_TOO_SHORT: &str = "O nome deve ter pelo menos 2 caracteres.";
const MSG_INVALID_EMAIL: &str = "Informe um endereço de e-mail válido.";
const MSG_INVALID_STATUS: &str = "Selecione uma opção válida.";
pub const MSG_DUPLICATE_EMAIL: &str = "Este e-mail já está cadastrado.";

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+(?:[a-zA-Z]{2,63}|xn--[a-zA-Z0-9-]{1,59})$",
    )
    .expect("email regex is valid")
});

/// Field name → messages, in stable field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Which form the submission came from. Only the edit form carries a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Create,
    Edit,
}

#[derive(Debug, Default)]
struct Draft {
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    role: Option<String>,
    status: LeadStatus,
    notes: Option<String>,
}

type FieldCheck = fn(&LeadForm, FormKind, &mut Draft, &mut ValidationErrors);

/// Field checks, applied in order.
const LEAD_CHECKS: &[FieldCheck] = &[check_name, check_email, check_optional_fields, check_status];

fn check_name(form: &LeadForm, _: FormKind, draft: &mut Draft, errors: &mut ValidationErrors) {
    let name = form.name.trim();
    let chars = name.chars().count();
    if name.is_empty() {
        errors.add("name", MSG_REQUIRED);
    } else if chars < NAME_MIN_CHARS {
        errors.add("name", MSG_NAME_TOO_SHORT);
    } else if chars > NAME_MAX_CHARS {
        errors.add("name", too_long(NAME_MAX_CHARS));
    } else {
        draft.name = name.to_string();
    }
}

fn check_email(form: &LeadForm, _: FormKind, draft: &mut Draft, errors: &mut ValidationErrors) {
    let email = form.email.trim();
    if email.is_empty() {
        errors.add("email", MSG_REQUIRED);
    } else if email.chars().count() > EMAIL_MAX_CHARS {
        errors.add("email", too_long(EMAIL_MAX_CHARS));
    } else if !is_valid_email(email) {
        errors.add("email", MSG_INVALID_EMAIL);
    } else {
        draft.email = email.to_lowercase();
    }
}

fn check_optional_fields(
    form: &LeadForm,
    _: FormKind,
    draft: &mut Draft,
    errors: &mut ValidationErrors,
) {
    draft.phone = optional_text("phone", &form.phone, PHONE_MAX_CHARS, errors);
    draft.company = optional_text("company", &form.company, COMPANY_MAX_CHARS, errors);
    draft.role = optional_text("role", &form.role, ROLE_MAX_CHARS, errors);
    draft.notes = optional_text("notes", &form.notes, NOTES_MAX_CHARS, errors);
}

fn check_status(form: &LeadForm, kind: FormKind, draft: &mut Draft, errors: &mut ValidationErrors) {
    if kind == FormKind::Create {
        draft.status = LeadStatus::New;
        return;
    }

    match form.status.as_deref().map(str::trim) {
        None | Some("") => errors.add("status", MSG_REQUIRED),
        Some(raw) => match raw.parse() {
            Ok(status) => draft.status = status,
            Err(_) => errors.add("status", MSG_INVALID_STATUS),
        },
    }
}

fn optional_text(
    field: &'static str,
    raw: &str,
    max_chars: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if value.chars().count() > max_chars {
        errors.add(field, too_long(max_chars));
        return None;
    }
    Some(value.to_string())
}

fn too_long(max_chars: usize) -> String {
    format!(
        "Certifique-se de que o valor tenha no máximo {} caracteres.",
        max_chars
    )
}

/// Validate email address syntax (`local@domain.tld`).
pub fn is_valid_email(email: &str) -> bool {
    if !EMAIL_REGEX.is_match(email) {
        return false;
    }

    let local = email.split('@').next().unwrap_or("");
    !(local.starts_with('.') || local.ends_with('.') || local.contains(".."))
}

/// Runs the field checks without touching the store.
pub fn clean_lead(form: &LeadForm, kind: FormKind) -> Result<NewLead, ValidationErrors> {
    let mut draft = Draft::default();
    let mut errors = ValidationErrors::new();

    for check in LEAD_CHECKS {
        check(form, kind, &mut draft, &mut errors);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewLead {
        name: draft.name,
        email: draft.email,
        phone: draft.phone,
        company: draft.company,
        role: draft.role,
        status: draft.status,
        notes: draft.notes,
    })
}

/// Full validation: field checks, then email uniqueness against the store.
///
/// `existing_id` is the lead being edited; it is excluded from the
/// uniqueness check so a lead can keep its own email.
pub async fn validate_lead(
    store: &dyn LeadStore,
    form: &LeadForm,
    kind: FormKind,
    existing_id: Option<i64>,
) -> Result<NewLead, AppError> {
    let cleaned = clean_lead(form, kind);

    // Uniqueness is only meaningful for a syntactically valid email.
    let email = match &cleaned {
        Ok(lead) => Some(lead.email.clone()),
        Err(errors) if !errors.contains("email") => Some(form.email.trim().to_lowercase()),
        Err(_) => None,
    };

    let duplicate = match email {
        Some(email) => store.find_by_email(&email, existing_id).await?.is_some(),
        None => false,
    };

    match cleaned {
        Ok(lead) if !duplicate => Ok(lead),
        Ok(_) => Err(ValidationErrors::single("email", MSG_DUPLICATE_EMAIL).into()),
        Err(mut errors) => {
            if duplicate {
                errors.add("email", MSG_DUPLICATE_EMAIL);
            }
            Err(errors.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryLeadStore;

    fn form(name: &str, email: &str) -> LeadForm {
        LeadForm {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
        assert!(is_valid_email("valid_email-2023@company.org"));
        assert!(is_valid_email("maria@teste.com"));
        assert!(is_valid_email("user@example.xn--p1ai"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("email-invalido"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email("user@exam ple.com"));
        assert!(!is_valid_email(".user@example.com"));
        assert!(!is_valid_email("user..name@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_clean_normalizes_fields() {
        let mut input = form("  Maria Santos  ", " Maria@Teste.COM ");
        input.company = " Empresa Teste ".to_string();
        input.phone = "   ".to_string();

        let lead = clean_lead(&input, FormKind::Create).unwrap();
        assert_eq!(lead.name, "Maria Santos");
        assert_eq!(lead.email, "maria@teste.com");
        assert_eq!(lead.company.as_deref(), Some("Empresa Teste"));
        assert_eq!(lead.phone, None);
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_missing_required_fields() {
        let mut input = LeadForm::default();
        input.company = "Empresa Teste".to_string();

        let errors = clean_lead(&input, FormKind::Create).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
        assert!(!errors.contains("company"));
    }

    #[test]
    fn test_short_name_rejected_after_trim() {
        let errors = clean_lead(&form("  J ", "joao@teste.com"), FormKind::Create).unwrap_err();
        assert_eq!(errors.get("name"), [MSG_NAME_TOO_SHORT.to_string()]);
    }

    #[test]
    fn test_invalid_email_format() {
        let errors = clean_lead(&form("João Silva", "email-invalido"), FormKind::Create)
            .unwrap_err();
        assert_eq!(errors.get("email"), [MSG_INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn test_field_limits() {
        let mut input = form("João Silva", "joao@teste.com");
        input.role = "x".repeat(ROLE_MAX_CHARS + 1);
        input.notes = "n".repeat(NOTES_MAX_CHARS + 1);

        let errors = clean_lead(&input, FormKind::Create).unwrap_err();
        assert!(errors.contains("role"));
        assert!(errors.contains("notes"));
    }

    #[test]
    fn test_create_ignores_submitted_status() {
        let mut input = form("João Silva", "joao@teste.com");
        input.status = Some("converted".to_string());

        let lead = clean_lead(&input, FormKind::Create).unwrap();
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_edit_requires_known_status() {
        let mut input = form("João Silva", "joao@teste.com");
        let errors = clean_lead(&input, FormKind::Edit).unwrap_err();
        assert_eq!(errors.get("status"), [MSG_REQUIRED.to_string()]);

        input.status = Some("novo".to_string());
        let errors = clean_lead(&input, FormKind::Edit).unwrap_err();
        assert_eq!(errors.get("status"), [MSG_INVALID_STATUS.to_string()]);

        input.status = Some("qualified".to_string());
        let lead = clean_lead(&input, FormKind::Edit).unwrap();
        assert_eq!(lead.status, LeadStatus::Qualified);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let store = MemoryLeadStore::new();
        let input = form("João Silva", "joao@teste.com");
        let first = validate_lead(&store, &input, FormKind::Create, None)
            .await
            .unwrap();
        store.create(first).await.unwrap();

        let input = form("Outro João", "JOAO@Teste.com");
        let err = validate_lead(&store, &input, FormKind::Create, None)
            .await
            .unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.get("email"), [MSG_DUPLICATE_EMAIL.to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_reported_alongside_other_errors() {
        let store = MemoryLeadStore::new();
        let first = clean_lead(&form("João Silva", "joao@teste.com"), FormKind::Create).unwrap();
        store.create(first).await.unwrap();

        let err = validate_lead(&store, &form("J", "joao@teste.com"), FormKind::Create, None)
            .await
            .unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
    }

    #[tokio::test]
    async fn test_edit_keeps_own_email() {
        let store = MemoryLeadStore::new();
        let created = store
            .create(clean_lead(&form("João Silva", "joao@teste.com"), FormKind::Create).unwrap())
            .await
            .unwrap();

        let mut input = form("João Silva Jr", "joao@teste.com");
        input.status = Some("contacted".to_string());
        let changes = validate_lead(&store, &input, FormKind::Edit, Some(created.id))
            .await
            .unwrap();
        assert_eq!(changes.email, "joao@teste.com");
        assert_eq!(changes.status, LeadStatus::Contacted);
    }
}
