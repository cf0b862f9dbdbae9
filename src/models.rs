use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// ============ Domain Models ============

/// Pipeline stage of a lead. Any status may move to any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
    ];

    /// Value stored in the database and submitted by forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
        }
    }

    /// Human-readable label shown in the pages.
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "Novo",
            LeadStatus::Contacted => "Contatado",
            LeadStatus::Qualified => "Qualificado",
            LeadStatus::Converted => "Convertido",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(format!("unknown lead status '{}'", other)),
        }
    }
}

/// A prospective-customer contact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    /// Trimmed, at least 2 characters.
    pub name: String,
    /// Lower-cased, unique across all leads.
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// First whitespace-delimited token of the name, or `""` for an empty name.
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.name,
            self.company.as_deref().unwrap_or("Sem empresa")
        )
    }
}

pub fn short_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or("")
}

/// Validated field set for a lead that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
}

/// Validated replacement values for the mutable fields of an existing lead.
pub type LeadChanges = NewLead;

/// Raw form submission, exactly as the browser sent it.
///
/// Every field defaults so that a partial submission still reaches the
/// validator and produces field errors instead of a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub role: String,
    pub status: Option<String>,
    pub notes: String,
}

impl From<&Lead> for LeadForm {
    fn from(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone().unwrap_or_default(),
            company: lead.company.clone().unwrap_or_default(),
            role: lead.role.clone().unwrap_or_default(),
            status: Some(lead.status.as_str().to_string()),
            notes: lead.notes.clone().unwrap_or_default(),
        }
    }
}

/// Aggregate counts displayed on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub new: i64,
    pub contacted: i64,
    pub qualified: i64,
    pub converted: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: LeadStatus, count: i64) {
        self.total += count;
        match status {
            LeadStatus::New => self.new += count,
            LeadStatus::Contacted => self.contacted += count,
            LeadStatus::Qualified => self.qualified += count,
            LeadStatus::Converted => self.converted += count,
        }
    }
}

// ============ Database Models ============

/// Row shape of the `leads` table. `status` is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = String;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            role: row.role,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
