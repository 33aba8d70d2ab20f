use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Processing,
    Resolved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Processing => "processing",
            ClaimStatus::Resolved => "resolved",
            ClaimStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceKind {
    Auto,
    Home,
    Health,
    Life,
    Liability,
}

impl InsuranceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceKind::Auto => "auto",
            InsuranceKind::Home => "home",
            InsuranceKind::Health => "health",
            InsuranceKind::Life => "life",
            InsuranceKind::Liability => "liability",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Pending,
    Expired,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Pending => "pending",
            ContractStatus::Expired => "expired",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Complaint,
    Question,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Contracts,
    Invoices,
    Certificates,
    Personal,
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for InsuranceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// Date of the incident, as entered on the declaration form
    pub date: String,
    pub status: ClaimStatus,
    pub documents: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsuranceKind,
    pub contract_number: String,
    pub start_date: String,
    pub end_date: String,
    pub premium: f64,
    pub status: ContractStatus,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    pub message: String,
    pub attachments: Vec<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responses: Vec<SupportResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResponse {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_agent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub category: DocumentCategory,
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// `size` rendered for display, see [`human_size`]
    #[serde(default)]
    pub size_label: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
}

/// Byte count rendered with a binary unit, e.g. `1.5 KB`
pub fn human_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if size == 0 {
        return "0 B".to_string();
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub company_name: String,
    pub logo: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub email_notifications: bool,
    pub auto_renewal: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company_name: "AssurTech".to_string(),
            logo: String::new(),
            primary_color: "#2563eb".to_string(),
            secondary_color: "#1e40af".to_string(),
            email_notifications: true,
            auto_renewal: true,
        }
    }
}

/// Claim declaration form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub date: String,
}

/// Subscription wizard output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInsurance {
    #[serde(rename = "type")]
    pub kind: InsuranceKind,
    #[serde(default)]
    pub contract_number: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub premium: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupportTicket {
    #[serde(rename = "type")]
    pub kind: TicketKind,
    #[serde(default)]
    pub contract_number: Option<String>,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub name: String,
    pub category: DocumentCategory,
    pub url: String,
    pub size: u64,
    #[serde(default)]
    pub contract_id: Option<String>,
}

/// Parse a form date: `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_portal_date(raw: &str) -> Result<DateTime<Utc>> {
    parse_portal_date_as_written(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Like [`parse_portal_date`] but keeps the offset the date was written with,
/// so it can be displayed on the calendar day the user entered.
pub fn parse_portal_date_as_written(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    DateTime::parse_from_rfc3339(raw).map_err(|_| PortalError::InvalidDate(raw.to_string()))
}
