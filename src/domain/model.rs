use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::{require_positive_amount, require_text, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key the bearer token is persisted under.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Routes of the dashboard. Everything except `Login` needs a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
    Companies,
    CompanyDetails(String),
    AddMainCategory,
    AddSubcategory,
}

impl View {
    pub const DEFAULT_PROTECTED: View = View::Dashboard;

    pub fn is_protected(&self) -> bool {
        !matches!(self, View::Login)
    }

    pub fn path(&self) -> String {
        match self {
            View::Login => "/".to_string(),
            View::Dashboard => "/dashboard".to_string(),
            View::Companies => "/companies".to_string(),
            View::CompanyDetails(id) => format!("/companies/{}", id),
            View::AddMainCategory => "/dashboard/addmain".to_string(),
            View::AddSubcategory => "/dashboard/addsub".to_string(),
        }
    }

    /// Resolves a route path; unknown paths fall back to the login view.
    pub fn from_path(path: &str) -> View {
        let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => View::Login,
            "/dashboard" => View::Dashboard,
            "/companies" => View::Companies,
            "/dashboard/addmain" => View::AddMainCategory,
            "/dashboard/addsub" => View::AddSubcategory,
            other => match other.strip_prefix("/companies/") {
                Some(id) if !id.is_empty() && !id.contains('/') => {
                    View::CompanyDetails(id.to_string())
                }
                _ => View::Login,
            },
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(View),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SessionExpired,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::SessionExpired => "Session Expired",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Notice::SessionExpired => "Your session has expired. Please login again.",
        }
    }
}

/// Which reaction every guarded call site applies to a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedPolicy {
    ClearAndRedirect,
    #[default]
    RefreshAndRetry,
}

impl std::str::FromStr for UnauthorizedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "clear_and_redirect" | "clear-and-redirect" => {
                Ok(UnauthorizedPolicy::ClearAndRedirect)
            }
            "refresh_and_retry" | "refresh-and-retry" => Ok(UnauthorizedPolicy::RefreshAndRetry),
            other => Err(format!(
                "unknown policy '{}', expected clear_and_redirect or refresh_and_retry",
                other
            )),
        }
    }
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "user")]
    pub username: String,
    #[serde(rename = "pwd")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<()> {
        require_text(&self.username, "Username is required")?;
        require_text(&self.password, "Password is required")
    }
}

/// Body returned by the auth and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
}

impl TokenGrant {
    pub fn into_token(self) -> Option<String> {
        self.access_token.filter(|t| !t.trim().is_empty())
    }
}

/// Error body; the auth endpoint capitalises the field, the others don't.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "Message")]
    pub upper: Option<String>,
    pub message: Option<String>,
}

impl ServerMessage {
    pub fn text(self) -> Option<String> {
        self.upper
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Incoming,
    Outgoing,
}

impl std::str::FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(CategoryKind::Incoming),
            "outgoing" => Ok(CategoryKind::Outgoing),
            other => Err(format!("unknown category type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMainCategory {
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub name: String,
}

impl Validate for NewMainCategory {
    fn validate(&self) -> Result<()> {
        require_text(&self.name, "Category name is required")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubcategory {
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub main_category_name: String,
    pub sub_category_name: String,
    pub details: String,
    pub price: String,
}

impl Validate for NewSubcategory {
    fn validate(&self) -> Result<()> {
        require_text(&self.main_category_name, "Main category is required")?;
        require_text(&self.sub_category_name, "Subcategory name is required")?;
        require_text(&self.details, "Details are required")?;
        require_positive_amount(
            &self.price,
            "Price is required",
            "Price must be a positive number",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub main_category_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryRef {
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub main_category_name: String,
    pub sub_category_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCompany {
    pub name: String,
}

impl Validate for NewCompany {
    fn validate(&self) -> Result<()> {
        require_text(&self.name, "Please enter a company name")
    }
}

/// Financial entry attached to a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub invoice_no: String,
    pub container_no: String,
    pub product: String,
    #[serde(default)]
    pub advance: String,
    #[serde(default)]
    pub cheque_number: String,
}

impl CompanyRecord {
    /// Trims every field the way the record form does before submitting.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.invoice_no,
            &mut self.container_no,
            &mut self.product,
            &mut self.advance,
            &mut self.cheque_number,
        ] {
            *field = field.trim().to_string();
        }
        self
    }
}

impl Validate for CompanyRecord {
    fn validate(&self) -> Result<()> {
        const MESSAGE: &str = "Please fill out all required fields";
        require_text(&self.invoice_no, MESSAGE)?;
        require_text(&self.container_no, MESSAGE)?;
        require_text(&self.product, MESSAGE)
    }
}

/// Form values of a dashboard ledger entry, as typed by the operator.
#[derive(Debug, Clone, Default)]
pub struct EntryForm {
    pub date: String,
    pub amount: String,
    pub description: String,
}

impl EntryForm {
    /// Validates the form and produces the values sent to the server.
    /// Thousands separators in the amount are ignored.
    pub fn into_fields(self) -> Result<EntryFields> {
        let date = self.date.trim();
        require_text(date, "Date is required")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ConsoleError::validation("Date must be in YYYY-MM-DD format"))?;

        let amount = require_positive_amount(
            &self.amount.replace(',', ""),
            "Please enter a valid amount",
            "Please enter a valid amount",
        )?;

        require_text(&self.description, "Description is required")?;

        Ok(EntryFields {
            date: date.to_string(),
            amount,
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFields {
    pub date: String,
    pub amount: f64,
    pub description: String,
}

/// Body of the ledger add/edit calls; `recordId` only on edits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(flatten)]
    pub fields: EntryFields,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryRef {
    pub company_name: String,
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    CompanySummary,
    Outgoing,
    Company(String),
    Full,
}

impl ReportKind {
    pub fn file_name(&self) -> String {
        match self {
            ReportKind::CompanySummary => "companies_summary.pdf".to_string(),
            ReportKind::Outgoing => "outgoing.pdf".to_string(),
            ReportKind::Company(id) => format!("company_{}_report.pdf", file_safe(id)),
            ReportKind::Full => "all_companies_report.pdf".to_string(),
        }
    }
}

/// Keeps `[A-Za-z0-9_-]` and replaces everything else, so an id can never
/// leave the output directory.
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
