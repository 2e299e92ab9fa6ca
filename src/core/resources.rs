use crate::core::client::ApiClient;
use crate::domain::model::{
    CategoryKind, CategoryRef, CompanyRecord, EntryForm, LedgerEntry, LedgerEntryRef, NewCompany,
    NewMainCategory, NewSubcategory, ReportKind, SubcategoryRef,
};
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::{require_text, Validate};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Percent-encodes a caller-supplied id for use as one path segment.
fn segment(id: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(ConsoleError::validation("Identifier cannot be empty"));
    }
    let mut url = url::Url::parse("http://segment.invalid/").map_err(|e| {
        ConsoleError::ConfigError {
            message: e.to_string(),
        }
    })?;
    url.path_segments_mut()
        .map_err(|_| ConsoleError::validation("Identifier cannot be encoded"))?
        .push(id);
    Ok(url.path().trim_start_matches('/').to_string())
}

pub struct InventoryApi {
    api: Arc<ApiClient>,
}

impl InventoryApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Value>> {
        self.api.get_json("/inventory").await
    }

    /// Inventory entries of the outgoing kind, as the dashboard shows them.
    pub async fn outgoing(&self) -> Result<Vec<Value>> {
        Ok(filter_by_kind(self.list().await?, CategoryKind::Outgoing))
    }

    pub async fn add_main_category(&self, category: &NewMainCategory) -> Result<Value> {
        category.validate()?;
        tracing::info!("Adding main category '{}'", category.name);
        self.api
            .post_json("/inventory/add-main-category", category)
            .await
    }

    pub async fn add_subcategory(&self, subcategory: &NewSubcategory) -> Result<Value> {
        subcategory.validate()?;
        tracing::info!(
            "Adding subcategory '{}' under '{}'",
            subcategory.sub_category_name,
            subcategory.main_category_name
        );
        self.api
            .post_json("/inventory/add-subcategory", subcategory)
            .await
    }

    pub async fn delete_main_category(&self, category: &CategoryRef) -> Result<Value> {
        tracing::info!("Deleting main category '{}'", category.main_category_name);
        self.api
            .post_json("/inventory/delete-main-category", category)
            .await
    }

    pub async fn delete_subcategory(&self, subcategory: &SubcategoryRef) -> Result<Value> {
        tracing::info!(
            "Deleting subcategory '{}' under '{}'",
            subcategory.sub_category_name,
            subcategory.main_category_name
        );
        self.api
            .post_json("/inventory/delete-subcategory", subcategory)
            .await
    }
}

pub fn filter_by_kind(items: Vec<Value>, kind: CategoryKind) -> Vec<Value> {
    let wanted = match kind {
        CategoryKind::Incoming => "incoming",
        CategoryKind::Outgoing => "outgoing",
    };
    items
        .into_iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some(wanted))
        .collect()
}

pub struct CompaniesApi {
    api: Arc<ApiClient>,
}

impl CompaniesApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn names(&self) -> Result<Vec<Value>> {
        self.api.get_json("/companies/names").await
    }

    pub async fn details(&self, company_id: &str) -> Result<Value> {
        self.api
            .get_json(&format!("/companies/{}", segment(company_id)?))
            .await
    }

    pub async fn add(&self, company: &NewCompany) -> Result<Value> {
        company.validate()?;
        let company = NewCompany {
            name: company.name.trim().to_string(),
        };
        tracing::info!("Adding company '{}'", company.name);
        self.api.post_json("/companies/add", &company).await
    }

    pub async fn delete(&self, company_id: &str) -> Result<Value> {
        tracing::info!("Deleting company {}", company_id);
        self.api
            .delete_json(&format!("/companies/delete/{}", segment(company_id)?), None)
            .await
    }

    pub async fn add_record(&self, company_id: &str, record: CompanyRecord) -> Result<Value> {
        let record = record.normalized();
        record.validate()?;
        self.api
            .post_json(
                &format!("/companies/{}/records/add", segment(company_id)?),
                &record,
            )
            .await
    }

    pub async fn update_record(
        &self,
        company_id: &str,
        record_id: &str,
        record: CompanyRecord,
    ) -> Result<Value> {
        let record = record.normalized();
        record.validate()?;
        self.api
            .put_json(
                &format!(
                    "/companies/{}/records/{}",
                    segment(company_id)?,
                    segment(record_id)?
                ),
                &record,
            )
            .await
    }

    pub async fn delete_record(&self, company_id: &str, record_id: &str) -> Result<Value> {
        self.api
            .delete_json(
                &format!(
                    "/companies/{}/records/{}",
                    segment(company_id)?,
                    segment(record_id)?
                ),
                None,
            )
            .await
    }
}

/// Case-insensitive substring match on each company's `name`.
pub fn filter_by_name(companies: Vec<Value>, term: &str) -> Vec<Value> {
    let term = term.to_lowercase();
    companies
        .into_iter()
        .filter(|company| {
            company
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.to_lowercase().contains(&term))
                .unwrap_or(false)
        })
        .collect()
}

/// Company ledger of the dashboard. Companies are addressed by name here,
/// and each carries dated amounts.
pub struct LedgerApi {
    api: Arc<ApiClient>,
}

impl LedgerApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn companies(&self) -> Result<Vec<Value>> {
        self.api.get_json("/company/get-all-companies").await
    }

    pub async fn add_company(&self, name: &str) -> Result<Value> {
        require_text(name, "Company name is required")?;
        let company = NewCompany {
            name: name.trim().to_string(),
        };
        tracing::info!("Adding ledger company '{}'", company.name);
        self.api.post_json("/company/add-company", &company).await
    }

    pub async fn delete_company(&self, name: &str) -> Result<Value> {
        require_text(name, "Company name is required")?;
        tracing::info!("Deleting ledger company '{}'", name);
        let body = serde_json::json!({ "name": name });
        self.api
            .delete_json("/company/delete-company", Some(&body))
            .await
    }

    pub async fn add_entry(&self, company_name: &str, form: EntryForm) -> Result<Value> {
        require_text(company_name, "Company name is required")?;
        let entry = LedgerEntry {
            company_name: company_name.to_string(),
            record_id: None,
            fields: form.into_fields()?,
        };
        self.api.post_json("/company/add-record", &entry).await
    }

    pub async fn edit_entry(
        &self,
        company_name: &str,
        record_id: &str,
        form: EntryForm,
    ) -> Result<Value> {
        require_text(company_name, "Company name is required")?;
        require_text(record_id, "Identifier cannot be empty")?;
        let entry = LedgerEntry {
            company_name: company_name.to_string(),
            record_id: Some(record_id.to_string()),
            fields: form.into_fields()?,
        };
        self.api.put_json("/company/edit-record", &entry).await
    }

    pub async fn delete_entry(&self, company_name: &str, record_id: &str) -> Result<Value> {
        require_text(company_name, "Company name is required")?;
        require_text(record_id, "Identifier cannot be empty")?;
        let body = serde_json::to_value(LedgerEntryRef {
            company_name: company_name.to_string(),
            record_id: record_id.to_string(),
        })?;
        self.api
            .delete_json("/company/delete-record", Some(&body))
            .await
    }
}

pub struct ReportsApi {
    api: Arc<ApiClient>,
}

impl ReportsApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn path(kind: &ReportKind) -> Result<String> {
        Ok(match kind {
            ReportKind::CompanySummary => "/companies/reports/summary".to_string(),
            ReportKind::Outgoing => "/reports/outgoing".to_string(),
            ReportKind::Company(id) => format!("/company/generate-report/{}", segment(id)?),
            ReportKind::Full => "/company/generate-full-report".to_string(),
        })
    }

    pub async fn download(&self, kind: &ReportKind) -> Result<Vec<u8>> {
        let bytes = self.api.get_bytes(&Self::path(kind)?).await?;
        if !bytes.starts_with(b"%PDF") {
            tracing::warn!("Report {:?} does not look like a PDF ({} bytes)", kind, bytes.len());
        }
        Ok(bytes)
    }

    /// Downloads the report into `dir` under its default file name.
    pub async fn save(&self, kind: &ReportKind, dir: &Path) -> Result<PathBuf> {
        let bytes = self.download(kind).await?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(kind.file_name());
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}
