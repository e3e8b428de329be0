//! Tenant management screen

use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use super::BasePage;
use crate::config::PortalConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;
use crate::validation::{is_valid_domain, is_valid_email};

/// The four fields of the tenant form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantForm {
    pub name: String,
    pub email: String,
    pub domain: String,
    pub description: String,
}

impl TenantForm {
    pub fn new(name: &str, email: &str, domain: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            domain: domain.to_string(),
            description: description.to_string(),
        }
    }

    /// Form with a random suffix so runs never collide on the live portal
    pub fn unique(prefix: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            name: format!("{} {}", prefix, suffix),
            email: format!("qa+{}@cempal.example", suffix),
            domain: format!("{}.cempal.example", suffix),
            description: format!("Created by the E2E suite ({})", prefix),
        }
    }

    /// Local format check run before anything is sent to the portal
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::Validation("tenant name is empty".to_string()));
        }
        if !is_valid_email(&self.email) {
            return Err(E2eError::Validation(format!("invalid e-mail: {}", self.email)));
        }
        if !is_valid_domain(&self.domain) {
            return Err(E2eError::Validation(format!("invalid domain: {}", self.domain)));
        }
        Ok(())
    }
}

pub struct TenantPage<'a> {
    pub base: BasePage<'a>,
}

impl<'a> TenantPage<'a> {
    pub fn new(page: &'a Page, config: &'a PortalConfig) -> Self {
        Self {
            base: BasePage::new(page, config),
        }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.base.navigate(&self.base.config.portal.tenants_path).await?;
        if !self.base.wait_for_element("tenant.add_button").await {
            return Err(E2eError::Timeout("tenant list".to_string()));
        }
        Ok(())
    }

    pub async fn start_create(&self) -> E2eResult<()> {
        self.base.click_element("tenant.add_button").await?;
        if !self.base.wait_for_element("tenant.name").await {
            return Err(E2eError::Timeout("tenant form".to_string()));
        }
        Ok(())
    }

    pub async fn fill_form(&self, form: &TenantForm) -> E2eResult<()> {
        self.base.fill_input("tenant.name", &form.name).await?;
        self.base.fill_input("tenant.email", &form.email).await?;
        self.base.fill_input("tenant.domain", &form.domain).await?;
        self.base.fill_input("tenant.description", &form.description).await
    }

    /// Submit the open form and wait for the list to come back
    pub async fn submit(&self) -> E2eResult<()> {
        self.base.click_element("tenant.submit").await?;
        let pattern = format!("{}$", regex::escape(&self.base.config.portal.tenants_path));
        self.base
            .page
            .wait_for_url(&pattern, Duration::from_millis(self.base.config.timeouts.navigation))
            .await?;
        self.base.wait_for_network_idle().await
    }

    pub async fn create_tenant(&self, form: &TenantForm) -> E2eResult<()> {
        form.validate()?;
        info!("Creating tenant '{}'", form.name);
        self.start_create().await?;
        self.fill_form(form).await?;
        self.submit().await
    }

    pub async fn edit_tenant(&self, current_name: &str, form: &TenantForm) -> E2eResult<()> {
        form.validate()?;
        info!("Editing tenant '{}'", current_name);
        let edit = self.base.config.selectors.format("tenant.row_edit", current_name)?;
        self.base.page.click(&edit, self.base.config.timeouts.element()).await?;
        if !self.base.wait_for_element("tenant.name").await {
            return Err(E2eError::Timeout("tenant edit form".to_string()));
        }
        self.fill_form(form).await?;
        self.submit().await
    }

    pub async fn delete_tenant(&self, name: &str) -> E2eResult<()> {
        info!("Deleting tenant '{}'", name);
        let delete = self.base.config.selectors.format("tenant.row_delete", name)?;
        self.base.page.click(&delete, self.base.config.timeouts.element()).await?;
        self.base.click_element("tenant.confirm_delete").await?;
        let row = self.base.config.selectors.format("tenant.row", name)?;
        if !self.base.wait_for_hidden(&row).await {
            return Err(E2eError::AssertionFailed(format!("tenant '{}' still listed after delete", name)));
        }
        Ok(())
    }

    pub async fn search(&self, term: &str) -> E2eResult<()> {
        self.base.fill_input("tenant.search", term).await?;
        self.base.pause().await
    }

    pub async fn tenant_exists(&self, name: &str) -> bool {
        match self.base.config.selectors.format("tenant.row", name) {
            Ok(row) => self.base.wait_for_raw(&row, self.base.config.timeouts.element()).await,
            Err(_) => false,
        }
    }

    pub async fn row_count(&self) -> E2eResult<usize> {
        let rows = self.base.selector("tenant.rows")?;
        self.base.page.count(rows).await
    }

    pub async fn validation_error(&self) -> Option<String> {
        if !self.base.wait_for_element("tenant.validation_error").await {
            return None;
        }
        self.base.element_text("tenant.validation_error").await.ok()
    }

    pub async fn cancel(&self) -> E2eResult<()> {
        self.base.click_element("tenant.cancel").await
    }
}
