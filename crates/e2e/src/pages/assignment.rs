//! Super Admin assignment: map a user to a tenant, user group and team

use tracing::info;

use super::BasePage;
use crate::config::{AssignmentTarget, PortalConfig};
use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;

pub struct UserAssignmentPage<'a> {
    pub base: BasePage<'a>,
}

impl<'a> UserAssignmentPage<'a> {
    pub fn new(page: &'a Page, config: &'a PortalConfig) -> Self {
        Self {
            base: BasePage::new(page, config),
        }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.base.navigate(&self.base.config.portal.super_admins_path).await?;
        if !self.base.wait_for_element("page.heading").await {
            return Err(E2eError::Timeout("super admins page".to_string()));
        }
        Ok(())
    }

    pub async fn user_listed(&self, email: &str) -> bool {
        match self.base.config.selectors.format("assignment.row", email) {
            Ok(row) => self.base.wait_for_raw(&row, self.base.config.timeouts.element()).await,
            Err(_) => false,
        }
    }

    /// Click the action button on the user's row and wait for the dialog
    pub async fn open_assign_dialog(&self, email: &str) -> E2eResult<()> {
        let action = self.base.config.selectors.format("assignment.row_action", email)?;
        self.base.page.click(&action, self.base.config.timeouts.element()).await?;
        if !self.base.wait_for_element("assignment.dialog").await {
            return Err(E2eError::Timeout(format!("assignment dialog for {}", email)));
        }
        Ok(())
    }

    /// Select tenant, then user group, then team by visible text and submit.
    ///
    /// Each dropdown is populated from the previous choice; Playwright waits
    /// for the requested option to appear before selecting it.
    pub async fn assign_user(&self, target: &AssignmentTarget) -> E2eResult<()> {
        info!(
            "Assigning {} to {} / {} / {}",
            target.user_email, target.tenant, target.user_group, target.team
        );
        let timeout = self.base.config.timeouts.element();

        self.open_assign_dialog(&target.user_email).await?;
        self.base
            .page
            .select_option_by_label(self.base.selector("assignment.tenant_select")?, &target.tenant, timeout)
            .await?;
        self.base
            .page
            .select_option_by_label(self.base.selector("assignment.group_select")?, &target.user_group, timeout)
            .await?;
        self.base
            .page
            .select_option_by_label(self.base.selector("assignment.team_select")?, &target.team, timeout)
            .await?;
        self.base.click_element("assignment.submit").await?;

        let dialog = self.base.selector("assignment.dialog")?;
        if !self.base.wait_for_hidden(dialog).await {
            return Err(E2eError::AssertionFailed("assignment dialog did not close".to_string()));
        }
        self.base.wait_for_network_idle().await
    }

    /// Whether the user's row now mentions the tenant
    pub async fn assignment_visible(&self, email: &str, tenant: &str) -> E2eResult<bool> {
        let row = self.base.config.selectors.format("assignment.row", email)?;
        if !self.base.wait_for_raw(&row, self.base.config.timeouts.element()).await {
            return Ok(false);
        }
        let text = self.base.page.text_content(&row).await?.unwrap_or_default();
        Ok(text.contains(tenant))
    }
}
