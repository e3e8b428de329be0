//! Login screen, including the federated (SSO) sign-in

use std::time::Duration;

use tracing::{debug, info};

use super::BasePage;
use crate::config::{Credentials, PortalConfig};
use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;

pub struct LoginPage<'a> {
    pub base: BasePage<'a>,
}

impl<'a> LoginPage<'a> {
    pub fn new(page: &'a Page, config: &'a PortalConfig) -> Self {
        Self {
            base: BasePage::new(page, config),
        }
    }

    /// Navigate to the login page and wait for the e-mail field
    pub async fn open(&self) -> E2eResult<()> {
        self.base.navigate(&self.base.config.portal.login_path).await?;
        if !self.base.wait_for_element("login.email").await {
            return Err(E2eError::Timeout("login form".to_string()));
        }
        Ok(())
    }

    /// Fill e-mail and password, submit, and wait for the network to settle
    pub async fn login(&self, credentials: &Credentials) -> E2eResult<()> {
        info!("Logging in as {}", credentials.email);
        self.base.fill_input("login.email", &credentials.email).await?;
        self.base.fill_input("login.password", &credentials.password).await?;
        self.base.click_element("login.submit").await?;
        self.base.wait_for_network_idle().await
    }

    pub async fn login_as_admin(&self) -> E2eResult<()> {
        self.login(&self.base.config.credentials.admin).await
    }

    /// Open the login page, sign in as admin, and require the dashboard
    pub async fn open_and_login(&self) -> E2eResult<()> {
        self.open().await?;
        self.login_as_admin().await?;
        if !self.is_logged_in().await {
            return Err(E2eError::AssertionFailed(format!(
                "dashboard not shown after logging in as {}",
                self.base.config.credentials.admin.email
            )));
        }
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.base.wait_for_element("dashboard.marker").await
    }

    pub async fn is_on_login_page(&self) -> bool {
        self.base.is_element_visible("login.email").await
    }

    pub async fn error_message(&self) -> Option<String> {
        if !self.base.wait_for_element("login.error").await {
            return None;
        }
        self.base.element_text("login.error").await.ok()
    }

    /// Sign in through the identity provider and wait to land back on the portal
    pub async fn login_with_federated_identity(&self, credentials: &Credentials) -> E2eResult<()> {
        let config = self.base.config;
        let navigation = Duration::from_millis(config.timeouts.navigation);

        info!("Federated login as {}", credentials.email);
        self.base.click_element("login.sso_button").await?;
        let idp_url = self
            .base
            .page
            .wait_for_url(&config.portal.identity_provider_pattern, navigation)
            .await?;
        debug!("Redirected to identity provider: {}", idp_url);

        self.base.fill_input("sso.email", &credentials.email).await?;
        self.base.click_element("sso.submit").await?;
        if !self.base.wait_for_element("sso.password").await {
            return Err(E2eError::Timeout("identity provider password field".to_string()));
        }
        self.base.fill_input("sso.password", &credentials.password).await?;
        self.base.click_element("sso.submit").await?;

        // "Stay signed in?" prompt only shows for some tenants
        if self
            .base
            .wait_for_element_within("sso.stay_signed_in", config.timeouts.short_wait() * 3)
            .await
        {
            self.base.click_element("sso.submit").await?;
        }

        let portal_pattern = format!("^{}", regex::escape(config.portal.base_url.trim_end_matches('/')));
        self.base.page.wait_for_url(&portal_pattern, navigation).await?;
        self.base.wait_for_network_idle().await
    }

    pub async fn logout(&self) -> E2eResult<()> {
        self.base.click_element("dashboard.user_menu").await?;
        self.base.click_element("dashboard.logout").await?;
        if !self.base.wait_for_element("login.email").await {
            return Err(E2eError::Timeout("login form after logout".to_string()));
        }
        Ok(())
    }
}
