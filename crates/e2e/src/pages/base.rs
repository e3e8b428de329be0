//! Helpers shared by every page object

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::error::E2eResult;
use crate::playwright::{LoadState, NavigationResponse, Page, WaitState};

/// Shared page-object base: a page handle plus the suite configuration.
///
/// Existence checks return `bool`; a browser error while waiting counts as
/// "not there".
#[derive(Clone, Copy)]
pub struct BasePage<'a> {
    pub page: &'a Page,
    pub config: &'a PortalConfig,
}

impl<'a> BasePage<'a> {
    pub fn new(page: &'a Page, config: &'a PortalConfig) -> Self {
        Self { page, config }
    }

    pub fn selector(&self, name: &str) -> E2eResult<&'a str> {
        self.config.selectors.get(name)
    }

    fn element_timeout(&self) -> Duration {
        self.config.timeouts.element()
    }

    pub async fn navigate(&self, path: &str) -> E2eResult<NavigationResponse> {
        let url = self.config.url(path);
        debug!("Navigating to {}", url);
        self.page.goto(&url, LoadState::DomContentLoaded).await
    }

    pub async fn wait_for_element(&self, name: &str) -> bool {
        match self.selector(name) {
            Ok(selector) => self.wait_for_raw(selector, self.element_timeout()).await,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }

    pub async fn wait_for_element_within(&self, name: &str, timeout: Duration) -> bool {
        match self.selector(name) {
            Ok(selector) => self.wait_for_raw(selector, timeout).await,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }

    pub async fn wait_for_raw(&self, selector: &str, timeout: Duration) -> bool {
        match self
            .page
            .wait_for_selector(selector, WaitState::Visible, timeout)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Element {} not visible: {}", selector, e);
                false
            }
        }
    }

    pub async fn wait_for_hidden(&self, selector: &str) -> bool {
        self.page
            .wait_for_selector(selector, WaitState::Hidden, self.element_timeout())
            .await
            .is_ok()
    }

    pub async fn is_element_visible(&self, name: &str) -> bool {
        match self.selector(name) {
            Ok(selector) => self.page.is_visible(selector).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Wait for the element to be visible, then click it
    pub async fn click_element(&self, name: &str) -> E2eResult<()> {
        let selector = self.selector(name)?;
        self.page.click(selector, self.element_timeout()).await
    }

    pub async fn fill_input(&self, name: &str, value: &str) -> E2eResult<()> {
        let selector = self.selector(name)?;
        self.page.fill(selector, value, self.element_timeout()).await
    }

    pub async fn element_text(&self, name: &str) -> E2eResult<String> {
        let selector = self.selector(name)?;
        Ok(self
            .page
            .text_content(selector)
            .await?
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    pub async fn wait_for_network_idle(&self) -> E2eResult<()> {
        self.page
            .wait_for_load_state(
                LoadState::NetworkIdle,
                Duration::from_millis(self.config.timeouts.network_idle),
            )
            .await
    }

    pub async fn pause(&self) -> E2eResult<()> {
        self.page.wait_for_timeout(self.config.timeouts.short_wait()).await
    }

    /// Full-page screenshot under the screenshot directory with a timestamped name
    pub async fn take_screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        let path = self
            .config
            .artifacts
            .screenshot_dir
            .join(screenshot_file_name(name, Local::now()));
        self.page.screenshot(&path, true).await?;
        info!("Screenshot saved: {}", path.display());
        Ok(path)
    }
}

/// `<name>-<YYYYmmdd-HHMMSS>.png`, with anything outside `[A-Za-z0-9_-]` replaced
pub fn screenshot_file_name(name: &str, at: DateTime<Local>) -> String {
    let clean: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-{}.png", clean, at.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_screenshot_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(screenshot_file_name("login-page", at), "login-page-20240309-140507.png");
        assert_eq!(screenshot_file_name("tenant @#$%", at), "tenant_____-20240309-140507.png");
    }
}
