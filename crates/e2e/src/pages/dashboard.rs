//! Dashboard shell: sidebar navigation, theme toggle, user menu

use std::fmt;
use std::time::Duration;

use serde_json::json;

use super::BasePage;
use crate::config::PortalConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
    Other(String),
}

impl Theme {
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" | "" => Theme::Light,
            "dark" => Theme::Dark,
            other => Theme::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
            Theme::Other(name) => write!(f, "{}", name),
        }
    }
}

const THEME_PROBE: &str = r#"() => {
  const root = document.documentElement;
  const attr = root.getAttribute('data-theme');
  if (attr) return attr;
  return root.classList.contains('dark') ? 'dark' : 'light';
}"#;

pub struct DashboardPage<'a> {
    pub base: BasePage<'a>,
}

impl<'a> DashboardPage<'a> {
    pub fn new(page: &'a Page, config: &'a PortalConfig) -> Self {
        Self {
            base: BasePage::new(page, config),
        }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.base.navigate(&self.base.config.portal.dashboard_path).await?;
        Ok(())
    }

    pub async fn is_loaded(&self) -> bool {
        self.base.wait_for_element("dashboard.marker").await
    }

    pub async fn toggle_theme(&self) -> E2eResult<()> {
        self.base.click_element("dashboard.theme_toggle").await?;
        // let the CSS transition finish before anything reads styles
        self.base.pause().await
    }

    pub async fn current_theme(&self) -> E2eResult<Theme> {
        let value: String = self.base.page.evaluate(THEME_PROBE, json!(null)).await?;
        Ok(Theme::from_attr(&value))
    }

    pub async fn navigate_to_tenants(&self) -> E2eResult<()> {
        self.navigate_via("nav.tenants", &self.base.config.portal.tenants_path)
            .await
    }

    pub async fn navigate_to_super_admins(&self) -> E2eResult<()> {
        self.navigate_via("nav.super_admins", &self.base.config.portal.super_admins_path)
            .await
    }

    async fn navigate_via(&self, link: &str, path: &str) -> E2eResult<()> {
        self.base.click_element(link).await?;
        let pattern = format!("{}$", regex::escape(path));
        self.base
            .page
            .wait_for_url(&pattern, Duration::from_millis(self.base.config.timeouts.navigation))
            .await?;
        Ok(())
    }

    pub async fn sidebar_items(&self) -> E2eResult<Vec<String>> {
        let selector = self.base.selector("dashboard.sidebar_items")?;
        let items = self.base.page.all_text_contents(selector).await?;
        Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub async fn user_menu_visible(&self) -> bool {
        self.base.is_element_visible("dashboard.user_menu").await
    }

    pub async fn heading(&self) -> E2eResult<String> {
        if !self.base.wait_for_element("page.heading").await {
            return Err(E2eError::Timeout("page heading".to_string()));
        }
        self.base.element_text("page.heading").await
    }
}
