//! Scenario registry
//!
//! A scenario is a named, tagged async function run against a fresh browser
//! context. Each module below contributes one group.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::PortalConfig;
use crate::error::E2eResult;
use crate::pages::{DashboardPage, LoginPage, TenantPage, UserAssignmentPage};
use crate::playwright::{Browser, BrowserContext, Page};
use crate::portal::PortalProbe;
use crate::visual::{VisualConfig, VisualTester};

mod accessibility;
mod assignment;
mod auth;
mod comprehensive;
mod navigation;
mod performance;
mod security;
mod tenant;
mod theme;
mod visual;

pub use accessibility::{contrast_ratio, parse_css_color};
pub use comprehensive::COMPREHENSIVE_STEPS;

type ScenarioFn = Arc<dyn Fn(ScenarioContext) -> BoxFuture<'static, E2eResult<()>> + Send + Sync>;

#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    run: ScenarioFn,
}

impl Scenario {
    pub fn new<F, Fut>(name: &'static str, tags: &'static [&'static str], f: F) -> Self
    where
        F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        Self {
            name,
            tags,
            run: Arc::new(move |ctx: ScenarioContext| f(ctx).boxed()),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }

    pub async fn run(&self, ctx: ScenarioContext) -> E2eResult<()> {
        (self.run)(ctx).await
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Everything a scenario may touch. The runner keeps its own handles to the
/// page and context for failure screenshots and cleanup.
#[derive(Clone)]
pub struct ScenarioContext {
    pub name: &'static str,
    pub config: Arc<PortalConfig>,
    pub browser: Arc<Browser>,
    pub context: Arc<BrowserContext>,
    pub page: Arc<Page>,
    /// Promote visual screenshots to baselines instead of comparing
    pub update_baselines: bool,
}

impl ScenarioContext {
    pub fn login_page(&self) -> LoginPage<'_> {
        LoginPage::new(&self.page, &self.config)
    }

    pub fn dashboard(&self) -> DashboardPage<'_> {
        DashboardPage::new(&self.page, &self.config)
    }

    pub fn tenants(&self) -> TenantPage<'_> {
        TenantPage::new(&self.page, &self.config)
    }

    pub fn assignments(&self) -> UserAssignmentPage<'_> {
        UserAssignmentPage::new(&self.page, &self.config)
    }

    pub fn probe(&self) -> E2eResult<PortalProbe> {
        PortalProbe::new(&self.config.portal.base_url)
    }

    pub fn visual(&self) -> E2eResult<VisualTester> {
        VisualTester::new(VisualConfig::from(&self.config.artifacts))
    }

    /// Log in as the admin user and require the dashboard
    pub async fn sign_in(&self) -> E2eResult<()> {
        self.login_page().open_and_login().await
    }
}

/// Every registered scenario, in declaration order
pub fn all() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(auth::scenarios());
    scenarios.extend(tenant::scenarios());
    scenarios.extend(assignment::scenarios());
    scenarios.extend(theme::scenarios());
    scenarios.extend(navigation::scenarios());
    scenarios.extend(comprehensive::scenarios());
    scenarios.extend(security::scenarios());
    scenarios.extend(performance::scenarios());
    scenarios.extend(accessibility::scenarios());
    scenarios.extend(visual::scenarios());
    scenarios
}

/// Launch a browser over a scripted bridge and open one context and page
#[cfg(all(test, unix))]
pub(crate) async fn fake_context(
    fake: &crate::playwright::fake_node::FakeBridge,
    config: PortalConfig,
) -> ScenarioContext {
    let browser = Browser::launch(fake.config.clone(), &config.browser, &config.timeouts)
        .await
        .unwrap();
    let context = browser.new_context(config.viewport).await.unwrap();
    let page = context.new_page().await.unwrap();
    ScenarioContext {
        name: "fake",
        config: Arc::new(config),
        browser: Arc::new(browser),
        context: Arc::new(context),
        page: Arc::new(page),
        update_baselines: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let scenarios = all();
        let names: HashSet<_> = scenarios.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn test_every_scenario_is_tagged() {
        for scenario in all() {
            assert!(!scenario.tags.is_empty(), "{} has no tags", scenario.name);
        }
    }

    #[test]
    fn test_every_group_registered() {
        let scenarios = all();
        for tag in [
            "auth",
            "sso",
            "tenant",
            "assignment",
            "theme",
            "navigation",
            "comprehensive",
            "security",
            "performance",
            "accessibility",
            "visual",
            "smoke",
        ] {
            assert!(
                scenarios.iter().any(|s| s.has_tag(tag)),
                "no scenario tagged {}",
                tag
            );
        }
    }
}
