//! Sidebar navigation and routing

use std::time::Duration;

use tracing::info;

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::playwright::LoadState;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("navigation-sidebar", &["navigation", "smoke"], navigation_sidebar),
        Scenario::new("navigation-direct-urls", &["navigation"], navigation_direct_urls),
        Scenario::new("navigation-unknown-route", &["navigation"], navigation_unknown_route),
    ]
}

async fn navigation_sidebar(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();

    let items = dashboard.sidebar_items().await?;
    info!("Sidebar items: {:?}", items);
    ensure!(!items.is_empty(), "sidebar has no items");

    dashboard.navigate_to_tenants().await?;
    ensure!(
        dashboard.base.wait_for_element("tenant.add_button").await,
        "tenant list did not render"
    );

    dashboard.navigate_to_super_admins().await?;
    let heading = dashboard.heading().await?;
    ensure!(!heading.is_empty(), "super admins page has an empty heading");

    ctx.page.go_back(LoadState::DomContentLoaded).await?;
    let pattern = format!("{}$", regex::escape(&ctx.config.portal.tenants_path));
    let url = ctx
        .page
        .wait_for_url(&pattern, Duration::from_millis(ctx.config.timeouts.navigation))
        .await?;
    info!("Back navigation landed on {}", url);
    Ok(())
}

async fn navigation_direct_urls(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;

    for path in [
        ctx.config.dashboard_url(),
        ctx.config.tenants_url(),
        ctx.config.super_admins_url(),
    ] {
        let response = ctx.page.goto(&path, LoadState::DomContentLoaded).await?;
        if let Some(status) = response.status {
            ensure!(status < 400, "{} returned {}", path, status);
        }
        ensure!(
            !ctx.login_page().is_on_login_page().await,
            "{} bounced to the login page",
            path
        );
        let title = ctx.page.title().await?;
        ensure!(!title.trim().is_empty(), "{} has no document title", path);
    }
    Ok(())
}

async fn navigation_unknown_route(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let url = ctx.config.url("/this-route-does-not-exist");
    let response = ctx.page.goto(&url, LoadState::DomContentLoaded).await?;

    if let Some(status) = response.status {
        ensure!(status < 500, "unknown route returned {}", status);
    }
    let body: String = ctx
        .page
        .evaluate("() => document.body ? document.body.innerText : ''", serde_json::Value::Null)
        .await?;
    ensure!(!body.trim().is_empty(), "unknown route rendered an empty page");

    let errors = ctx.page.console_errors().await?;
    if !errors.is_empty() {
        info!("Console errors on unknown route: {:?}", errors);
    }
    Ok(())
}
