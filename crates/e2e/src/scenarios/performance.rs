//! Page-load timing, concurrent sessions, and JS heap growth

use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tracing::{info, warn};

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::{E2eError, E2eResult};
use crate::pages::LoginPage;
use crate::playwright::{BrowserContext, LoadState, Page};

/// Navigation timing of the current document, in milliseconds
const NAVIGATION_TIMING: &str = r#"() => {
  const [nav] = performance.getEntriesByType('navigation');
  if (!nav || !nav.loadEventEnd) return null;
  return nav.loadEventEnd - nav.startTime;
}"#;

/// Chromium-only heap counter; null elsewhere
const HEAP_USED: &str = "() => (performance.memory ? performance.memory.usedJSHeapSize : null)";

const MEMORY_LOOP_ITERATIONS: usize = 5;

/// Slack allowed when comparing a cached reload against the first load
const RELOAD_TOLERANCE: f64 = 1.1;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("perf-login-page-load", &["performance", "smoke"], perf_login_page_load),
        Scenario::new("perf-dashboard-load", &["performance"], perf_dashboard_load),
        Scenario::new("perf-cached-reload-faster", &["performance"], perf_cached_reload_faster),
        Scenario::new("perf-concurrent-logins", &["performance", "auth"], perf_concurrent_logins),
        Scenario::new("perf-memory-growth", &["performance"], perf_memory_growth),
        Scenario::new("perf-api-response-times", &["performance"], perf_api_response_times),
    ]
}

/// Wall-clock time of a navigation, preferring the browser's own timing
async fn timed_goto(page: &Page, url: &str) -> E2eResult<Duration> {
    let start = Instant::now();
    page.goto(url, LoadState::Load).await?;
    let wall = start.elapsed();
    let timing: Option<f64> = page.evaluate(NAVIGATION_TIMING, serde_json::Value::Null).await?;
    Ok(timing.map(|ms| Duration::from_secs_f64(ms / 1000.0)).unwrap_or(wall))
}

async fn perf_login_page_load(ctx: ScenarioContext) -> E2eResult<()> {
    let limit = Duration::from_millis(ctx.config.performance.max_page_load_ms);
    let elapsed = timed_goto(&ctx.page, &ctx.config.login_url()).await?;
    info!("Login page loaded in {:?}", elapsed);

    ensure!(
        ctx.login_page().base.wait_for_element("login.email").await,
        "login form not rendered"
    );
    ensure!(elapsed <= limit, "login page took {:?} (limit {:?})", elapsed, limit);
    Ok(())
}

async fn perf_dashboard_load(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let limit = Duration::from_millis(ctx.config.performance.max_page_load_ms);

    let start = Instant::now();
    ctx.page.goto(&ctx.config.dashboard_url(), LoadState::Load).await?;
    let dashboard = ctx.dashboard();
    ensure!(dashboard.is_loaded().await, "dashboard did not render");
    let elapsed = start.elapsed();
    info!("Dashboard rendered in {:?}", elapsed);

    ensure!(elapsed <= limit, "dashboard took {:?} (limit {:?})", elapsed, limit);
    Ok(())
}

async fn perf_cached_reload_faster(ctx: ScenarioContext) -> E2eResult<()> {
    let url = ctx.config.login_url();
    let first = timed_goto(&ctx.page, &url).await?;
    let second = timed_goto(&ctx.page, &url).await?;
    info!("Login page: first load {:?}, cached load {:?}", first, second);

    ensure!(
        second <= first.mul_f64(RELOAD_TOLERANCE),
        "cached load {:?} slower than first load {:?}",
        second,
        first
    );
    Ok(())
}

async fn perf_concurrent_logins(ctx: ScenarioContext) -> E2eResult<()> {
    let users = ctx.config.performance.concurrent_users;
    let limit = Duration::from_millis(ctx.config.performance.max_concurrent_login_ms);

    let mut contexts = Vec::with_capacity(users);
    let mut pages = Vec::with_capacity(users);
    let outcome = match open_sessions(&ctx, users, &mut contexts, &mut pages).await {
        Ok(()) => {
            info!("Simulating {} concurrent logins", users);
            let logins = pages.iter().map(|page| {
                let config = &ctx.config;
                async move {
                    let start = Instant::now();
                    LoginPage::new(page, config).open_and_login().await?;
                    Ok::<Duration, E2eError>(start.elapsed())
                }
            });
            try_join_all(logins).await
        }
        Err(e) => Err(e),
    };

    for context in &contexts {
        if let Err(e) = context.close().await {
            warn!("Failed to close context {}: {}", context.id(), e);
        }
    }

    let durations = outcome?;
    let slowest = durations.iter().max().copied().unwrap_or_default();
    info!("Concurrent logins: {:?} (slowest {:?})", durations, slowest);
    ensure!(slowest <= limit, "slowest concurrent login took {:?} (limit {:?})", slowest, limit);
    Ok(())
}

/// Open one context and page per simulated user. Every context is recorded
/// before its page is opened, so the caller can close all of them.
async fn open_sessions(
    ctx: &ScenarioContext,
    users: usize,
    contexts: &mut Vec<BrowserContext>,
    pages: &mut Vec<Page>,
) -> E2eResult<()> {
    for _ in 0..users {
        contexts.push(ctx.browser.new_context(ctx.config.viewport).await?);
        if let Some(context) = contexts.last() {
            pages.push(context.new_page().await?);
        }
    }
    Ok(())
}

async fn perf_memory_growth(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();

    let before: Option<f64> = ctx.page.evaluate(HEAP_USED, serde_json::Value::Null).await?;
    let Some(before) = before else {
        info!("performance.memory unavailable in {}; skipping", ctx.browser.kind().as_str());
        return Ok(());
    };

    for _ in 0..MEMORY_LOOP_ITERATIONS {
        dashboard.navigate_to_tenants().await?;
        dashboard.base.wait_for_network_idle().await?;
        dashboard.navigate_to_super_admins().await?;
        dashboard.base.wait_for_network_idle().await?;
    }

    let after: Option<f64> = ctx.page.evaluate(HEAP_USED, serde_json::Value::Null).await?;
    let growth_mb = (after.unwrap_or(before) - before) / (1024.0 * 1024.0);
    info!("JS heap grew {:.1} MB over {} navigation loops", growth_mb, MEMORY_LOOP_ITERATIONS);

    let limit = ctx.config.performance.max_memory_growth_mb;
    ensure!(growth_mb <= limit, "heap grew {:.1} MB (limit {:.1} MB)", growth_mb, limit);
    Ok(())
}

async fn perf_api_response_times(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    ctx.page.clear_network_log().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;
    tenants.base.wait_for_network_idle().await?;

    let limit_ms = ctx.config.performance.max_page_load_ms as f64;
    let calls: Vec<_> = ctx
        .page
        .network_log()
        .await?
        .into_iter()
        .filter(|e| e.resource_type == "fetch" || e.resource_type == "xhr")
        .collect();
    info!("Observed {} API calls", calls.len());

    for call in &calls {
        let Some(ms) = call.duration_ms else { continue };
        ensure!(
            ms <= limit_ms,
            "{} {} took {:.0} ms (limit {:.0} ms)",
            call.method,
            call.url,
            ms,
            limit_ms
        );
        if let Some(status) = call.status {
            ensure!(status < 500, "{} {} returned {}", call.method, call.url, status);
        }
    }
    Ok(())
}
