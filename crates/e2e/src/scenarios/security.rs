//! Security checks against the live portal

use tracing::{info, warn};

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::pages::TenantForm;
use crate::playwright::LoadState;

/// Opens an alert if the portal renders the tenant name as HTML
const SCRIPT_PAYLOAD: &str = "<img src=x onerror=alert('xss')>";

const SQL_PAYLOAD: &str = "' OR '1'='1' --";

/// Session tokens the auth library keeps in local storage
const TOKEN_PROBE: &str = r#"() => Object.keys(window.localStorage)
  .filter((k) => /accessToken|idToken|refreshToken/.test(k))"#;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("security-password-masked", &["security"], security_password_masked),
        Scenario::new(
            "security-no-credentials-in-urls",
            &["security"],
            security_no_credentials_in_urls,
        ),
        Scenario::new("security-https-transport", &["security"], security_https_transport),
        Scenario::new("security-response-headers", &["security"], security_response_headers),
        Scenario::new("security-protected-routes", &["security"], security_protected_routes),
        Scenario::new(
            "security-session-cleared-on-logout",
            &["security", "auth"],
            security_session_cleared_on_logout,
        ),
        Scenario::new("security-script-injection", &["security", "tenant"], security_script_injection),
        Scenario::new("security-sql-injection-login", &["security", "auth"], security_sql_injection_login),
    ]
}

async fn security_password_masked(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    let password = login.base.selector("login.password")?;

    let kind = ctx.page.get_attribute(password, "type").await?;
    ensure!(kind.as_deref() == Some("password"), "password input type is {:?}", kind);

    login.base.fill_input("login.password", "visible?").await?;
    let kind = ctx.page.get_attribute(password, "type").await?;
    ensure!(kind.as_deref() == Some("password"), "password unmasked after typing");

    let autocomplete = ctx.page.get_attribute(password, "autocomplete").await?;
    if autocomplete.as_deref() == Some("on") {
        warn!("Password field allows autocomplete");
    }
    Ok(())
}

async fn security_no_credentials_in_urls(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    ctx.page.clear_network_log().await?;
    login.login_as_admin().await?;

    let admin = &ctx.config.credentials.admin;
    let encoded_email = admin.email.replace('@', "%40");
    let requests = ctx.page.network_log().await?;
    info!("Inspecting {} requests", requests.len());
    for entry in &requests {
        ensure!(
            !entry.url.contains(&admin.email) && !entry.url.contains(&encoded_email),
            "e-mail leaked in {} {}",
            entry.method,
            entry.url
        );
        ensure!(
            !entry.url.contains(&admin.password),
            "password leaked in {} {}",
            entry.method,
            entry.url
        );
    }
    Ok(())
}

async fn security_https_transport(ctx: ScenarioContext) -> E2eResult<()> {
    let base = &ctx.config.portal.base_url;
    if !base.starts_with("https://") {
        warn!("Base URL {} is not HTTPS; transport checks skipped", base);
        return Ok(());
    }

    let login = ctx.login_page();
    login.open().await?;
    ctx.page.clear_network_log().await?;
    login.login_as_admin().await?;
    for entry in ctx.page.network_log().await? {
        ensure!(
            entry.url.starts_with("https://") || entry.url.starts_with("data:") || entry.url.starts_with("blob:"),
            "insecure request: {}",
            entry.url
        );
    }

    let cookies = ctx.context.cookies().await?;
    for cookie in cookies.iter().filter(|c| !c.secure) {
        warn!("Cookie {} on {} is not marked Secure", cookie.name, cookie.domain);
    }

    let plain = base.replacen("https://", "http://", 1);
    match ctx.probe()?.fetch_no_redirect(&plain).await {
        Ok(resp) => {
            let location = resp.header("location").unwrap_or_default();
            ensure!(
                (300..400).contains(&resp.status) && location.starts_with("https://"),
                "plain HTTP answered {} (location: '{}')",
                resp.status,
                location
            );
        }
        Err(e) => info!("Plain HTTP not served: {}", e),
    }
    Ok(())
}

async fn security_response_headers(ctx: ScenarioContext) -> E2eResult<()> {
    let resp = ctx.probe()?.fetch(&ctx.config.portal.login_path).await?;
    info!("Login page answered {} with {} headers", resp.status, resp.headers.len());

    ensure!(
        resp.header("x-frame-options").is_some()
            || resp
                .header("content-security-policy")
                .map(|csp| csp.contains("frame-ancestors"))
                .unwrap_or(false),
        "no clickjacking protection (X-Frame-Options or CSP frame-ancestors)"
    );
    ensure!(
        resp.header("x-content-type-options")
            .map(|v| v.eq_ignore_ascii_case("nosniff"))
            .unwrap_or(false),
        "X-Content-Type-Options: nosniff missing"
    );
    if resp.url.starts_with("https://") {
        ensure!(
            resp.header("strict-transport-security").is_some(),
            "Strict-Transport-Security missing"
        );
    }
    Ok(())
}

async fn security_protected_routes(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    for path in [
        &ctx.config.portal.dashboard_path,
        &ctx.config.portal.tenants_path,
        &ctx.config.portal.super_admins_path,
    ] {
        ctx.page.goto(&ctx.config.url(path), LoadState::DomContentLoaded).await?;
        ensure!(
            login.base.wait_for_element("login.email").await,
            "{} reachable without signing in",
            path
        );
        ensure!(
            !login.base.is_element_visible("dashboard.marker").await,
            "{} rendered the dashboard without signing in",
            path
        );
    }
    Ok(())
}

async fn security_session_cleared_on_logout(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let login = ctx.login_page();
    login.logout().await?;

    let tokens: Vec<String> = ctx.page.evaluate(TOKEN_PROBE, serde_json::Value::Null).await?;
    ensure!(tokens.is_empty(), "tokens left in local storage: {:?}", tokens);

    ctx.page.goto(&ctx.config.dashboard_url(), LoadState::DomContentLoaded).await?;
    ensure!(
        login.base.wait_for_element("login.email").await,
        "dashboard reachable after logout"
    );
    Ok(())
}

async fn security_script_injection(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let mut form = TenantForm::unique("QA Injection");
    form.name = SCRIPT_PAYLOAD.to_string();
    tenants.create_tenant(&form).await?;
    ctx.page.reload(LoadState::NetworkIdle).await?;
    tenants.search(SCRIPT_PAYLOAD).await?;

    let dialogs = ctx.page.dialogs().await?;
    let listed = tenants.tenant_exists(SCRIPT_PAYLOAD).await;
    if listed {
        tenants.delete_tenant(SCRIPT_PAYLOAD).await?;
    }

    ensure!(dialogs.is_empty(), "injected script ran: {:?}", dialogs);
    ensure!(listed, "payload tenant not rendered as text");
    Ok(())
}

async fn security_sql_injection_login(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    login
        .login(&crate::config::Credentials::new(SQL_PAYLOAD, SQL_PAYLOAD))
        .await?;

    ensure!(
        !login.base.is_element_visible("dashboard.marker").await,
        "SQL payload signed in"
    );
    ensure!(login.is_on_login_page().await, "SQL payload left the login page");
    Ok(())
}
