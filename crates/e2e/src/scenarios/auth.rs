//! Login, federated login and logout

use serde_json::json;

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("login-valid-credentials", &["auth", "smoke"], login_valid_credentials),
        Scenario::new("login-submit-with-enter", &["auth"], login_submit_with_enter),
        Scenario::new("login-invalid-credentials", &["auth"], login_invalid_credentials),
        Scenario::new("login-empty-fields", &["auth"], login_empty_fields),
        Scenario::new("login-federated-identity", &["auth", "sso"], login_federated_identity),
        Scenario::new("logout-returns-to-login", &["auth", "smoke"], logout_returns_to_login),
    ]
}

async fn login_valid_credentials(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    login.login_as_admin().await?;

    ensure!(login.is_logged_in().await, "dashboard not visible after login");
    let url = ctx.page.url().await?;
    ensure!(
        !url.ends_with(&ctx.config.portal.login_path),
        "still on the login page: {}",
        url
    );
    Ok(())
}

async fn login_submit_with_enter(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    let admin = &ctx.config.credentials.admin;
    login.base.fill_input("login.email", &admin.email).await?;
    login.base.fill_input("login.password", &admin.password).await?;
    ctx.page
        .press(login.base.selector("login.password")?, "Enter")
        .await?;

    ensure!(login.is_logged_in().await, "Enter in the password field did not sign in");
    Ok(())
}

async fn login_invalid_credentials(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    login.login(&ctx.config.credentials.invalid).await?;

    let message = login.error_message().await;
    ensure!(message.is_some(), "no error shown for invalid credentials");
    ensure!(login.is_on_login_page().await, "left the login page with invalid credentials");
    ensure!(
        !login.base.is_element_visible("dashboard.marker").await,
        "dashboard visible with invalid credentials"
    );
    Ok(())
}

async fn login_empty_fields(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    login.base.click_element("login.submit").await?;

    ensure!(login.is_on_login_page().await, "empty form navigated away");
    let email = login.base.selector("login.email")?;
    let invalid: bool = ctx
        .page
        .evaluate(
            "(sel) => { const el = document.querySelector(sel); return !!el && !el.checkValidity(); }",
            json!(email),
        )
        .await?;
    ensure!(invalid, "empty e-mail field reported as valid");
    Ok(())
}

async fn login_federated_identity(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    login
        .login_with_federated_identity(&ctx.config.credentials.federated)
        .await?;

    ensure!(login.is_logged_in().await, "dashboard not visible after federated login");
    Ok(())
}

async fn logout_returns_to_login(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let login = ctx.login_page();
    login.logout().await?;

    ensure!(login.is_on_login_page().await, "login form not shown after logout");
    Ok(())
}
