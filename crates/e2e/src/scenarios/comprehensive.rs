//! Full manual QA script, replayed step by step.
//!
//! Every step is logged with its number so a failure report reads like the
//! script it came from. The tenant name `@#$%` is part of the script and is
//! kept as-is.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::{E2eError, E2eResult};
use crate::pages::{Theme, TenantForm};
use crate::playwright::LoadState;

/// Tenant name used by the script
const SCRIPT_TENANT_NAME: &str = "@#$%";

pub const COMPREHENSIVE_STEPS: [&str; 71] = [
    // login page
    "Open the login page",
    "Verify the e-mail field is visible",
    "Verify the password field is visible",
    "Verify the sign-in button is visible",
    "Verify the password field masks its input",
    "Verify the forgot-password link is visible",
    "Verify the federated sign-in button is visible",
    "Submit the empty login form",
    "Verify the login page is still shown",
    "Enter invalid credentials",
    "Submit the invalid credentials",
    "Verify an error message is shown",
    "Reload the login page",
    "Enter the admin e-mail and password",
    "Submit the login form",
    "Verify the dashboard is shown",
    // dashboard
    "Take a dashboard screenshot",
    "Verify the sidebar is visible",
    "Verify the user menu is visible",
    "Read the current theme",
    "Toggle the theme",
    "Verify the theme changed and toggle it back",
    // tenants
    "Navigate to Tenants from the sidebar",
    "Verify the tenant list is shown",
    "Record the number of tenant rows",
    "Open the new tenant form",
    "Submit the empty tenant form",
    "Verify a required-field error is shown",
    "Enter the tenant name @#$%",
    "Enter the tenant e-mail",
    "Enter the tenant domain",
    "Enter the tenant description",
    "Submit the tenant form",
    "Verify the tenant list is shown again",
    "Search for @#$%",
    "Verify the @#$% tenant is listed",
    "Clear the search",
    "Verify @#$% is listed with the search cleared",
    "Open the edit form for @#$%",
    "Verify the edit form shows the current name",
    "Rename the tenant",
    "Save the tenant",
    "Verify the renamed tenant is listed",
    "Verify @#$% is no longer listed",
    "Search for the renamed tenant",
    "Verify exactly one row matches",
    "Clear the search again",
    "Take a tenant list screenshot",
    "Reload the tenant list and verify the rename persisted",
    // super admins
    "Navigate to Super Admins from the sidebar",
    "Verify the Super Admins heading is shown",
    "Verify the assignment user is listed",
    "Open the assignment dialog",
    "Verify the tenant dropdown is visible",
    "Select the tenant",
    "Select the user group",
    "Select the team",
    "Submit the assignment",
    "Verify the dialog closed",
    "Verify the user shows the assigned tenant",
    // cleanup
    "Go back to the tenant list",
    "Verify the tenant list is shown",
    "Click delete on the renamed tenant",
    "Confirm the deletion",
    "Verify the tenant is no longer listed",
    // session
    "Reload the dashboard",
    "Verify the session survived the reload",
    "Open the user menu",
    "Sign out",
    "Verify the login page is shown",
    "Verify the dashboard is no longer reachable",
];

/// Enforces step order and wraps failures with the step number
struct StepLog {
    next: usize,
}

impl StepLog {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn begin(&mut self, number: usize) -> E2eResult<&'static str> {
        let description = COMPREHENSIVE_STEPS
            .get(number.wrapping_sub(1))
            .copied()
            .filter(|_| number == self.next)
            .ok_or_else(|| E2eError::StepFailed {
                number,
                description: "out of order".to_string(),
                reason: format!("expected step {}", self.next),
            })?;
        info!("Step {}/{}: {}", number, COMPREHENSIVE_STEPS.len(), description);
        self.next += 1;
        Ok(description)
    }

    async fn step<T, Fut>(&mut self, number: usize, action: Fut) -> E2eResult<T>
    where
        Fut: Future<Output = E2eResult<T>>,
    {
        let description = self.begin(number)?;
        action.await.map_err(|e| E2eError::StepFailed {
            number,
            description: description.to_string(),
            reason: e.to_string(),
        })
    }

    async fn verify<Fut>(&mut self, number: usize, check: Fut) -> E2eResult<()>
    where
        Fut: Future<Output = bool>,
    {
        let description = self.begin(number)?;
        if !check.await {
            return Err(E2eError::StepFailed {
                number,
                description: description.to_string(),
                reason: "check failed".to_string(),
            });
        }
        Ok(())
    }

    fn finish(&self) -> E2eResult<()> {
        let ran = self.next - 1;
        ensure!(
            ran == COMPREHENSIVE_STEPS.len(),
            "script stopped after {} of {} steps",
            ran,
            COMPREHENSIVE_STEPS.len()
        );
        Ok(())
    }
}

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![Scenario::new(
        "comprehensive-manual-script",
        &["comprehensive"],
        comprehensive_manual_script,
    )]
}

async fn comprehensive_manual_script(ctx: ScenarioContext) -> E2eResult<()> {
    let config = &ctx.config;
    let page = &ctx.page;
    let login = ctx.login_page();
    let dashboard = ctx.dashboard();
    let tenants = ctx.tenants();
    let assignments = ctx.assignments();
    let element = config.timeouts.element();
    let mut log = StepLog::new();

    // login page
    log.step(1, login.open()).await?;
    log.verify(2, login.base.wait_for_element("login.email")).await?;
    log.verify(3, login.base.wait_for_element("login.password")).await?;
    log.verify(4, login.base.wait_for_element("login.submit")).await?;
    let password_type = log
        .step(5, page.get_attribute(login.base.selector("login.password")?, "type"))
        .await?;
    ensure!(password_type.as_deref() == Some("password"), "password field type is {:?}", password_type);
    log.verify(6, login.base.wait_for_element("login.forgot_password")).await?;
    log.verify(7, login.base.wait_for_element("login.sso_button")).await?;
    log.step(8, login.base.click_element("login.submit")).await?;
    log.verify(9, login.is_on_login_page()).await?;
    log.step(10, async {
        let invalid = &config.credentials.invalid;
        login.base.fill_input("login.email", &invalid.email).await?;
        login.base.fill_input("login.password", &invalid.password).await
    })
    .await?;
    log.step(11, async {
        login.base.click_element("login.submit").await?;
        login.base.wait_for_network_idle().await
    })
    .await?;
    log.verify(12, async { login.error_message().await.is_some() }).await?;
    log.step(13, login.open()).await?;
    log.step(14, async {
        let admin = &config.credentials.admin;
        login.base.fill_input("login.email", &admin.email).await?;
        login.base.fill_input("login.password", &admin.password).await
    })
    .await?;
    log.step(15, async {
        login.base.click_element("login.submit").await?;
        login.base.wait_for_network_idle().await
    })
    .await?;
    log.verify(16, login.is_logged_in()).await?;

    // dashboard
    log.step(17, dashboard.base.take_screenshot("comprehensive-dashboard")).await?;
    log.verify(18, dashboard.base.wait_for_element("dashboard.sidebar")).await?;
    log.verify(19, dashboard.user_menu_visible()).await?;
    let initial_theme: Theme = log.step(20, dashboard.current_theme()).await?;
    log.step(21, dashboard.toggle_theme()).await?;
    log.step(22, async {
        let toggled = dashboard.current_theme().await?;
        ensure!(toggled != initial_theme, "theme stayed {}", initial_theme);
        dashboard.toggle_theme().await
    })
    .await?;

    // tenants
    log.step(23, dashboard.navigate_to_tenants()).await?;
    log.verify(24, tenants.base.wait_for_element("tenant.add_button")).await?;
    let rows_before = log.step(25, tenants.row_count()).await?;
    debug!("{} tenant row(s) before creating {}", rows_before, SCRIPT_TENANT_NAME);
    log.step(26, tenants.start_create()).await?;
    log.step(27, tenants.base.click_element("tenant.submit")).await?;
    log.verify(28, async { tenants.validation_error().await.is_some() }).await?;

    let mut form = TenantForm::unique("QA Comprehensive");
    form.name = SCRIPT_TENANT_NAME.to_string();
    form.validate()?;
    log.step(29, tenants.base.fill_input("tenant.name", &form.name)).await?;
    log.step(30, tenants.base.fill_input("tenant.email", &form.email)).await?;
    log.step(31, tenants.base.fill_input("tenant.domain", &form.domain)).await?;
    log.step(32, tenants.base.fill_input("tenant.description", &form.description)).await?;
    log.step(33, tenants.submit()).await?;
    log.verify(34, tenants.base.wait_for_element("tenant.add_button")).await?;
    log.step(35, tenants.search(SCRIPT_TENANT_NAME)).await?;
    log.verify(36, tenants.tenant_exists(SCRIPT_TENANT_NAME)).await?;
    log.step(37, tenants.search("")).await?;
    log.verify(38, tenants.tenant_exists(SCRIPT_TENANT_NAME)).await?;

    let edit = config.selectors.format("tenant.row_edit", SCRIPT_TENANT_NAME)?;
    log.step(39, async {
        page.click(&edit, element).await?;
        ensure!(tenants.base.wait_for_element("tenant.name").await, "edit form not shown");
        Ok(())
    })
    .await?;
    log.step(40, async {
        let current = page.input_value(tenants.base.selector("tenant.name")?).await?;
        ensure!(current == SCRIPT_TENANT_NAME, "edit form shows '{}'", current);
        Ok(())
    })
    .await?;
    let renamed = TenantForm::unique("QA Comprehensive").name;
    log.step(41, tenants.base.fill_input("tenant.name", &renamed)).await?;
    log.step(42, tenants.submit()).await?;
    log.verify(43, tenants.tenant_exists(&renamed)).await?;
    let old_row = config.selectors.format("tenant.row", SCRIPT_TENANT_NAME)?;
    log.verify(44, tenants.base.wait_for_hidden(&old_row)).await?;
    log.step(45, tenants.search(&renamed)).await?;
    log.step(46, async {
        let rows = tenants.row_count().await?;
        ensure!(rows == 1, "{} rows match '{}'", rows, renamed);
        Ok(())
    })
    .await?;
    log.step(47, tenants.search("")).await?;
    log.step(48, tenants.base.take_screenshot("comprehensive-tenants")).await?;
    log.step(49, async {
        page.reload(LoadState::NetworkIdle).await?;
        ensure!(tenants.tenant_exists(&renamed).await, "'{}' gone after reload", renamed);
        Ok(())
    })
    .await?;

    // super admins
    let target = &config.credentials.assignment;
    log.step(50, dashboard.navigate_to_super_admins()).await?;
    log.verify(51, assignments.base.wait_for_element("page.heading")).await?;
    log.verify(52, assignments.user_listed(&target.user_email)).await?;
    log.step(53, assignments.open_assign_dialog(&target.user_email)).await?;
    log.verify(54, assignments.base.wait_for_element("assignment.tenant_select")).await?;
    log.step(
        55,
        page.select_option_by_label(assignments.base.selector("assignment.tenant_select")?, &target.tenant, element),
    )
    .await?;
    log.step(
        56,
        page.select_option_by_label(assignments.base.selector("assignment.group_select")?, &target.user_group, element),
    )
    .await?;
    log.step(
        57,
        page.select_option_by_label(assignments.base.selector("assignment.team_select")?, &target.team, element),
    )
    .await?;
    log.step(58, assignments.base.click_element("assignment.submit")).await?;
    log.verify(59, assignments.base.wait_for_hidden(assignments.base.selector("assignment.dialog")?))
        .await?;
    log.step(60, async {
        let visible = assignments
            .assignment_visible(&target.user_email, &target.tenant)
            .await?;
        ensure!(visible, "{} not shown with {}", target.user_email, target.tenant);
        Ok(())
    })
    .await?;

    // cleanup
    log.step(61, page.go_back(LoadState::NetworkIdle)).await?;
    log.verify(62, tenants.base.wait_for_element("tenant.add_button")).await?;
    let delete = config.selectors.format("tenant.row_delete", &renamed)?;
    log.step(63, page.click(&delete, element)).await?;
    log.step(64, tenants.base.click_element("tenant.confirm_delete")).await?;
    let renamed_row = config.selectors.format("tenant.row", &renamed)?;
    log.verify(65, tenants.base.wait_for_hidden(&renamed_row)).await?;

    // session
    log.step(66, async {
        dashboard.open().await?;
        page.reload(LoadState::NetworkIdle).await.map(|_| ())
    })
    .await?;
    log.verify(67, dashboard.is_loaded()).await?;
    log.step(68, dashboard.base.click_element("dashboard.user_menu")).await?;
    log.step(69, dashboard.base.click_element("dashboard.logout")).await?;
    log.verify(70, login.base.wait_for_element("login.email")).await?;
    log.step(71, async {
        page.goto(&config.dashboard_url(), LoadState::DomContentLoaded).await?;
        ensure!(
            login.base.wait_for_element_within("login.email", Duration::from_millis(config.timeouts.navigation)).await,
            "dashboard reachable after sign-out"
        );
        ensure!(!dashboard.base.is_element_visible("dashboard.marker").await, "dashboard rendered after sign-out");
        Ok(())
    })
    .await?;

    log.finish()
}
