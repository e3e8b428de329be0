//! Super Admin user assignment

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::{E2eError, E2eResult};

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("assignment-dialog-dropdowns", &["assignment"], assignment_dialog_dropdowns),
        Scenario::new("assignment-assign-user", &["assignment"], assignment_assign_user),
    ]
}

async fn assignment_dialog_dropdowns(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let assignments = ctx.assignments();
    assignments.open().await?;

    let email = &ctx.config.credentials.assignment.user_email;
    ensure!(assignments.user_listed(email).await, "user {} not listed", email);
    assignments.open_assign_dialog(email).await?;

    for name in [
        "assignment.tenant_select",
        "assignment.group_select",
        "assignment.team_select",
    ] {
        ensure!(assignments.base.is_element_visible(name).await, "{} not visible", name);
    }

    ctx.page.keyboard_press("Escape").await?;
    let dialog = assignments.base.selector("assignment.dialog")?;
    ensure!(assignments.base.wait_for_hidden(dialog).await, "dialog did not close on Escape");
    Ok(())
}

async fn assignment_assign_user(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let assignments = ctx.assignments();
    assignments.open().await?;

    let target = &ctx.config.credentials.assignment;
    if target.tenant.is_empty() {
        return Err(E2eError::Config("credentials.assignment.tenant is not set".to_string()));
    }
    assignments.assign_user(target).await?;

    ensure!(
        assignments.assignment_visible(&target.user_email, &target.tenant).await?,
        "{} is not shown as assigned to {}",
        target.user_email,
        target.tenant
    );
    Ok(())
}
