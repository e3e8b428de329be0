//! Tenant CRUD

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::{E2eError, E2eResult};
use crate::pages::TenantForm;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("tenant-create", &["tenant", "smoke"], tenant_create),
        Scenario::new("tenant-create-invalid-email", &["tenant"], tenant_create_invalid_email),
        Scenario::new("tenant-required-fields", &["tenant"], tenant_required_fields),
        Scenario::new("tenant-edit", &["tenant"], tenant_edit),
        Scenario::new("tenant-search", &["tenant"], tenant_search),
        Scenario::new("tenant-delete", &["tenant"], tenant_delete),
    ]
}

async fn tenant_create(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let form = TenantForm::unique("QA Create");
    tenants.create_tenant(&form).await?;
    ensure!(tenants.tenant_exists(&form.name).await, "tenant '{}' not listed", form.name);

    tenants.delete_tenant(&form.name).await
}

async fn tenant_create_invalid_email(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let mut form = TenantForm::unique("QA Invalid");
    form.email = "not-an-email".to_string();
    match tenants.create_tenant(&form).await {
        Err(E2eError::Validation(_)) => {}
        Err(e) => return Err(e),
        Ok(()) => return Err(E2eError::AssertionFailed("invalid e-mail was submitted".to_string())),
    }

    ensure!(
        !tenants.tenant_exists(&form.name).await,
        "tenant '{}' with an invalid e-mail is listed",
        form.name
    );
    Ok(())
}

async fn tenant_required_fields(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;
    tenants.start_create().await?;

    tenants.base.click_element("tenant.submit").await?;
    let error = tenants.validation_error().await;
    ensure!(error.is_some(), "no validation error for an empty tenant form");
    ensure!(
        tenants.base.is_element_visible("tenant.name").await,
        "tenant form closed on invalid submit"
    );
    tenants.cancel().await
}

async fn tenant_edit(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let original = TenantForm::unique("QA Edit");
    tenants.create_tenant(&original).await?;

    let mut renamed = original.clone();
    renamed.name = format!("{} renamed", original.name);
    renamed.description = "Updated by the E2E suite".to_string();
    tenants.edit_tenant(&original.name, &renamed).await?;

    ensure!(tenants.tenant_exists(&renamed.name).await, "renamed tenant not listed");
    let old_row = ctx.config.selectors.format("tenant.row", &original.name)?;
    ensure!(
        tenants.base.wait_for_hidden(&old_row).await,
        "old tenant name still listed"
    );

    tenants.delete_tenant(&renamed.name).await
}

async fn tenant_search(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let form = TenantForm::unique("QA Search");
    tenants.create_tenant(&form).await?;

    tenants.search(&form.name).await?;
    ensure!(tenants.tenant_exists(&form.name).await, "search did not find '{}'", form.name);
    ensure!(tenants.row_count().await? >= 1, "search returned no rows");

    tenants.search("zz-no-such-tenant-zz").await?;
    let rows = tenants.row_count().await?;
    ensure!(rows == 0, "nonsense search returned {} rows", rows);

    tenants.search("").await?;
    tenants.delete_tenant(&form.name).await
}

async fn tenant_delete(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let tenants = ctx.tenants();
    tenants.open().await?;

    let form = TenantForm::unique("QA Delete");
    tenants.create_tenant(&form).await?;
    ensure!(tenants.tenant_exists(&form.name).await, "tenant '{}' not listed", form.name);

    tenants.delete_tenant(&form.name).await?;
    ctx.page.reload(crate::playwright::LoadState::NetworkIdle).await?;
    let row = ctx.config.selectors.format("tenant.row", &form.name)?;
    ensure!(!ctx.page.is_visible(&row).await?, "deleted tenant reappeared after reload");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::playwright::fake_node::FakeNode;
    use crate::scenarios::fake_context;

    #[tokio::test]
    async fn test_invalid_email_is_checked_by_name_not_row_count() {
        // the fake reports a higher row count on every call, as a list shared
        // with other workers would
        let fake = FakeNode::new().missing("QA Invalid").write();
        let ctx = fake_context(&fake, PortalConfig::default()).await;
        let browser = ctx.browser.clone();

        tenant_create_invalid_email(ctx).await.unwrap();

        // only the login submit was clicked: the invalid form never reached the portal
        assert_eq!(fake.count("click"), 1);
        assert_eq!(fake.count("count"), 0);
        browser.close().await.unwrap();
    }
}
