//! Light/dark theme toggle

use tracing::info;

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::playwright::LoadState;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("theme-toggle", &["theme", "visual"], theme_toggle),
        Scenario::new("theme-persists-after-reload", &["theme"], theme_persists_after_reload),
    ]
}

async fn theme_toggle(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let initial = dashboard.current_theme().await?;
    let before = dashboard.base.take_screenshot("theme-before").await?;

    dashboard.toggle_theme().await?;
    let toggled = dashboard.current_theme().await?;
    ensure!(toggled != initial, "theme stayed {} after toggle", initial);
    let after = dashboard.base.take_screenshot("theme-after").await?;

    // any visible change counts, so compare with a zero threshold
    let diff = ctx.visual()?.diff_files("theme-toggle", &after, &before, 0.0)?;
    info!("Theme toggle changed {:.2}% of pixels", diff.diff_percent);
    ensure!(!diff.matches, "page looks identical after switching to {}", toggled);

    dashboard.toggle_theme().await?;
    let restored = dashboard.current_theme().await?;
    ensure!(restored == initial, "second toggle gave {}, expected {}", restored, initial);
    Ok(())
}

async fn theme_persists_after_reload(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;
    let dashboard = ctx.dashboard();
    let initial = dashboard.current_theme().await?;

    dashboard.toggle_theme().await?;
    let toggled = dashboard.current_theme().await?;
    ctx.page.reload(LoadState::NetworkIdle).await?;
    ensure!(dashboard.is_loaded().await, "dashboard did not reload");

    let after_reload = dashboard.current_theme().await?;
    // restore before asserting so later scenarios see the original theme
    if after_reload != initial {
        dashboard.toggle_theme().await?;
    }
    ensure!(after_reload == toggled, "theme {} reverted to {} on reload", toggled, after_reload);
    Ok(())
}
