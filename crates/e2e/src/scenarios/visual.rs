//! Baseline screenshot regression

use tracing::{info, warn};

use super::{Scenario, ScenarioContext};
use crate::error::{E2eError, E2eResult};
use crate::playwright::LoadState;

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("visual-login-page", &["visual"], |ctx| async move {
            let login = ctx.login_page();
            login.open().await?;
            login.base.wait_for_network_idle().await?;
            check_baseline(&ctx, "login-page").await
        }),
        Scenario::new("visual-dashboard", &["visual"], |ctx| async move {
            ctx.sign_in().await?;
            ctx.page.reload(LoadState::NetworkIdle).await?;
            check_baseline(&ctx, "dashboard").await
        }),
    ]
}

/// Screenshot the page as `<name>.png`, then promote it or compare it with
/// the stored baseline. A missing baseline is reported, not failed.
async fn check_baseline(ctx: &ScenarioContext, name: &str) -> E2eResult<()> {
    let visual = ctx.visual()?;
    ctx.page.screenshot(&visual.actual_path(name), true).await?;

    if ctx.update_baselines {
        return visual.update_baseline(name);
    }

    match visual.compare(name, None) {
        Ok(diff) if diff.matches => {
            info!("'{}' matches its baseline ({:.2}% changed)", name, diff.diff_percent);
            Ok(())
        }
        Ok(diff) => Err(E2eError::ScreenshotMismatch {
            name: name.to_string(),
            diff_percent: diff.diff_percent,
            threshold: ctx.config.artifacts.visual_threshold,
        }),
        Err(E2eError::BaselineNotFound(path)) => {
            warn!("No baseline at {}; run with --update-baselines to create it", path);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
