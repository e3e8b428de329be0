//! Browser and browser-context handles

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::bridge::{BridgeConfig, PlaywrightBridge};
use super::page::Page;
use crate::config::{BrowserConfig, BrowserKind, Timeouts, Viewport};
use crate::error::E2eResult;

/// A launched browser behind the bridge
pub struct Browser {
    bridge: Arc<PlaywrightBridge>,
    kind: BrowserKind,
    version: String,
    timeouts: Timeouts,
}

impl Browser {
    /// Start the bridge and launch the configured browser. The bridge's
    /// response timeout is raised to outlast every entry of `timeouts`.
    pub async fn launch(bridge_config: BridgeConfig, config: &BrowserConfig, timeouts: &Timeouts) -> E2eResult<Self> {
        let bridge = Arc::new(PlaywrightBridge::new(bridge_config.covering(timeouts)));
        bridge.start().await?;

        let version: String = bridge
            .call_as(
                "launch",
                json!({
                    "browser": config.kind.as_str(),
                    "headless": config.headless,
                    "slowMo": config.slow_mo_ms,
                }),
            )
            .await?;

        info!(
            "Launched {} {} (headless: {})",
            config.kind.as_str(),
            version,
            config.headless
        );

        Ok(Self {
            bridge,
            kind: config.kind,
            version,
            timeouts: timeouts.clone(),
        })
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Open an isolated context (own cookies and storage)
    pub async fn new_context(&self, viewport: Viewport) -> E2eResult<BrowserContext> {
        let id: String = self
            .bridge
            .call_as(
                "newContext",
                json!({
                    "viewport": { "width": viewport.width, "height": viewport.height },
                    "ignoreHTTPSErrors": false,
                }),
            )
            .await?;
        debug!("Opened browser context {}", id);

        Ok(BrowserContext {
            bridge: self.bridge.clone(),
            id,
            timeouts: self.timeouts.clone(),
        })
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.bridge.stop().await
    }
}

/// Cookie as reported by the browser context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

/// Isolated browser context; one per scenario
pub struct BrowserContext {
    bridge: Arc<PlaywrightBridge>,
    id: String,
    timeouts: Timeouts,
}

impl BrowserContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn new_page(&self) -> E2eResult<Page> {
        let page_id: String = self
            .bridge
            .call_as(
                "newPage",
                json!({
                    "contextId": self.id,
                    "timeout": self.timeouts.default,
                    "navigationTimeout": self.timeouts.navigation,
                }),
            )
            .await?;
        Ok(Page::new(self.bridge.clone(), page_id, &self.timeouts))
    }

    pub async fn cookies(&self) -> E2eResult<Vec<Cookie>> {
        self.bridge
            .call_as("cookies", json!({ "contextId": self.id }))
            .await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.bridge
            .call("closeContext", json!({ "contextId": self.id }))
            .await?;
        debug!("Closed browser context {}", self.id);
        Ok(())
    }
}
