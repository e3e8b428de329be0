//! Page handle
//!
//! Every method is one bridge round trip. Selector-based actions operate on the
//! first matching element.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::bridge::PlaywrightBridge;
use crate::config::{Timeouts, Viewport};
use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResponse {
    pub status: Option<u16>,
    pub url: String,
}

/// One request observed on the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub url: String,
    pub method: String,
    pub resource_type: String,
    pub status: Option<u16>,
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogEntry {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedElement {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub input_type: Option<String>,
    pub aria_label: Option<String>,
}

pub struct Page {
    bridge: Arc<PlaywrightBridge>,
    id: String,
    timeout_ms: u64,
    navigation_timeout_ms: u64,
}

impl Page {
    pub(crate) fn new(bridge: Arc<PlaywrightBridge>, id: String, timeouts: &Timeouts) -> Self {
        Self {
            bridge,
            id,
            timeout_ms: timeouts.default,
            navigation_timeout_ms: timeouts.navigation,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, method: &str, mut params: serde_json::Value) -> E2eResult<serde_json::Value> {
        params["pageId"] = json!(self.id);
        self.bridge.call(method, params).await
    }

    async fn call_as<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> E2eResult<T> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    // Navigation

    pub async fn goto(&self, url: &str, wait_until: LoadState) -> E2eResult<NavigationResponse> {
        self.call_as(
            "goto",
            json!({ "url": url, "waitUntil": wait_until.as_str(), "timeout": self.navigation_timeout_ms }),
        )
        .await
    }

    pub async fn reload(&self, wait_until: LoadState) -> E2eResult<NavigationResponse> {
        self.call_as(
            "reload",
            json!({ "waitUntil": wait_until.as_str(), "timeout": self.navigation_timeout_ms }),
        )
        .await
    }

    pub async fn go_back(&self, wait_until: LoadState) -> E2eResult<()> {
        self.call(
            "goBack",
            json!({ "waitUntil": wait_until.as_str(), "timeout": self.navigation_timeout_ms }),
        )
        .await?;
        Ok(())
    }

    pub async fn url(&self) -> E2eResult<String> {
        self.call_as("url", json!({})).await
    }

    pub async fn title(&self) -> E2eResult<String> {
        self.call_as("title", json!({})).await
    }

    // Actions

    pub async fn click(&self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "click",
            json!({ "selector": selector, "timeout": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    pub async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "fill",
            json!({ "selector": selector, "value": value, "timeout": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    pub async fn press(&self, selector: &str, key: &str) -> E2eResult<()> {
        self.call("press", json!({ "selector": selector, "key": key }))
            .await?;
        Ok(())
    }

    pub async fn keyboard_press(&self, key: &str) -> E2eResult<()> {
        self.call("keyboardPress", json!({ "key": key })).await?;
        Ok(())
    }

    /// Select a `<select>` option by its visible text
    pub async fn select_option_by_label(&self, selector: &str, label: &str, timeout: Duration) -> E2eResult<()> {
        self.call(
            "selectOption",
            json!({ "selector": selector, "label": label, "timeout": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    // Waiting

    pub async fn wait_for_selector(&self, selector: &str, state: WaitState, timeout: Duration) -> E2eResult<()> {
        self.call(
            "waitForSelector",
            json!({ "selector": selector, "state": state.as_str(), "timeout": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    pub async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        self.call(
            "waitForLoadState",
            json!({ "state": state.as_str(), "timeout": timeout.as_millis() as u64 }),
        )
        .await?;
        Ok(())
    }

    /// Wait until the page URL matches a JavaScript regular expression
    pub async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> E2eResult<String> {
        self.call_as(
            "waitForUrl",
            json!({ "pattern": pattern, "timeout": timeout.as_millis() as u64 }),
        )
        .await
    }

    pub async fn wait_for_timeout(&self, duration: Duration) -> E2eResult<()> {
        self.call("waitForTimeout", json!({ "ms": duration.as_millis() as u64 }))
            .await?;
        Ok(())
    }

    // Queries

    pub async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        self.call_as("isVisible", json!({ "selector": selector }))
            .await
    }

    pub async fn text_content(&self, selector: &str) -> E2eResult<Option<String>> {
        self.call_as(
            "textContent",
            json!({ "selector": selector, "timeout": self.timeout_ms }),
        )
        .await
    }

    pub async fn all_text_contents(&self, selector: &str) -> E2eResult<Vec<String>> {
        self.call_as("allTextContents", json!({ "selector": selector }))
            .await
    }

    pub async fn input_value(&self, selector: &str) -> E2eResult<String> {
        self.call_as(
            "inputValue",
            json!({ "selector": selector, "timeout": self.timeout_ms }),
        )
        .await
    }

    pub async fn get_attribute(&self, selector: &str, name: &str) -> E2eResult<Option<String>> {
        self.call_as(
            "getAttribute",
            json!({ "selector": selector, "name": name, "timeout": self.timeout_ms }),
        )
        .await
    }

    pub async fn count(&self, selector: &str) -> E2eResult<usize> {
        self.call_as("count", json!({ "selector": selector })).await
    }

    /// Evaluate a JavaScript function expression such as `(arg) => arg * 2`
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str, arg: serde_json::Value) -> E2eResult<T> {
        self.call_as("evaluate", json!({ "expression": expression, "arg": arg }))
            .await
    }

    pub async fn computed_style(&self, selector: &str, property: &str) -> E2eResult<String> {
        self.call_as(
            "computedStyle",
            json!({ "selector": selector, "property": property }),
        )
        .await
    }

    pub async fn focused_element(&self) -> E2eResult<Option<FocusedElement>> {
        self.call_as("focusedElement", json!({})).await
    }

    // Artifacts and introspection

    pub async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<PathBuf> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.call(
            "screenshot",
            json!({ "path": path.to_string_lossy(), "fullPage": full_page }),
        )
        .await?;
        Ok(path.to_path_buf())
    }

    pub async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.call(
            "setViewport",
            json!({ "width": viewport.width, "height": viewport.height }),
        )
        .await?;
        Ok(())
    }

    pub async fn network_log(&self) -> E2eResult<Vec<NetworkEntry>> {
        self.call_as("networkLog", json!({})).await
    }

    pub async fn clear_network_log(&self) -> E2eResult<()> {
        self.call("clearNetworkLog", json!({})).await?;
        Ok(())
    }

    pub async fn console_errors(&self) -> E2eResult<Vec<String>> {
        self.call_as("consoleErrors", json!({})).await
    }

    pub async fn dialogs(&self) -> E2eResult<Vec<DialogEntry>> {
        self.call_as("dialogs", json!({})).await
    }
}
