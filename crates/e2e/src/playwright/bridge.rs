//! Node.js Playwright bridge
//!
//! Manages a long-lived `node` child process running `bridge.js`. Requests and
//! responses are newline-delimited JSON over stdin/stdout, correlated by id.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Timeouts;
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Path to the Node.js executable (searched on PATH if None)
    pub node_path: Option<PathBuf>,

    /// Extra arguments placed before the bridge script
    pub node_args: Vec<String>,

    /// Directory node runs in; `playwright` is resolved from its node_modules
    pub working_dir: PathBuf,

    /// Upper bound on a single bridge round trip
    pub response_timeout_ms: u64,
}

/// Added to the longest configured browser timeout
const RESPONSE_TIMEOUT_MARGIN_MS: u64 = 5_000;

impl BridgeConfig {
    /// Raise the response timeout so it outlasts every configured timeout
    pub fn covering(mut self, timeouts: &Timeouts) -> Self {
        self.response_timeout_ms = self
            .response_timeout_ms
            .max(timeouts.longest() + RESPONSE_TIMEOUT_MARGIN_MS);
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            node_path: None,
            node_args: Vec::new(),
            working_dir: PathBuf::from("."),
            response_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BridgeRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BridgeResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<BridgeErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BridgeErrorBody {
    pub message: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl BridgeErrorBody {
    pub(crate) fn into_error(self) -> E2eError {
        match self.name.as_deref() {
            Some("TimeoutError") => E2eError::Timeout(self.message),
            Some("PlaywrightMissing") => E2eError::PlaywrightNotFound,
            _ => E2eError::Playwright(self.message),
        }
    }
}

impl BridgeResponse {
    pub(crate) fn into_result(self) -> E2eResult<serde_json::Value> {
        match self.error {
            Some(err) => Err(err.into_error()),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

type PendingRequests = HashMap<u64, oneshot::Sender<E2eResult<serde_json::Value>>>;

/// Handle to the running Node.js bridge
pub struct PlaywrightBridge {
    config: BridgeConfig,
    process: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    request_id: AtomicU64,
    pending: Arc<RwLock<PendingRequests>>,
    script_dir: Mutex<Option<tempfile::TempDir>>,
}

impl PlaywrightBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            process: Mutex::new(None),
            stdin: Mutex::new(None),
            request_id: AtomicU64::new(1),
            pending: Arc::new(RwLock::new(HashMap::new())),
            script_dir: Mutex::new(None),
        }
    }

    /// Spawn node with the embedded bridge script and wait for it to answer a ping
    pub async fn start(&self) -> E2eResult<()> {
        let node = self.find_node()?;

        let dir = tempfile::Builder::new().prefix("cempal-bridge").tempdir()?;
        let script_path = dir.path().join("bridge.js");
        tokio::fs::write(&script_path, BRIDGE_SCRIPT).await?;

        info!("Starting Playwright bridge ({})", script_path.display());

        let mut child = Command::new(&node)
            .args(&self.config.node_args)
            .arg(&script_path)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::BridgeStartup(format!("failed to spawn {}: {}", node.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::BridgeStartup("no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::BridgeStartup("no stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[bridge] {}", line);
                }
            });
        }

        let pending = self.pending.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                debug!("Bridge response: {}", truncate(&line, 200));

                match serde_json::from_str::<BridgeResponse>(&line) {
                    Ok(response) => {
                        if let Some(sender) = pending.write().await.remove(&response.id) {
                            let _ = sender.send(response.into_result());
                        }
                    }
                    Err(e) => error!("Unparseable bridge output: {} - {}", e, line),
                }
            }

            // stdout closed: nobody will answer the outstanding requests
            for (_, sender) in pending.write().await.drain() {
                let _ = sender.send(Err(E2eError::BridgeNotRunning));
            }
        });

        *self.process.lock().await = Some(child);
        *self.stdin.lock().await = Some(stdin);
        *self.script_dir.lock().await = Some(dir);

        let pong = self.call("ping", serde_json::json!({})).await?;
        if pong.as_str() != Some("pong") {
            return Err(E2eError::BridgeStartup(format!("unexpected ping reply: {}", pong)));
        }

        info!("Playwright bridge ready");
        Ok(())
    }

    /// Ask the bridge to close the browser, then terminate the process
    pub async fn stop(&self) -> E2eResult<()> {
        if self.stdin.lock().await.is_none() {
            return Ok(());
        }

        if let Err(e) = self.call("shutdown", serde_json::json!({})).await {
            debug!("Bridge shutdown request failed: {}", e);
        }
        self.stdin.lock().await.take();

        if let Some(mut child) = self.process.lock().await.take() {
            // Let the browser exit cleanly before forcing it
            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if let Some(pid) = child.id() {
                    if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                        let _ = tokio::time::timeout(Duration::from_millis(500), child.wait()).await;
                    }
                }
            }
            let _ = child.kill().await;
        }

        self.script_dir.lock().await.take();
        info!("Playwright bridge stopped");
        Ok(())
    }

    /// Send one request and wait for its response
    pub async fn call(&self, method: &str, params: serde_json::Value) -> E2eResult<serde_json::Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&BridgeRequest { id, method, params })?;

        debug!("Bridge request: {}", truncate(&line, 200));

        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(id, tx);

        if let Err(e) = self.send_line(&line).await {
            self.pending.write().await.remove(&id);
            return Err(e);
        }

        let timeout = Duration::from_millis(self.config.response_timeout_ms);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(E2eError::BridgeNotRunning),
            Err(_) => {
                self.pending.write().await.remove(&id);
                Err(E2eError::Timeout(format!(
                    "bridge method {} after {}ms",
                    method, self.config.response_timeout_ms
                )))
            }
        }
    }

    async fn send_line(&self, line: &str) -> E2eResult<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(E2eError::BridgeNotRunning)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// [`call`](Self::call) and deserialize the result
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> E2eResult<T> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn find_node(&self) -> E2eResult<PathBuf> {
        if let Some(path) = &self.config.node_path {
            return Ok(path.clone());
        }
        which::which("node").map_err(|_| E2eError::NodeNotFound)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = BridgeRequest {
            id: 7,
            method: "click",
            params: serde_json::json!({ "pageId": "page-1", "selector": "#tenantName" }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r##"{"id":7,"method":"click","params":{"pageId":"page-1","selector":"#tenantName"}}"##
        );
    }

    #[test]
    fn test_response_ok() {
        let response: BridgeResponse = serde_json::from_str(r#"{"id":3,"result":"pong"}"#).unwrap();
        assert_eq!(response.id, 3);
        assert_eq!(response.into_result().unwrap(), serde_json::json!("pong"));

        let response: BridgeResponse = serde_json::from_str(r#"{"id":4}"#).unwrap();
        assert!(response.into_result().unwrap().is_null());
    }

    #[test]
    fn test_response_error_mapping() {
        let response: BridgeResponse = serde_json::from_str(
            r#"{"id":5,"error":{"message":"locator.click: Timeout 5000ms exceeded.","name":"TimeoutError"}}"#,
        )
        .unwrap();
        assert!(matches!(response.into_result(), Err(E2eError::Timeout(_))));

        let response: BridgeResponse =
            serde_json::from_str(r#"{"id":6,"error":{"message":"Cannot find module 'playwright'","name":"PlaywrightMissing"}}"#)
                .unwrap();
        assert!(matches!(response.into_result(), Err(E2eError::PlaywrightNotFound)));

        let response: BridgeResponse =
            serde_json::from_str(r#"{"id":7,"error":{"message":"boom"}}"#).unwrap();
        assert!(matches!(response.into_result(), Err(E2eError::Playwright(m)) if m == "boom"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_call_without_start_fails() {
        let bridge = PlaywrightBridge::new(BridgeConfig::default());
        let err = bridge.call("ping", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, E2eError::BridgeNotRunning));
        assert!(bridge.pending.read().await.is_empty());
        // stopping a bridge that never started is a no-op
        bridge.stop().await.unwrap();
    }

    #[test]
    fn test_response_timeout_covers_configured_timeouts() {
        let mut timeouts = Timeouts::default();
        assert_eq!(BridgeConfig::default().covering(&timeouts).response_timeout_ms, 60_000);

        timeouts.navigation = 120_000;
        let config = BridgeConfig::default().covering(&timeouts);
        assert_eq!(config.response_timeout_ms, 120_000 + RESPONSE_TIMEOUT_MARGIN_MS);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_calls_are_correlated_and_stop_reaches_child() {
        use crate::playwright::fake_node::FakeNode;

        let fake = FakeNode::new().write();
        let bridge = PlaywrightBridge::new(fake.config.clone());
        bridge.start().await.unwrap();

        let (a, b, c) = tokio::join!(
            bridge.call_as::<String>("newContext", serde_json::json!({})),
            bridge.call_as::<String>("newContext", serde_json::json!({})),
            bridge.call_as::<String>("newContext", serde_json::json!({})),
        );
        let ids = [a.unwrap(), b.unwrap(), c.unwrap()];
        assert!(ids.iter().all(|id| id.starts_with("ctx-")));
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
        assert!(bridge.pending.read().await.is_empty());

        bridge.stop().await.unwrap();
        assert_eq!(fake.count("shutdown"), 1);
        assert!(bridge.process.lock().await.is_none());
        assert!(matches!(
            bridge.call("ping", serde_json::json!({})).await,
            Err(E2eError::BridgeNotRunning)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unanswered_call_times_out() {
        use crate::playwright::fake_node::FakeNode;

        let mut fake = FakeNode::new().never_answer("goto").write();
        fake.config.response_timeout_ms = 300;
        let bridge = PlaywrightBridge::new(fake.config.clone());
        bridge.start().await.unwrap();

        let err = bridge
            .call("goto", serde_json::json!({ "url": "https://portal.cempal.example/" }))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Timeout(_)), "unexpected error: {}", err);
        assert!(bridge.pending.read().await.is_empty());

        // the bridge keeps serving later requests
        assert_eq!(bridge.call("ping", serde_json::json!({})).await.unwrap(), "pong");
        bridge.stop().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_call_after_child_exit_leaves_nothing_pending() {
        use crate::playwright::fake_node::FakeNode;

        let mut fake = FakeNode::new().write();
        fake.config.response_timeout_ms = 500;
        let bridge = PlaywrightBridge::new(fake.config.clone());
        bridge.start().await.unwrap();

        // the fake exits after answering shutdown; stdin stays open on our side
        bridge.call("shutdown", serde_json::json!({})).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        for _ in 0..3 {
            assert!(bridge.call("ping", serde_json::json!({})).await.is_err());
        }
        assert!(bridge.pending.read().await.is_empty());
        bridge.stop().await.unwrap();
    }

    #[test]
    fn test_bridge_script_handles_core_methods() {
        for method in ["ping", "launch", "newContext", "newPage", "goto", "fill", "click", "screenshot", "networkLog", "shutdown"] {
            assert!(BRIDGE_SCRIPT.contains(&format!("{}:", method)), "missing handler {}", method);
        }
    }
}
