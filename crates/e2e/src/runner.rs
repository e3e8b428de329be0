//! Suite runner: owns the browser, isolates each scenario in its own context,
//! and aggregates results

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::PortalConfig;
use crate::error::{E2eError, E2eResult};
use crate::pages::BasePage;
use crate::playwright::{BridgeConfig, Browser, BrowserContext, Page};
use crate::portal::PortalProbe;
use crate::scenarios::{self, Scenario, ScenarioContext};
use crate::visual::{VisualConfig, VisualTester};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Screenshot captured when the scenario failed
    pub screenshot: Option<String>,
}

/// Result of running a selection of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Registered scenarios left out by the tag/name selection
    pub skipped: usize,
    pub duration_ms: u64,
    pub browser: String,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, skipped: usize, duration_ms: u64, browser: &str) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            skipped,
            duration_ms,
            browser: browser.to_string(),
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub portal: PortalConfig,
    pub bridge: BridgeConfig,
    /// Promote visual screenshots to baselines instead of comparing
    pub update_baselines: bool,
    /// How long to wait for the portal before giving up
    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            portal: PortalConfig::default(),
            bridge: BridgeConfig::default(),
            update_baselines: false,
            preflight_timeout: Duration::from_secs(30),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<PortalConfig>,
    bridge_config: BridgeConfig,
    update_baselines: bool,
    preflight_timeout: Duration,

    /// Launched browser (if any)
    browser: Option<Arc<Browser>>,

    scenarios: Vec<Scenario>,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config.portal),
            bridge_config: config.bridge,
            update_baselines: config.update_baselines,
            preflight_timeout: config.preflight_timeout,
            browser: None,
            scenarios: scenarios::all(),
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Check the portal answers, then start the bridge and launch the browser
    pub async fn start(&mut self) -> E2eResult<()> {
        if self.browser.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        PortalProbe::new(&self.config.portal.base_url)?
            .wait_until_reachable(self.preflight_timeout)
            .await?;

        let browser = Browser::launch(
            self.bridge_config.clone(),
            &self.config.browser,
            &self.config.timeouts,
        )
        .await?;
        self.browser = Some(Arc::new(browser));
        Ok(())
    }

    /// Close the browser and stop the bridge
    pub async fn stop(&mut self) -> E2eResult<()> {
        if let Some(browser) = self.browser.take() {
            browser.close().await?;
        }
        Ok(())
    }

    /// `(name, tags)` of every registered scenario
    pub fn list(&self) -> Vec<(&'static str, &'static [&'static str])> {
        self.scenarios.iter().map(|s| (s.name, s.tags)).collect()
    }

    /// Pick scenarios by exact name, else by tag, else all of them
    pub fn select(&self, tag: Option<&str>, name: Option<&str>) -> E2eResult<Vec<Scenario>> {
        if let Some(name) = name {
            let scenario = self
                .scenarios
                .iter()
                .find(|s| s.name == name)
                .cloned()
                .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))?;
            return Ok(vec![scenario]);
        }

        let selected: Vec<Scenario> = match tag {
            Some(tag) => self.scenarios.iter().filter(|s| s.has_tag(tag)).cloned().collect(),
            None => self.scenarios.clone(),
        };
        if selected.is_empty() {
            warn!("No scenarios tagged '{}'", tag.unwrap_or_default());
        }
        Ok(selected)
    }

    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let selected = self.select(None, None)?;
        self.run_scenarios(&selected).await
    }

    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let selected = self.select(Some(tag), None)?;
        self.run_scenarios(&selected).await
    }

    /// Run a single scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestSuiteResult> {
        let selected = self.select(None, Some(name))?;
        self.run_scenarios(&selected).await
    }

    /// Run scenarios with at most `browser.workers` in flight. Results keep
    /// the order of `selected`.
    pub async fn run_scenarios(&self, selected: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let browser = self.browser()?;
        let workers = self.config.browser.workers.max(1);
        let start = Instant::now();

        let visual = VisualTester::new(VisualConfig::from(&self.config.artifacts))?;
        visual.clean_diffs()?;

        info!("Running {} scenario(s) with {} worker(s)...", selected.len(), workers);

        let mut indexed: Vec<(usize, TestResult)> = futures::stream::iter(selected.iter().enumerate())
            .map(|(index, scenario)| {
                let browser = browser.clone();
                async move { (index, self.run_scenario(browser, scenario).await) }
            })
            .buffer_unordered(workers)
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<TestResult> = indexed.into_iter().map(|(_, result)| result).collect();

        let duration_ms = start.elapsed().as_millis() as u64;
        let skipped = self.scenarios.len().saturating_sub(selected.len());
        let label = format!("{} {}", browser.kind().as_str(), browser.version());
        let suite = TestSuiteResult::from_results(results, skipped, duration_ms, &label);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        if self.update_baselines {
            info!("{} visual baseline(s) stored", visual.list_baselines()?.len());
        }
        Ok(suite)
    }

    /// Run one scenario in a fresh context. Never fails: every error ends up
    /// in the returned `TestResult`.
    pub async fn run_scenario(&self, browser: Arc<Browser>, scenario: &Scenario) -> TestResult {
        let start = Instant::now();
        let span = info_span!("scenario", name = scenario.name);
        let (outcome, screenshot) = self.execute(browser, scenario).instrument(span).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(()) => info!("✓ {} ({} ms)", scenario.name, duration_ms),
            Err(e) => error!("✗ {} - {}", scenario.name, e),
        }

        TestResult {
            name: scenario.name.to_string(),
            tags: scenario.tags.iter().map(|t| t.to_string()).collect(),
            success: outcome.is_ok(),
            duration_ms,
            error: outcome.err().map(|e| e.to_string()),
            screenshot: screenshot.map(|p| p.to_string_lossy().to_string()),
        }
    }

    async fn execute(&self, browser: Arc<Browser>, scenario: &Scenario) -> (E2eResult<()>, Option<PathBuf>) {
        debug!("Running scenario: {}", scenario.name);
        let (context, page) = match self.open_page(&browser).await {
            Ok(opened) => opened,
            Err(e) => return (Err(e), None),
        };

        let ctx = ScenarioContext {
            name: scenario.name,
            config: self.config.clone(),
            browser,
            context: context.clone(),
            page: page.clone(),
            update_baselines: self.update_baselines,
        };
        let outcome = match AssertUnwindSafe(scenario.run(ctx)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::AssertionFailed(format!("scenario {} panicked", scenario.name))),
        };

        let screenshot = if outcome.is_err() {
            let base = BasePage::new(&page, &self.config);
            match base.take_screenshot(&format!("failure-{}", scenario.name)).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Failure screenshot not captured: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = context.close().await {
            warn!("Failed to close context {}: {}", context.id(), e);
        }
        (outcome, screenshot)
    }

    async fn open_page(&self, browser: &Browser) -> E2eResult<(Arc<BrowserContext>, Arc<Page>)> {
        let context = browser.new_context(self.config.viewport).await?;
        match context.new_page().await {
            Ok(page) => Ok((Arc::new(context), Arc::new(page))),
            Err(e) => {
                let _ = context.close().await;
                Err(e)
            }
        }
    }

    fn browser(&self) -> E2eResult<Arc<Browser>> {
        self.browser.clone().ok_or(E2eError::BridgeNotRunning)
    }

    /// Write test results to `<results_dir>/test-results.json`
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let dir = &self.config.artifacts.results_dir;
        std::fs::create_dir_all(dir)?;

        let path = dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, success: bool) -> TestResult {
        TestResult {
            name: name.to_string(),
            tags: vec!["auth".to_string()],
            success,
            duration_ms: 10,
            error: (!success).then(|| "Assertion failed: nope".to_string()),
            screenshot: None,
        }
    }

    #[test]
    fn test_suite_aggregation() {
        let suite = TestSuiteResult::from_results(
            vec![result("a", true), result("b", false), result("c", true)],
            4,
            1234,
            "120.0",
        );
        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 2);
        assert_eq!(suite.failed, 1);
        assert_eq!(suite.skipped, 4);
        assert!(!suite.success());
    }

    #[test]
    fn test_empty_suite_succeeds() {
        let suite = TestSuiteResult::from_results(vec![], 0, 0, "");
        assert!(suite.success());
    }

    #[test]
    fn test_select_by_tag() {
        let runner = TestRunner::new();
        let selected = runner.select(Some("security"), None).unwrap();
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.has_tag("security")));
        assert!(selected.len() < runner.list().len());
    }

    #[test]
    fn test_select_by_name() {
        let runner = TestRunner::new();
        let selected = runner
            .select(Some("security"), Some("comprehensive-manual-script"))
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "comprehensive-manual-script");

        let err = runner.select(None, Some("no-such-scenario")).unwrap_err();
        assert!(matches!(err, E2eError::ScenarioNotFound(_)));
    }

    #[test]
    fn test_select_unknown_tag_is_empty() {
        let runner = TestRunner::new();
        assert!(runner.select(Some("nope"), None).unwrap().is_empty());
        assert_eq!(runner.select(None, None).unwrap().len(), runner.list().len());
    }

    #[tokio::test]
    async fn test_run_without_start_fails() {
        let runner = TestRunner::new();
        let err = runner.run_all().await.unwrap_err();
        assert!(matches!(err, E2eError::BridgeNotRunning));
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut portal = PortalConfig::default();
        portal.artifacts.results_dir = dir.path().join("results");
        let runner = TestRunner::with_config(RunnerConfig {
            portal,
            ..RunnerConfig::default()
        });

        let suite = TestSuiteResult::from_results(vec![result("a", true)], 0, 5, "120.0");
        let path = runner.write_results(&suite).unwrap();
        assert_eq!(path.file_name().unwrap(), "test-results.json");

        let parsed: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.results[0].name, "a");
    }

    #[cfg(unix)]
    mod isolation {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use super::*;
        use crate::playwright::fake_node::{FakeBridge, FakeNode};

        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static MAX_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

        async fn tracked(_ctx: ScenarioContext) -> E2eResult<()> {
            let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
            MAX_IN_FLIGHT.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn panicking(_ctx: ScenarioContext) -> E2eResult<()> {
            panic!("scenario blew up")
        }

        async fn started_runner(fake: &FakeBridge, dir: &std::path::Path, workers: usize) -> TestRunner {
            let mut portal = PortalConfig::default();
            portal.browser.workers = workers;
            portal.artifacts.screenshot_dir = dir.join("screenshots");
            portal.artifacts.results_dir = dir.join("results");
            portal.artifacts.baseline_dir = dir.join("baselines");
            portal.artifacts.diff_dir = dir.join("diffs");

            let browser = Browser::launch(fake.config.clone(), &portal.browser, &portal.timeouts)
                .await
                .unwrap();
            let mut runner = TestRunner::with_config(RunnerConfig {
                portal,
                bridge: fake.config.clone(),
                ..RunnerConfig::default()
            });
            runner.browser = Some(Arc::new(browser));
            runner
        }

        #[tokio::test]
        async fn test_panicking_scenario_is_isolated() {
            let fake = FakeNode::new().write();
            let dir = tempfile::tempdir().unwrap();
            let mut runner = started_runner(&fake, dir.path(), 2).await;

            let selected = vec![
                Scenario::new("first", &["isolation"], tracked),
                Scenario::new("explodes", &["isolation"], panicking),
                Scenario::new("third", &["isolation"], tracked),
                Scenario::new("fourth", &["isolation"], tracked),
            ];
            let suite = runner.run_scenarios(&selected).await.unwrap();

            assert_eq!(suite.total, 4);
            assert_eq!(suite.passed, 3);
            assert_eq!(suite.failed, 1);
            let names: Vec<&str> = suite.results.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, ["first", "explodes", "third", "fourth"]);

            let failed = &suite.results[1];
            assert!(failed.error.as_deref().unwrap().contains("panicked"));
            assert!(failed.screenshot.as_deref().unwrap().contains("failure-explodes"));
            assert!(suite.results.iter().filter(|r| r.success).all(|r| r.screenshot.is_none()));

            assert!(MAX_IN_FLIGHT.load(Ordering::SeqCst) <= 2);
            assert_eq!(fake.count("newContext"), 4);
            assert_eq!(fake.count("closeContext"), 4);
            assert_eq!(fake.count("screenshot"), 1);

            runner.stop().await.unwrap();
            assert_eq!(fake.count("shutdown"), 1);
        }
    }
}
