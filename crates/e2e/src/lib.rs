//! Cempal Portal E2E Test Suite
//!
//! Browser-driven end-to-end tests for the multi-tenant Cempal Portal:
//! - Drives Playwright through a long-lived Node.js bridge process
//! - Wraps each screen in a page object with one method per user action
//! - Runs tagged scenarios in parallel, one fresh browser context each
//! - Compares screenshots against stored baselines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start() -> PortalProbe pre-flight + Browser          │
//! │    ├── select(tag, name) -> [Scenario]                      │
//! │    ├── run_scenarios() -> TestSuiteResult                   │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (async fn, tagged)                                │
//! │    └── ScenarioContext { config, browser, context, page }   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page objects                                               │
//! │    ├── LoginPage          ├── TenantPage                    │
//! │    ├── DashboardPage      └── UserAssignmentPage            │
//! │    └── BasePage (selectors, waits, screenshots)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Browser / BrowserContext / Page  ──JSON lines──  bridge.js │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod portal;
pub mod runner;
pub mod scenarios;
pub mod validation;
pub mod visual;

pub use config::PortalConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, TestResult, TestRunner, TestSuiteResult};
