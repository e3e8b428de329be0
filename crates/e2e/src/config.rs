//! Suite configuration
//!
//! A single read-only [`PortalConfig`] is loaded at startup and shared by every
//! scenario. Values come from built-in defaults, an optional YAML file, and a
//! handful of `CEMPAL_*` environment overrides, in that order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::validation::xpath_literal;

/// Top-level suite configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub portal: PortalUrls,
    pub credentials: CredentialsConfig,
    pub timeouts: Timeouts,
    pub viewport: Viewport,
    pub mobile_viewport: MobileViewport,
    pub browser: BrowserConfig,
    pub performance: PerformanceThresholds,
    pub artifacts: ArtifactsConfig,
    pub selectors: Selectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalUrls {
    pub base_url: String,
    pub login_path: String,
    pub dashboard_path: String,
    pub tenants_path: String,
    pub super_admins_path: String,
    /// Regex matched against the URL while on the identity provider
    pub identity_provider_pattern: String,
}

impl Default for PortalUrls {
    fn default() -> Self {
        Self {
            base_url: "https://portal.cempal.example".to_string(),
            login_path: "/login".to_string(),
            dashboard_path: "/dashboard".to_string(),
            tenants_path: "/tenant-list".to_string(),
            super_admins_path: "/super-admins".to_string(),
            identity_provider_pattern: r"login\.microsoftonline\.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// The user and the three dropdown values used by the Super Admin assignment flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentTarget {
    pub user_email: String,
    pub tenant: String,
    pub user_group: String,
    pub team: String,
}

impl Default for AssignmentTarget {
    fn default() -> Self {
        Self {
            user_email: "qa.user@cempal.example".to_string(),
            tenant: "QA Tenant".to_string(),
            user_group: "Administrators".to_string(),
            team: "Platform".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub admin: Credentials,
    pub invalid: Credentials,
    /// Identity-provider account for the federated login
    pub federated: Credentials,
    pub assignment: AssignmentTarget,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            admin: Credentials::new("superadmin@cempal.example", "ChangeMe!123"),
            invalid: Credentials::new("nobody@cempal.example", "wrong-password"),
            federated: Credentials::new("sso.user@cempal.example", "ChangeMe!123"),
            assignment: AssignmentTarget::default(),
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default: u64,
    pub navigation: u64,
    pub element: u64,
    pub network_idle: u64,
    pub short_wait: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: 30_000,
            navigation: 30_000,
            element: 10_000,
            network_idle: 15_000,
            short_wait: 1_000,
        }
    }
}

impl Timeouts {
    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element)
    }

    pub fn short_wait(&self) -> Duration {
        Duration::from_millis(self.short_wait)
    }

    /// Longest single wait the browser may be asked to perform
    pub fn longest(&self) -> u64 {
        [self.default, self.navigation, self.element, self.network_idle, self.short_wait]
            .into_iter()
            .max()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Viewport used by the responsive layout checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileViewport(pub Viewport);

impl Default for MobileViewport {
    fn default() -> Self {
        Self(Viewport {
            width: 375,
            height: 667,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: BrowserKind,
    pub headless: bool,
    pub slow_mo_ms: u64,
    /// Number of scenarios run in parallel
    pub workers: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            slow_mo_ms: 0,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub max_page_load_ms: u64,
    pub concurrent_users: usize,
    pub max_concurrent_login_ms: u64,
    pub max_memory_growth_mb: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_page_load_ms: 10_000,
            concurrent_users: 5,
            max_concurrent_login_ms: 10_000,
            max_memory_growth_mb: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub screenshot_dir: PathBuf,
    pub results_dir: PathBuf,
    pub baseline_dir: PathBuf,
    pub diff_dir: PathBuf,
    /// Allowed pixel difference for visual comparisons (0.0 - 100.0 percent)
    pub visual_threshold: f64,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            results_dir: PathBuf::from("test-results"),
            baseline_dir: PathBuf::from("test-results/baselines"),
            diff_dir: PathBuf::from("test-results/diffs"),
            visual_threshold: 0.5,
        }
    }
}

/// Flat mapping of logical selector name to CSS/XPath string.
///
/// Row-scoped XPath templates carry a `{value}` placeholder that
/// [`Selectors::format`] replaces with a quoted XPath literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selectors(BTreeMap<String, String>);

const DEFAULT_SELECTORS: &[(&str, &str)] = &[
    // Login (Amplify authenticator)
    ("login.email", "input[id='amplify-id-:r2:']"),
    ("login.password", "input[id='amplify-id-:r5:']"),
    ("login.submit", "button[type='submit']"),
    ("login.error", "[data-amplify-authenticator] [role='alert']"),
    ("login.sso_button", "button:has-text('Sign in with Microsoft')"),
    ("login.forgot_password", "button:has-text('Forgot your password?')"),
    // Identity provider
    ("sso.email", "input[name='loginfmt']"),
    ("sso.password", "input[name='passwd']"),
    ("sso.submit", "#idSIButton9"),
    ("sso.stay_signed_in", "#KmsiDescription"),
    // Dashboard shell
    ("dashboard.marker", "[data-testid='dashboard']"),
    ("dashboard.sidebar", "aside nav"),
    ("dashboard.sidebar_items", "aside nav a"),
    ("dashboard.theme_toggle", "button[aria-label='Toggle theme']"),
    ("dashboard.user_menu", "button[aria-label='User menu']"),
    ("dashboard.logout", "button:has-text('Sign out')"),
    ("nav.tenants", "a[href='/tenant-list']"),
    ("nav.super_admins", "a[href='/super-admins']"),
    ("page.heading", "main h1"),
    // Tenant management
    ("tenant.add_button", "button:has-text('Add Tenant')"),
    ("tenant.name", "#tenantName"),
    ("tenant.email", "#tenantEmail"),
    ("tenant.domain", "#tenantDomain"),
    ("tenant.description", "#tenantDescription"),
    ("tenant.submit", "form button[type='submit']"),
    ("tenant.cancel", "button:has-text('Cancel')"),
    ("tenant.search", "input[placeholder='Search tenants']"),
    ("tenant.rows", "table tbody tr"),
    ("tenant.validation_error", "form [role='alert']"),
    ("tenant.confirm_delete", "[role='dialog'] button:has-text('Delete')"),
    ("tenant.toast", "[role='status']"),
    ("tenant.row", "//tr[td[normalize-space(.)={value}]]"),
    ("tenant.row_edit", "//tr[td[normalize-space(.)={value}]]//button[@aria-label='Edit']"),
    ("tenant.row_delete", "//tr[td[normalize-space(.)={value}]]//button[@aria-label='Delete']"),
    // Super Admin assignment
    ("assignment.tenant_select", "#tenantSelect"),
    ("assignment.group_select", "#userGroupSelect"),
    ("assignment.team_select", "#teamSelect"),
    ("assignment.submit", "[role='dialog'] button:has-text('Assign')"),
    ("assignment.dialog", "[role='dialog']"),
    ("assignment.row", "//tr[td[normalize-space(.)={value}]]"),
    ("assignment.row_action", "//tr[td[normalize-space(.)={value}]]//button[contains(@class, 'action')]"),
];

impl Default for Selectors {
    fn default() -> Self {
        Self(
            DEFAULT_SELECTORS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

// File entries are merged over the defaults rather than replacing the map.
impl<'de> Deserialize<'de> for Selectors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut selectors = Selectors::default();
        selectors.0.extend(overrides);
        Ok(selectors)
    }
}

impl Selectors {
    /// Look up a selector by logical name
    pub fn get(&self, name: &str) -> E2eResult<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| E2eError::SelectorMissing(name.to_string()))
    }

    /// Fill a row-scoped template with `value` as an XPath string literal
    pub fn format(&self, name: &str, value: &str) -> E2eResult<String> {
        let template = self.get(name)?;
        if !template.contains("{value}") {
            return Err(E2eError::Config(format!(
                "selector '{}' has no {{value}} placeholder",
                name
            )));
        }
        Ok(template.replace("{value}", &xpath_literal(value)))
    }

    pub fn insert(&mut self, name: &str, selector: &str) {
        self.0.insert(name.to_string(), selector.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PortalConfig {
    /// Load configuration from a YAML file, falling back to defaults
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            info!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CEMPAL_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> E2eResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CEMPAL_BASE_URL") {
            self.portal.base_url = url;
        }
        if let Some(email) = lookup("CEMPAL_ADMIN_EMAIL") {
            self.credentials.admin.email = email;
        }
        if let Some(password) = lookup("CEMPAL_ADMIN_PASSWORD") {
            self.credentials.admin.password = password;
        }
        if let Some(email) = lookup("CEMPAL_SSO_EMAIL") {
            self.credentials.federated.email = email;
        }
        if let Some(password) = lookup("CEMPAL_SSO_PASSWORD") {
            self.credentials.federated.password = password;
        }
        if let Some(headless) = lookup("CEMPAL_HEADLESS") {
            let off = ["0", "false", "no"].iter().any(|v| headless.trim().eq_ignore_ascii_case(v));
            self.browser.headless = !off;
        }
        if let Some(workers) = lookup("CEMPAL_WORKERS") {
            self.browser.workers = workers
                .parse()
                .map_err(|_| E2eError::Config(format!("CEMPAL_WORKERS is not a number: {}", workers)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> E2eResult<()> {
        let base = &self.portal.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(E2eError::Config(format!("base_url must be http(s): {}", base)));
        }
        if self.browser.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Join the base URL and a path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.portal.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn login_url(&self) -> String {
        self.url(&self.portal.login_path)
    }

    pub fn dashboard_url(&self) -> String {
        self.url(&self.portal.dashboard_path)
    }

    pub fn tenants_url(&self) -> String {
        self.url(&self.portal.tenants_path)
    }

    pub fn super_admins_url(&self) -> String {
        self.url(&self.portal.super_admins_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(config.browser.kind, BrowserKind::Chromium);
        assert!(config.browser.headless);
        assert_eq!(config.performance.concurrent_users, 5);
        assert_eq!(config.selectors.get("tenant.name").unwrap(), "#tenantName");
        assert_eq!(
            config.selectors.get("login.email").unwrap(),
            "input[id='amplify-id-:r2:']"
        );
    }

    #[test]
    fn test_yaml_merges_selectors_over_defaults() {
        let yaml = r#"
portal:
  base_url: https://staging.cempal.example/
selectors:
  tenant.name: "input[name='tenant']"
  custom.banner: ".banner"
browser:
  kind: firefox
  workers: 3
"#;
        let config = PortalConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.selectors.get("tenant.name").unwrap(), "input[name='tenant']");
        assert_eq!(config.selectors.get("custom.banner").unwrap(), ".banner");
        // untouched defaults survive
        assert_eq!(config.selectors.get("login.submit").unwrap(), "button[type='submit']");
        assert_eq!(config.browser.kind, BrowserKind::Firefox);
        assert_eq!(config.browser.workers, 3);
        assert!(config.browser.headless);
        assert_eq!(config.url("/tenant-list"), "https://staging.cempal.example/tenant-list");
    }

    #[test]
    fn test_unknown_selector_is_an_error() {
        let selectors = Selectors::default();
        let err = selectors.get("does.not.exist").unwrap_err();
        assert!(matches!(err, E2eError::SelectorMissing(name) if name == "does.not.exist"));
    }

    #[test]
    fn test_format_row_selector_quotes_value() {
        let selectors = Selectors::default();
        let xpath = selectors.format("assignment.row_action", "o'brien@example.com").unwrap();
        assert_eq!(
            xpath,
            "//tr[td[normalize-space(.)=\"o'brien@example.com\"]]//button[contains(@class, 'action')]"
        );
        assert!(selectors.format("tenant.name", "x").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PortalConfig::default();
        config
            .apply_overrides(|key| match key {
                "CEMPAL_BASE_URL" => Some("http://localhost:3000".to_string()),
                "CEMPAL_ADMIN_EMAIL" => Some("qa@cempal.example".to_string()),
                "CEMPAL_HEADLESS" => Some("false".to_string()),
                "CEMPAL_WORKERS" => Some("4".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.login_url(), "http://localhost:3000/login");
        assert_eq!(config.credentials.admin.email, "qa@cempal.example");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.workers, 4);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let mut config = PortalConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "CEMPAL_WORKERS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(E2eError::Config(_))));

        let mut config = PortalConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "CEMPAL_BASE_URL").then(|| "ftp://portal".to_string())
        });
        assert!(matches!(result, Err(E2eError::Config(_))));
    }

    #[test_case("false", false; "lower case false")]
    #[test_case("FALSE", false; "upper case false")]
    #[test_case("No", false; "mixed case no")]
    #[test_case(" 0 ", false; "padded zero")]
    #[test_case("true", true; "true")]
    #[test_case("1", true; "one")]
    fn test_headless_override(value: &str, headless: bool) {
        let mut config = PortalConfig::default();
        config.browser.headless = !headless;
        config
            .apply_overrides(|key| (key == "CEMPAL_HEADLESS").then(|| value.to_string()))
            .unwrap();
        assert_eq!(config.browser.headless, headless);
    }

    #[test]
    fn test_longest_timeout() {
        let mut timeouts = Timeouts::default();
        assert_eq!(timeouts.longest(), 30_000);
        timeouts.navigation = 90_000;
        assert_eq!(timeouts.longest(), 90_000);
    }

    #[test]
    fn test_browser_kind_from_str() {
        assert_eq!("Chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chromium);
        assert_eq!("webkit".parse::<BrowserKind>().unwrap(), BrowserKind::Webkit);
        assert!("opera".parse::<BrowserKind>().is_err());
    }
}
