use std::io::Write;

use cempal_e2e::config::BrowserKind;
use cempal_e2e::{E2eError, PortalConfig, TestRunner};
use tempfile::NamedTempFile;

/// Config File Loading
///
/// Writes a partial YAML file and checks it merges over the built-in
/// defaults, including selector overrides.
#[test]
fn partial_yaml_merges_over_defaults() {
    let mut file = NamedTempFile::new().expect("create temp file");
    write!(
        file,
        r##"
portal:
  base_url: https://staging.cempal.example/
browser:
  kind: firefox
  workers: 3
credentials:
  admin:
    email: qa.admin@cempal.example
selectors:
  login.submit: "#sign-in"
"##
    )
    .expect("write config");

    let config = PortalConfig::load(file.path()).expect("load config");

    assert_eq!(config.browser.kind, BrowserKind::Firefox);
    assert_eq!(config.browser.workers, 3);
    assert!(config.browser.headless);
    assert_eq!(config.credentials.admin.email, "qa.admin@cempal.example");
    assert_eq!(config.selectors.get("login.submit").unwrap(), "#sign-in");
    assert!(config.selectors.get("tenant.add_button").is_ok());
    assert_eq!(config.tenants_url(), "https://staging.cempal.example/tenant-list");
}

#[test]
fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = PortalConfig::load(&dir.path().join("absent.yaml")).expect("defaults");
    assert_eq!(config.portal.login_path, "/login");
    assert_eq!(config.timeouts.element, 10_000);
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = PortalConfig::from_yaml("portal:\n  base_url: ftp://portal.cempal.example\n").unwrap_err();
    assert!(matches!(err, E2eError::Config(_)), "unexpected error: {}", err);
}

/// Scenario Registry
///
/// The runner exposes every group and the full manual script without a
/// browser.
#[test]
fn runner_lists_every_group() {
    let runner = TestRunner::new();
    let listed = runner.list();
    for tag in ["auth", "tenant", "assignment", "theme", "navigation", "comprehensive"] {
        assert!(
            listed.iter().any(|(_, tags)| tags.contains(&tag)),
            "no scenario tagged {}",
            tag
        );
    }
    assert_eq!(cempal_e2e::scenarios::COMPREHENSIVE_STEPS.len(), 71);
}
