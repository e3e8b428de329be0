//! Error types for the portal E2E suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Portal unreachable at {url} after {attempts} attempts")]
    PortalUnreachable { url: String, attempts: usize },

    #[error("Node.js not found. Install Node.js >= 18")]
    NodeNotFound,

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Bridge failed to start: {0}")]
    BridgeStartup(String),

    #[error("Bridge not running")]
    BridgeNotRunning,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown selector: {0}")]
    SelectorMissing(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Step {number} failed: {description} - {reason}")]
    StepFailed {
        number: usize,
        description: String,
        reason: String,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Screenshot mismatch: {name} differs by {diff_percent:.2}% (threshold: {threshold:.2}%)")]
    ScreenshotMismatch {
        name: String,
        diff_percent: f64,
        threshold: f64,
    },

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Screenshot not captured: {0}")]
    ScreenshotMissing(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fail the current scenario with [`E2eError::AssertionFailed`] unless the
/// condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::E2eError::AssertionFailed(format!($($arg)+)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: u32) -> E2eResult<()> {
        ensure!(value < 10, "value {} exceeds limit", value);
        Ok(())
    }

    #[test]
    fn test_ensure_passes_and_fails() {
        assert!(check(3).is_ok());
        let err = check(12).unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: value 12 exceeds limit");
    }

    #[test]
    fn test_step_failed_display() {
        let err = E2eError::StepFailed {
            number: 7,
            description: "Click tenants".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Step 7 failed: Click tenants - timeout");
    }
}
