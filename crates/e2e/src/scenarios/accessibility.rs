//! Accessibility checks: labels, alt text, keyboard reachability, contrast,
//! landmarks, and the mobile layout.

use serde_json::json;
use tracing::{debug, info, warn};

use super::{Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::playwright::LoadState;

/// WCAG AA minimum for normal text
const MIN_CONTRAST: f64 = 4.5;

const MAX_TAB_PRESSES: usize = 10;

const HAS_ACCESSIBLE_LABEL: &str = r#"(sel) => {
  const el = document.querySelector(sel);
  if (!el) return false;
  if (el.getAttribute('aria-label') || el.getAttribute('aria-labelledby')) return true;
  if (el.id && document.querySelector(`label[for="${CSS.escape(el.id)}"]`)) return true;
  return !!el.closest('label');
}"#;

const IMAGES_WITHOUT_ALT: &str =
    "() => Array.from(document.querySelectorAll('img:not([alt])')).map((img) => img.src)";

const UNNAMED_BUTTONS: &str = r#"() => Array.from(document.querySelectorAll('button, [role="button"]'))
  .filter((b) => !(b.textContent || '').trim()
    && !b.getAttribute('aria-label')
    && !b.getAttribute('aria-labelledby')
    && !b.getAttribute('title'))
  .map((b) => b.outerHTML.slice(0, 120))"#;

const IS_FOCUSED: &str = "(sel) => document.activeElement === document.querySelector(sel)";

/// First non-transparent background colour walking up from the element
const EFFECTIVE_BACKGROUND: &str = r#"(sel) => {
  let el = document.querySelector(sel);
  while (el) {
    const bg = window.getComputedStyle(el).backgroundColor;
    if (bg && bg !== 'transparent' && !/rgba\(.*,\s*0\)$/.test(bg)) return bg;
    el = el.parentElement;
  }
  return 'rgb(255, 255, 255)';
}"#;

const HORIZONTAL_OVERFLOW: &str =
    "() => document.documentElement.scrollWidth - document.documentElement.clientWidth";

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("a11y-login-labels", &["accessibility"], a11y_login_labels),
        Scenario::new("a11y-images-alt", &["accessibility"], a11y_images_alt),
        Scenario::new("a11y-keyboard-navigation", &["accessibility"], a11y_keyboard_navigation),
        Scenario::new("a11y-button-names", &["accessibility"], a11y_button_names),
        Scenario::new("a11y-contrast", &["accessibility"], a11y_contrast),
        Scenario::new("a11y-landmarks", &["accessibility"], a11y_landmarks),
        Scenario::new("a11y-responsive-mobile", &["accessibility"], a11y_responsive_mobile),
    ]
}

/// Parse `rgb()`, `rgba()`, `#rgb` or `#rrggbb`. Fully transparent colours
/// yield `None`.
pub fn parse_css_color(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        return Some((channel(0)?, channel(2)?, channel(4)?));
    }

    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    if let Some(alpha) = parts.get(3) {
        let alpha: f64 = alpha.trim_end_matches('%').parse().ok()?;
        if alpha == 0.0 {
            return None;
        }
    }
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.round().clamp(0.0, 255.0) as u8);
    Some((channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
}

fn relative_luminance((r, g, b): (u8, u8, u8)) -> f64 {
    let linear = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// WCAG contrast ratio, from 1.0 (identical) to 21.0 (black on white)
pub fn contrast_ratio(foreground: (u8, u8, u8), background: (u8, u8, u8)) -> f64 {
    let a = relative_luminance(foreground);
    let b = relative_luminance(background);
    let (lighter, darker) = if a >= b { (a, b) } else { (b, a) };
    (lighter + 0.05) / (darker + 0.05)
}

async fn a11y_login_labels(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;

    for name in ["login.email", "login.password"] {
        let selector = login.base.selector(name)?;
        let labelled: bool = ctx.page.evaluate(HAS_ACCESSIBLE_LABEL, json!(selector)).await?;
        ensure!(labelled, "{} has no label or ARIA label", name);
    }
    Ok(())
}

async fn a11y_images_alt(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    let missing: Vec<String> = ctx.page.evaluate(IMAGES_WITHOUT_ALT, json!(null)).await?;
    ensure!(missing.is_empty(), "login page images without alt: {:?}", missing);

    ctx.sign_in().await?;
    let missing: Vec<String> = ctx.page.evaluate(IMAGES_WITHOUT_ALT, json!(null)).await?;
    ensure!(missing.is_empty(), "dashboard images without alt: {:?}", missing);
    Ok(())
}

async fn a11y_keyboard_navigation(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    let email = login.base.selector("login.email")?;

    for press in 1..=MAX_TAB_PRESSES {
        ctx.page.keyboard_press("Tab").await?;
        if let Some(focused) = ctx.page.focused_element().await? {
            debug!("Tab {} focused <{}> {:?}", press, focused.tag, focused.id);
        }
        let reached: bool = ctx.page.evaluate(IS_FOCUSED, json!(email)).await?;
        if reached {
            info!("E-mail field reached after {} Tab presses", press);
            return Ok(());
        }
    }
    Err(crate::error::E2eError::AssertionFailed(format!(
        "e-mail field not reached within {} Tab presses",
        MAX_TAB_PRESSES
    )))
}

async fn a11y_button_names(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;
    let unnamed: Vec<String> = ctx.page.evaluate(UNNAMED_BUTTONS, json!(null)).await?;
    ensure!(unnamed.is_empty(), "login buttons without a name: {:?}", unnamed);

    ctx.sign_in().await?;
    let unnamed: Vec<String> = ctx.page.evaluate(UNNAMED_BUTTONS, json!(null)).await?;
    ensure!(unnamed.is_empty(), "dashboard buttons without a name: {:?}", unnamed);
    Ok(())
}

async fn a11y_contrast(ctx: ScenarioContext) -> E2eResult<()> {
    let login = ctx.login_page();
    login.open().await?;

    for name in ["login.submit", "login.email"] {
        let selector = login.base.selector(name)?;
        let color = ctx.page.computed_style(selector, "color").await?;
        let background: String = ctx.page.evaluate(EFFECTIVE_BACKGROUND, json!(selector)).await?;

        let (Some(fg), Some(bg)) = (parse_css_color(&color), parse_css_color(&background)) else {
            warn!("Cannot parse colours for {}: '{}' on '{}'", name, color, background);
            continue;
        };
        let ratio = contrast_ratio(fg, bg);
        info!("{} contrast {:.2}:1 ({} on {})", name, ratio, color, background);
        ensure!(
            ratio >= MIN_CONTRAST,
            "{} contrast {:.2}:1 is below {:.1}:1",
            name,
            ratio,
            MIN_CONTRAST
        );
    }
    Ok(())
}

async fn a11y_landmarks(ctx: ScenarioContext) -> E2eResult<()> {
    ctx.sign_in().await?;

    let main = ctx.page.count("main, [role='main']").await?;
    ensure!(main >= 1, "no main landmark");
    let nav = ctx.page.count("nav, [role='navigation']").await?;
    ensure!(nav >= 1, "no navigation landmark");

    let lang = ctx.page.get_attribute("html", "lang").await?;
    ensure!(
        lang.map(|l| !l.trim().is_empty()).unwrap_or(false),
        "document has no lang attribute"
    );
    Ok(())
}

async fn a11y_responsive_mobile(ctx: ScenarioContext) -> E2eResult<()> {
    let mobile = ctx.config.mobile_viewport.0;
    ctx.page.set_viewport(mobile).await?;
    ctx.page.goto(&ctx.config.login_url(), LoadState::Load).await?;

    let login = ctx.login_page();
    ensure!(
        login.base.wait_for_element("login.email").await,
        "login form hidden at {}x{}",
        mobile.width,
        mobile.height
    );
    ensure!(
        login.base.is_element_visible("login.submit").await,
        "sign-in button hidden at {}x{}",
        mobile.width,
        mobile.height
    );

    let overflow: f64 = ctx.page.evaluate(HORIZONTAL_OVERFLOW, json!(null)).await?;
    ensure!(overflow <= 0.0, "page overflows horizontally by {}px", overflow);
    Ok(())
}
