//! Playwright browser automation
//!
//! ```text
//! ┌─────────────────┐  JSON lines   ┌──────────────────┐
//! │  Rust (Page,    │ ◄───────────► │ node bridge.js   │
//! │  BrowserContext)│  stdin/stdout │                  │
//! └─────────────────┘               └──────────────────┘
//!                                          │ Playwright API
//!                                   ┌──────────────────┐
//!                                   │ Chromium/Firefox │
//!                                   │ /WebKit          │
//!                                   └──────────────────┘
//! ```

mod bridge;
mod browser;
mod page;

#[cfg(all(test, unix))]
pub(crate) mod fake_node;

pub use bridge::{BridgeConfig, PlaywrightBridge};
pub use browser::{Browser, BrowserContext, Cookie};
pub use page::{DialogEntry, FocusedElement, LoadState, NavigationResponse, NetworkEntry, Page, WaitState};
