//! Shared browser-session plumbing for portal adapters
//!
//! Portal platforms have no public API; their adapters drive a headless
//! Chrome session instead. This module owns the parts that are identical
//! across portals: launching the browser, restoring persisted cookie
//! state, detecting a login page, filling the login form, and persisting
//! cookie state for future runs. Everything portal-specific (listing
//! URLs, card selectors) stays in the individual adapter modules.

use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, LaunchOptions, Tab};
use sdk::errors::EngineError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything needed to establish a logged-in portal session.
pub struct LoginSpec {
    /// Platform name, for logging only
    pub platform: &'static str,

    /// Portal landing URL
    pub base_url: String,

    /// Run Chrome headless
    pub headless: bool,

    /// Login email (never logged)
    pub email: String,

    /// Login password (never logged)
    pub password: String,

    /// Where cookie state is persisted between runs
    pub state_path: PathBuf,
}

/// A live Chrome session against one portal.
///
/// Dropping the session closes the browser, so every early-return path
/// out of `establish` releases the Chrome process.
pub struct PortalSession {
    // Held only to keep the Chrome process alive for the tab's lifetime.
    _browser: Browser,

    /// The single tab all portal navigation goes through
    pub tab: Arc<Tab>,
}

impl PortalSession {
    /// Launch Chrome, restore persisted cookie state, navigate to the
    /// portal, and run the login flow when the portal asks for one.
    ///
    /// Blocking; callers run this under `spawn_blocking`.
    pub fn establish(spec: &LoginSpec) -> Result<Self, EngineError> {
        let options = LaunchOptions::default_builder()
            .headless(spec.headless)
            .build()
            .map_err(|e| EngineError::Browser(format!("launch options: {}", e)))?;

        let browser = Browser::new(options)
            .map_err(|e| EngineError::Browser(format!("Chrome launch failed: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| EngineError::Browser(format!("tab creation failed: {}", e)))?;

        if let Some(cookies) = load_cookie_state(&spec.state_path) {
            debug!("{}: restoring {} cookie(s)", spec.platform, cookies.len());
            if let Err(e) = tab.set_cookies(cookies) {
                warn!("{}: could not restore session state: {}", spec.platform, e);
            }
        }

        tab.navigate_to(&spec.base_url)
            .map_err(|e| EngineError::Browser(format!("navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| EngineError::Browser(format!("page load failed: {}", e)))?;

        if looks_like_login_page(&tab.get_url()) {
            fill_login_form(&tab, spec)?;
            persist_cookie_state(&tab, &spec.state_path, spec.platform);
        }

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

/// Fill and submit the portal's login form with the spec's credentials.
fn fill_login_form(tab: &Arc<Tab>, spec: &LoginSpec) -> Result<(), EngineError> {
    // Not every portal renders every field; fill what is present.
    if let Ok(field) = tab.find_element("input[type='email']") {
        field
            .click()
            .map_err(|e| EngineError::Browser(format!("email field: {}", e)))?;
        tab.type_str(&spec.email)
            .map_err(|e| EngineError::Browser(format!("email input: {}", e)))?;
    }

    if let Ok(field) = tab.find_element("input[type='password']") {
        field
            .click()
            .map_err(|e| EngineError::Browser(format!("password field: {}", e)))?;
        tab.type_str(&spec.password)
            .map_err(|e| EngineError::Browser(format!("password input: {}", e)))?;
    }

    if let Ok(button) = tab.find_element("button[type='submit']") {
        button
            .click()
            .map_err(|e| EngineError::Browser(format!("submit button: {}", e)))?;
    }

    tab.wait_until_navigated()
        .map_err(|e| EngineError::Browser(format!("post-login load failed: {}", e)))?;

    Ok(())
}

/// Whether a URL looks like the portal's login/auth flow.
pub fn looks_like_login_page(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("login") || lower.contains("auth")
}

/// Load persisted cookie state, if any.
///
/// The state file stores the cookies as captured from the browser; that
/// JSON shape is a superset of the cookie-parameter shape, so it
/// deserializes directly into restorable parameters.
fn load_cookie_state(path: &Path) -> Option<Vec<CookieParam>> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(cookies) => Some(cookies),
        Err(e) => {
            warn!("ignoring unreadable session state {}: {}", path.display(), e);
            None
        }
    }
}

/// Persist the tab's cookies for future runs. Failures only warn: session
/// persistence is an optimization, never a reason to fail a connect.
fn persist_cookie_state(tab: &Arc<Tab>, path: &Path, platform: &str) {
    let cookies = match tab.get_cookies() {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!("{}: could not read cookies: {}", platform, e);
            return;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("{}: could not create state directory: {}", platform, e);
            return;
        }
    }

    match serde_json::to_string(&cookies) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                warn!("{}: could not persist session state: {}", platform, e);
            }
        }
        Err(e) => warn!("{}: could not serialize session state: {}", platform, e),
    }
}
