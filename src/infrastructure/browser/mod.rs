use crate::config::USER_AGENT;
use crate::error::{HarvestError, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub(crate) mod apple;
pub(crate) mod workday_board;

/// A headless Chromium instance. The API is blocking, so callers drive it from
/// `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    pub fn launch() -> Result<Self> {
        let user_agent = format!("--user-agent={USER_AGENT}");
        let options = LaunchOptions {
            headless: true,
            sandbox: false,
            window_size: Some((1920, 1080)),
            idle_browser_timeout: Duration::from_secs(180),
            args: vec![
                OsStr::new(&user_agent),
                OsStr::new("--lang=en-US"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ],
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(HarvestError::browser)?;
        info!("Launched headless browser");
        Ok(Self { browser })
    }

    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        let tab = self.browser.new_tab().map_err(HarvestError::browser)?;
        tab.set_default_timeout(Duration::from_secs(30));
        tab.set_user_agent(USER_AGENT, Some("en-US"), None)
            .map_err(HarvestError::browser)?;
        Ok(tab)
    }
}

/// Loads `url` and waits for the navigation to settle.
pub fn goto(tab: &Arc<Tab>, url: &str) -> Result<()> {
    tab.navigate_to(url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(HarvestError::browser)?;
    Ok(())
}

/// Waits for client-side rendering; a timeout is not an error.
pub fn wait_for(tab: &Arc<Tab>, selector: &str, timeout: Duration) -> bool {
    match tab.wait_for_element_with_custom_timeout(selector, timeout) {
        Ok(_) => true,
        Err(e) => {
            debug!("Gave up waiting for {}: {}", selector, e);
            false
        }
    }
}

/// Runs a script that returns `JSON.stringify(...)` and decodes the result.
pub fn eval_json<T: DeserializeOwned>(tab: &Arc<Tab>, script: &str, await_promise: bool) -> Result<T> {
    let text = eval_string(tab, script, await_promise)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn eval_string(tab: &Arc<Tab>, script: &str, await_promise: bool) -> Result<String> {
    let result = tab
        .evaluate(script, await_promise)
        .map_err(HarvestError::browser)?;
    string_value(result.value)
}

fn string_value(value: Option<Value>) -> Result<String> {
    match value {
        Some(Value::String(text)) => Ok(text),
        Some(other) => Err(HarvestError::Parse(format!(
            "Expected a string from the page, got {other}"
        ))),
        None => Err(HarvestError::Parse("Script returned nothing".to_string())),
    }
}

pub fn close_tab(tab: &Arc<Tab>) {
    if let Err(e) = tab.close(false) {
        debug!("Could not close tab: {}", e);
    }
}
