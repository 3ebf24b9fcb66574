use crate::scout_browser::{
    stealth::{build_stealth_arguments, StealthScripts},
    wait::Waiter,
};
use anyhow::Result;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use webdriver::capabilities::Capabilities;

/// Connection and lifecycle settings for one browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chromedriver endpoint, e.g. `http://localhost:9515`.
    pub webdriver_url: String,
    pub headless: bool,
    pub page_load_timeout: Duration,
    /// Cadence for bounded element polls.
    pub poll: Duration,
    /// Bounded wait for fast-appearing elements.
    pub short_wait: Duration,
    /// Bounded wait for page and frame readiness.
    pub long_wait: Duration,
}

/// Owner of exactly one live WebDriver session.
///
/// At most one session exists per harvester; recovery destroys the handle and
/// creates a fresh one, which also invalidates every [`Waiter`] built from it.
pub struct ScoutSession {
    client: Client,
    config: SessionConfig,
}

impl ScoutSession {
    /// Connect to the WebDriver service and open a hardened browser.
    pub async fn create(config: SessionConfig) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();

        let args = build_stealth_arguments(config.headless);
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": config.page_load_timeout.as_millis() as u64 }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await?;

        debug!(target: "browser.session", url = %config.webdriver_url, "session created");
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Navigate and re-apply the JS evasions; the masking does not survive a
    /// page load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        self.client
            .execute(StealthScripts::core_evasions(), vec![])
            .await?;
        Ok(())
    }

    /// Waiter with the short element timeout.
    pub fn short_waiter(&self) -> Waiter {
        Waiter::new(self.client.clone(), self.config.short_wait, self.config.poll)
    }

    /// Waiter with the long page/frame timeout.
    pub fn long_waiter(&self) -> Waiter {
        Waiter::new(self.client.clone(), self.config.long_wait, self.config.poll)
    }

    /// Liveness probe. Any failure to answer a trivial command counts as
    /// dead; this never errors.
    pub async fn is_alive(&self) -> bool {
        self.client.current_url().await.is_ok()
    }

    /// Close the underlying browser. Safe to call on an already-dead
    /// session.
    pub async fn destroy(self) {
        if let Err(e) = self.client.close().await {
            warn!(target: "browser.session", error = %e, "session close failed (already dead?)");
        }
    }
}
