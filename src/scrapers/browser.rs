use crate::error::ExtractError;
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::ScrapeConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

const COOKIE_ACCEPT_JS: &str = r#"
    (() => {
        const button = [...document.querySelectorAll('button')]
            .find(b => /Accept|Agree/.test(b.textContent));
        if (button) { button.click(); return true; }
        return false;
    })()
"#;

const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Index page element that signals listings have rendered
const LISTING_LINK_SELECTOR: &str = "a.inner-link";
/// Detail page element that signals the listing has rendered
const PRICE_SELECTOR: &str = "p.hero-price";

/// Page source backed by a single headless Chrome instance.
///
/// Each page gets a fresh tab that is closed afterwards. Calls are blocking,
/// so the async trait methods move them onto tokio's blocking pool.
pub struct AutoTraderBrowserScraper {
    browser: Browser,
    config: ScrapeConfig,
}

impl AutoTraderBrowserScraper {
    /// Launch Chrome for a collection run
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self { browser, config })
    }

    fn open_tab(browser: &Browser, config: &ScrapeConfig) -> Result<Arc<Tab>> {
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_user_agent(&config.user_agent, None, None)
            .context("Failed to set user agent")?;
        Ok(tab)
    }

    fn load_index(browser: &Browser, config: &ScrapeConfig) -> Result<String> {
        let tab = Self::open_tab(browser, config)?;
        let result = Self::read_index(&tab, config);
        if let Err(e) = tab.close(true) {
            debug!("Failed to close index tab: {}", e);
        }
        result
    }

    fn read_index(tab: &Tab, config: &ScrapeConfig) -> Result<String> {
        tab.navigate_to(&config.index_url)?;
        tab.wait_until_navigated()?;

        match tab.evaluate(COOKIE_ACCEPT_JS, false) {
            Ok(result) if result.value.as_ref().and_then(|v| v.as_bool()) == Some(true) => {
                info!("✅ Cookies accepted");
            }
            _ => info!("⚠️  No cookie popup found"),
        }

        info!("🖱️  Scrolling page...");
        let _ = tab.evaluate(SCROLL_TO_BOTTOM_JS, false);
        thread::sleep(config.index_settle.sample());

        tab.wait_for_element_with_custom_timeout(LISTING_LINK_SELECTOR, config.wait_timeout)
            .with_context(|| {
                format!(
                    "No listing links appeared within {}s",
                    config.wait_timeout.as_secs()
                )
            })?;

        let html = tab.get_content().context("Failed to read index page HTML")?;

        if let Some(dir) = &config.debug_dir {
            std::fs::create_dir_all(dir)?;
            let path = dir.join("index_page.html");
            std::fs::write(&path, &html)?;
            info!("Saved index HTML to {} ({} bytes)", path.display(), html.len());
        }

        Ok(html)
    }

    fn load_listing(
        browser: &Browser,
        config: &ScrapeConfig,
        url: &str,
    ) -> Result<String, ExtractError> {
        let tab = Self::open_tab(browser, config)
            .map_err(|e| ExtractError::Navigation(e.to_string()))?;

        debug!("🚗 Navigating to: {}", url);
        let result = tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ExtractError::Navigation(e.to_string()))
            .and_then(|t| {
                t.wait_for_element_with_custom_timeout(PRICE_SELECTOR, config.wait_timeout)
                    .map(|_| ())
                    .map_err(|_| ExtractError::Timeout {
                        selector: PRICE_SELECTOR.to_string(),
                        seconds: config.wait_timeout.as_secs(),
                    })
            })
            .and_then(|_| {
                tab.get_content()
                    .map_err(|e| ExtractError::Navigation(e.to_string()))
            });

        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", url, e);
        }
        result
    }
}

#[async_trait]
impl ListingSource for AutoTraderBrowserScraper {
    async fn index_page(&self) -> Result<String> {
        let browser = self.browser.clone();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || Self::load_index(&browser, &config))
            .await
            .context("Index page task panicked")?
    }

    async fn listing_page(&self, url: &str) -> Result<String, ExtractError> {
        let browser = self.browser.clone();
        let config = self.config.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || Self::load_listing(&browser, &config, &url))
            .await
            .unwrap_or_else(|e| {
                warn!("Listing task failed to complete: {}", e);
                Err(ExtractError::Navigation(e.to_string()))
            })
    }

    fn source_name(&self) -> &'static str {
        "AutoTrader (headless Chrome)"
    }
}
