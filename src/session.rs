//! Browser session management on top of chromiumoxide.
//!
//! The [`PageContext`] trait is the only surface the rest of the pipeline
//! sees: navigate, evaluate JavaScript, read the rendered source, read the
//! current URL. [`ChromiumSession`] implements it over a single headless
//! Chromium instance: one page, driven sequentially, never shared.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Errors from the browser session layer.
///
/// DOM-level misses (element not found, stale index) are NOT errors; they
/// are ordinary outcome values in [`crate::dom`]. This enum covers the cases
/// where the session itself is unusable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no Chromium binary found — set FORAGE_CHROMIUM_PATH or install Chrome")]
    BrowserNotFound,
    #[error("failed to launch Chromium: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },
    #[error("script evaluation failed: {0}")]
    Script(String),
}

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FORAGE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("FORAGE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.forage/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".forage/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".forage/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".forage/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".forage/chromium/chrome-linux64/chrome"),
                home.join(".forage/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for the browser session.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Viewport size passed as `--window-size`.
    pub window: (u32, u32),
    /// User agent string sent with every request.
    pub user_agent: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1920, 1080),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// A rendered page the pipeline can observe and drive.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), SessionError>;
    /// Evaluate JavaScript in the page and return its JSON value.
    async fn eval(&self, script: &str) -> Result<serde_json::Value, SessionError>;
    /// The full rendered page source.
    async fn page_source(&self) -> Result<String, SessionError>;
    /// The current URL.
    async fn current_url(&self) -> Result<String, SessionError>;
}

/// A single headless Chromium instance with one active page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank page.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, SessionError> {
        let chrome_path = find_chromium().ok_or(SessionError::BrowserNotFound)?;

        let mut config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!(
                "--window-size={},{}",
                options.window.0, options.window.1
            ))
            .arg(format!("--user-agent={}", options.user_agent));
        if options.headless {
            config = config.arg("--headless=new");
        }
        let config = config
            .build()
            .map_err(|e| SessionError::Launch(format!("bad browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(format!("failed to open page: {e}")))?;

        Ok(Self { browser, page })
    }

    /// Close the page and drop the browser.
    pub async fn close(self) {
        let _ = self.page.close().await;
        drop(self.browser);
    }
}

#[async_trait]
impl PageContext for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), SessionError> {
        let start = Instant::now();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                debug!(url, elapsed_ms = start.elapsed().as_millis() as u64, "navigated");
                Ok(())
            }
            Ok(Err(e)) => Err(SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(SessionError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }

    async fn eval(&self, script: &str) -> Result<serde_json::Value, SessionError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| SessionError::Script(format!("bad script result: {e:?}")))
    }

    async fn page_source(&self) -> Result<String, SessionError> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| SessionError::Script(format!("bad outerHTML result: {e:?}")))
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }
}
