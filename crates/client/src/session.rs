//! Browser session lifecycle.
//!
//! A [`BrowserSession`] owns one chromiumoxide `Browser`, the background task
//! driving its DevTools connection and a single `Page`. It is either launched
//! by us or attached to a browser someone else started; release only tears
//! down what we created.

use std::path::PathBuf;
use std::time::Duration;

use cachesnap_core::{AppConfig, CollectionError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// How to obtain a browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Launch without a window (default: true).
    pub headless: bool,

    /// Browser binary to launch instead of the detected one.
    pub chrome_executable: Option<PathBuf>,

    /// Attach to this running browser instead of launching.
    pub debugger_url: Option<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self { headless: true, chrome_executable: None, debugger_url: None }
    }
}

impl From<&AppConfig> for BrowserOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            debugger_url: config.debugger_url.clone(),
        }
    }
}

/// `/json/version` payload of a DevTools HTTP endpoint.
#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// A browser plus the one page collections run against.
pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    owned: bool,
}

impl BrowserSession {
    /// Launch or attach according to `options`.
    pub async fn open(options: &BrowserOptions) -> Result<Self, CollectionError> {
        match options.debugger_url.as_deref() {
            Some(endpoint) => Self::attach(endpoint).await,
            None => Self::launch(options).await,
        }
    }

    /// Launch a new browser instance.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, CollectionError> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| CollectionError::Session(format!("invalid browser config: {e}")))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| CollectionError::Session(format!("browser launch failed: {e}")))?;

        tracing::info!(headless = options.headless, "launched browser");
        Self::start(browser, handler, true).await
    }

    /// Attach to a running browser through its DevTools endpoint.
    ///
    /// Accepts a `ws://` debugger URL or the `http://host:port` endpoint,
    /// which is resolved through `/json/version`.
    pub async fn attach(endpoint: &str) -> Result<Self, CollectionError> {
        let ws_url = resolve_debugger_url(endpoint).await?;

        let (browser, handler) = Browser::connect(ws_url.as_str())
            .await
            .map_err(|e| CollectionError::Session(format!("failed to attach to {ws_url}: {e}")))?;

        tracing::info!(endpoint = %ws_url, "attached to running browser");
        Self::start(browser, handler, false).await
    }

    async fn start(
        mut browser: Browser, mut handler: chromiumoxide::Handler, owned: bool,
    ) -> Result<Self, CollectionError> {
        use futures_util::StreamExt;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if owned {
                    browser.close().await.ok();
                    browser.wait().await.ok();
                }
                handler.abort();
                return Err(CollectionError::Session(format!("failed to open page: {e}")));
            }
        };

        Ok(Self { browser: Mutex::new(Some(browser)), page, handler, owned })
    }

    /// The page collections run against.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate the page to `url` and give it `settle` to populate its caches.
    pub async fn navigate(&self, url: &Url, settle: Duration) -> Result<(), CollectionError> {
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| CollectionError::Session(format!("navigation to {url} failed: {e}")))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| CollectionError::Session(format!("navigation to {url} failed: {e}")))?;

        tracing::info!(url = %url, settle_ms = settle.as_millis() as u64, "page loaded");
        tokio::time::sleep(settle).await;
        Ok(())
    }

    /// Tear the session down. Later calls are no-ops.
    ///
    /// Launched browsers are closed and reaped; attached browsers only lose
    /// the page this session opened.
    pub async fn release(&self) -> Result<(), CollectionError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let result = if self.owned {
            match browser.close().await {
                Ok(_) => browser
                    .wait()
                    .await
                    .map(|_| ())
                    .map_err(|e| CollectionError::Session(format!("failed to reap browser: {e}"))),
                Err(e) => Err(CollectionError::Session(format!("failed to close browser: {e}"))),
            }
        } else {
            self.page
                .clone()
                .close()
                .await
                .map_err(|e| CollectionError::Session(format!("failed to close page: {e}")))
        };

        self.handler.abort();
        tracing::info!(owned = self.owned, "released browser session");
        result
    }
}

/// Turn a DevTools endpoint into a websocket debugger URL.
async fn resolve_debugger_url(endpoint: &str) -> Result<Url, CollectionError> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| CollectionError::Session(format!("invalid debugger URL {endpoint:?}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        "http" | "https" => {
            let version_url = version_endpoint(&url)?;
            let info: VersionInfo = reqwest::get(version_url.as_str())
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| CollectionError::Session(format!("failed to query {version_url}: {e}")))?
                .json()
                .await
                .map_err(|e| CollectionError::Session(format!("invalid response from {version_url}: {e}")))?;

            Url::parse(&info.web_socket_debugger_url)
                .map_err(|e| CollectionError::Session(format!("invalid websocket URL from {version_url}: {e}")))
        }
        scheme => Err(CollectionError::Session(format!("unsupported debugger URL scheme: {scheme}"))),
    }
}

fn version_endpoint(base: &Url) -> Result<Url, CollectionError> {
    base.join("/json/version")
        .map_err(|e| CollectionError::Session(format!("invalid debugger URL {base}: {e}")))
}
