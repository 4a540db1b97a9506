//! Headless-browser fetching via `chromiumoxide` (spec.md §4.A).
//!
//! Grounded in the teacher's `scraping::browser_manager` module: executable
//! discovery order (env override → `PATH` scan → OS well-known paths), the
//! headless flag set for container/CI compatibility, and the
//! launch-handler-task shape are all carried over. The browser instance is
//! shared and mutex-guarded (SPEC_FULL.md §4.A); a dead connection (the CDP
//! event stream ending) is detected via an `alive` flag and forces a
//! relaunch on the next fetch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use url::Url;

use super::Fetcher;
use crate::core::error::FetchError;
use crate::core::types::{FetchResult, ScraperOptions};

/// Find a usable Chromium-family browser executable.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = ["chromium", "chromium-browser", "google-chrome", "chrome"];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

fn build_headless_config(exe: &str, width: u32, height: u32) -> Result<BrowserConfig, FetchError> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .build()
        .map_err(FetchError::Browser)
}

struct BrowserHandle {
    browser: Browser,
    alive: Arc<AtomicBool>,
}

pub struct BrowserFetcher {
    chrome_executable: Option<String>,
    viewport: (u32, u32),
    wait_after_navigate: Duration,
    inner: Arc<Mutex<Option<BrowserHandle>>>,
}

impl BrowserFetcher {
    pub fn new(chrome_executable: Option<String>) -> Self {
        Self {
            chrome_executable,
            viewport: (1280, 900),
            wait_after_navigate: Duration::from_millis(1500),
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Best-effort shutdown of the shared browser instance.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut handle) = guard.take() {
            if let Err(e) = handle.browser.close().await {
                warn!(error = %e, "browser close error (non-fatal)");
            }
        }
    }

    async fn launch(&self) -> Result<BrowserHandle, FetchError> {
        let exe = self
            .chrome_executable
            .clone()
            .or_else(find_chrome_executable)
            .ok_or_else(|| {
                FetchError::Browser(
                    "no browser found; install Chromium/Chrome or set CHROME_EXECUTABLE".to_string(),
                )
            })?;

        let config = build_headless_config(&exe, self.viewport.0, self.viewport.1)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to launch browser ({exe}): {e}")))?;

        let alive = Arc::new(AtomicBool::new(true));
        let alive_task = alive.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!(error = %e, "CDP handler error");
                }
            }
            alive_task.store(false, Ordering::SeqCst);
        });

        Ok(BrowserHandle { browser, alive })
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    /// Doesn't inspect the committed navigation's status or redirect chain —
    /// `options.follow_redirects` is enforced by `Crawler::fetcher_for`
    /// routing to `StaticFetcher` instead whenever it's `false`, so this
    /// fetcher is only ever reached when redirects are allowed.
    async fn fetch(&self, url: &Url, options: &ScraperOptions) -> Result<FetchResult, FetchError> {
        if options.cancellation.is_cancelled() {
            return Err(FetchError::Browser("cancelled before navigation".to_string()));
        }

        let mut guard = self.inner.lock().await;
        let needs_relaunch = match &*guard {
            Some(h) => !h.alive.load(Ordering::SeqCst),
            None => true,
        };
        if needs_relaunch {
            *guard = Some(self.launch().await?);
        }
        let handle = guard.as_mut().expect("just ensured Some");

        debug!(%url, "browser fetch");
        let page = handle
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| FetchError::Browser(format!("failed to open page: {e}")))?;

        tokio::select! {
            _ = tokio::time::sleep(self.wait_after_navigate) => {}
            _ = options.cancellation.cancelled() => {
                let _ = page.close().await;
                return Err(FetchError::Browser("cancelled during navigation wait".to_string()));
            }
        }

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::Browser(format!("failed to read page content: {e}")))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let _ = page.close().await;

        Ok(FetchResult {
            bytes: html.into_bytes(),
            content_type: "text/html".to_string(),
            status: 200,
            final_url,
        })
    }
}
