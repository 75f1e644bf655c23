//! Headless Chrome implementation of [`ViewerDriver`] over the DevTools protocol.

use anyhow::{Result, anyhow};

use crate::config::BrowserConfig;
use crate::driver::{DriverLauncher, ViewerDriver};

/// Launches Chrome with the window size and executable from [`BrowserConfig`].
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "browser")]
pub use enabled::ChromiumDriver;

#[cfg(feature = "browser")]
mod enabled {
    use super::*;

    use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// One Chrome process with at most one open viewer tab
    pub struct ChromiumDriver {
        browser: Browser,
        handler_task: JoinHandle<()>,
        page: Option<Page>,
    }

    impl std::fmt::Debug for ChromiumDriver {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumDriver")
                .field("has_page", &self.page.is_some())
                .finish()
        }
    }

    impl DriverLauncher for ChromiumLauncher {
        type Driver = ChromiumDriver;

        async fn launch(&self) -> Result<ChromiumDriver> {
            let width = self.config.window_width;
            let height = self.config.window_height;
            let window_arg = format!("--window-size={},{}", width, height);
            let args = [
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-extensions",
                "--disable-background-networking",
                "--disable-sync",
                "--no-first-run",
                window_arg.as_str(),
            ];

            let mut builder = CdpBrowserConfig::builder()
                .viewport(Some(Viewport {
                    width,
                    height,
                    device_scale_factor: Some(1.0),
                    ..Default::default()
                }))
                .args(args);
            if !self.config.headless {
                builder = builder.with_head();
            }
            if let Some(executable) = &self.config.chrome_executable {
                builder = builder.chrome_executable(executable);
            }
            let config = builder
                .build()
                .map_err(|e| anyhow!("Browser config error: {e}"))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| anyhow!("Failed to launch browser: {e}"))?;

            let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

            Ok(ChromiumDriver {
                browser,
                handler_task,
                page: None,
            })
        }
    }

    impl ChromiumDriver {
        fn page(&self) -> Result<&Page> {
            self.page.as_ref().ok_or_else(|| anyhow!("no viewer page is open"))
        }
    }

    impl ViewerDriver for ChromiumDriver {
        async fn open(&mut self, url: &str) -> Result<()> {
            if let Some(previous) = self.page.take() {
                if let Err(e) = previous.close().await {
                    log::debug!("Closing previous page failed: {e}");
                }
            }

            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| anyhow!("Failed to open {url}: {e}"))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| anyhow!("Navigation to {url} failed: {e}"))?;
            self.page = Some(page);
            Ok(())
        }

        async fn is_present(&mut self, selector: &str) -> Result<bool> {
            Ok(self.page()?.find_element(selector).await.is_ok())
        }

        async fn text(&mut self, selector: &str) -> Result<String> {
            let element = self
                .page()?
                .find_element(selector)
                .await
                .map_err(|e| anyhow!("'{selector}' not found: {e}"))?;
            let text = element
                .inner_text()
                .await
                .map_err(|e| anyhow!("Reading '{selector}' failed: {e}"))?;
            Ok(text.unwrap_or_default())
        }

        async fn screenshot_element(&mut self, selector: &str) -> Result<Vec<u8>> {
            let element = self
                .page()?
                .find_element(selector)
                .await
                .map_err(|e| anyhow!("'{selector}' not found: {e}"))?;
            element
                .screenshot(CaptureScreenshotFormat::Png)
                .await
                .map_err(|e| anyhow!("Screenshot of '{selector}' failed: {e}"))
        }

        async fn click(&mut self, selector: &str) -> Result<()> {
            let element = self
                .page()?
                .find_element(selector)
                .await
                .map_err(|e| anyhow!("'{selector}' not found: {e}"))?;
            element
                .click()
                .await
                .map_err(|e| anyhow!("Clicking '{selector}' failed: {e}"))?;
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<()> {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    log::debug!("Closing page failed: {e}");
                }
            }
            self.browser
                .close()
                .await
                .map_err(|e| anyhow!("Failed to close browser: {e}"))?;
            self.browser
                .wait()
                .await
                .map_err(|e| anyhow!("Failed to reap browser process: {e}"))?;
            self.handler_task.abort();
            Ok(())
        }
    }

    impl Drop for ChromiumDriver {
        fn drop(&mut self) {
            // Browser's own Drop kills the child process
            self.handler_task.abort();
        }
    }
}

/// Stand-in when the crate is built without the `browser` feature.
#[cfg(not(feature = "browser"))]
#[derive(Debug)]
pub struct ChromiumDriver {
    _private: (),
}

#[cfg(not(feature = "browser"))]
impl DriverLauncher for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn launch(&self) -> Result<ChromiumDriver> {
        let _ = &self.config;
        Err(anyhow!("built without the `browser` feature"))
    }
}

#[cfg(not(feature = "browser"))]
impl ViewerDriver for ChromiumDriver {
    async fn open(&mut self, _url: &str) -> Result<()> {
        Err(anyhow!("built without the `browser` feature"))
    }

    async fn is_present(&mut self, _selector: &str) -> Result<bool> {
        Ok(false)
    }

    async fn text(&mut self, _selector: &str) -> Result<String> {
        Err(anyhow!("built without the `browser` feature"))
    }

    async fn screenshot_element(&mut self, _selector: &str) -> Result<Vec<u8>> {
        Err(anyhow!("built without the `browser` feature"))
    }

    async fn click(&mut self, _selector: &str) -> Result<()> {
        Err(anyhow!("built without the `browser` feature"))
    }

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Whether this build can drive a browser at all
pub fn browser_compiled() -> bool {
    cfg!(feature = "browser")
}
