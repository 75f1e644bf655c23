use std::future::Future;

use crate::acquisition::SlideAcquirer;
use crate::browser_acquirer::BrowserAcquirer;
use crate::chromium::ChromiumLauncher;
use crate::config::DownloaderConfig;
use crate::driver::DriverLauncher;
use crate::error::{Result, SlidesError};
use crate::packager::{ArchiveBundle, package};
use crate::pdf_acquirer::PdfAcquirer;
use crate::session::AcquisitionSession;
use crate::slide_set::SlideSet;
use crate::url_normalizer::{AcquisitionMode, PresentationSource};

/// URL in, ZIP out. Holds both acquisition strategies and the browser session
/// for the lifetime of the process.
pub struct SlideDownloader<L: DriverLauncher = ChromiumLauncher> {
    config: DownloaderConfig,
    pdf: PdfAcquirer,
    session: AcquisitionSession<L>,
}

impl SlideDownloader<ChromiumLauncher> {
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        let launcher = ChromiumLauncher::new(config.browser.clone());
        Self::with_launcher(config, launcher)
    }
}

impl<L: DriverLauncher> SlideDownloader<L> {
    pub fn with_launcher(config: DownloaderConfig, launcher: L) -> Result<Self> {
        Ok(Self {
            pdf: PdfAcquirer::new(config.pdf.clone())?,
            session: AcquisitionSession::new(launcher)
                .with_teardown_timeout(config.browser.step_timeout()),
            config,
        })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn session(&self) -> &AcquisitionSession<L> {
        &self.session
    }

    /// Validate and rewrite `url` for `mode` using the configured viewer.
    pub fn source(&self, url: &str, mode: AcquisitionMode) -> Result<PresentationSource> {
        PresentationSource::with_viewer(url, mode, self.config.browser.viewer)
    }

    /// Run the strategy matching `source.mode()`.
    pub async fn acquire(&self, source: &PresentationSource) -> Result<SlideSet> {
        match source.mode() {
            AcquisitionMode::Pdf => self.pdf.acquire(source).await,
            AcquisitionMode::Browser => {
                BrowserAcquirer::new(&self.session, &self.config.browser)
                    .acquire(source)
                    .await
            }
        }
    }

    /// Normalize, acquire and package. An empty deck is reported as
    /// [`SlidesError::NoSlidesFound`] rather than an empty archive.
    pub async fn download(&self, url: &str, mode: AcquisitionMode) -> Result<ArchiveBundle> {
        let source = self.source(url, mode)?;
        log::info!(
            "Downloading presentation {} via {}",
            source.presentation_id(),
            mode
        );

        let slides = self.acquire(&source).await?;
        if slides.is_empty() {
            return Err(SlidesError::NoSlidesFound);
        }

        package(slides, &self.config.archive.file_name)
    }

    /// Like [`download`](Self::download), but gives up as soon as `cancel`
    /// completes. The in-flight run is dropped, which tears down a browser it
    /// was holding.
    pub async fn download_or_cancel<F>(
        &self,
        url: &str,
        mode: AcquisitionMode,
        cancel: F,
    ) -> Result<ArchiveBundle>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                log::info!("Download of {} cancelled", url);
                Err(SlidesError::Cancelled)
            }
            result = self.download(url, mode) => result,
        }
    }

    /// Release the browser, if one was started.
    pub async fn shutdown(&self) {
        self.session.close().await;
    }
}
