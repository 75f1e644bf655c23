use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use crate::acquisition::SlideAcquirer;
use crate::config::BrowserConfig;
use crate::driver::{DriverLauncher, ViewerDriver};
use crate::error::{Result, SlidesError};
use crate::session::AcquisitionSession;
use crate::slide_set::SlideSet;
use crate::url_normalizer::{AcquisitionMode, PresentationSource};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Where a viewer capture run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Loading,
    ReadingCount,
    Capturing(usize),
    Advancing(usize),
    Done,
    Failed,
}

/// Screenshots each slide of the published viewer using a session's browser.
pub struct BrowserAcquirer<'a, L: DriverLauncher> {
    session: &'a AcquisitionSession<L>,
    config: &'a BrowserConfig,
}

impl<'a, L: DriverLauncher> BrowserAcquirer<'a, L> {
    pub fn new(session: &'a AcquisitionSession<L>, config: &'a BrowserConfig) -> Self {
        Self { session, config }
    }
}

impl<L: DriverLauncher> SlideAcquirer for BrowserAcquirer<'_, L> {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Browser
    }

    async fn acquire(&self, source: &PresentationSource) -> Result<SlideSet> {
        let mut lease = self.session.checkout().await?;
        match capture_deck(lease.driver(), source.normalized_url(), self.config).await {
            Ok(slides) => {
                lease.release();
                Ok(slides)
            }
            Err(e) => {
                lease.discard().await;
                Err(e)
            }
        }
    }
}

/// Drive the viewer at `url` from the first slide to the last, capturing each.
///
/// Either every slide is captured or the run fails; slides captured before a
/// failure are dropped.
pub async fn capture_deck<D: ViewerDriver>(
    driver: &mut D,
    url: &str,
    config: &BrowserConfig,
) -> Result<SlideSet> {
    let mut run = CaptureRun {
        driver,
        config,
        total: 0,
        slides: SlideSet::new(),
    };

    let mut state = CaptureState::Idle;
    loop {
        let (next, failure) = match run.step(state, url).await {
            Ok(next) => (next, None),
            Err(e) => (CaptureState::Failed, Some(e)),
        };
        log::debug!("Viewer capture {:?} -> {:?}", state, next);

        match (next, failure) {
            (CaptureState::Failed, Some(e)) => {
                log::warn!("Viewer capture failed in {:?}: {}", state, e);
                return Err(e);
            }
            (CaptureState::Done, _) => {
                log::info!("Captured {} slides from viewer", run.slides.len());
                return Ok(run.slides);
            }
            (next, _) => state = next,
        }
    }
}

struct CaptureRun<'a, D> {
    driver: &'a mut D,
    config: &'a BrowserConfig,
    total: usize,
    slides: SlideSet,
}

impl<D: ViewerDriver> CaptureRun<'_, D> {
    async fn step(&mut self, state: CaptureState, url: &str) -> Result<CaptureState> {
        let selectors = &self.config.selectors;
        let timeout = self.config.step_timeout();

        match state {
            CaptureState::Idle => Ok(CaptureState::Loading),
            CaptureState::Loading => {
                // a hung navigation means the viewer never rendered
                match tokio::time::timeout(timeout, self.driver.open(url)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        return Err(SlidesError::BrowserUnavailable(format!(
                            "could not open {}: {:#}",
                            url, e
                        )));
                    }
                    Err(_) => {
                        return Err(SlidesError::ElementNotFound {
                            selector: selectors.slide_container.clone(),
                            timeout,
                        });
                    }
                }
                wait_for_element(self.driver, &selectors.slide_container, timeout).await?;
                wait_for_element(self.driver, &selectors.next_button, timeout).await?;
                Ok(CaptureState::ReadingCount)
            }
            CaptureState::ReadingCount => {
                wait_for_element(self.driver, &selectors.page_count, timeout).await?;
                let text = bounded(timeout, self.driver.text(&selectors.page_count))
                    .await
                    .map_err(|_| SlidesError::ElementNotFound {
                        selector: selectors.page_count.clone(),
                        timeout,
                    })?;
                self.total = parse_slide_count(&text)?;
                log::info!("Viewer reports {} slides", self.total);
                self.slides = SlideSet::with_capacity(self.total);
                Ok(if self.total == 0 {
                    CaptureState::Done
                } else {
                    CaptureState::Capturing(1)
                })
            }
            CaptureState::Capturing(index) => {
                tokio::time::sleep(self.config.settle_delay()).await;
                let png = bounded(
                    timeout,
                    self.driver.screenshot_element(&selectors.slide_container),
                )
                .await
                .map_err(|reason| SlidesError::CaptureFailed {
                    slide: index,
                    reason,
                })?;
                check_png(index, &png)?;
                self.slides
                    .push(png)
                    .map_err(|e| SlidesError::CaptureFailed {
                        slide: index,
                        reason: e.to_string(),
                    })?;
                log::info!("Captured slide {}/{}", index, self.total);

                Ok(if index < self.total {
                    CaptureState::Advancing(index)
                } else {
                    CaptureState::Done
                })
            }
            CaptureState::Advancing(index) => {
                bounded(timeout, self.driver.click(&selectors.next_button))
                    .await
                    .map_err(|reason| SlidesError::NavigationFailed {
                        slide: index,
                        reason,
                    })?;
                Ok(CaptureState::Capturing(index + 1))
            }
            CaptureState::Done | CaptureState::Failed => Ok(state),
        }
    }
}

/// The paginator must hold a bare integer.
pub fn parse_slide_count(text: &str) -> Result<usize> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| SlidesError::PageCountUnparsable {
            text: text.to_string(),
        })
}

/// Poll until `selector` is present or `timeout` elapses.
async fn wait_for_element<D: ViewerDriver>(
    driver: &mut D,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    let polling = async {
        loop {
            match driver.is_present(selector).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => log::debug!("Probe for '{}' failed: {:#}", selector, e),
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
        }
    };

    tokio::time::timeout(timeout, polling)
        .await
        .map_err(|_| SlidesError::ElementNotFound {
            selector: selector.to_string(),
            timeout,
        })
}

/// Run one driver call under the step timeout, flattening both failure kinds
/// into a message.
async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> std::result::Result<T, String> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(_) => Err(format!("timed out after {}s", timeout.as_secs_f32())),
    }
}

fn check_png(index: usize, png: &[u8]) -> Result<()> {
    let reader = image::ImageReader::new(Cursor::new(png))
        .with_guessed_format()
        .map_err(|e| SlidesError::CaptureFailed {
            slide: index,
            reason: e.to_string(),
        })?;

    if reader.format() != Some(image::ImageFormat::Png) {
        return Err(SlidesError::CaptureFailed {
            slide: index,
            reason: "screenshot is not a PNG image".to_string(),
        });
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| SlidesError::CaptureFailed {
            slide: index,
            reason: e.to_string(),
        })?;
    log::debug!("Slide {} screenshot is {}x{}", index, width, height);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLauncher, FakeViewer};

    fn fast_config() -> BrowserConfig {
        BrowserConfig {
            step_timeout_secs: 1,
            settle_delay_ms: 0,
            ..BrowserConfig::default()
        }
    }

    fn source() -> PresentationSource {
        PresentationSource::new(
            "https://docs.google.com/presentation/d/DECK/edit",
            AcquisitionMode::Browser,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_slide_count() {
        assert_eq!(parse_slide_count("5").unwrap(), 5);
        assert_eq!(parse_slide_count(" 12\n").unwrap(), 12);
        for bad in ["", "five", "1 / 5", "-3", "5 slides"] {
            assert!(matches!(
                parse_slide_count(bad),
                Err(SlidesError::PageCountUnparsable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_five_slides_take_four_clicks() {
        let _ = env_logger::builder().is_test(true).try_init();
        let launcher = FakeLauncher::new(FakeViewer::with_slides(5));
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let slides = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap();

        let indices: Vec<usize> = slides.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);

        let log = launcher.log.lock().unwrap();
        assert_eq!(log.clicks, 4);
        assert_eq!(log.screenshots, 5);
        assert_eq!(
            log.opened,
            vec!["https://docs.google.com/presentation/d/DECK/pub?start=false&loop=false&delayms=3000"]
        );
        drop(log);

        // every slide came from its own page of the viewer
        let first = slides.iter().next().unwrap().png().to_vec();
        assert!(slides.iter().skip(1).all(|s| s.png() != first.as_slice()));
        assert!(session.is_warm());
    }

    #[tokio::test]
    async fn test_missing_slide_container_fails_and_tears_down() {
        let config = fast_config();
        let viewer = FakeViewer::with_slides(3).without(&config.selectors.slide_container);
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher.clone());

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();

        assert!(matches!(err, SlidesError::ElementNotFound { ref selector, .. }
            if selector == &config.selectors.slide_container));
        assert_eq!(launcher.log.lock().unwrap().shutdowns, 1);
        assert!(!session.is_warm());
    }

    #[tokio::test]
    async fn test_unparsable_count_fails() {
        let mut viewer = FakeViewer::with_slides(3);
        viewer.count_text = "several".to_string();
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::PageCountUnparsable { .. }));
        assert_eq!(launcher.log.lock().unwrap().screenshots, 0);
    }

    #[tokio::test]
    async fn test_stuck_next_button_discards_captured_slides() {
        let mut viewer = FakeViewer::with_slides(4);
        viewer.fail_click_after = Some(2);
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::NavigationFailed { slide: 3, .. }));
        assert_eq!(launcher.log.lock().unwrap().shutdowns, 1);
    }

    #[tokio::test]
    async fn test_empty_screenshot_is_capture_failure() {
        let mut viewer = FakeViewer::with_slides(3);
        viewer.empty_screenshot_at = Some(2);
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher);
        let config = fast_config();

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::CaptureFailed { slide: 2, .. }));
    }

    #[tokio::test]
    async fn test_zero_slide_viewer_is_empty_set() {
        let launcher = FakeLauncher::new(FakeViewer::with_slides(0));
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let slides = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap();
        assert!(slides.is_empty());
        assert_eq!(launcher.log.lock().unwrap().screenshots, 0);
    }

    #[tokio::test]
    async fn test_session_is_reused_across_runs() {
        let launcher = FakeLauncher::new(FakeViewer::with_slides(2));
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();
        let acquirer = BrowserAcquirer::new(&session, &config);

        acquirer.acquire(&source()).await.unwrap();
        acquirer.acquire(&source()).await.unwrap();

        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.log.lock().unwrap().opened.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_drops_browser() {
        let config = BrowserConfig {
            settle_delay_ms: 10_000,
            ..fast_config()
        };
        let launcher = FakeLauncher::new(FakeViewer::with_slides(3));
        let session = AcquisitionSession::new(launcher.clone());

        let acquirer = BrowserAcquirer::new(&session, &config);
        let source = source();
        let run = acquirer.acquire(&source);
        let outcome = tokio::time::timeout(Duration::from_millis(100), run).await;
        assert!(outcome.is_err());

        assert_eq!(launcher.log.lock().unwrap().drops, 1);
        assert!(!session.is_warm());
    }

    #[tokio::test]
    async fn test_open_error_is_browser_unavailable() {
        let mut viewer = FakeViewer::with_slides(3);
        viewer.fail_open = true;
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::BrowserUnavailable(ref reason)
            if reason.contains("browser crashed")));
        assert_eq!(err.category(), crate::error::ErrorCategory::LocalEnvironment);
        assert_eq!(launcher.log.lock().unwrap().shutdowns, 1);
        assert!(!session.is_warm());
    }

    #[tokio::test]
    async fn test_hung_open_is_element_not_found() {
        let mut viewer = FakeViewer::with_slides(3);
        viewer.open_hangs = true;
        let launcher = FakeLauncher::new(viewer);
        let session = AcquisitionSession::new(launcher.clone());
        let config = fast_config();

        let err = BrowserAcquirer::new(&session, &config)
            .acquire(&source())
            .await
            .unwrap_err();
        assert!(matches!(err, SlidesError::ElementNotFound { ref selector, .. }
            if selector == &config.selectors.slide_container));
        assert_eq!(launcher.log.lock().unwrap().screenshots, 0);
    }
}
