use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::driver::{DriverLauncher, ViewerDriver};
use crate::error::{Result, SlidesError};

/// Owns the browser used by the viewer capture.
///
/// The browser is launched on first use and kept warm between runs. Only one
/// run may hold it at a time: [`checkout`](Self::checkout) waits until the
/// previous lease is returned or discarded.
pub struct AcquisitionSession<L: DriverLauncher> {
    launcher: L,
    slot: Mutex<Option<L::Driver>>,
    launches: AtomicUsize,
    teardown_timeout: Duration,
}

/// Upper bound on a graceful browser shutdown before the driver is dropped.
const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

impl<L: DriverLauncher> AcquisitionSession<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
            launches: AtomicUsize::new(0),
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Take exclusive use of the browser, launching it if none is warm.
    pub async fn checkout(&self) -> Result<DriverLease<'_, L::Driver>> {
        let mut slot = self.slot.lock().await;
        let driver = match slot.take() {
            Some(driver) => {
                log::debug!("Reusing warm browser");
                driver
            }
            None => {
                log::info!("Launching browser");
                let driver = self
                    .launcher
                    .launch()
                    .await
                    .map_err(|e| SlidesError::BrowserUnavailable(format!("{:#}", e)))?;
                self.launches.fetch_add(1, Ordering::Relaxed);
                driver
            }
        };
        Ok(DriverLease {
            slot,
            driver,
            teardown_timeout: self.teardown_timeout,
        })
    }

    /// Whether a browser is currently idle and ready for reuse. Reports
    /// `false` while a run holds the lease.
    pub fn is_warm(&self) -> bool {
        match self.slot.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(_) => false,
        }
    }

    /// How many browsers this session has started
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    /// Shut down the warm browser, if any. Waits for an in-flight run to finish.
    pub async fn close(&self) {
        let driver = self.slot.lock().await.take();
        if let Some(driver) = driver {
            log::info!("Closing browser");
            teardown(driver, self.teardown_timeout).await;
        }
    }
}

/// Shut `driver` down, giving up after `limit`. The driver is dropped either
/// way, which kills a browser that ignored the request.
async fn teardown<D: ViewerDriver>(mut driver: D, limit: Duration) {
    match tokio::time::timeout(limit, driver.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Browser did not shut down cleanly: {:#}", e),
        Err(_) => log::warn!("Browser shutdown exceeded {:?}, killing it", limit),
    }
}

/// Exclusive use of a session's browser for one run.
///
/// Return it with [`release`](Self::release) after a clean run or
/// [`discard`](Self::discard) after a failed one. Dropping the lease without
/// either (for example when the run is cancelled) drops the driver, which
/// terminates the browser.
pub struct DriverLease<'a, D: ViewerDriver> {
    slot: MutexGuard<'a, Option<D>>,
    driver: D,
    teardown_timeout: Duration,
}

impl<D: ViewerDriver> DriverLease<'_, D> {
    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Put the browser back for the next run.
    pub fn release(self) {
        let DriverLease { mut slot, driver, .. } = self;
        *slot = Some(driver);
    }

    /// Shut the browser down; the next checkout launches a fresh one.
    pub async fn discard(self) {
        let DriverLease {
            slot,
            driver,
            teardown_timeout,
        } = self;
        log::info!("Tearing down browser after failed run");
        teardown(driver, teardown_timeout).await;
        drop(slot);
    }
}
