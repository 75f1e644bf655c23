use anyhow::Result;

/// The handful of page operations the viewer capture needs from a browser.
///
/// Calls are not individually time-limited here; callers wrap them in their own
/// timeouts.
#[allow(async_fn_in_trait)]
pub trait ViewerDriver {
    /// Navigate to `url`, replacing whatever page was open
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Whether an element matching `selector` currently exists
    async fn is_present(&mut self, selector: &str) -> Result<bool>;

    /// Visible text of the first element matching `selector`
    async fn text(&mut self, selector: &str) -> Result<String>;

    /// PNG screenshot clipped to the first element matching `selector`
    async fn screenshot_element(&mut self, selector: &str) -> Result<Vec<u8>>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Close the browser. The driver is not used again afterwards.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Starts browser instances for an [`AcquisitionSession`](crate::session::AcquisitionSession).
#[allow(async_fn_in_trait)]
pub trait DriverLauncher {
    type Driver: ViewerDriver;

    async fn launch(&self) -> Result<Self::Driver>;
}
