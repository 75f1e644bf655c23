/// Slides Fetch MCP - A Model Context Protocol server that turns a public
/// Google Slides link into a ZIP of per-slide PNG images

pub mod acquisition;
pub mod browser_acquirer;
pub mod chromium;
pub mod config;
pub mod downloader;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mcp_handler;
pub mod packager;
pub mod pdf_acquirer;
pub mod session;
pub mod slide_set;
pub mod url_normalizer;

#[cfg(test)]
mod test_support;

/// Re-export the server for direct usage
pub use mcp_handler::{SlidesServer, start_server};

/// Re-export the end-to-end pipeline
pub use downloader::SlideDownloader;
pub use packager::{ArchiveBundle, ZIP_MEDIA_TYPE, package};
pub use slide_set::{SlideImage, SlideSet, slide_file_name};
pub use url_normalizer::{AcquisitionMode, PresentationSource, normalize_url};

/// Re-export acquisition strategies
pub use acquisition::SlideAcquirer;
pub use browser_acquirer::{BrowserAcquirer, CaptureState, capture_deck, parse_slide_count};
pub use chromium::ChromiumLauncher;
pub use driver::{DriverLauncher, ViewerDriver};
pub use pdf_acquirer::{PdfAcquirer, pdfium_available, probe_page_count, rasterize_pdf};
pub use session::{AcquisitionSession, DriverLease};

/// Re-export configuration and errors
pub use config::{ArchiveConfig, BrowserConfig, DownloaderConfig, PdfConfig, ViewerKind};
pub use error::{ErrorCategory, Result, SlidesError};
