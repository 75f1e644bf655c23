use std::time::Duration;

use thiserror::Error;

/// Who has to act to fix a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The URL or the deck's sharing settings are wrong.
    UserInput,
    /// Google changed its viewer markup or export endpoint.
    RemoteContractChanged,
    /// Something is wrong on this machine (missing library, disk, browser).
    LocalEnvironment,
}

/// Every way a slide download can fail.
#[derive(Debug, Error)]
pub enum SlidesError {
    #[error("invalid presentation URL '{url}': {reason}")]
    InvalidUrlKind { url: String, reason: String },

    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("failed to rasterize PDF: {0}")]
    RasterizationFailed(String),

    #[error("element '{selector}' did not appear within {}s", timeout.as_secs())]
    ElementNotFound { selector: String, timeout: Duration },

    #[error("slide count '{text}' is not a number")]
    PageCountUnparsable { text: String },

    #[error("could not advance past slide {slide}: {reason}")]
    NavigationFailed { slide: usize, reason: String },

    #[error("could not capture slide {slide}: {reason}")]
    CaptureFailed { slide: usize, reason: String },

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("the presentation contains no slides")]
    NoSlidesFound,

    #[error("failed to write archive: {0}")]
    PackagingFailed(#[from] std::io::Error),

    #[error("acquisition was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SlidesError>;

impl SlidesError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SlidesError::InvalidUrlKind { .. }
            | SlidesError::DownloadFailed { .. }
            | SlidesError::NoSlidesFound => ErrorCategory::UserInput,
            SlidesError::ElementNotFound { .. }
            | SlidesError::PageCountUnparsable { .. }
            | SlidesError::NavigationFailed { .. }
            | SlidesError::CaptureFailed { .. }
            | SlidesError::RasterizationFailed(_) => ErrorCategory::RemoteContractChanged,
            SlidesError::BrowserUnavailable(_)
            | SlidesError::PackagingFailed(_)
            | SlidesError::Cancelled => ErrorCategory::LocalEnvironment,
        }
    }

    /// Message meant for the person who pasted the link.
    pub fn user_message(&self) -> String {
        let hint = match self.category() {
            ErrorCategory::UserInput => {
                "Check the link and make sure the presentation is shared publicly."
            }
            ErrorCategory::RemoteContractChanged => {
                "Google Slides appears to have changed; this tool needs updating."
            }
            ErrorCategory::LocalEnvironment => {
                "There is a problem with the local environment running this tool."
            }
        };
        format!("{hint} ({self})")
    }

    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        SlidesError::InvalidUrlKind {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<zip::result::ZipError> for SlidesError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => SlidesError::PackagingFailed(io),
            other => SlidesError::PackagingFailed(std::io::Error::other(other)),
        }
    }
}
