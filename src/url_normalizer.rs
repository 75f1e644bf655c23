use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ViewerKind;
use crate::error::{Result, SlidesError};

const SLIDES_HOST: &str = "docs.google.com";

/// Query string the browser path appends so the viewer does not auto-advance.
pub const VIEWER_QUERY: &str = "start=false&loop=false&delayms=3000";

lazy_static::lazy_static! {
    /// `/presentation[/u/N]/d[/e]/<id>/(embed|pub|edit)[/]`
    static ref PRESENTATION_PATH: Regex = Regex::new(
        r"^(?P<base>/presentation/(?:u/\d+/)?d/(?:e/)?(?P<id>[A-Za-z0-9_-]+))/(?:embed|pub|edit)/?$"
    )
    .expect("presentation path pattern is valid");
}

/// How slide images are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Export to PDF and rasterize each page
    #[default]
    Pdf,
    /// Screenshot each slide in a headless browser
    Browser,
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionMode::Pdf => write!(f, "pdf"),
            AcquisitionMode::Browser => write!(f, "browser"),
        }
    }
}

impl FromStr for AcquisitionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(AcquisitionMode::Pdf),
            "browser" => Ok(AcquisitionMode::Browser),
            other => Err(format!(
                "Unsupported mode '{}'. Supported modes: pdf, browser",
                other
            )),
        }
    }
}

/// A validated reference to a public presentation, already rewritten for one
/// acquisition mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSource {
    raw_url: String,
    normalized_url: String,
    presentation_id: String,
    mode: AcquisitionMode,
}

impl PresentationSource {
    /// Validate `raw_url` for `mode`, loading the `/pub` viewer for the browser path.
    pub fn new(raw_url: &str, mode: AcquisitionMode) -> Result<Self> {
        Self::with_viewer(raw_url, mode, ViewerKind::Pub)
    }

    pub fn with_viewer(raw_url: &str, mode: AcquisitionMode, viewer: ViewerKind) -> Result<Self> {
        let (base, presentation_id) = presentation_base(raw_url)?;
        let normalized_url = match mode {
            AcquisitionMode::Pdf => format!("{}/export/pdf", base),
            AcquisitionMode::Browser => {
                format!("{}/{}?{}", base, viewer.path_suffix(), VIEWER_QUERY)
            }
        };

        Ok(Self {
            raw_url: raw_url.to_string(),
            normalized_url,
            presentation_id,
            mode,
        })
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    pub fn presentation_id(&self) -> &str {
        &self.presentation_id
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }
}

/// Rewrite a Slides URL for `mode`. Shorthand for building a [`PresentationSource`].
pub fn normalize_url(raw_url: &str, mode: AcquisitionMode, viewer: ViewerKind) -> Result<String> {
    PresentationSource::with_viewer(raw_url, mode, viewer).map(|source| source.normalized_url)
}

/// Find `https://docs.google.com/presentation/.../<id>` with the view suffix,
/// query and fragment removed.
fn presentation_base(raw_url: &str) -> Result<(String, String)> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err(SlidesError::invalid_url(raw_url, "URL is empty"));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| SlidesError::invalid_url(raw_url, format!("not a valid URL ({})", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SlidesError::invalid_url(
            raw_url,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    if parsed.host_str() != Some(SLIDES_HOST) {
        return Err(SlidesError::invalid_url(
            raw_url,
            format!("expected a {} link", SLIDES_HOST),
        ));
    }

    let captures = PRESENTATION_PATH.captures(parsed.path()).ok_or_else(|| {
        SlidesError::invalid_url(
            raw_url,
            "expected a presentation link ending in /embed, /pub or /edit",
        )
    })?;

    let base = format!("https://{}{}", SLIDES_HOST, &captures["base"]);
    Ok((base, captures["id"].to_string()))
}
