use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at a JSON configuration file.
pub const ENV_CONFIG_PATH: &str = "SLIDES_FETCH_CONFIG";

/// Convenience URL offered by front ends when the user has not pasted one yet.
pub const DEFAULT_PRESENTATION_URL: &str = "https://docs.google.com/presentation/d/e/2PACX-1vRoiaaNbJnyMe-Z19h9h2wy24yJsX_rFhHn6_svn5VMKMDcl4yMsjMF3qoNUOO_Yg/embed?start=false&loop=false&delayms=3000&slide=id.p1";

/// Top-level configuration for a downloader process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    pub pdf: PdfConfig,
    pub browser: BrowserConfig,
    pub archive: ArchiveConfig,
}

/// Settings for the export-and-rasterize path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub dpi: f32,
    pub max_pages: usize,
    pub request_timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            max_pages: 500,
            request_timeout_secs: 60,
        }
    }
}

impl PdfConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which viewer page the browser path loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerKind {
    #[default]
    Pub,
    Embed,
}

impl ViewerKind {
    pub fn path_suffix(self) -> &'static str {
        match self {
            ViewerKind::Pub => "pub",
            ViewerKind::Embed => "embed",
        }
    }
}

/// CSS selectors scraped from the Slides viewer. These track Google's markup and
/// are expected to drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSelectors {
    pub slide_container: String,
    pub next_button: String,
    pub page_count: String,
}

impl Default for ViewerSelectors {
    fn default() -> Self {
        Self {
            slide_container: ".punch-viewer-svgpage-svgcontainer".to_string(),
            next_button: ".punch-viewer-navbar-next".to_string(),
            page_count: ".punch-viewer-navbar-page-count".to_string(),
        }
    }
}

/// Settings for the headless browser path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub step_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub viewer: ViewerKind,
    pub selectors: ViewerSelectors,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 30,
            settle_delay_ms: 1000,
            viewer: ViewerKind::Pub,
            selectors: ViewerSelectors::default(),
            headless: true,
            chrome_executable: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl BrowserConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Output naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub file_name: String,
    pub default_url: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            file_name: "slides.zip".to_string(),
            default_url: DEFAULT_PRESENTATION_URL.to_string(),
        }
    }
}

impl DownloaderConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Resolve configuration: explicit path, then `SLIDES_FETCH_CONFIG`, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::info!("Loading config from {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(env_path);
            log::info!("Loading config from {} ({})", path.display(), ENV_CONFIG_PATH);
            return Self::from_file(&path);
        }

        log::debug!("No config file given, using built-in defaults");
        Ok(Self::default())
    }
}
