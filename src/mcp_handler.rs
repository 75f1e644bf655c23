use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::RequestContext;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt, schemars, tool, tool_handler,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::chromium::browser_compiled;
use crate::config::DownloaderConfig;
use crate::downloader::SlideDownloader;
use crate::error::SlidesError;
use crate::pdf_acquirer::pdfium_available;
use crate::url_normalizer::AcquisitionMode;

/// MCP front end for [`SlideDownloader`]
#[derive(Clone)]
pub struct SlidesServer {
    downloader: Arc<SlideDownloader>,
    tool_router: ToolRouter<Self>,
}

/// Input for the download_slides tool
#[derive(Serialize, Deserialize, Debug, schemars::JsonSchema)]
pub struct DownloadSlidesInput {
    #[schemars(
        description = "Public Google Slides link ending in /edit, /pub or /embed (default: configured sample deck)"
    )]
    pub url: Option<String>,
    #[schemars(description = "Acquisition mode: 'pdf' (default) or 'browser'")]
    pub mode: Option<String>,
    #[schemars(description = "Where to write the ZIP (default: configured archive file name)")]
    pub output_path: Option<String>,
    #[schemars(description = "Also return the ZIP as base64 text (default: false)")]
    pub include_base64: Option<bool>,
}

/// Input for the normalize_slides_url tool
#[derive(Serialize, Deserialize, Debug, schemars::JsonSchema)]
pub struct NormalizeUrlInput {
    #[schemars(description = "Google Slides link to rewrite")]
    pub url: String,
    #[schemars(description = "Acquisition mode: 'pdf' (default) or 'browser'")]
    pub mode: Option<String>,
}

/// Summary returned after a successful download
#[derive(Serialize, Debug)]
pub struct DownloadSummary {
    pub presentation_id: String,
    pub mode: AcquisitionMode,
    pub source_url: String,
    pub slide_count: usize,
    pub archive_bytes: usize,
    pub media_type: &'static str,
    pub saved_to: String,
}

fn parse_mode(raw: Option<&str>) -> std::result::Result<AcquisitionMode, String> {
    raw.map_or(Ok(AcquisitionMode::default()), str::parse)
}

fn slides_error(err: &SlidesError) -> CallToolResult {
    log::warn!("Download failed ({:?}): {}", err.category(), err);
    CallToolResult::error(vec![Content::text(err.user_message())])
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Error serializing result: {}", e), None))
}

#[tool_router]
impl SlidesServer {
    pub fn new(downloader: Arc<SlideDownloader>) -> Self {
        Self {
            downloader,
            tool_router: Self::tool_router(),
        }
    }

    /// Download a public deck as a ZIP of slide PNGs
    #[tool(
        description = "Download a public Google Slides presentation as a ZIP of PNG images (slide_001.png, slide_002.png, ...)"
    )]
    async fn download_slides(
        &self,
        Parameters(input): Parameters<DownloadSlidesInput>,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let mode = match parse_mode(input.mode.as_deref()) {
            Ok(mode) => mode,
            Err(msg) => return Ok(CallToolResult::error(vec![Content::text(msg)])),
        };
        let url = input
            .url
            .unwrap_or_else(|| self.downloader.config().archive.default_url.clone());

        let source = match self.downloader.source(&url, mode) {
            Ok(source) => source,
            Err(e) => return Ok(slides_error(&e)),
        };

        let download = self
            .downloader
            .download_or_cancel(&url, mode, context.ct.cancelled());
        let bundle = match download.await {
            Ok(bundle) => bundle,
            Err(e) => return Ok(slides_error(&e)),
        };

        let output_path = input
            .output_path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(bundle.file_name()));
        if let Err(e) = bundle.save(&output_path) {
            return Ok(slides_error(&e));
        }

        let summary = DownloadSummary {
            presentation_id: source.presentation_id().to_string(),
            mode,
            source_url: source.normalized_url().to_string(),
            slide_count: bundle.entry_count(),
            archive_bytes: bundle.bytes().len(),
            media_type: bundle.media_type(),
            saved_to: output_path.display().to_string(),
        };

        let mut contents = vec![Content::text(to_json(&summary)?)];
        if input.include_base64.unwrap_or(false) {
            contents.push(Content::text(
                base64::engine::general_purpose::STANDARD.encode(bundle.bytes()),
            ));
        }
        Ok(CallToolResult::success(contents))
    }

    /// Rewrite a Slides link for one acquisition mode
    #[tool(description = "Rewrite a Google Slides link into its PDF export URL or viewer URL without downloading anything")]
    async fn normalize_slides_url(
        &self,
        Parameters(input): Parameters<NormalizeUrlInput>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let mode = match parse_mode(input.mode.as_deref()) {
            Ok(mode) => mode,
            Err(msg) => return Ok(CallToolResult::error(vec![Content::text(msg)])),
        };

        match self.downloader.source(&input.url, mode) {
            Ok(source) => Ok(CallToolResult::success(vec![Content::text(
                source.normalized_url(),
            )])),
            Err(e) => Ok(slides_error(&e)),
        }
    }

    /// Report which acquisition backends work in this process
    #[tool(description = "Report which slide acquisition backends (pdf rasterizer, headless browser) are usable")]
    async fn get_backend_info(&self) -> std::result::Result<CallToolResult, McpError> {
        let info = serde_json::json!({
            "pdf": {
                "rasterizer": "pdfium",
                "available": pdfium_available(),
            },
            "browser": {
                "driver": "chromium",
                "compiled": browser_compiled(),
                "warm": self.downloader.session().is_warm(),
                "launches": self.downloader.session().launch_count(),
            },
        });
        Ok(CallToolResult::success(vec![Content::text(to_json(&info)?)]))
    }
}

#[tool_handler]
impl ServerHandler for SlidesServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server downloads public Google Slides presentations as ZIP archives of PNG slide images, either by rasterizing the PDF export or by screenshotting the web viewer.".to_string()
            ),
            ..Default::default()
        }
    }
}

/// Serve the tools over stdio until the client disconnects or Ctrl-C.
pub async fn start_server(config: DownloaderConfig) -> Result<()> {
    let downloader = Arc::new(SlideDownloader::new(config)?);
    let server = SlidesServer::new(Arc::clone(&downloader));

    let service = server.serve(rmcp::transport::stdio()).await?;
    log::info!("Slides MCP server ready");

    tokio::select! {
        quit_reason = service.waiting() => {
            log::info!("Server stopped: {:?}", quit_reason?);
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
        }
    }

    downloader.shutdown().await;
    Ok(())
}
