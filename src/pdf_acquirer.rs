use std::sync::OnceLock;

use crate::acquisition::SlideAcquirer;
use crate::config::PdfConfig;
use crate::error::{Result, SlidesError};
use crate::slide_set::SlideSet;
use crate::url_normalizer::{AcquisitionMode, PresentationSource};

/// Outcome of the first attempt to bind the native Pdfium library.
static PDFIUM_BINDING: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Downloads the `/export/pdf` rendition of a deck and rasterizes every page
/// to PNG in memory.
#[derive(Debug, Clone)]
pub struct PdfAcquirer {
    client: reqwest::Client,
    config: PdfConfig,
}

impl PdfAcquirer {
    pub fn new(config: PdfConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SlidesError::DownloadFailed {
                url: String::new(),
                reason: format!("could not build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    /// Fetch and rasterize an export URL without going through the normalizer.
    pub async fn acquire_url(&self, url: &str) -> Result<SlideSet> {
        let pdf_bytes = fetch_pdf(&self.client, url).await?;
        rasterize_pdf(pdf_bytes, &self.config).await
    }
}

impl SlideAcquirer for PdfAcquirer {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Pdf
    }

    async fn acquire(&self, source: &PresentationSource) -> Result<SlideSet> {
        self.acquire_url(source.normalized_url()).await
    }
}

/// GET `url`, streaming the body into memory. Any non-2xx status fails.
pub async fn fetch_pdf(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let download_failed = |reason: String| SlidesError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    log::info!("Downloading PDF export from {}", url);
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(download_failed(format!("HTTP {}", status)));
    }

    // Private decks redirect to the sign-in page, which answers 200 with HTML
    let requested_host = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    let final_host = response.url().host_str().map(str::to_string);
    if final_host != requested_host {
        return Err(download_failed(format!(
            "redirected to {}; the presentation is probably not shared publicly",
            response.url()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.is_empty() && !content_type.starts_with("application/pdf") {
        return Err(download_failed(format!(
            "expected a PDF but got '{}'; the presentation is probably not shared publicly",
            content_type
        )));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| download_failed(e.to_string()))?
    {
        body.extend_from_slice(&chunk);
    }

    log::debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Page count read from the PDF structure, without rendering anything.
pub fn probe_page_count(pdf_bytes: &[u8]) -> Result<usize> {
    if !pdf_bytes.starts_with(b"%PDF-") {
        return Err(SlidesError::RasterizationFailed(
            "response is not a PDF document".to_string(),
        ));
    }

    let document = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| SlidesError::RasterizationFailed(format!("invalid PDF: {}", e)))?;
    Ok(document.get_pages().len())
}

/// Render every page of `pdf_bytes` to an RGB PNG, in page order.
pub async fn rasterize_pdf(pdf_bytes: Vec<u8>, config: &PdfConfig) -> Result<SlideSet> {
    let dpi = config.dpi;
    let max_pages = config.max_pages;
    tokio::task::spawn_blocking(move || {
        let page_count = probe_page_count(&pdf_bytes)?;
        log::info!("PDF has {} pages", page_count);

        if page_count == 0 {
            return Ok(SlideSet::new());
        }
        if page_count > max_pages {
            return Err(SlidesError::RasterizationFailed(format!(
                "{} pages exceeds the limit of {}",
                page_count, max_pages
            )));
        }
        render_pages(&pdf_bytes, dpi)
    })
    .await
        .map_err(|e| SlidesError::RasterizationFailed(format!("render task failed: {}", e)))?
}

/// Whether the native Pdfium library can be bound in this process. Checked once.
pub fn pdfium_available() -> bool {
    PDFIUM_BINDING.get_or_init(test_pdfium_binding).is_ok()
}

fn ensure_pdfium() -> Result<()> {
    PDFIUM_BINDING
        .get_or_init(test_pdfium_binding)
        .clone()
        .map_err(|e| {
            SlidesError::RasterizationFailed(format!("Pdfium library is not available: {}", e))
        })
}

#[cfg(feature = "pdfium")]
fn test_pdfium_binding() -> std::result::Result<(), String> {
    bind_pdfium().map(|_| ()).map_err(|e| e.to_string())
}

#[cfg(not(feature = "pdfium"))]
fn test_pdfium_binding() -> std::result::Result<(), String> {
    Err("built without the `pdfium` feature".to_string())
}

/// Prefer a library shipped next to the binary, then the system one.
#[cfg(feature = "pdfium")]
fn bind_pdfium() -> std::result::Result<
    pdfium_render::prelude::Pdfium,
    pdfium_render::prelude::PdfiumError,
> {
    use pdfium_render::prelude::*;

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())?;
    Ok(Pdfium::new(bindings))
}

#[cfg(feature = "pdfium")]
fn render_pages(pdf_bytes: &[u8], dpi: f32) -> Result<SlideSet> {
    use image::{DynamicImage, ImageFormat};
    use pdfium_render::prelude::*;
    use std::io::Cursor;

    ensure_pdfium()?;
    let pdfium = bind_pdfium()
        .map_err(|e| SlidesError::RasterizationFailed(format!("Pdfium bind failed: {}", e)))?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| SlidesError::RasterizationFailed(format!("Pdfium open failed: {}", e)))?;

    let pages = document.pages();
    let mut slides = SlideSet::with_capacity(pages.len() as usize);

    for (page_index, page) in pages.iter().enumerate() {
        let width = (page.width().value * dpi / 72.0).round() as i32;
        let height = (page.height().value * dpi / 72.0).round() as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height),
            )
            .map_err(|e| {
                SlidesError::RasterizationFailed(format!(
                    "render page {} failed: {}",
                    page_index + 1,
                    e
                ))
            })?;

        let rgb = DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8());
        let mut png = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| {
                SlidesError::RasterizationFailed(format!(
                    "PNG encode page {} failed: {}",
                    page_index + 1,
                    e
                ))
            })?;

        let index = slides
            .push(png)
            .map_err(|e| SlidesError::RasterizationFailed(e.to_string()))?;
        log::debug!("Rendered page {} ({}x{})", index, width, height);
    }

    Ok(slides)
}

#[cfg(not(feature = "pdfium"))]
fn render_pages(_pdf_bytes: &[u8], _dpi: f32) -> Result<SlideSet> {
    ensure_pdfium()?;
    Ok(SlideSet::new())
}
