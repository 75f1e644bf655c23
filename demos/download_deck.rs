use slides_fetch_mcp::{AcquisitionMode, DownloaderConfig, SlideDownloader};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Usage: download_deck [URL] [pdf|browser] [OUTPUT]
    let mut args = std::env::args().skip(1);
    let config = DownloaderConfig::resolve(None)?;
    let url = args
        .next()
        .unwrap_or_else(|| config.archive.default_url.clone());
    let mode: AcquisitionMode = match args.next() {
        Some(raw) => raw.parse()?,
        None => AcquisitionMode::default(),
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.archive.file_name));

    let downloader = SlideDownloader::new(config)?;
    let source = downloader.source(&url, mode)?;
    println!("Presentation: {}", source.presentation_id());
    println!("Fetching from: {}", source.normalized_url());

    let result = downloader.download(&url, mode).await;
    downloader.shutdown().await;

    match result {
        Ok(bundle) => {
            bundle.save(&output)?;
            println!(
                "✅ Saved {} slides ({} bytes) to {}",
                bundle.entry_count(),
                bundle.bytes().len(),
                output.display()
            );
        }
        Err(e) => {
            println!("❌ {}", e.user_message());
        }
    }

    Ok(())
}
