use anyhow::Result;
use slides_fetch_mcp::config::DownloaderConfig;
use slides_fetch_mcp::{logging, mcp_handler};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    logging::init_logging_from_env()?;
    let config = DownloaderConfig::resolve(None)?;

    // Create a Tokio runtime for async operations
    let rt = Runtime::new()?;

    // Run the RMCP server in the Tokio runtime
    rt.block_on(async { mcp_handler::start_server(config).await })?;

    Ok(())
}
