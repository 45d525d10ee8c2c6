use std::sync::Arc;

use nac_api::PlatformClient;
use nac_core::config::Config;

mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nac_core::logging::init("nac");

    let cfg = Config::load()?;
    let platform = Arc::new(PlatformClient::new(&cfg));

    let args: Vec<String> = std::env::args().skip(1).collect();
    commands::run(&cfg, platform, &args).await?;
    Ok(())
}
