mod app;
mod connection;
mod discovery;
mod logging;
mod router;
mod state;
mod vault;

use mqtt_bridge_common::{config_file_name, BridgeConfig, PROJECT};
use tracing::error;

const CONFIG_MISSING_EXIT: i32 = -1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(PROJECT)?;

    let path = config_file_name(PROJECT, std::env::args().len());
    let config = match BridgeConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            error!("{:#}", anyhow::Error::new(err));
            std::process::exit(CONFIG_MISSING_EXIT);
        }
    };

    app::run(config).await
}
