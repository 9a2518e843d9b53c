//! Reference relay for mdshare clients.
//!
//! Reads `MDSHARE_BIND_ADDR` / `MDSHARE_BROADCAST_CAPACITY` (optionally from a
//! `.env` file); `RUST_LOG` controls log output.

use log::{error, info};
use mdshare_collab::{RelayConfig, RelayServer};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    info!("Starting relay on {}", config.bind_addr);
    let relay = RelayServer::new(config);
    if let Err(e) = relay.run().await {
        error!("Relay stopped: {e}");
        std::process::exit(1);
    }
}
