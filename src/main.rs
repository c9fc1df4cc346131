mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod relay;
mod server;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logger::init_logger();

    let config = match config::AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            warn!("配置加载失败，使用默认配置: {}", e);
            config::AppConfig::default()
        }
    };

    info!("Starting model-relay server...");

    if let Err(e) = server::serve(config).await {
        error!("Server exited with error: {}", e);
        std::process::exit(1);
    }
}
