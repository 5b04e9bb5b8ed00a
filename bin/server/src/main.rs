use authgate_server::{config::ServerConfig, error::ServerError, init_tracing, run};
use rootcause::prelude::Report;

#[tokio::main]
async fn main() -> Result<(), Report<ServerError>> {
    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| ServerError::Config {
        reason: e.to_string(),
    })?;

    init_tracing(&config.log_level, config.log_format);
    tracing::info!("Loaded configuration");

    run(config).await
}
