use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crmcore::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "crmcore", "crmcore starting: RUST_LOG='{}'", rust_log);

    // A missing signing secret stops the process here, before anything binds
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(target: "startup", "configuration error: {}", e);
            return Err(e.into());
        }
    };

    crmcore::server::run(config).await
}
