//! Intake server binary
//!
//! Hosts the sync endpoint and the broadcast relay. Configuration comes from
//! the shared intake config file and `INTAKE_*` environment variables.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_core::{Config, Relay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_server=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("-- Starting intake server on {}", config.server_addr);

    intake_server::serve(&config.server_addr, Relay::new()).await
}
