//! clinica-core service entry point.
//!
//! The core is library-shaped: this binary only boots the process-wide
//! dependencies — configuration, logging, the connection pool — and
//! confirms the store is reachable. An HTTP transport embeds
//! [`clinica_core::CoreService`] the same way; it is out of scope here.

use std::sync::Arc;

use clinica_core::{AppConfig, CoreService, Database, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let _log_guard = clinica_core::logging::init_logging(&config);

    tracing::info!(
        git_hash = env!("GIT_HASH"),
        default_stock_location = %config.default_stock_location_code,
        default_currency = %config.default_currency,
        "starting clinica-core"
    );

    let db = Database::connect(&config.database_url).await?;
    db.health_check().await?;
    tracing::info!("database connection established");

    db.migrate().await?;

    let _service = CoreService::new(db, config, Arc::new(SystemClock));

    tracing::info!("clinica-core ready");
    Ok(())
}
