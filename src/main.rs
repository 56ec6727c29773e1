use taskplane::{
    api::start_api_server,
    config::AppConfig,
    observability::{init_tracing, log_config_info},
    storage::create_pool,
    Result, APP_NAME, VERSION,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; config comes from the environment after this
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_tracing(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Taskplane");
    log_config_info(&config);

    let pool = create_pool(&config.database).await?;

    start_api_server(&config, pool).await?;

    info!("Taskplane shutdown completed");
    Ok(())
}
