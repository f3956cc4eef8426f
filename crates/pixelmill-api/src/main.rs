use pixelmill_api::{build_router, setup, telemetry, AppState};
use pixelmill_core::Config;

// Use mimalloc as the global allocator for better performance and lower
// fragmentation under many short-lived pixel buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    // Load configuration
    let config = Config::from_env()?;

    let state = AppState::new(config.clone());
    let router = build_router(state);

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
