use mirror_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, caches, services, routes)
    let (_state, router) = mirror_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    mirror_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
