use tubenote_api::{setup, telemetry};
use tubenote_core::Config;
use tubenote_infra::DiagnosticCapture;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Telemetry first so service initialization is visible; the capture
    // layer is shared with the application state.
    let capture = DiagnosticCapture::new();
    telemetry::init(&config, &capture);

    // Initialize the application (services, routes)
    let (_state, router) = setup::initialize_app(config.clone(), capture).await?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
