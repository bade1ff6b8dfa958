use snapdrive_api::{build_router, state::AppState};
use snapdrive_config::Settings;
use snapdrive_services::drive::DriveError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "snapdrive_api=debug,snapdrive_services=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config; missing folder id or client credentials is fatal
    let settings = Settings::load()?;
    settings.validate()?;
    info!(
        "Starting Snapdrive on {}:{}",
        settings.app.host, settings.app.port
    );

    let app_state = AppState::new(settings.clone());

    // Only check the folder at startup when a grant is already present.
    // A non-folder id is fatal; a transient lookup failure is retried
    // lazily on the next authorized request.
    if app_state.auth.is_authorized().await {
        match app_state.drive.resolve_folder().await {
            Ok(_) => {}
            Err(err @ DriveError::NotAFolder { .. }) => return Err(err.into()),
            Err(err) => warn!("folder check failed, will retry after auth: {err}"),
        }
    } else {
        info!("Not authenticated yet; open / to begin the consent flow");
    }

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
