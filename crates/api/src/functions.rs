//! Single-function deployment adapter: serves exactly one handler per
//! process, selected by SNAPDRIVE_FUNCTION. Shares the handler library
//! with the long-running server so the two deployment shapes cannot
//! drift apart.

use axum::{
    Router,
    routing::{get, post},
};
use snapdrive_api::{routes, state::AppState};
use snapdrive_config::Settings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "snapdrive_api=debug,snapdrive_services=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let function = std::env::var("SNAPDRIVE_FUNCTION")
        .map_err(|_| anyhow::anyhow!("SNAPDRIVE_FUNCTION must name the handler to serve"))?;

    let settings = Settings::load()?;
    settings.validate()?;
    let state = AppState::new(settings.clone());

    let app: Router = match function.as_str() {
        "auth" => Router::new().route("/auth", get(routes::auth::begin)),
        "oauth2callback" => {
            Router::new().route("/oauth2callback", get(routes::auth::callback))
        }
        "logout" => Router::new().route("/logout", post(routes::auth::logout)),
        "upload-drive" => Router::new().route("/upload-drive", post(routes::upload::upload)),
        "gallery" => Router::new().route("/gallery", get(routes::gallery::list)),
        "image" => Router::new().route("/image/{id}", get(routes::image::get)),
        other => anyhow::bail!("unknown function: {other}"),
    }
    .with_state(state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Serving function '{}' on {}", function, addr);

    axum::serve(listener, app).await?;

    Ok(())
}
