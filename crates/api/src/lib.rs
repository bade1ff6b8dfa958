pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/auth", get(routes::auth::begin))
        .route("/oauth2callback", get(routes::auth::callback))
        .route("/logout", post(routes::auth::logout))
        .route("/upload-drive", post(routes::upload::upload))
        .route("/gallery", get(routes::gallery::list))
        .route("/image/{id}", get(routes::image::get))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Landing page: browser-facing, so an unauthorized visit redirects into
/// the consent flow instead of getting a JSON 401.
async fn index(State(state): State<AppState>) -> Response {
    if !state.auth.is_authorized().await {
        return Redirect::to("/auth").into_response();
    }
    Html(INDEX_HTML).into_response()
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Snapdrive</title>
</head>
<body>
<h1>Snapdrive</h1>
<form id="up" enctype="multipart/form-data">
  <input type="file" name="photo" accept="image/*" required>
  <button type="submit">Upload</button>
</form>
<div id="gallery"></div>
<script>
const gallery = document.getElementById("gallery");
async function refresh() {
  const res = await fetch("/gallery");
  const data = await res.json();
  gallery.innerHTML = (data.files || [])
    .map(f => `<img src="/image/${f.id}" alt="${f.name}" width="200" loading="lazy">`)
    .join("");
}
document.getElementById("up").addEventListener("submit", async (e) => {
  e.preventDefault();
  await fetch("/upload-drive", { method: "POST", body: new FormData(e.target) });
  e.target.reset();
  refresh();
});
refresh();
</script>
</body>
</html>
"#;
