use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{CollectionQuery, CollectionResponse},
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod catalog;
mod config;

use api::{collections_route, list_collection, ApiContext};
use app_state::AppState;
use config::{load_catalog, load_settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let catalog = load_catalog(&settings.catalog_path)?;
    let categories = catalog.categories().map(ToString::to_string).collect::<Vec<_>>();
    info!(
        catalog_path = %settings.catalog_path,
        ?categories,
        default_category = %settings.default_category,
        "media catalog loaded"
    );

    let api = ApiContext {
        catalog: Arc::new(catalog),
        default_category: settings.default_category(),
        signed_url_ttl: settings.signed_url_ttl(),
    };
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "content backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(collections_route(), get(http_list_collection))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_list_collection(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CollectionQuery>,
) -> Result<Json<CollectionResponse>, (StatusCode, Json<ApiError>)> {
    list_collection(&state.api, q.category.as_ref(), Utc::now())
        .map(Json)
        .map_err(|err| (status_for(&err), Json(err)))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, "route not found")),
    )
}

fn status_for(err: &ApiError) -> StatusCode {
    match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
