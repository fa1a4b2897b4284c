//! HTTP surface of the color extraction service.
//!
//! `POST /api/extract-color` always answers `200 OK`; failures are reported
//! in the body as `success: false` with a fallback color.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::extract::{ColorExtractor, ExtractColorRequest, ExtractColorResponse};

/// Route path of the extraction endpoint.
pub const EXTRACT_COLOR_PATH: &str = "/api/extract-color";

/// Builds the service router.
pub fn router(extractor: ColorExtractor) -> Router {
    Router::new()
        .route(EXTRACT_COLOR_PATH, post(extract_color_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(extractor)
}

/// POST /api/extract-color
///
/// The body is parsed by hand so that malformed JSON falls into the same
/// "Image URL is required" path as a missing field instead of a 4xx.
pub async fn extract_color_handler(
    State(extractor): State<ColorExtractor>,
    body: Bytes,
) -> Json<ExtractColorResponse> {
    let request = match serde_json::from_slice::<ExtractColorRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!("extract-color body is not a valid request ({} bytes): {err}", body.len());
            ExtractColorRequest::default()
        }
    };

    let extraction = extractor.extract(request.image_url.as_deref()).await;
    Json(extraction.into())
}

/// Serves `app` on `listener` until the process is stopped.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("color extraction service listening on {addr}");
    }
    axum::serve(listener, app).await
}
