use axum::http::StatusCode;

/// Liveness probe.
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Healthy!")
}
