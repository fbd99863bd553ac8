//! CORS policy
//!
//! The proxy is meant to be called from browser pages on any origin, so the
//! policy allows every origin, the `GET` and `OPTIONS` methods and the
//! `Content-Type` request header.

use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer: any origin, `GET`/`OPTIONS`, `Content-Type`
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Answer a bare `OPTIONS` request that is not a CORS preflight
pub async fn preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_preflight_is_no_content() {
        let response = preflight().await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "https://anywhere.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap();
        assert!(methods.contains("GET"));
        assert!(methods.contains("OPTIONS"));
    }
}
