//! CORS policy of the proxy.
//!
//! Upstream answers with its own restrictive `Access-Control-Allow-Origin`.
//! Whatever the inner handlers produce, that header is removed first and only
//! then does `CorsLayer` add ours.

use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::response::Response;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AllowedOrigins;

pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let layer = match origins {
        AllowedOrigins::Any => CorsLayer::new().allow_origin(Any),
        AllowedOrigins::List(list) => {
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|s| HeaderValue::from_str(s).ok())
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
        }
    };

    layer.allow_methods([Method::GET, Method::OPTIONS])
}

async fn strip_upstream_cors(mut response: Response) -> Response {
    response.headers_mut().remove(ACCESS_CONTROL_ALLOW_ORIGIN);
    response
}

/// Layer order matters: strip runs inside, CorsLayer outside.
pub fn apply<S>(router: Router<S>, origins: &AllowedOrigins) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::map_response(strip_upstream_cors))
        .layer(cors_layer(origins))
}
