use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;

/// Build the CORS layer from configuration.
///
/// A literal `*` combined with credentials is answered by mirroring the
/// request, since browsers reject a wildcard on credentialed requests.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods(allow_methods(config))
        .allow_headers(allow_headers(config))
        .allow_credentials(config.allow_credentials)
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

fn allow_origin(config: &CorsConfig) -> AllowOrigin {
    if is_wildcard(&config.allowed_origins) {
        return if config.allow_credentials {
            AllowOrigin::mirror_request()
        } else {
            Any.into()
        };
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(origins)
}

fn allow_methods(config: &CorsConfig) -> AllowMethods {
    if is_wildcard(&config.allow_methods) {
        return if config.allow_credentials {
            AllowMethods::mirror_request()
        } else {
            Any.into()
        };
    }

    let methods: Vec<Method> = config
        .allow_methods
        .iter()
        .filter_map(|method| Method::from_bytes(method.to_uppercase().as_bytes()).ok())
        .collect();
    AllowMethods::list(methods)
}

fn allow_headers(config: &CorsConfig) -> AllowHeaders {
    if is_wildcard(&config.allow_headers) {
        return if config.allow_credentials {
            AllowHeaders::mirror_request()
        } else {
            Any.into()
        };
    }

    let headers: Vec<HeaderName> = config
        .allow_headers
        .iter()
        .filter_map(|header| HeaderName::from_bytes(header.as_bytes()).ok())
        .collect();
    AllowHeaders::list(headers)
}
