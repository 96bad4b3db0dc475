//! CORS for browser clients opening the socket from another origin.

use std::str::FromStr;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use cotune_core::config::CorsConfig;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// Parses each entry, logging and skipping the ones that are not valid
/// header syntax so a typo never blocks startup.
fn parse_all<T: FromStr>(field: &str, values: &[String]) -> Vec<T> {
    values
        .iter()
        .filter_map(|raw| match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(field, value = %raw, "Ignoring invalid CORS entry");
                None
            }
        })
        .collect()
}

/// Builds the CORS layer from `[server.cors]`.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if is_wildcard(&config.allowed_origins) {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parse_all::<HeaderValue>("allowed_origins", &config.allowed_origins))
    };

    let headers = if is_wildcard(&config.allowed_headers) {
        AllowHeaders::from(Any)
    } else {
        AllowHeaders::list(parse_all::<HeaderName>("allowed_headers", &config.allowed_headers))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(parse_all::<Method>("allowed_methods", &config.allowed_methods))
        .allow_headers(headers)
        .max_age(Duration::from_secs(config.max_age_seconds))
}
