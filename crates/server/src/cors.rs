use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsSettings;
use crate::error::{ConfigError, Result};

const ANY_ORIGIN: &str = "*";

/// Build the CORS middleware.
///
/// Methods and headers mirror the preflight request. A literal `*` origin
/// mirrors the request origin, since a wildcard cannot be combined with
/// credentials.
pub fn cors_layer(settings: &CorsSettings) -> Result<CorsLayer> {
    let origin = if settings.origins.iter().any(|o| o == ANY_ORIGIN) {
        AllowOrigin::mirror_request()
    } else {
        let values = settings
            .origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin {
                    origin: origin.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(settings.allow_credentials)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}
