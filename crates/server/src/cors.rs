use config::CorsConfig;
use http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build the CORS layer for the public routes.
///
/// Methods and headers are mirrored from the preflight request. A `"*"` origin
/// is mirrored as well when credentials are allowed, since browsers reject the
/// wildcard together with credentials.
pub(super) fn generate(config: &CorsConfig) -> CorsLayer {
    let cors_layer = CorsLayer::new()
        .allow_credentials(config.allow_credentials)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let allow_origin = match (config.allows_any_origin(), config.allow_credentials) {
        (true, true) => AllowOrigin::mirror_request(),
        (true, false) => AllowOrigin::any(),
        (false, _) => {
            let origins = config.allow_origins.iter().filter_map(|origin| {
                let origin = origin.trim_end_matches('/');

                HeaderValue::from_str(origin)
                    .inspect_err(|e| log::warn!("Ignoring invalid CORS origin '{origin}': {e}"))
                    .ok()
            });

            AllowOrigin::list(origins)
        }
    };

    cors_layer.allow_origin(allow_origin)
}
