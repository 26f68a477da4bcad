use serde::Deserialize;

/// Configuration for CORS (Cross-Origin Resource Sharing).
///
/// Methods and headers are mirrored from the preflight request, so only the
/// origins and the credentials flag are configurable.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins from which we allow requests. A single `"*"` allows any origin.
    pub allow_origins: Vec<String>,
    /// Whether credentials (cookies, authorization headers) are allowed.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["http://localhost:3000".to_string(), "http://localhost:3001".to_string()],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    /// Whether any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }
}
