use http::Method;

use super::config::{OriginPattern, ALL};
use super::{CorsConfig, CorsConfigError};

/// Builder for creating a validated [`CorsConfig`] with a fluent API
///
/// Properties that are never set stay unconfigured (`None`), so the built
/// value combines cleanly with other configurations.
///
/// # Example
///
/// ```rust,ignore
/// use brrtdispatch::middleware::CorsConfig;
/// use http::Method;
///
/// let cors = CorsConfig::builder()
///     .allowed_origins(&["https://example.com", "https://api.example.com"])
///     .allowed_methods(&[Method::GET, Method::POST, Method::PUT])
///     .allowed_headers(&["Content-Type", "Authorization", "X-Custom-Header"])
///     .allow_credentials(true)
///     .expose_headers(&["X-Total-Count", "X-Page-Number"])
///     .max_age(3600) // Cache preflight for 1 hour
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CorsConfigBuilder {
    allowed_origins: Option<Vec<String>>,
    allowed_origin_patterns: Option<Vec<String>>,
    allowed_methods: Option<Vec<String>>,
    allowed_headers: Option<Vec<String>>,
    expose_headers: Option<Vec<String>>,
    allow_credentials: Option<bool>,
    max_age: Option<u64>,
}

impl CorsConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set allowed origins
    ///
    /// * Use `&["*"]` to allow all origins (cannot be combined with credentials)
    /// * Each other entry must look like `scheme://host[:port]`
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.allowed_origins = Some(origins.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set origin patterns such as `https://*.example.com`
    ///
    /// Unlike a literal `*` origin, patterns may be used together with credentials.
    #[must_use]
    pub fn allowed_origin_patterns(mut self, patterns: &[&str]) -> Self {
        self.allowed_origin_patterns = Some(patterns.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set allowed HTTP methods
    #[must_use]
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.allowed_methods = Some(methods.iter().map(|m| m.as_str().to_string()).collect());
        self
    }

    /// Set allowed methods by name; `"*"` allows any method
    #[must_use]
    pub fn allowed_method_names(mut self, methods: &[&str]) -> Self {
        self.allowed_methods = Some(methods.iter().map(|m| m.trim().to_ascii_uppercase()).collect());
        self
    }

    /// Set allowed request headers; `"*"` allows any header
    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = Some(headers.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set headers to expose to JavaScript via `Access-Control-Expose-Headers`
    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.expose_headers = Some(headers.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Enable or disable credentials
    ///
    /// **Important**: Cannot be used with wildcard origin (`*`).
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = Some(allow);
        self
    }

    /// Set preflight cache duration in seconds
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// * `WildcardWithCredentials` - credentials with a `*` origin
    /// * `EmptyOriginsWithCredentials` - credentials with no origins or patterns
    /// * `InvalidOriginFormat` - an origin that is not `scheme://host[:port]`
    /// * `InvalidOriginPattern` - a pattern that does not compile
    /// * `InvalidMethod` - a method name that is not an HTTP token
    pub fn build(self) -> Result<CorsConfig, CorsConfigError> {
        if let Some(origins) = &self.allowed_origins {
            for origin in origins {
                validate_origin_format(origin)?;
            }
        }
        if let Some(methods) = &self.allowed_methods {
            for method in methods {
                if method != ALL && Method::from_bytes(method.as_bytes()).is_err() {
                    return Err(CorsConfigError::InvalidMethod {
                        method: method.clone(),
                    });
                }
            }
        }
        let allowed_origin_patterns = self
            .allowed_origin_patterns
            .map(|patterns| {
                patterns
                    .iter()
                    .map(|p| OriginPattern::parse(p))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        if self.allow_credentials == Some(true) {
            let has_origins = self.allowed_origins.as_ref().is_some_and(|o| !o.is_empty());
            let has_patterns = allowed_origin_patterns.as_ref().is_some_and(|p| !p.is_empty());
            if !has_origins && !has_patterns {
                return Err(CorsConfigError::EmptyOriginsWithCredentials);
            }
        }

        let config = CorsConfig {
            allowed_origins: self.allowed_origins,
            allowed_origin_patterns,
            allowed_methods: self.allowed_methods,
            allowed_headers: self.allowed_headers,
            exposed_headers: self.expose_headers,
            allow_credentials: self.allow_credentials,
            max_age: self.max_age,
        };
        config.validate_allow_credentials()?;
        Ok(config)
    }
}

fn validate_origin_format(origin: &str) -> Result<(), CorsConfigError> {
    if origin == ALL || origin == "null" {
        return Ok(());
    }
    let invalid = || CorsConfigError::InvalidOriginFormat {
        origin: origin.to_string(),
    };
    let url = url::Url::parse(origin).map_err(|_| invalid())?;
    let bare_path = url.path().is_empty() || url.path() == "/";
    if url.host_str().is_none() || !bare_path || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }
    Ok(())
}
