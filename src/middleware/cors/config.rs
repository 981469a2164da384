use http::Method;
use regex::Regex;
use std::fmt;

use super::{CorsConfigBuilder, CorsConfigError};

pub(crate) const ALL: &str = "*";

/// Methods permitted when a configuration does not list any.
pub const DEFAULT_METHODS: [&str; 3] = ["GET", "HEAD", "POST"];

/// Preflight cache duration applied by [`CorsConfig::permissive`].
pub const DEFAULT_MAX_AGE: u64 = 1800;

/// Origin pattern such as `https://*.example.com`, where `*` matches any run of characters.
#[derive(Clone)]
pub struct OriginPattern {
    raw: String,
    regex: Regex,
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Result<Self, CorsConfigError> {
        let raw = pattern.trim().trim_end_matches('/').to_string();
        let mut source = String::with_capacity(raw.len() + 8);
        source.push_str("(?i)^");
        for (i, part) in raw.split('*').enumerate() {
            if i > 0 {
                source.push_str(".*");
            }
            source.push_str(&regex::escape(part));
        }
        source.push('$');
        let regex = Regex::new(&source).map_err(|e| CorsConfigError::InvalidOriginPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { raw, regex })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn is_match(&self, origin: &str) -> bool {
        self.regex.is_match(origin)
    }
}

impl fmt::Debug for OriginPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OriginPattern").field(&self.raw).finish()
    }
}

/// CORS policy for a set of requests.
///
/// Every property is optional: `None` means "not configured", which matters
/// when a global policy is [combined](CorsConfig::combine) with a
/// handler-specific one. Lists may contain `*` to allow anything.
///
/// # Credentials
///
/// When `allow_credentials` is `true`, wildcard origin (`*`) is not permitted by
/// the CORS specification. Use origin patterns instead; the builder and
/// `combine` both reject the invalid combination.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub(crate) allowed_origins: Option<Vec<String>>,
    pub(crate) allowed_origin_patterns: Option<Vec<OriginPattern>>,
    pub(crate) allowed_methods: Option<Vec<String>>,
    pub(crate) allowed_headers: Option<Vec<String>>,
    pub(crate) exposed_headers: Option<Vec<String>>,
    pub(crate) allow_credentials: Option<bool>,
    pub(crate) max_age: Option<u64>,
}

impl CorsConfig {
    /// An empty configuration: nothing allowed, nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> CorsConfigBuilder {
        CorsConfigBuilder::new()
    }

    /// Allow every origin, the default methods and every header, caching preflights for 30 minutes.
    ///
    /// Suitable for development only.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allowed_origins: Some(vec![ALL.to_string()]),
            allowed_origin_patterns: None,
            allowed_methods: Some(DEFAULT_METHODS.iter().map(|m| m.to_string()).collect()),
            allowed_headers: Some(vec![ALL.to_string()]),
            exposed_headers: None,
            allow_credentials: None,
            max_age: Some(DEFAULT_MAX_AGE),
        }
    }

    #[must_use]
    pub fn allowed_origins(&self) -> Option<&[String]> {
        self.allowed_origins.as_deref()
    }

    #[must_use]
    pub fn allowed_origin_patterns(&self) -> Vec<&str> {
        self.allowed_origin_patterns
            .iter()
            .flatten()
            .map(OriginPattern::as_str)
            .collect()
    }

    #[must_use]
    pub fn allowed_methods(&self) -> Option<&[String]> {
        self.allowed_methods.as_deref()
    }

    #[must_use]
    pub fn allowed_headers(&self) -> Option<&[String]> {
        self.allowed_headers.as_deref()
    }

    #[must_use]
    pub fn exposed_headers(&self) -> Option<&[String]> {
        self.exposed_headers.as_deref()
    }

    #[must_use]
    pub fn allow_credentials(&self) -> Option<bool> {
        self.allow_credentials
    }

    #[must_use]
    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    /// Methods actually in force: the configured list or [`DEFAULT_METHODS`].
    #[must_use]
    pub fn resolved_methods(&self) -> Vec<String> {
        match &self.allowed_methods {
            Some(methods) if !methods.is_empty() => methods.clone(),
            _ => DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Combine `self` (the broader, usually global policy) with `other` (the
    /// handler-specific one).
    ///
    /// Lists are unioned in order with duplicates dropped; a `*` on either side
    /// makes the result `*`. Scalars set on one side only are kept. When both
    /// sides set `max_age` the smaller wins. Explicitly disagreeing
    /// `allow_credentials` values are an error, as is a result that pairs
    /// credentials with a wildcard origin.
    pub fn combine(&self, other: &CorsConfig) -> Result<CorsConfig, CorsConfigError> {
        let allow_credentials = match (self.allow_credentials, other.allow_credentials) {
            (Some(a), Some(b)) if a != b => return Err(CorsConfigError::ConflictingCredentials),
            (a, b) => b.or(a),
        };
        let max_age = match (self.max_age, other.max_age) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => b.or(a),
        };
        let allowed_origin_patterns = match (&self.allowed_origin_patterns, &other.allowed_origin_patterns) {
            (None, None) => None,
            (Some(p), None) | (None, Some(p)) => Some(p.clone()),
            (Some(a), Some(b)) => {
                let mut merged = a.clone();
                for pattern in b {
                    if !merged.iter().any(|m| m.raw == pattern.raw) {
                        merged.push(pattern.clone());
                    }
                }
                Some(merged)
            }
        };

        let combined = CorsConfig {
            allowed_origins: combine_lists(&self.allowed_origins, &other.allowed_origins),
            allowed_origin_patterns,
            allowed_methods: combine_lists(&self.allowed_methods, &other.allowed_methods),
            allowed_headers: combine_lists(&self.allowed_headers, &other.allowed_headers),
            exposed_headers: combine_lists(&self.exposed_headers, &other.exposed_headers),
            allow_credentials,
            max_age,
        };
        combined.validate_allow_credentials()?;
        Ok(combined)
    }

    /// Reject `allow_credentials = true` paired with a literal `*` origin.
    pub fn validate_allow_credentials(&self) -> Result<(), CorsConfigError> {
        if self.allow_credentials == Some(true)
            && self
                .allowed_origins
                .as_ref()
                .is_some_and(|origins| origins.iter().any(|o| o == ALL))
        {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        Ok(())
    }

    /// The value for `Access-Control-Allow-Origin`, or `None` if `origin` is not allowed.
    ///
    /// A configured `*` yields `"*"`; otherwise the request origin is echoed back.
    #[must_use]
    pub fn check_origin(&self, origin: &str) -> Option<String> {
        let origin = origin.trim();
        if origin.is_empty() {
            return None;
        }
        let normalized = origin.trim_end_matches('/');

        if let Some(origins) = &self.allowed_origins {
            if origins.iter().any(|o| o == ALL) && self.allow_credentials != Some(true) {
                return Some(ALL.to_string());
            }
            if origins
                .iter()
                .any(|o| o.trim_end_matches('/').eq_ignore_ascii_case(normalized))
            {
                return Some(origin.to_string());
            }
        }
        if let Some(patterns) = &self.allowed_origin_patterns {
            if patterns.iter().any(|p| p.is_match(normalized)) {
                return Some(origin.to_string());
            }
        }
        None
    }

    /// The methods to advertise in `Access-Control-Allow-Methods`, or `None` if
    /// `method` is not allowed.
    #[must_use]
    pub fn check_http_method(&self, method: &Method) -> Option<Vec<String>> {
        let resolved = self.resolved_methods();
        if resolved.iter().any(|m| m == ALL) {
            return Some(vec![method.as_str().to_string()]);
        }
        if resolved.iter().any(|m| m.eq_ignore_ascii_case(method.as_str())) {
            return Some(resolved);
        }
        None
    }

    /// The headers to advertise in `Access-Control-Allow-Headers`.
    ///
    /// Every requested header must be allowed; a single disallowed header
    /// rejects the preflight. An empty request is trivially allowed.
    #[must_use]
    pub fn check_headers(&self, requested: &[String]) -> Option<Vec<String>> {
        if requested.is_empty() {
            return Some(Vec::new());
        }
        let allowed = self.allowed_headers.as_ref()?;
        if allowed.iter().any(|h| h == ALL) {
            return Some(requested.to_vec());
        }
        requested
            .iter()
            .all(|r| allowed.iter().any(|a| a.eq_ignore_ascii_case(r)))
            .then(|| requested.to_vec())
    }
}

fn combine_lists(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (a, b) {
        (None, None) => None,
        (Some(list), None) | (None, Some(list)) => Some(list.clone()),
        (Some(first), Some(second)) => {
            if first.iter().chain(second).any(|v| v == ALL) {
                return Some(vec![ALL.to_string()]);
            }
            let mut merged: Vec<String> = Vec::with_capacity(first.len() + second.len());
            for value in first.iter().chain(second) {
                if !merged.iter().any(|m| m.eq_ignore_ascii_case(value)) {
                    merged.push(value.clone());
                }
            }
            Some(merged)
        }
    }
}
