use std::fmt;

/// Why a CORS configuration was refused.
///
/// Raised by [`CorsConfigBuilder::build`](super::CorsConfigBuilder::build) at
/// registration time and by [`CorsConfig::combine`](super::CorsConfig::combine)
/// when a handler policy is merged with the global one for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// `*` among the allowed origins while credentials are allowed.
    ///
    /// Browsers refuse a credentialed response whose
    /// `Access-Control-Allow-Origin` is `*`; list the origins or use patterns.
    WildcardWithCredentials,
    /// An allowed origin that is not `scheme://host[:port]`
    InvalidOriginFormat { origin: String },
    /// Credentials allowed but neither origins nor origin patterns given
    EmptyOriginsWithCredentials,
    InvalidOriginPattern { pattern: String, message: String },
    InvalidMethod { method: String },
    /// The two sides of a combine set `allow_credentials` to different values
    ConflictingCredentials,
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid CORS configuration: ")?;
        match self {
            CorsConfigError::WildcardWithCredentials => f.write_str(
                "allowed origins contain '*' while allow_credentials is true; list explicit origins or origin patterns",
            ),
            CorsConfigError::InvalidOriginFormat { origin } => {
                write!(f, "origin '{origin}' is not of the form scheme://host[:port]")
            }
            CorsConfigError::EmptyOriginsWithCredentials => {
                f.write_str("allow_credentials is true but no origin or origin pattern is allowed")
            }
            CorsConfigError::InvalidOriginPattern { pattern, message } => {
                write!(f, "origin pattern '{pattern}' does not compile: {message}")
            }
            CorsConfigError::InvalidMethod { method } => {
                write!(f, "'{method}' is not an HTTP method token")
            }
            CorsConfigError::ConflictingCredentials => {
                f.write_str("global and handler policies disagree on allow_credentials")
            }
        }
    }
}

impl std::error::Error for CorsConfigError {}
