use std::fmt;

use crate::middleware::CorsConfigError;

/// Failure surfaced by the dispatch pipeline.
///
/// Lookup misses, CORS rejections, `false` pre-handles and unresolvable view
/// names are *not* errors; they are ordinary outcomes. What ends up here is
/// propagated to the caller after the execution chain has run its completion
/// phase.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The effective CORS configuration for the request is invalid
    CorsConfig(CorsConfigError),
    /// A named handler reference could not be resolved through the registry
    UnknownHandler { name: String },
    /// An interceptor callback failed
    Interceptor { interceptor: String, message: String },
    /// The handler failed
    Handler { handler: String, message: String },
    /// No view resolver produced a view for the name returned by the handler
    ViewNotResolved { view_name: String },
    /// A view failed to render
    Render { view: String, message: String },
    /// A deferred result did not arrive in time
    AsyncTimeout { timeout_ms: u64 },
    /// A suspended request was abandoned before its result arrived
    AsyncCancelled,
}

impl DispatchError {
    #[must_use]
    pub fn handler(handler: &str, message: impl Into<String>) -> Self {
        DispatchError::Handler {
            handler: handler.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn interceptor(interceptor: &str, message: impl Into<String>) -> Self {
        DispatchError::Interceptor {
            interceptor: interceptor.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status an error-translation layer should report for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::AsyncTimeout { .. } => 503,
            _ => 500,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::CorsConfig(e) => write!(f, "{e}"),
            DispatchError::UnknownHandler { name } => {
                write!(f, "No handler registered under the name '{name}'")
            }
            DispatchError::Interceptor {
                interceptor,
                message,
            } => write!(f, "Interceptor '{interceptor}' failed: {message}"),
            DispatchError::Handler { handler, message } => {
                write!(f, "Handler '{handler}' failed: {message}")
            }
            DispatchError::ViewNotResolved { view_name } => {
                write!(f, "Could not resolve view with name '{view_name}'")
            }
            DispatchError::Render { view, message } => {
                write!(f, "View '{view}' failed to render: {message}")
            }
            DispatchError::AsyncTimeout { timeout_ms } => {
                write!(f, "Async result not produced within {timeout_ms} ms")
            }
            DispatchError::AsyncCancelled => {
                write!(f, "Async request abandoned before its result arrived")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::CorsConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CorsConfigError> for DispatchError {
    fn from(e: CorsConfigError) -> Self {
        DispatchError::CorsConfig(e)
    }
}
