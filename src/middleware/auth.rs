use serde_json::json;

use super::Interceptor;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::handler::Handler;

/// Header checked when none is configured.
pub const DEFAULT_AUTH_HEADER: &str = "authorization";

/// Rejects requests whose auth header does not carry the configured token.
///
/// On mismatch the response becomes `401 {"error": "Unauthorized"}` and the
/// chain short-circuits.
pub struct AuthInterceptor {
    token: String,
    header: String,
}

impl AuthInterceptor {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            header: DEFAULT_AUTH_HEADER.to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: &str) -> Self {
        self.header = header.to_ascii_lowercase();
        self
    }
}

impl Interceptor for AuthInterceptor {
    fn name(&self) -> &str {
        "auth"
    }

    fn pre_handle(
        &self,
        req: &HandlerRequest,
        res: &mut HandlerResponse,
        _handler: &dyn Handler,
    ) -> Result<bool, DispatchError> {
        match req.get_header(&self.header) {
            Some(h) if h == self.token => Ok(true),
            _ => {
                res.status = 401;
                res.body = json!({ "error": "Unauthorized" });
                Ok(false)
            }
        }
    }
}
