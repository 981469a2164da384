use serde_json::Value;

use super::{Model, View};
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::negotiation::{MediaType, APPLICATION_JSON};

/// Renders the model as the JSON response body.
///
/// The `content-type` header is the negotiated content type when one was
/// selected and is concrete, otherwise the view's own.
#[derive(Debug, Clone)]
pub struct JsonView {
    content_type: MediaType,
}

impl Default for JsonView {
    fn default() -> Self {
        Self {
            content_type: APPLICATION_JSON.clone(),
        }
    }
}

impl JsonView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A JSON view advertising another content type, e.g. `application/hal+json`.
    #[must_use]
    pub fn with_content_type(content_type: MediaType) -> Self {
        Self { content_type }
    }
}

impl View for JsonView {
    fn content_type(&self) -> Option<MediaType> {
        Some(self.content_type.clone())
    }

    fn name(&self) -> &str {
        "JsonView"
    }

    fn render(&self, model: &Model, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<(), DispatchError> {
        let content_type = req
            .attributes()
            .selected_content_type()
            .filter(|selected| selected.is_concrete())
            .unwrap_or(&self.content_type);
        res.set_header("content-type", content_type.to_string());
        res.body = Value::Object(model.clone());
        Ok(())
    }
}

/// Sends the client elsewhere instead of rendering content.
///
/// `{name}` placeholders in the target are filled from the request's URI
/// template variables.
#[derive(Debug, Clone)]
pub struct RedirectView {
    url: String,
    status: u16,
}

impl RedirectView {
    /// A `302 Found` redirect to `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: 302,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn expand(&self, req: &HandlerRequest) -> String {
        let mut out = String::with_capacity(self.url.len());
        let mut rest = self.url.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            out.push_str(&rest[..start]);
            match req.path_variable(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..=start + len]),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl View for RedirectView {
    fn is_redirect(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "RedirectView"
    }

    fn render(&self, _model: &Model, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<(), DispatchError> {
        res.status = self.status;
        res.set_header("location", self.expand(req));
        Ok(())
    }
}

/// The synthetic view returned when negotiation finds nothing acceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAcceptableView;

impl View for NotAcceptableView {
    fn name(&self) -> &str {
        "NotAcceptableView"
    }

    fn render(&self, _model: &Model, _req: &HandlerRequest, res: &mut HandlerResponse) -> Result<(), DispatchError> {
        res.status = 406;
        Ok(())
    }
}
