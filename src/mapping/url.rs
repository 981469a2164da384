use http::Method;

use super::HandlerLookup;
use crate::dispatcher::HandlerRequest;
use crate::error::DispatchError;
use crate::handler::HandlerRef;
use crate::router::Router;

/// Router-backed lookup step.
///
/// On a match it publishes the matched pattern, the handler description, the
/// URI template variables and, when the route declares any, the producible
/// media types as request attributes.
#[derive(Debug, Clone, Default)]
pub struct UrlHandlerLookup {
    router: Router,
}

impl UrlHandlerLookup {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl HandlerLookup for UrlHandlerLookup {
    fn lookup(&self, req: &HandlerRequest, method: &Method) -> Result<Option<HandlerRef>, DispatchError> {
        let Some(route_match) = self.router.route(method, &req.path) else {
            return Ok(None);
        };
        let route = route_match.route;
        let attributes = req.attributes();
        attributes.set_best_matching_pattern(route.pattern.as_arc());
        attributes.set_best_matching_handler(route.target.describe());
        attributes.set_uri_template_variables(route_match.path_params);
        if !route.produces.is_empty() {
            attributes.set_producible_media_types(route.produces.clone());
        }
        Ok(Some(route.target.clone()))
    }
}
