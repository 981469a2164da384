use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{NotAcceptableView, View, ViewResolver};
use crate::dispatcher::HandlerRequest;
use crate::error::DispatchError;
use crate::negotiation::{sort_by_specificity_and_quality, ContentNegotiationManager, MediaType, ALL};
use crate::order::{sort_by_order, HIGHEST_PRECEDENCE};

/// Picks a view for a logical name by content negotiation.
///
/// Every delegate resolver is asked for the plain name and for the name
/// suffixed with each file extension of the negotiated media types. Default
/// views are appended after resolver candidates. A redirect view wins
/// outright; otherwise the first candidate whose content type is compatible
/// with the most preferred media type is chosen, and that media type is
/// published as the request's selected content type.
pub struct ContentNegotiatingViewResolver {
    manager: Arc<ContentNegotiationManager>,
    resolvers: Vec<Arc<dyn ViewResolver>>,
    default_views: Vec<Arc<dyn View>>,
    use_not_acceptable: bool,
    order: i32,
}

impl ContentNegotiatingViewResolver {
    /// Delegate resolvers are sorted once here by their declared order;
    /// equal orders keep the given order.
    #[must_use]
    pub fn new(manager: Arc<ContentNegotiationManager>, mut resolvers: Vec<Arc<dyn ViewResolver>>) -> Self {
        sort_by_order(&mut resolvers, |r| r.order());
        Self {
            manager,
            resolvers,
            default_views: Vec::new(),
            use_not_acceptable: false,
            order: HIGHEST_PRECEDENCE,
        }
    }

    #[must_use]
    pub fn with_default_views(mut self, views: Vec<Arc<dyn View>>) -> Self {
        self.default_views = views;
        self
    }

    /// Return a `406` view instead of `None` when nothing is acceptable.
    #[must_use]
    pub fn with_use_not_acceptable(mut self, use_not_acceptable: bool) -> Self {
        self.use_not_acceptable = use_not_acceptable;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn resolvers(&self) -> &[Arc<dyn ViewResolver>] {
        &self.resolvers
    }

    /// Media types both acceptable to the client and producible by the
    /// handler, most preferred first. `None` when the request is not acceptable.
    pub fn media_types(&self, req: &HandlerRequest) -> Option<Vec<MediaType>> {
        let acceptable = match self.manager.resolve_media_types(req) {
            Ok(acceptable) => acceptable,
            Err(e) => {
                warn!(request_id = %req.request_id, error = %e, "Content negotiation failed");
                return None;
            }
        };
        let all = [ALL.clone()];
        let producible = match req.attributes().producible_media_types() {
            Some(types) if !types.is_empty() => types,
            _ => &all[..],
        };

        let mut compatible: Vec<MediaType> = Vec::new();
        for accept in &acceptable {
            for produce in producible {
                if accept.is_compatible_with(produce) {
                    let candidate = most_specific(accept, produce);
                    if !compatible.contains(&candidate) {
                        compatible.push(candidate);
                    }
                }
            }
        }
        sort_by_specificity_and_quality(&mut compatible);

        debug!(
            request_id = %req.request_id,
            acceptable = ?acceptable.iter().map(ToString::to_string).collect::<Vec<_>>(),
            producible = ?producible.iter().map(ToString::to_string).collect::<Vec<_>>(),
            compatible = ?compatible.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Negotiated media types"
        );
        Some(compatible)
    }

    fn candidate_views(
        &self,
        view_name: &str,
        locale: &str,
        media_types: &[MediaType],
        req: &HandlerRequest,
    ) -> Result<Vec<Arc<dyn View>>, DispatchError> {
        let mut candidates = Vec::new();
        for resolver in &self.resolvers {
            if let Some(view) = resolver.resolve_view_name(view_name, locale, req)? {
                candidates.push(view);
            }
            for media_type in media_types {
                for extension in self.manager.resolve_file_extensions(media_type) {
                    let name_with_extension = format!("{view_name}.{extension}");
                    if let Some(view) = resolver.resolve_view_name(&name_with_extension, locale, req)? {
                        candidates.push(view);
                    }
                }
            }
        }
        candidates.extend(self.default_views.iter().cloned());
        Ok(candidates)
    }

    fn best_view(
        &self,
        candidates: &[Arc<dyn View>],
        media_types: &[MediaType],
        req: &HandlerRequest,
    ) -> Option<Arc<dyn View>> {
        if let Some(redirect) = candidates.iter().find(|view| view.is_redirect()) {
            return Some(Arc::clone(redirect));
        }
        for media_type in media_types {
            for candidate in candidates {
                let Some(content_type) = candidate.content_type() else {
                    continue;
                };
                if media_type.is_compatible_with(&content_type) {
                    req.attributes()
                        .set_selected_content_type(media_type.remove_quality_value());
                    return Some(Arc::clone(candidate));
                }
            }
        }
        None
    }
}

impl ViewResolver for ContentNegotiatingViewResolver {
    fn resolve_view_name(
        &self,
        view_name: &str,
        locale: &str,
        req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        if let Some(media_types) = self.media_types(req) {
            let candidates = self.candidate_views(view_name, locale, &media_types, req)?;
            if let Some(view) = self.best_view(&candidates, &media_types, req) {
                debug!(
                    request_id = %req.request_id,
                    view_name = %view_name,
                    view = %view.name(),
                    selected_content_type = ?req.attributes().selected_content_type().map(ToString::to_string),
                    "View selected"
                );
                return Ok(Some(view));
            }
        }

        if self.use_not_acceptable {
            warn!(request_id = %req.request_id, view_name = %view_name, "No acceptable view, answering 406");
            return Ok(Some(Arc::new(NotAcceptableView)));
        }
        debug!(request_id = %req.request_id, view_name = %view_name, "No acceptable view");
        Ok(None)
    }

    fn order(&self) -> i32 {
        self.order
    }
}

impl fmt::Debug for ContentNegotiatingViewResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentNegotiatingViewResolver")
            .field("resolvers", &self.resolvers.len())
            .field(
                "default_views",
                &self.default_views.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .field("use_not_acceptable", &self.use_not_acceptable)
            .field("order", &self.order)
            .finish()
    }
}

/// The more specific of a compatible pair, carrying the acceptable side's quality.
fn most_specific(accept: &MediaType, produce: &MediaType) -> MediaType {
    let produce = produce.copy_quality_value(accept);
    if accept.specificity_cmp(&produce) == Ordering::Less {
        accept.clone()
    } else {
        produce
    }
}
