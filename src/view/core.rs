use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::DispatchError;
use crate::negotiation::MediaType;
use crate::order::LOWEST_PRECEDENCE;

/// Model data handed to a view.
pub type Model = Map<String, Value>;

/// A renderer for a model.
pub trait View: Send + Sync {
    /// Content type this view produces. Content negotiation only selects views
    /// that declare one; redirect views are exempt.
    fn content_type(&self) -> Option<MediaType> {
        None
    }

    /// Redirect-capable views win view selection regardless of content negotiation.
    fn is_redirect(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn render(&self, model: &Model, req: &HandlerRequest, res: &mut HandlerResponse) -> Result<(), DispatchError>;
}

/// Turns a logical view name into a [`View`].
///
/// Resolvers are shared across concurrent requests and must be reentrant.
/// `Ok(None)` means "not mine", letting the next resolver in the chain try.
pub trait ViewResolver: Send + Sync {
    fn resolve_view_name(
        &self,
        view_name: &str,
        locale: &str,
        req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError>;

    /// Precedence in a resolver chain; lower runs first.
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }
}

/// Either a logical name still to be resolved or a concrete view.
#[derive(Clone)]
pub enum ViewRef {
    Name(String),
    View(Arc<dyn View>),
}

impl fmt::Debug for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ViewRef::View(view) => f.debug_tuple("View").field(&view.name()).finish(),
        }
    }
}

/// What a handler returns when it wants a view rendered.
#[derive(Debug, Clone, Default)]
pub struct ModelAndView {
    pub view: Option<ViewRef>,
    pub model: Model,
    /// Status to set before rendering
    pub status: Option<u16>,
}

impl ModelAndView {
    #[must_use]
    pub fn new(view_name: &str) -> Self {
        Self {
            view: Some(ViewRef::Name(view_name.to_string())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_view(view: Arc<dyn View>) -> Self {
        Self {
            view: Some(ViewRef::View(view)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn add_object(mut self, key: &str, value: Value) -> Self {
        self.model.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn view_name(&self) -> Option<&str> {
        match &self.view {
            Some(ViewRef::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// Replace the view name, e.g. from a post-handle interceptor.
    pub fn set_view_name(&mut self, view_name: &str) {
        self.view = Some(ViewRef::Name(view_name.to_string()));
    }
}
