//! # Views
//!
//! What happens after a handler returns a [`ModelAndView`] instead of
//! writing the response itself.
//!
//! A [`ViewResolver`] turns a logical view name into a [`View`]. The
//! [`ContentNegotiatingViewResolver`] sits in front of the others: it asks
//! the [`ContentNegotiationManager`](crate::negotiation::ContentNegotiationManager)
//! what the client accepts, intersects that with what the handler declared it
//! produces, and picks the best candidate view.
//!
//! ## Built-in views
//!
//! - [`JsonView`]: the model as the JSON body
//! - [`RedirectView`]: `302` plus `Location`; always wins negotiation
//! - [`NotAcceptableView`]: `406`, returned when nothing matches and so configured
//!
//! ## Built-in resolvers
//!
//! - [`NamedViewResolver`]: fixed name → view table
//! - [`UrlBasedViewResolver`]: prefix/suffix plus a factory; understands `redirect:`
//! - [`CachingViewResolver`]: caches another resolver per name and locale
//!
//! A [`ModelAndView`] without a view gets its name from a
//! [`RequestToViewNameTranslator`]; [`DefaultViewNameTranslator`] uses the
//! request path.

mod core;
mod negotiating;
mod resolvers;
mod translator;
mod views;

pub use core::{Model, ModelAndView, View, ViewRef, ViewResolver};
pub use negotiating::ContentNegotiatingViewResolver;
pub use resolvers::{
    CachingViewResolver, NamedViewResolver, UrlBasedViewResolver, DEFAULT_CACHE_LIMIT, REDIRECT_URL_PREFIX,
};
pub use translator::{DefaultViewNameTranslator, RequestToViewNameTranslator};
pub use views::{JsonView, NotAcceptableView, RedirectView};

#[cfg(test)]
mod tests;
