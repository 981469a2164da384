//! # Content Negotiation
//!
//! Media type parsing and comparison, plus the manager that decides which
//! media types a request is asking for.
//!
//! The manager asks each [`ContentNegotiationStrategy`] in turn (query
//! parameter, `Accept` header, fixed defaults) and takes the first answer that
//! expresses a preference. It also owns the extension table view resolution
//! uses to look up extension-specific views such as `home.json`.
//!
//! Requested media types come back ordered most specific first, highest
//! quality first:
//!
//! ```rust,ignore
//! // Accept: text/html, application/json;q=0.9
//! let requested = manager.resolve_media_types(&req)?;
//! assert_eq!(requested[0].to_string(), "text/html");
//! ```

mod error;
mod manager;
mod media_type;

pub use error::{MediaTypeError, NegotiationError};
pub use manager::{
    ContentNegotiationManager, ContentNegotiationManagerBuilder, ContentNegotiationStrategy,
    FixedStrategy, HeaderStrategy, MediaTypeFileExtensionResolver, MediaTypeMappings,
    ParameterStrategy, DEFAULT_PARAMETER_NAME,
};
pub use media_type::{
    sort_by_specificity_and_quality, MediaType, ALL, APPLICATION_JSON, APPLICATION_XML,
    TEXT_HTML, TEXT_PLAIN, WILDCARD,
};
