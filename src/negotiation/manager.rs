//! Strategies that turn a request into the list of media types it accepts.

use super::error::NegotiationError;
use super::media_type::{sort_by_specificity_and_quality, MediaType, ALL};
use crate::dispatcher::HandlerRequest;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PARAMETER_NAME: &str = "format";

/// One way of discovering the requested media types.
///
/// Returning `[*/*]` means "no preference"; the manager then moves on to the
/// next strategy.
pub trait ContentNegotiationStrategy: Send + Sync {
    fn resolve_media_types(&self, req: &HandlerRequest) -> Result<Vec<MediaType>, NegotiationError>;
}

/// Maps media types to the file extensions that stand for them.
pub trait MediaTypeFileExtensionResolver: Send + Sync {
    fn resolve_file_extensions(&self, media_type: &MediaType) -> Vec<String>;
    fn all_file_extensions(&self) -> Vec<String>;
}

/// Extension ↔ media type table shared by the parameter strategy and view resolution.
#[derive(Debug, Clone, Default)]
pub struct MediaTypeMappings {
    entries: Vec<(String, MediaType)>,
}

impl MediaTypeMappings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extension` (case-insensitive) for `media_type`. Re-registering replaces.
    #[must_use]
    pub fn with(mut self, extension: &str, media_type: MediaType) -> Self {
        self.add(extension, media_type);
        self
    }

    pub fn add(&mut self, extension: &str, media_type: MediaType) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.entries.retain(|(ext, _)| *ext != extension);
        self.entries.push((extension, media_type));
    }

    #[must_use]
    pub fn lookup_media_type(&self, extension: &str) -> Option<&MediaType> {
        let extension = extension.trim_start_matches('.');
        self.entries
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, mt)| mt)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MediaTypeFileExtensionResolver for MediaTypeMappings {
    /// Parameters on either side are ignored: `application/json;q=0.8` maps to `json`.
    fn resolve_file_extensions(&self, media_type: &MediaType) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, mt)| mt.essence_eq(media_type))
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    fn all_file_extensions(&self) -> Vec<String> {
        self.entries.iter().map(|(ext, _)| ext.clone()).collect()
    }
}

/// Reads the `Accept` header. Repeated headers are concatenated.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStrategy;

impl ContentNegotiationStrategy for HeaderStrategy {
    fn resolve_media_types(&self, req: &HandlerRequest) -> Result<Vec<MediaType>, NegotiationError> {
        let values: Vec<&str> = req.get_header_values("accept").collect();
        if values.is_empty() {
            return Ok(vec![ALL.clone()]);
        }
        let joined = values.join(",");
        let mut media_types = MediaType::parse_list(&joined).map_err(|e| {
            NegotiationError::NotAcceptable {
                value: joined.clone(),
                reason: e.to_string(),
            }
        })?;
        if media_types.is_empty() {
            return Ok(vec![ALL.clone()]);
        }
        sort_by_specificity_and_quality(&mut media_types);
        Ok(media_types)
    }
}

/// Reads a query parameter (`?format=json`) and maps it through [`MediaTypeMappings`].
#[derive(Debug, Clone)]
pub struct ParameterStrategy {
    parameter_name: String,
    mappings: Arc<MediaTypeMappings>,
}

impl ParameterStrategy {
    #[must_use]
    pub fn new(mappings: Arc<MediaTypeMappings>) -> Self {
        Self {
            parameter_name: DEFAULT_PARAMETER_NAME.to_string(),
            mappings,
        }
    }

    #[must_use]
    pub fn with_parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = name.to_string();
        self
    }

    #[must_use]
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
}

impl ContentNegotiationStrategy for ParameterStrategy {
    fn resolve_media_types(&self, req: &HandlerRequest) -> Result<Vec<MediaType>, NegotiationError> {
        let Some(key) = req.get_query_param(&self.parameter_name) else {
            return Ok(vec![ALL.clone()]);
        };
        match self.mappings.lookup_media_type(key) {
            Some(media_type) => Ok(vec![media_type.clone()]),
            None => Err(NegotiationError::NotAcceptable {
                value: key.to_string(),
                reason: format!("no media type registered for {}={key}", self.parameter_name),
            }),
        }
    }
}

/// Always answers with a fixed list, used as the fallback when nothing else decides.
#[derive(Debug, Clone)]
pub struct FixedStrategy {
    media_types: Vec<MediaType>,
}

impl FixedStrategy {
    #[must_use]
    pub fn new(media_types: Vec<MediaType>) -> Self {
        Self { media_types }
    }
}

impl ContentNegotiationStrategy for FixedStrategy {
    fn resolve_media_types(&self, _req: &HandlerRequest) -> Result<Vec<MediaType>, NegotiationError> {
        Ok(self.media_types.clone())
    }
}

/// Consults its strategies in order; the first answer other than `[*/*]` wins.
#[derive(Clone)]
pub struct ContentNegotiationManager {
    strategies: Vec<Arc<dyn ContentNegotiationStrategy>>,
    resolvers: Vec<Arc<dyn MediaTypeFileExtensionResolver>>,
}

impl Default for ContentNegotiationManager {
    fn default() -> Self {
        Self::new(vec![Arc::new(HeaderStrategy)])
    }
}

impl std::fmt::Debug for ContentNegotiationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentNegotiationManager")
            .field("strategies", &self.strategies.len())
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

impl ContentNegotiationManager {
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn ContentNegotiationStrategy>>) -> Self {
        Self {
            strategies,
            resolvers: Vec::new(),
        }
    }

    #[must_use]
    pub fn builder() -> ContentNegotiationManagerBuilder {
        ContentNegotiationManagerBuilder::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn MediaTypeFileExtensionResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn resolve_media_types(&self, req: &HandlerRequest) -> Result<Vec<MediaType>, NegotiationError> {
        for strategy in &self.strategies {
            let media_types = strategy.resolve_media_types(req)?;
            if media_types.len() == 1 && media_types[0] == *ALL {
                continue;
            }
            if media_types.is_empty() {
                continue;
            }
            debug!(
                request_id = %req.request_id,
                media_types = ?media_types.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Requested media types resolved"
            );
            return Ok(media_types);
        }
        Ok(vec![ALL.clone()])
    }

    /// Extensions for `media_type` from every resolver, without duplicates.
    #[must_use]
    pub fn resolve_file_extensions(&self, media_type: &MediaType) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::new();
        for resolver in &self.resolvers {
            for ext in resolver.resolve_file_extensions(media_type) {
                if !extensions.contains(&ext) {
                    extensions.push(ext);
                }
            }
        }
        extensions
    }

    #[must_use]
    pub fn all_file_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::new();
        for resolver in &self.resolvers {
            for ext in resolver.all_file_extensions() {
                if !extensions.contains(&ext) {
                    extensions.push(ext);
                }
            }
        }
        extensions
    }
}

/// Assembles a manager in the conventional strategy order: parameter, header, fixed.
#[derive(Debug, Clone, Default)]
pub struct ContentNegotiationManagerBuilder {
    favor_parameter: bool,
    parameter_name: Option<String>,
    ignore_accept_header: bool,
    default_content_types: Vec<MediaType>,
    mappings: MediaTypeMappings,
}

impl ContentNegotiationManagerBuilder {
    #[must_use]
    pub fn favor_parameter(mut self, favor: bool) -> Self {
        self.favor_parameter = favor;
        self
    }

    #[must_use]
    pub fn parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn ignore_accept_header(mut self, ignore: bool) -> Self {
        self.ignore_accept_header = ignore;
        self
    }

    #[must_use]
    pub fn default_content_types(mut self, media_types: Vec<MediaType>) -> Self {
        self.default_content_types = media_types;
        self
    }

    #[must_use]
    pub fn media_type(mut self, extension: &str, media_type: MediaType) -> Self {
        self.mappings.add(extension, media_type);
        self
    }

    #[must_use]
    pub fn build(self) -> ContentNegotiationManager {
        let mappings = Arc::new(self.mappings);
        let mut strategies: Vec<Arc<dyn ContentNegotiationStrategy>> = Vec::new();
        if self.favor_parameter {
            let mut strategy = ParameterStrategy::new(Arc::clone(&mappings));
            if let Some(name) = &self.parameter_name {
                strategy = strategy.with_parameter_name(name);
            }
            strategies.push(Arc::new(strategy));
        }
        if !self.ignore_accept_header {
            strategies.push(Arc::new(HeaderStrategy));
        }
        if !self.default_content_types.is_empty() {
            strategies.push(Arc::new(FixedStrategy::new(self.default_content_types)));
        }
        ContentNegotiationManager::new(strategies).with_resolver(mappings)
    }
}
