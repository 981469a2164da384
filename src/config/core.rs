use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::handler::{HandlerRef, HandlerRegistry};
use crate::mapping::{HandlerMapping, UrlHandlerLookup};
use crate::middleware::{
    CorsConfig, CorsConfigError, Interceptor, InterceptorRegistry, MappedInterceptor,
    UrlBasedCorsConfigSource,
};
use crate::negotiation::{ContentNegotiationManager, MediaType, DEFAULT_PARAMETER_NAME};
use crate::router::{Route, Router};
use crate::view::{ContentNegotiatingViewResolver, View, ViewResolver};

/// Environment variable naming the default configuration file.
pub const CONFIG_ENV_VAR: &str = "BRRTD_CONFIG";

/// Root of a dispatch configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DispatchConfig {
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    /// Handler used when no route matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_handler: Option<String>,
    /// Interceptors in registration order
    #[serde(default)]
    pub interceptors: Vec<InterceptorConfig>,
    /// Global CORS policy by path; the first matching pattern wins
    #[serde(default)]
    pub cors: Vec<CorsMappingConfig>,
    #[serde(default)]
    pub negotiation: NegotiationConfig,
}

/// One route: a path pattern bound to a named handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    pub pattern: String,
    /// Accepted methods; empty accepts every method
    #[serde(default)]
    pub methods: Vec<String>,
    /// Name resolved through the handler registry
    pub handler: String,
    #[serde(default)]
    pub produces: Vec<String>,
}

/// An interceptor by name, optionally scoped to paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterceptorConfig {
    pub name: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl InterceptorConfig {
    /// No include or exclude patterns: applies to every request.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// A CORS policy for requests whose path matches `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CorsMappingConfig {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origin_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

impl CorsMappingConfig {
    /// Validate and convert into a [`CorsConfig`].
    pub fn to_cors_config(&self) -> Result<CorsConfig, CorsConfigError> {
        let mut builder = CorsConfig::builder();
        if let Some(origins) = &self.allowed_origins {
            builder = builder.allowed_origins(&as_strs(origins));
        }
        if let Some(patterns) = &self.allowed_origin_patterns {
            builder = builder.allowed_origin_patterns(&as_strs(patterns));
        }
        if let Some(methods) = &self.allowed_methods {
            builder = builder.allowed_method_names(&as_strs(methods));
        }
        if let Some(headers) = &self.allowed_headers {
            builder = builder.allowed_headers(&as_strs(headers));
        }
        if let Some(headers) = &self.exposed_headers {
            builder = builder.expose_headers(&as_strs(headers));
        }
        if let Some(allow) = self.allow_credentials {
            builder = builder.allow_credentials(allow);
        }
        if let Some(max_age) = self.max_age {
            builder = builder.max_age(max_age);
        }
        builder.build()
    }
}

/// Content negotiation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiationConfig {
    /// Consult the query parameter before the `Accept` header
    #[serde(default)]
    pub favor_parameter: bool,
    #[serde(default = "default_parameter_name")]
    pub parameter_name: String,
    #[serde(default)]
    pub ignore_accept_header: bool,
    /// Used when neither the parameter nor the header decide
    #[serde(default)]
    pub default_content_types: Vec<String>,
    /// File extension → media type
    #[serde(default)]
    pub media_types: BTreeMap<String, String>,
    /// Answer `406` instead of falling through when no view is acceptable
    #[serde(default)]
    pub use_not_acceptable: bool,
}

fn default_parameter_name() -> String {
    DEFAULT_PARAMETER_NAME.to_string()
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            favor_parameter: false,
            parameter_name: default_parameter_name(),
            ignore_accept_header: false,
            default_content_types: Vec::new(),
            media_types: BTreeMap::new(),
            use_not_acceptable: false,
        }
    }
}

impl NegotiationConfig {
    pub fn build_manager(&self) -> anyhow::Result<ContentNegotiationManager> {
        let mut builder = ContentNegotiationManager::builder()
            .favor_parameter(self.favor_parameter)
            .parameter_name(&self.parameter_name)
            .ignore_accept_header(self.ignore_accept_header)
            .default_content_types(parse_media_types(&self.default_content_types)?);
        for (extension, media_type) in &self.media_types {
            let parsed = MediaType::parse(media_type)
                .with_context(|| format!("Invalid media type for extension '{extension}': {media_type}"))?;
            builder = builder.media_type(extension, parsed);
        }
        Ok(builder.build())
    }

    /// Negotiating resolver over `resolvers` and `default_views`, answering
    /// `406` for unresolvable names when `use_not_acceptable` is set.
    pub fn build_view_resolver(
        &self,
        resolvers: Vec<Arc<dyn ViewResolver>>,
        default_views: Vec<Arc<dyn View>>,
    ) -> anyhow::Result<ContentNegotiatingViewResolver> {
        let manager = self.build_manager()?;
        Ok(ContentNegotiatingViewResolver::new(Arc::new(manager), resolvers)
            .with_default_views(default_views)
            .with_use_not_acceptable(self.use_not_acceptable))
    }
}

impl DispatchConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dispatch config: {}", path.display()))?;
        let config = Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse dispatch config: {}", path.display()))?;
        info!(
            path = %path.display(),
            routes = config.routes.len(),
            interceptors = config.interceptors.len(),
            cors_mappings = config.cors.len(),
            "Dispatch config loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        let config: DispatchConfig = serde_yaml::from_str(contents).context("Invalid dispatch config YAML")?;
        Ok(config)
    }

    /// Route table with every handler as a [`HandlerRef::Named`] reference.
    pub fn build_router(&self) -> anyhow::Result<Router> {
        let mut routes = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            let methods = route
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                        .with_context(|| format!("Invalid method '{m}' for route {}", route.pattern))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let produces = parse_media_types(&route.produces)
                .with_context(|| format!("Invalid produces for route {}", route.pattern))?;
            let built = Route::new(&route.pattern, HandlerRef::Named(route.handler.clone()))
                .with_context(|| format!("Invalid route pattern '{}'", route.pattern))?
                .with_methods(methods)
                .with_produces(produces);
            routes.push(built);
        }
        Ok(Router::new(routes))
    }

    /// Global CORS source, or `None` when no mapping is configured.
    pub fn build_cors_source(&self) -> anyhow::Result<Option<UrlBasedCorsConfigSource>> {
        if self.cors.is_empty() {
            return Ok(None);
        }
        let mut source = UrlBasedCorsConfigSource::new();
        for mapping in &self.cors {
            let config = mapping
                .to_cors_config()
                .with_context(|| format!("Invalid CORS configuration for '{}'", mapping.pattern))?;
            source
                .register(&mapping.pattern, config)
                .with_context(|| format!("Invalid CORS pattern '{}'", mapping.pattern))?;
        }
        Ok(Some(source))
    }

    /// Interceptor registry in configuration order, taking instances from `available` by name.
    pub fn build_interceptors(
        &self,
        available: &HashMap<String, Arc<dyn Interceptor>>,
    ) -> anyhow::Result<InterceptorRegistry> {
        let mut registry = InterceptorRegistry::new();
        for entry in &self.interceptors {
            let interceptor = available
                .get(&entry.name)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown interceptor '{}'", entry.name))?;
            if entry.is_global() {
                registry = registry.with_global(interceptor);
            } else {
                let mapped = MappedInterceptor::new(&as_strs(&entry.include), &as_strs(&entry.exclude), interceptor)
                    .with_context(|| format!("Invalid patterns for interceptor '{}'", entry.name))?;
                registry = registry.with_mapped(mapped);
            }
            debug!(interceptor = %entry.name, global = entry.is_global(), "Interceptor configured");
        }
        Ok(registry)
    }

    /// Assemble a URL-based handler mapping.
    ///
    /// Fails when a configured handler or the default handler is missing from
    /// `registry`, so a typo surfaces at startup instead of as a per-request error.
    pub fn build_mapping(
        &self,
        registry: Arc<dyn HandlerRegistry>,
        interceptors: &HashMap<String, Arc<dyn Interceptor>>,
    ) -> anyhow::Result<HandlerMapping> {
        let handlers = self
            .routes
            .iter()
            .map(|r| r.handler.as_str())
            .chain(self.default_handler.as_deref());
        for name in handlers {
            if registry.get_handler(name).is_none() {
                return Err(anyhow!("Handler '{name}' is not registered"));
            }
        }

        let router = self.build_router()?;
        let mut builder = HandlerMapping::builder(Arc::new(UrlHandlerLookup::new(router)))
            .with_registry(registry)
            .with_interceptors(self.build_interceptors(interceptors)?);
        if let Some(default_handler) = &self.default_handler {
            builder = builder.with_default_handler(HandlerRef::Named(default_handler.clone()));
        }
        if let Some(source) = self.build_cors_source()? {
            builder = builder.with_cors_source(Arc::new(source));
        }
        Ok(builder.build())
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn parse_media_types(values: &[String]) -> anyhow::Result<Vec<MediaType>> {
    values
        .iter()
        .map(|v| MediaType::parse(v).with_context(|| format!("Invalid media type '{v}'")))
        .collect()
}
