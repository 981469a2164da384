use super::CorsConfig;
use crate::dispatcher::HandlerRequest;
use crate::router::{PathPattern, PatternError};

/// Supplies the global CORS configuration for a request.
pub trait CorsConfigSource: Send + Sync {
    fn cors_config(&self, req: &HandlerRequest) -> Option<CorsConfig>;
}

/// Path-pattern keyed CORS configurations; the first registered pattern that
/// matches the request path wins.
#[derive(Debug, Clone, Default)]
pub struct UrlBasedCorsConfigSource {
    mappings: Vec<(PathPattern, CorsConfig)>,
}

impl UrlBasedCorsConfigSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: &str, config: CorsConfig) -> Result<(), PatternError> {
        self.mappings.push((PathPattern::parse(pattern)?, config));
        Ok(())
    }

    pub fn with(mut self, pattern: &str, config: CorsConfig) -> Result<Self, PatternError> {
        self.register(pattern, config)?;
        Ok(self)
    }

    #[must_use]
    pub fn mappings(&self) -> &[(PathPattern, CorsConfig)] {
        &self.mappings
    }
}

impl CorsConfigSource for UrlBasedCorsConfigSource {
    fn cors_config(&self, req: &HandlerRequest) -> Option<CorsConfig> {
        self.mappings
            .iter()
            .find(|(pattern, _)| pattern.matches(&req.path))
            .map(|(_, config)| config.clone())
    }
}
