use crate::dispatcher::HandlerRequest;

/// Derives a view name for a [`ModelAndView`](super::ModelAndView) that names no view.
pub trait RequestToViewNameTranslator: Send + Sync {
    /// `None` leaves the model unrendered.
    fn view_name(&self, req: &HandlerRequest) -> Option<String>;
}

/// The request path without its leading and trailing slashes and without the
/// last segment's file extension, wrapped in an optional prefix and suffix.
///
/// `/orders/list.json` becomes `orders/list`; `/` yields no view name.
#[derive(Debug, Clone, Default)]
pub struct DefaultViewNameTranslator {
    prefix: String,
    suffix: String,
    separator: Option<String>,
}

impl DefaultViewNameTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    /// Replace `/` between path segments, e.g. with `.` for `orders.list`.
    #[must_use]
    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = Some(separator.to_string());
        self
    }

    fn strip_extension(path: &str) -> &str {
        let segment_start = path.rfind('/').map_or(0, |idx| idx + 1);
        match path[segment_start..].rfind('.') {
            Some(dot) if dot > 0 => &path[..segment_start + dot],
            _ => path,
        }
    }
}

impl RequestToViewNameTranslator for DefaultViewNameTranslator {
    fn view_name(&self, req: &HandlerRequest) -> Option<String> {
        let path = Self::strip_extension(req.path.trim_matches('/'));
        if path.is_empty() {
            return None;
        }
        let path = match &self.separator {
            Some(separator) => path.replace('/', separator),
            None => path.to_string(),
        };
        Some(format!("{}{path}{}", self.prefix, self.suffix))
    }
}
