use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use super::{RedirectView, View, ViewResolver};
use crate::dispatcher::HandlerRequest;
use crate::error::DispatchError;
use crate::order::LOWEST_PRECEDENCE;

/// Prefix marking a view name as a redirect target.
pub const REDIRECT_URL_PREFIX: &str = "redirect:";

/// Entries a [`CachingViewResolver`] keeps before evicting the oldest.
pub const DEFAULT_CACHE_LIMIT: usize = 1024;

/// Resolves names against a fixed table of views.
#[derive(Clone, Default)]
pub struct NamedViewResolver {
    views: HashMap<String, Arc<dyn View>>,
    order: Option<i32>,
}

impl NamedViewResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, view: Arc<dyn View>) -> Self {
        self.views.insert(name.to_string(), view);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

impl ViewResolver for NamedViewResolver {
    fn resolve_view_name(
        &self,
        view_name: &str,
        _locale: &str,
        _req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        Ok(self.views.get(view_name).cloned())
    }

    fn order(&self) -> i32 {
        self.order.unwrap_or(LOWEST_PRECEDENCE)
    }
}

impl fmt::Debug for NamedViewResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.views.keys().collect();
        names.sort();
        f.debug_struct("NamedViewResolver")
            .field("views", &names)
            .field("order", &self.order())
            .finish()
    }
}

type ViewFactory = dyn Fn(&str) -> Option<Arc<dyn View>> + Send + Sync;

/// Builds views from `prefix + name + suffix` through a factory.
///
/// Names starting with `redirect:` become a [`RedirectView`] to the rest of
/// the name and never reach the factory.
pub struct UrlBasedViewResolver {
    prefix: String,
    suffix: String,
    factory: Arc<ViewFactory>,
    order: i32,
}

impl UrlBasedViewResolver {
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Option<Arc<dyn View>> + Send + Sync + 'static,
    {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            factory: Arc::new(factory),
            order: LOWEST_PRECEDENCE,
        }
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

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl ViewResolver for UrlBasedViewResolver {
    fn resolve_view_name(
        &self,
        view_name: &str,
        _locale: &str,
        _req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        if let Some(target) = view_name.strip_prefix(REDIRECT_URL_PREFIX) {
            return Ok(Some(Arc::new(RedirectView::new(target))));
        }
        let url = format!("{}{}{}", self.prefix, view_name, self.suffix);
        Ok((self.factory)(&url))
    }

    fn order(&self) -> i32 {
        self.order
    }
}

impl fmt::Debug for UrlBasedViewResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlBasedViewResolver")
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Caches another resolver's answers per view name and locale.
///
/// Misses are cached too, so a name that resolves to nothing is not retried
/// until [`clear`](Self::clear). Errors are never cached. At most
/// [`DEFAULT_CACHE_LIMIT`] entries are kept unless
/// [`with_cache_limit`](Self::with_cache_limit) says otherwise; the least
/// recently used goes first.
pub struct CachingViewResolver {
    inner: Arc<dyn ViewResolver>,
    // `None` when the limit is 0 and caching is off
    cache: Option<Mutex<LruCache<CacheKey, Option<Arc<dyn View>>>>>,
}

type CacheKey = (String, String);

impl CachingViewResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn ViewResolver>) -> Self {
        Self { inner, cache: None }.with_cache_limit(DEFAULT_CACHE_LIMIT)
    }

    /// Bound the cache; `0` disables caching altogether. Existing entries are dropped.
    #[must_use]
    pub fn with_cache_limit(mut self, limit: usize) -> Self {
        self.cache = NonZeroUsize::new(limit).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Some(Ok(mut guard)) = self.cache.as_ref().map(Mutex::lock) {
            guard.clear();
        }
    }

    #[must_use]
    pub fn cached_entries(&self) -> usize {
        match self.cache.as_ref().map(Mutex::lock) {
            Some(Ok(guard)) => guard.len(),
            _ => 0,
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<Arc<dyn View>>> {
        let mut guard = self.cache.as_ref()?.lock().ok()?;
        guard.get(key).cloned()
    }

    fn store(&self, key: CacheKey, view: Option<Arc<dyn View>>) {
        let Some(Ok(mut guard)) = self.cache.as_ref().map(Mutex::lock) else {
            return;
        };
        let replaces = guard.contains(&key);
        if let Some((evicted, _)) = guard.push(key, view) {
            if !replaces {
                debug!(view_name = %evicted.0, locale = %evicted.1, "Evicted cached view");
            }
        }
    }
}

impl ViewResolver for CachingViewResolver {
    fn resolve_view_name(
        &self,
        view_name: &str,
        locale: &str,
        req: &HandlerRequest,
    ) -> Result<Option<Arc<dyn View>>, DispatchError> {
        let key = (view_name.to_string(), locale.to_string());
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }
        let view = self.inner.resolve_view_name(view_name, locale, req)?;
        debug!(view_name = %view_name, locale = %locale, resolved = view.is_some(), "Caching view resolution");
        self.store(key, view.clone());
        Ok(view)
    }

    fn order(&self) -> i32 {
        self.inner.order()
    }
}
