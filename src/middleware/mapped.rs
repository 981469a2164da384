use std::sync::Arc;

use super::{Interceptor, InterceptorHandle};
use crate::router::{PathPattern, PatternError};

/// An interceptor scoped to paths by include and exclude patterns.
///
/// With no include patterns every path is included; an exclude match always wins.
#[derive(Clone, Debug)]
pub struct MappedInterceptor {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
    interceptor: InterceptorHandle,
}

impl MappedInterceptor {
    pub fn new(
        include: &[&str],
        exclude: &[&str],
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            interceptor: InterceptorHandle::new(interceptor),
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(path))
    }

    #[must_use]
    pub fn interceptor(&self) -> &InterceptorHandle {
        &self.interceptor
    }

    #[must_use]
    pub fn include_patterns(&self) -> &[PathPattern] {
        &self.include
    }

    #[must_use]
    pub fn exclude_patterns(&self) -> &[PathPattern] {
        &self.exclude
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<PathPattern>, PatternError> {
    patterns.iter().map(|p| PathPattern::parse(p)).collect()
}

/// One registry entry.
#[derive(Clone, Debug)]
pub enum RegisteredInterceptor {
    Global(InterceptorHandle),
    Mapped(MappedInterceptor),
}

impl RegisteredInterceptor {
    #[must_use]
    pub fn global(interceptor: Arc<dyn Interceptor>) -> Self {
        RegisteredInterceptor::Global(InterceptorHandle::new(interceptor))
    }

    #[must_use]
    pub fn handle(&self) -> &InterceptorHandle {
        match self {
            RegisteredInterceptor::Global(handle) => handle,
            RegisteredInterceptor::Mapped(mapped) => mapped.interceptor(),
        }
    }

    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        match self {
            RegisteredInterceptor::Global(_) => true,
            RegisteredInterceptor::Mapped(mapped) => mapped.matches(path),
        }
    }
}

/// Immutable, ordered snapshot of global and mapped interceptors.
///
/// The handler mapping holds the current snapshot behind an `ArcSwap`;
/// late registration builds a new snapshot instead of mutating this one.
#[derive(Clone, Debug, Default)]
pub struct InterceptorRegistry {
    entries: Vec<RegisteredInterceptor>,
}

impl InterceptorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_global(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.entries.push(RegisteredInterceptor::global(interceptor));
        self
    }

    #[must_use]
    pub fn with_mapped(mut self, mapped: MappedInterceptor) -> Self {
        self.entries.push(RegisteredInterceptor::Mapped(mapped));
        self
    }

    pub fn push(&mut self, entry: RegisteredInterceptor) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[RegisteredInterceptor] {
        &self.entries
    }

    /// Interceptors applying to `path`, in registration order.
    pub fn matching<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a InterceptorHandle> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.applies_to(path))
            .map(RegisteredInterceptor::handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
