//! Service container.
//!
//! The container resolves a service name to a singleton instance and caches
//! it for its own lifetime. On a cache miss the sources are tried in order:
//!
//! 1. a built-in factory registered on the builder;
//! 2. a loader class, from the per-deployment overrides first and then from
//!    configuration;
//! 3. a configured implementation class, built positionally when a
//!    dependency list is declared and through the injectable factory
//!    otherwise.
//!
//! A name none of these can produce resolves to `None` and is not cached.

mod builder;
mod resolution;

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::ReentrantMutex;
use tracing::{debug, trace, warn};

use crate::config::ServiceConfig;
use crate::factory::InjectableFactory;
use crate::registry::ClassRegistry;
use crate::service::{Dependencies, Service, downcast};
use crate::{Error, Result};

pub use builder::ContainerBuilder;
use resolution::{ResolutionFrame, State};

/// Reserved name of the current user.
pub const USER_SERVICE: &str = "user";

/// Reserved name of the injectable factory built-in.
pub const INJECTABLE_FACTORY_SERVICE: &str = "injectableFactory";

pub(crate) type BuiltinFn = Arc<dyn Fn(&Container) -> Result<Service> + Send + Sync>;

pub(crate) struct Inner {
    state: ReentrantMutex<RefCell<State>>,
    builtins: HashMap<String, BuiltinFn>,
    loader_overrides: HashMap<String, String>,
    classes: Arc<ClassRegistry>,
    configuration: OnceLock<Arc<dyn ServiceConfig>>,
}

/// Where a service name would be resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Already resolved or set directly.
    Cached,
    /// A built-in factory is registered.
    Builtin,
    /// A loader class is declared.
    Loader { class: String, registered: bool },
    /// An implementation class is declared.
    Class { class: String, registered: bool },
    /// Nothing can produce this name.
    Unknown,
}

impl Availability {
    /// Same answer as [`Container::has`].
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// A declared class that the registry does not know.
    pub fn is_misconfigured(&self) -> bool {
        matches!(
            self,
            Self::Loader {
                registered: false,
                ..
            } | Self::Class {
                registered: false,
                ..
            }
        )
    }
}

/// Container statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStats {
    /// Number of cached services.
    pub cached: usize,
    /// Number of built-in factories.
    pub builtins: usize,
    /// Resolutions that produced an instance.
    pub resolutions: u64,
    /// Resolutions that produced nothing.
    pub misses: u64,
}

/// Lazily resolving, name-keyed service container.
///
/// Cloning the handle shares the same cache. Resolution is serialized by a
/// re-entrant lock: factories may call [`get`](Self::get) recursively on the
/// same thread, while other threads wait until the outermost resolution
/// finishes.
///
/// Cached services must not hold a `Container` clone: the cache would then
/// own its own container and neither is ever dropped. Services that need the
/// container after construction keep a [`WeakContainer`] instead.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Start building a container over `classes`.
    pub fn builder(classes: ClassRegistry) -> ContainerBuilder {
        ContainerBuilder::new(classes)
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// A handle that does not keep the container alive.
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn classes(&self) -> &Arc<ClassRegistry> {
        &self.inner.classes
    }

    /// Get a service, resolving it on first use.
    ///
    /// Returns `Ok(None)` when nothing can produce `name`; such names are
    /// retried on the next call.
    pub fn get(&self, name: &str) -> Result<Option<Service>> {
        let guard = self.inner.state.lock();

        if let Some(service) = guard.borrow().services.get(name).cloned() {
            trace!(service = name, "Cache hit");
            return Ok(Some(service));
        }

        let resolved = {
            let _frame = ResolutionFrame::enter(&guard, name)?;
            self.resolve(name)?
        };

        let Some(service) = resolved else {
            guard.borrow_mut().misses += 1;
            return Ok(None);
        };

        // A factory may have set this name while resolving it. The value it
        // replaces is dropped only after the borrow ends.
        let previous = {
            let mut state = guard.borrow_mut();
            state.resolutions += 1;
            state.services.insert(name.to_string(), service.clone())
        };
        if previous.is_some() {
            debug!(service = name, "Replaced cached service");
        }
        drop(previous);
        Ok(Some(service))
    }

    /// Typed [`get`](Self::get).
    pub fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>> {
        self.get(name)?
            .map(|service| downcast(name, service))
            .transpose()
    }

    /// Like [`get_as`](Self::get_as), but absence is an error.
    pub fn require<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.get_as(name)?
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))
    }

    /// Whether `name` is cached or could be resolved. Never constructs.
    ///
    /// A declared class is enough; whether it is registered is not checked.
    pub fn has(&self, name: &str) -> bool {
        self.probe(name).is_available()
    }

    /// Describe where `name` would come from. Never constructs.
    pub fn probe(&self, name: &str) -> Availability {
        if self.is_cached(name) {
            return Availability::Cached;
        }
        if self.inner.builtins.contains_key(name) {
            return Availability::Builtin;
        }
        if let Some(class) = self.loader_class(name) {
            let registered = self.inner.classes.contains(&class);
            return Availability::Loader { class, registered };
        }
        if let Some(class) = self.implementation_class(name) {
            let registered = self.inner.classes.contains(&class);
            return Availability::Class { class, registered };
        }
        Availability::Unknown
    }

    /// Whether `name` is already in the cache.
    pub fn is_cached(&self, name: &str) -> bool {
        self.inner.state.lock().borrow().services.contains_key(name)
    }

    /// Put the current user into the cache, bypassing resolution.
    pub fn set_user<U: Send + Sync + 'static>(&self, user: Arc<U>) {
        self.set(USER_SERVICE, user);
    }

    /// The current user, if one was set or can be resolved.
    pub fn user<U: Send + Sync + 'static>(&self) -> Result<Option<Arc<U>>> {
        self.get_as(USER_SERVICE)
    }

    /// Insert directly into the cache.
    pub(crate) fn set(&self, name: &str, service: Service) {
        let guard = self.inner.state.lock();
        let previous = guard
            .borrow_mut()
            .services
            .insert(name.to_string(), service);
        if previous.is_some() {
            debug!(service = name, "Replaced cached service");
        }
        // The old service may touch the container when dropped.
        drop(previous);
    }

    /// The injectable factory built-in.
    pub fn injectable_factory(&self) -> Result<Arc<InjectableFactory>> {
        self.require(INJECTABLE_FACTORY_SERVICE)
    }

    /// The configuration the container consults.
    ///
    /// `None` only while the container is still bootstrapping.
    pub fn configuration(&self) -> Option<Arc<dyn ServiceConfig>> {
        self.inner.configuration.get().cloned()
    }

    /// Names currently cached, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        let guard = self.inner.state.lock();
        let mut names: Vec<String> = guard.borrow().services.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> ContainerStats {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        ContainerStats {
            cached: state.services.len(),
            builtins: self.inner.builtins.len(),
            resolutions: state.resolutions,
            misses: state.misses,
        }
    }

    fn loader_class(&self, name: &str) -> Option<String> {
        self.inner
            .loader_overrides
            .get(name)
            .cloned()
            .or_else(|| self.inner.configuration.get()?.loader_class(name))
    }

    fn implementation_class(&self, name: &str) -> Option<String> {
        self.inner.configuration.get()?.implementation_class(name)
    }

    fn resolve(&self, name: &str) -> Result<Option<Service>> {
        if let Some(builtin) = self.inner.builtins.get(name) {
            debug!(service = name, "Resolving through built-in factory");
            return builtin(self).map(Some);
        }

        if let Some(class) = self.loader_class(name) {
            return self.resolve_with_loader(name, &class);
        }

        if let Some(class) = self.implementation_class(name) {
            return self.resolve_with_class(name, &class);
        }

        debug!(service = name, "No factory for service");
        Ok(None)
    }

    fn resolve_with_loader(&self, name: &str, class: &str) -> Result<Option<Service>> {
        let factory = self.injectable_factory()?;
        let Some(loader) = factory.create_loader(class)? else {
            warn!(service = name, class, "Loader class is not registered");
            return Ok(None);
        };

        debug!(service = name, class, "Resolving through loader");
        loader.load_service().map(Some)
    }

    fn resolve_with_class(&self, name: &str, class: &str) -> Result<Option<Service>> {
        let declared = self
            .inner
            .configuration
            .get()
            .and_then(|config| config.dependencies(name));

        let Some(dependency_names) = declared else {
            debug!(service = name, class, "Resolving through injectable factory");
            let service = self.injectable_factory()?.create(class)?;
            if service.is_none() {
                warn!(service = name, class, "Implementation class is not registered");
            }
            return Ok(service);
        };

        let Some(descriptor) = self.inner.classes.get(class) else {
            warn!(service = name, class, "Implementation class is not registered");
            return Ok(None);
        };

        debug!(
            service = name,
            class,
            dependencies = ?dependency_names,
            "Resolving with declared dependencies"
        );
        let mut entries = Vec::with_capacity(dependency_names.len());
        for dependency in dependency_names {
            let resolved = self.get(&dependency)?;
            entries.push((dependency, resolved));
        }
        descriptor.construct(Dependencies::new(name, entries)).map(Some)
    }
}

/// Non-owning handle to a [`Container`], from [`Container::downgrade`].
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    /// The container, unless it has been dropped.
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(Container::from_inner)
    }
}

impl std::fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("cached", &self.cached_names())
            .field("builtins", &self.inner.builtins.len())
            .field("classes", &self.inner.classes.len())
            .finish()
    }
}
