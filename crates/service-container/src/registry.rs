//! Class registry.
//!
//! Services are declared by class name in configuration. The registry is
//! what turns those names into constructors: each [`ClassDescriptor`]
//! carries up to four ways of producing an instance.
//!
//! - an injector, which receives the container and wires itself
//!   ([`Injectable`]);
//! - a positional constructor, which receives an explicit [`Dependencies`]
//!   list declared in configuration;
//! - a loader constructor, producing a [`Loader`] whose `load()` yields the
//!   service;
//! - a configuration constructor, producing the container's own
//!   [`ServiceConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ServiceConfig;
use crate::service::{Dependencies, Service};
use crate::{Container, Error, Result};

type InjectFn = Arc<dyn Fn(&Container) -> Result<Service> + Send + Sync>;
type ConstructFn = Arc<dyn Fn(Dependencies) -> Result<Service> + Send + Sync>;
type LoaderFn = Arc<dyn Fn(&Container) -> Result<Box<dyn ServiceLoader>> + Send + Sync>;
type ConfigurationFn = Arc<dyn Fn(&Container) -> Result<Arc<dyn ServiceConfig>> + Send + Sync>;

/// A type that builds itself from the container.
///
/// Resolve what is needed inside `inject` and keep the results. A type that
/// must reach the container later keeps [`Container::downgrade`] rather
/// than a clone, which would keep the container alive through its own
/// cache.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(container: &Container) -> Result<Self>;
}

/// A loader class: its `load()` produces the actual service.
pub trait Loader: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn load(&self) -> Result<Self::Output>;
}

/// Object-safe form of [`Loader`].
pub trait ServiceLoader: Send + Sync {
    fn load_service(&self) -> Result<Service>;
}

impl<L: Loader> ServiceLoader for L {
    fn load_service(&self) -> Result<Service> {
        Ok(Arc::new(self.load()?))
    }
}

/// Constructors registered under one class name.
#[derive(Clone)]
pub struct ClassDescriptor {
    name: String,
    injector: Option<InjectFn>,
    constructor: Option<ConstructFn>,
    loader: Option<LoaderFn>,
    configuration: Option<ConfigurationFn>,
}

impl ClassDescriptor {
    /// An empty descriptor. Add constructors with the `with_*` methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            injector: None,
            constructor: None,
            loader: None,
            configuration: None,
        }
    }

    /// A class whose injector is [`Injectable::inject`].
    pub fn injectable<T: Injectable>(name: impl Into<String>) -> Self {
        Self::new(name).with_injector(T::inject)
    }

    /// A loader class.
    pub fn loader<L, F>(name: impl Into<String>, factory: F) -> Self
    where
        L: Loader,
        F: Fn(&Container) -> Result<L> + Send + Sync + 'static,
    {
        let mut descriptor = Self::new(name);
        descriptor.loader = Some(Arc::new(move |container: &Container| {
            factory(container).map(|loader| Box::new(loader) as Box<dyn ServiceLoader>)
        }));
        descriptor
    }

    /// A configuration class.
    pub fn configuration<C, F>(name: impl Into<String>, factory: F) -> Self
    where
        C: ServiceConfig + 'static,
        F: Fn(&Container) -> Result<C> + Send + Sync + 'static,
    {
        let mut descriptor = Self::new(name);
        descriptor.configuration = Some(Arc::new(move |container: &Container| {
            factory(container).map(|config| Arc::new(config) as Arc<dyn ServiceConfig>)
        }));
        descriptor
    }

    /// A configuration class that hands out an already-built configuration.
    pub(crate) fn configuration_instance(
        name: impl Into<String>,
        config: Arc<dyn ServiceConfig>,
    ) -> Self {
        let mut descriptor = Self::new(name);
        descriptor.configuration = Some(Arc::new(move |_: &Container| Ok(config.clone())));
        descriptor
    }

    pub fn with_injector<T, F>(mut self, injector: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.injector = Some(Arc::new(move |container: &Container| {
            injector(container).map(|value| Arc::new(value) as Service)
        }));
        self
    }

    pub fn with_constructor<T, F>(mut self, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(move |dependencies: Dependencies| {
            constructor(dependencies).map(|value| Arc::new(value) as Service)
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_injector(&self) -> bool {
        self.injector.is_some()
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn is_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn is_configuration(&self) -> bool {
        self.configuration.is_some()
    }

    pub(crate) fn inject(&self, container: &Container) -> Result<Service> {
        let injector = self
            .injector
            .as_ref()
            .ok_or_else(|| self.unavailable("injector"))?;
        injector(container)
    }

    pub(crate) fn construct(&self, dependencies: Dependencies) -> Result<Service> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| self.unavailable("positional"))?;
        constructor(dependencies)
    }

    pub(crate) fn instantiate_loader(
        &self,
        container: &Container,
    ) -> Result<Box<dyn ServiceLoader>> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| self.unavailable("loader"))?;
        loader(container)
    }

    pub(crate) fn instantiate_configuration(
        &self,
        container: &Container,
    ) -> Result<Arc<dyn ServiceConfig>> {
        let configuration = self
            .configuration
            .as_ref()
            .ok_or_else(|| self.unavailable("configuration"))?;
        configuration(container)
    }

    fn unavailable(&self, constructor: &'static str) -> Error {
        Error::ConstructorUnavailable {
            class: self.name.clone(),
            constructor,
        }
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("injector", &self.has_injector())
            .field("constructor", &self.has_constructor())
            .field("loader", &self.is_loader())
            .field("configuration", &self.is_configuration())
            .finish()
    }
}

/// Class name to descriptor mapping, fixed once the container is built.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDescriptor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any previous descriptor with the same name.
    pub fn register(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        let name = descriptor.name.clone();
        if self.classes.insert(name.clone(), descriptor).is_some() {
            debug!(class = %name, "Replaced class descriptor");
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: ClassDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, class: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    struct ClockLoader;

    impl Loader for ClockLoader {
        type Output = Clock;

        fn load(&self) -> Result<Clock> {
            Ok(Clock)
        }
    }

    #[test]
    fn test_descriptor_capabilities() {
        let descriptor = ClassDescriptor::new("Clock")
            .with_injector(|_| Ok(Clock))
            .with_constructor(|_| Ok(Clock));
        assert!(descriptor.has_injector());
        assert!(descriptor.has_constructor());
        assert!(!descriptor.is_loader());
        assert!(!descriptor.is_configuration());

        let loader = ClassDescriptor::loader("ClockLoader", |_| Ok(ClockLoader));
        assert!(loader.is_loader());
        assert!(!loader.has_injector());
    }

    #[test]
    fn test_missing_constructor_is_reported() {
        let descriptor = ClassDescriptor::new("Clock").with_injector(|_| Ok(Clock));
        let err = descriptor
            .construct(Dependencies::new("clock", Vec::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstructorUnavailable {
                ref class,
                constructor: "positional",
            } if class == "Clock"
        ));
    }

    #[test]
    fn test_positional_constructor_runs() {
        let descriptor = ClassDescriptor::new("Clock").with_constructor(|deps: Dependencies| {
            assert!(deps.is_empty());
            Ok(Clock)
        });
        let service = descriptor
            .construct(Dependencies::new("clock", Vec::new()))
            .unwrap();
        assert!(service.downcast::<Clock>().is_ok());
    }

    #[test]
    fn test_loader_erases_output() {
        let loader: Box<dyn ServiceLoader> = Box::new(ClockLoader);
        let service = loader.load_service().unwrap();
        assert!(service.downcast::<Clock>().is_ok());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassDescriptor::new("Clock").with_injector(|_| Ok(Clock)));
        registry.register(ClassDescriptor::new("Clock").with_constructor(|_| Ok(Clock)));

        assert_eq!(registry.len(), 1);
        let descriptor = registry.get("Clock").unwrap();
        assert!(descriptor.has_constructor());
        assert!(!descriptor.has_injector());
    }
}
