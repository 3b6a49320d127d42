//! Injectable factory: builds class instances by name.
//!
//! The factory is itself a container service (`injectableFactory`) and is
//! the first thing the container resolves during bootstrap. It keeps only a
//! weak handle to the container so that caching it does not keep the
//! container alive.

use std::sync::Arc;

use tracing::debug;

use crate::config::ServiceConfig;
use crate::container::WeakContainer;
use crate::registry::{ClassRegistry, ServiceLoader};
use crate::service::{Dependencies, Service, downcast};
use crate::{Container, Error, Result};

/// Generic object-building facility.
///
/// Every `create*` method returns `Ok(None)` when the class is not
/// registered and [`Error::ConstructorUnavailable`] when the class exists
/// but cannot be built the requested way.
pub struct InjectableFactory {
    container: WeakContainer,
    classes: Arc<ClassRegistry>,
}

impl InjectableFactory {
    pub(crate) fn new(container: &Container) -> Self {
        Self {
            container: container.downgrade(),
            classes: container.classes().clone(),
        }
    }

    /// Whether `class` is registered.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// Build an instance of `class` through its injector.
    pub fn create(&self, class: &str) -> Result<Option<Service>> {
        let Some(descriptor) = self.classes.get(class) else {
            return Ok(None);
        };
        let container = self.container()?;
        debug!(class, "Creating instance");
        descriptor.inject(&container).map(Some)
    }

    /// Typed [`create`](Self::create).
    pub fn create_as<T: Send + Sync + 'static>(&self, class: &str) -> Result<Option<Arc<T>>> {
        self.create(class)?
            .map(|service| downcast(class, service))
            .transpose()
    }

    /// Build an instance of `class` through its positional constructor.
    pub fn create_with(&self, class: &str, dependencies: Dependencies) -> Result<Option<Service>> {
        let Some(descriptor) = self.classes.get(class) else {
            return Ok(None);
        };
        debug!(class, dependencies = dependencies.len(), "Creating instance with dependencies");
        descriptor.construct(dependencies).map(Some)
    }

    /// Build a loader instance of `class`.
    pub fn create_loader(&self, class: &str) -> Result<Option<Box<dyn ServiceLoader>>> {
        let Some(descriptor) = self.classes.get(class) else {
            return Ok(None);
        };
        let container = self.container()?;
        debug!(class, "Creating loader");
        descriptor.instantiate_loader(&container).map(Some)
    }

    /// Build a configuration instance of `class`.
    pub fn create_configuration(&self, class: &str) -> Result<Option<Arc<dyn ServiceConfig>>> {
        let Some(descriptor) = self.classes.get(class) else {
            return Ok(None);
        };
        let container = self.container()?;
        debug!(class, "Creating configuration");
        descriptor.instantiate_configuration(&container).map(Some)
    }

    fn container(&self) -> Result<Container> {
        self.container
            .upgrade()
            .ok_or_else(|| Error::other("injectable factory outlived its container"))
    }
}

impl std::fmt::Debug for InjectableFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectableFactory")
            .field("classes", &self.classes.len())
            .finish()
    }
}
