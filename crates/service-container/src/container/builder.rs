//! Container construction and bootstrap.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::ReentrantMutex;
use tracing::{debug, info};

use super::{BuiltinFn, Container, INJECTABLE_FACTORY_SERVICE, Inner};
use crate::config::{DEFAULT_CONFIGURATION_CLASS, ServiceConfig};
use crate::factory::InjectableFactory;
use crate::registry::{ClassDescriptor, ClassRegistry};
use crate::service::Service;
use crate::{Error, Result};

/// Builder for [`Container`].
///
/// The loader overrides, built-ins and class registry are fixed once
/// [`build`](Self::build) returns.
pub struct ContainerBuilder {
    classes: ClassRegistry,
    configuration_class: String,
    loader_overrides: HashMap<String, String>,
    builtins: HashMap<String, BuiltinFn>,
    instances: Vec<(String, Service)>,
}

impl ContainerBuilder {
    pub fn new(classes: ClassRegistry) -> Self {
        Self {
            classes,
            configuration_class: DEFAULT_CONFIGURATION_CLASS.to_string(),
            loader_overrides: HashMap::new(),
            builtins: HashMap::new(),
            instances: Vec::new(),
        }
    }

    /// Bootstrap the configuration from this registered class.
    pub fn configuration_class(mut self, class: impl Into<String>) -> Self {
        self.configuration_class = class.into();
        self
    }

    /// Use an already-built configuration.
    ///
    /// The configuration is registered under the default configuration
    /// class name and bootstrapped from there.
    pub fn configuration(mut self, config: impl ServiceConfig + 'static) -> Self {
        self.classes.register(ClassDescriptor::configuration_instance(
            DEFAULT_CONFIGURATION_CLASS,
            Arc::new(config),
        ));
        self.configuration_class = DEFAULT_CONFIGURATION_CLASS.to_string();
        self
    }

    /// Override the loader class for `service`, ahead of configuration.
    pub fn loader_override(mut self, service: impl Into<String>, class: impl Into<String>) -> Self {
        self.loader_overrides.insert(service.into(), class.into());
        self
    }

    pub fn loader_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.loader_overrides.extend(
            overrides
                .into_iter()
                .map(|(service, class)| (service.into(), class.into())),
        );
        self
    }

    /// Register a built-in factory for `name`.
    ///
    /// The value is cached, so it must not capture a `Container` clone. Keep
    /// a [`Container::downgrade`] handle instead.
    pub fn builtin<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.builtins.insert(
            name.into(),
            Arc::new(move |container: &Container| {
                factory(container).map(|value| Arc::new(value) as Service)
            }),
        );
        self
    }

    /// Register a built-in factory that returns a shared instance as is.
    pub fn builtin_shared<T, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.builtins.insert(
            name.into(),
            Arc::new(move |container: &Container| {
                factory(container).map(|value| value as Service)
            }),
        );
        self
    }

    /// Seed the cache with a pre-built instance.
    pub fn instance<T: Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        value: Arc<T>,
    ) -> Self {
        self.instances.push((name.into(), value as Service));
        self
    }

    /// Build the container and run bootstrap.
    ///
    /// The injectable factory is resolved first, then the configuration is
    /// built from the configuration class. Seeded instances are inserted
    /// last.
    pub fn build(self) -> Result<Container> {
        let Self {
            classes,
            configuration_class,
            loader_overrides,
            mut builtins,
            instances,
        } = self;

        if builtins.contains_key(INJECTABLE_FACTORY_SERVICE) {
            return Err(Error::Bootstrap(format!(
                "{INJECTABLE_FACTORY_SERVICE} is a reserved service name"
            )));
        }
        let injectable_factory: BuiltinFn = Arc::new(|container: &Container| {
            Ok(Arc::new(InjectableFactory::new(container)) as Service)
        });
        builtins.insert(INJECTABLE_FACTORY_SERVICE.to_string(), injectable_factory);

        let container = Container::from_inner(Arc::new(Inner {
            state: ReentrantMutex::new(RefCell::new(Default::default())),
            builtins,
            loader_overrides,
            classes: Arc::new(classes),
            configuration: OnceLock::new(),
        }));

        let factory = container.injectable_factory()?;
        let configuration = factory
            .create_configuration(&configuration_class)
            .map_err(|e| {
                Error::Bootstrap(format!(
                    "failed to build configuration class {configuration_class}: {e}"
                ))
            })?
            .ok_or_else(|| {
                Error::Bootstrap(format!(
                    "configuration class {configuration_class} is not registered"
                ))
            })?;
        container
            .inner
            .configuration
            .set(configuration)
            .map_err(|_| Error::Bootstrap("configuration initialized twice".to_string()))?;
        debug!(class = %configuration_class, "Container configuration loaded");

        for (name, service) in instances {
            container.set(&name, service);
        }

        info!(
            builtins = container.inner.builtins.len(),
            classes = container.inner.classes.len(),
            overrides = container.inner.loader_overrides.len(),
            "Service container initialized"
        );
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new(ClassRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerConfiguration;

    struct Metadata;

    #[test]
    fn test_missing_configuration_class() {
        let err = ContainerBuilder::default().build().unwrap_err();
        assert!(matches!(err, Error::Bootstrap(ref msg) if msg.contains("not registered")));
    }

    #[test]
    fn test_configuration_class_without_configuration_constructor() {
        let classes = ClassRegistry::new()
            .with(ClassDescriptor::new("Metadata").with_injector(|_| Ok(Metadata)));
        let err = ContainerBuilder::new(classes)
            .configuration_class("Metadata")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Bootstrap(_)));
    }

    #[test]
    fn test_reserved_builtin_name() {
        let err = ContainerBuilder::default()
            .configuration(ContainerConfiguration::new())
            .builtin(INJECTABLE_FACTORY_SERVICE, |_| Ok(Metadata))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Bootstrap(_)));
    }

    #[test]
    fn test_configuration_class_from_registry() {
        let classes = ClassRegistry::new().with(ClassDescriptor::configuration(
            "FileConfiguration",
            |_| ContainerConfiguration::from_json_str(r#"{"services":{"acl":{"className":"Acl"}}}"#),
        ));
        let container = ContainerBuilder::new(classes)
            .configuration_class("FileConfiguration")
            .build()
            .unwrap();

        let configuration = container.configuration().unwrap();
        assert_eq!(configuration.implementation_class("acl").as_deref(), Some("Acl"));
        // The configuration is not part of the service cache.
        assert_eq!(container.cached_names(), vec![INJECTABLE_FACTORY_SERVICE]);
    }

    #[test]
    fn test_seeded_instance_is_cached() {
        let metadata = Arc::new(Metadata);
        let container = ContainerBuilder::default()
            .configuration(ContainerConfiguration::new())
            .instance("metadata", metadata.clone())
            .build()
            .unwrap();

        let resolved = container.require::<Metadata>("metadata").unwrap();
        assert!(Arc::ptr_eq(&resolved, &metadata));
    }
}
