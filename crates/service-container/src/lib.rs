//! # Service Container
//!
//! A lazily resolving, name-keyed service container for application
//! backends. Services are looked up by name, constructed on first use and
//! cached for the lifetime of the container.
//!
//! ## Features
//!
//! - Built-in factories registered on the [`ContainerBuilder`]
//! - Loader classes, overridable per deployment
//! - Configured implementation classes, built positionally from a declared
//!   dependency list or through the [`InjectableFactory`]
//! - Cycle detection with a descriptive [`Error::CircularDependency`]
//!
//! ## Example
//!
//! ```
//! use service_container::{
//!     ClassDescriptor, ClassRegistry, ContainerBuilder, ContainerConfiguration,
//!     ServiceDefinition,
//! };
//!
//! struct Metadata;
//! struct Acl;
//!
//! let classes = ClassRegistry::new()
//!     .with(ClassDescriptor::new("Acl").with_constructor(|deps| {
//!         deps.required::<Metadata>(0)?;
//!         Ok(Acl)
//!     }));
//! let config = ContainerConfiguration::new().with_service(
//!     "acl",
//!     ServiceDefinition::class("Acl").with_dependencies(["metadata"]),
//! );
//!
//! let container = ContainerBuilder::new(classes)
//!     .configuration(config)
//!     .builtin("metadata", |_| Ok(Metadata))
//!     .build()?;
//!
//! assert!(container.has("acl"));
//! assert!(container.get_as::<Acl>("acl")?.is_some());
//! assert!(container.get("unknown")?.is_none());
//! # Ok::<(), service_container::Error>(())
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod factory;
pub mod registry;
pub mod service;

pub use config::{ContainerConfiguration, ServiceConfig, ServiceDefinition};
pub use container::{
    Availability, Container, ContainerBuilder, ContainerStats, INJECTABLE_FACTORY_SERVICE,
    USER_SERVICE, WeakContainer,
};
pub use error::{Error, Result};
pub use factory::InjectableFactory;
pub use registry::{ClassDescriptor, ClassRegistry, Injectable, Loader, ServiceLoader};
pub use service::{Dependencies, Service};
