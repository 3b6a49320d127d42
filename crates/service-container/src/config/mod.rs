//! Container configuration.
//!
//! The container only ever reads three things from its configuration: the
//! loader class for a name, the implementation class for a name and the
//! declared dependency list for a name. [`ServiceConfig`] is that seam;
//! [`ContainerConfiguration`] is the JSON-backed implementation.

mod file;

pub use file::{ContainerConfiguration, ServiceDefinition};

/// Default class name the container bootstraps its configuration from.
pub const DEFAULT_CONFIGURATION_CLASS: &str = "ContainerConfiguration";

/// Read-only view of service declarations.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceConfig: Send + Sync {
    /// Loader class declared for `name`.
    fn loader_class(&self, name: &str) -> Option<String>;

    /// Implementation class declared for `name`.
    fn implementation_class(&self, name: &str) -> Option<String>;

    /// Dependency names declared for `name`.
    ///
    /// `None` means nothing was declared, which is distinct from
    /// `Some(vec![])`, a declared empty list.
    fn dependencies(&self, name: &str) -> Option<Vec<String>>;
}
