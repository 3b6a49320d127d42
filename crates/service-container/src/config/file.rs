//! JSON-backed service declarations.
//!
//! The document shape is:
//!
//! ```json
//! {
//!   "services": {
//!     "mailSender": { "loaderClassName": "MailSenderLoader" },
//!     "mailer": { "className": "Mailer", "dependencyList": ["config", "log"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServiceConfig;
use crate::{Error, Result};

/// Declaration of a single service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_list: Option<Vec<String>>,
}

impl ServiceDefinition {
    /// A service built from `class`.
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class_name: Some(class.into()),
            ..Default::default()
        }
    }

    /// A service produced by the loader class `class`.
    pub fn loader(class: impl Into<String>) -> Self {
        Self {
            loader_class_name: Some(class.into()),
            ..Default::default()
        }
    }

    /// Declare an explicit, ordered dependency list.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_list = Some(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Overlay `other` on top of this definition, field by field.
    fn merge(&mut self, other: ServiceDefinition) {
        if other.class_name.is_some() {
            self.class_name = other.class_name;
        }
        if other.loader_class_name.is_some() {
            self.loader_class_name = other.loader_class_name;
        }
        if other.dependency_list.is_some() {
            self.dependency_list = other.dependency_list;
        }
    }
}

/// Service declarations loaded from one or more JSON documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfiguration {
    #[serde(default)]
    services: BTreeMap<String, ServiceDefinition>,
}

impl ContainerConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single JSON document.
    ///
    /// The result is not validated: a single layer may be partial, such as a
    /// module that only overrides a `dependencyList`. Call
    /// [`validate`](Self::validate) on the final configuration, or load
    /// through [`from_paths`](Self::from_paths), which does.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a single JSON document from disk.
    ///
    /// Like [`from_json_str`](Self::from_json_str), this does not validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            services = config.len(),
            "Loaded container configuration"
        );
        Ok(config)
    }

    /// Read and merge several documents in order, then validate the result.
    ///
    /// Later documents override earlier ones field by field.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut merged = Self::new();
        for path in paths {
            merged.merge(Self::from_path(path)?);
        }
        merged.validate()?;
        Ok(merged)
    }

    /// Declare or replace a service.
    pub fn define(&mut self, name: impl Into<String>, definition: ServiceDefinition) -> &mut Self {
        self.services.insert(name.into(), definition);
        self
    }

    /// Builder-style [`define`](Self::define).
    pub fn with_service(mut self, name: impl Into<String>, definition: ServiceDefinition) -> Self {
        self.define(name, definition);
        self
    }

    /// Overlay another configuration on top of this one.
    pub fn merge(&mut self, other: ContainerConfiguration) {
        for (name, definition) in other.services {
            self.services.entry(name).or_default().merge(definition);
        }
    }

    /// Reject declarations the container could never act on.
    pub fn validate(&self) -> Result<()> {
        for (name, definition) in &self.services {
            if name.is_empty() {
                return Err(Error::config("service name must not be empty"));
            }
            if definition.dependency_list.is_some() && definition.class_name.is_none() {
                return Err(Error::config(format!(
                    "service {name} declares dependencies but no className"
                )));
            }
            let blank_dependency = definition
                .dependency_list
                .iter()
                .flatten()
                .any(|dependency| dependency.is_empty());
            if blank_dependency {
                return Err(Error::config(format!(
                    "service {name} declares an empty dependency name"
                )));
            }
        }
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name)
    }

    /// Declared service names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceConfig for ContainerConfiguration {
    fn loader_class(&self, name: &str) -> Option<String> {
        self.service(name)?.loader_class_name.clone()
    }

    fn implementation_class(&self, name: &str) -> Option<String> {
        self.service(name)?.class_name.clone()
    }

    fn dependencies(&self, name: &str) -> Option<Vec<String>> {
        self.service(name)?.dependency_list.clone()
    }
}
