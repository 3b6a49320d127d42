//! Type-erased service values and positional dependency lists.

use std::any::Any;
use std::sync::Arc;

use crate::{Error, Result};

/// A resolved service instance.
///
/// The container stores every service behind this erased handle and
/// downcasts on the way out.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Erase a concrete value into a [`Service`].
pub fn service<T: Send + Sync + 'static>(value: T) -> Service {
    Arc::new(value)
}

/// Downcast an erased service registered under `name`.
pub(crate) fn downcast<T: Send + Sync + 'static>(name: &str, service: Service) -> Result<Arc<T>> {
    service
        .downcast::<T>()
        .map_err(|_| Error::type_mismatch::<T>(name))
}

/// Ordered dependency list handed to a positional constructor.
///
/// Entries keep the declared order. A dependency that resolved to nothing
/// is kept as `None` in its slot so positions never shift.
#[derive(Clone)]
pub struct Dependencies {
    service: String,
    entries: Vec<(String, Option<Service>)>,
}

impl Dependencies {
    pub fn new(service: impl Into<String>, entries: Vec<(String, Option<Service>)>) -> Self {
        Self {
            service: service.into(),
            entries,
        }
    }

    /// Name of the service being constructed.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared dependency names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// The erased instance at `index`, if it resolved.
    pub fn raw(&self, index: usize) -> Option<&Service> {
        self.entries.get(index).and_then(|(_, service)| service.as_ref())
    }

    /// The dependency at `index`, failing if it is absent.
    pub fn required<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        self.optional(index)?
            .ok_or_else(|| Error::MissingDependency {
                service: self.service.clone(),
                dependency: self.name_at(index),
            })
    }

    /// The dependency at `index`, or `None` if it resolved to nothing.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.entries.get(index) {
            Some((name, Some(service))) => downcast(name, service.clone()).map(Some),
            Some((_, None)) => Ok(None),
            None => Err(Error::MissingDependency {
                service: self.service.clone(),
                dependency: self.name_at(index),
            }),
        }
    }

    fn name_at(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("#{index}"))
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("service", &self.service)
            .field(
                "entries",
                &self
                    .entries
                    .iter()
                    .map(|(name, service)| (name.as_str(), service.is_some()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
