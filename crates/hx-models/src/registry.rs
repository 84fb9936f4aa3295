//! String-keyed factory table.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RegistryError;

/// Factory producing one boxed implementation of interface `T` from
/// construction arguments `A`.
pub type Factory<T, A, E> = Box<dyn Fn(&A) -> Result<Box<T>, E> + Send + Sync>;

/// Table of named factories for one modelling interface.
///
/// - `T` is the interface, usually `dyn Trait`
/// - `A` is the construction argument bundle passed to every factory
/// - `E` is the error type factories and [`create`](Self::create) return;
///   it must absorb [`RegistryError`] so an unknown name can be reported
///
/// Names are held sorted, so the list of valid alternatives printed for an
/// unknown name is the same on every run.
pub struct ModelRegistry<T: ?Sized, A, E = RegistryError> {
    interface: &'static str,
    factories: BTreeMap<String, Factory<T, A, E>>,
}

impl<T: ?Sized, A, E> ModelRegistry<T, A, E>
where
    E: From<RegistryError>,
{
    /// Create an empty registry for the named interface.
    pub fn new(interface: &'static str) -> Self {
        Self {
            interface,
            factories: BTreeMap::new(),
        }
    }

    /// Human readable interface name used in diagnostics.
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    /// Add a factory under `name`.
    ///
    /// Registering a name twice is a programming error and is reported
    /// instead of silently replacing the first factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&A) -> Result<Box<T>, E> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                interface: self.interface.to_string(),
                name,
            });
        }
        tracing::trace!(interface = self.interface, model = %name, "registered model");
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Construct a new instance of the model registered under `name`.
    ///
    /// Each call runs the factory again, so two calls never share state.
    pub fn create(&self, name: &str, args: &A) -> Result<Box<T>, E> {
        match self.factories.get(name) {
            Some(factory) => {
                tracing::debug!(interface = self.interface, model = name, "selecting model");
                factory(args)
            }
            None => Err(RegistryError::UnknownModel {
                interface: self.interface.to_string(),
                name: name.to_string(),
                valid: self.names().into_iter().map(str::to_string).collect(),
            }
            .into()),
        }
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<T: ?Sized, A, E> fmt::Debug for ModelRegistry<T, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("interface", &self.interface)
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
