//! Run-time selectable models.
//!
//! A [`ModelRegistry`] maps a textual type name read from a case file to a
//! factory producing one implementation of a modelling interface (chemistry
//! solver, ODE solver, solver object, ...).
//!
//! Registries are built explicitly by `register_builtin` functions in the
//! crates that own the implementations and are then shared read-only. There
//! is no discovery through static initialisation.
//!
//! # Example
//!
//! ```
//! use hx_models::{ModelRegistry, RegistryError};
//!
//! trait Viscosity {
//!     fn nu(&self) -> f64;
//! }
//!
//! struct Constant(f64);
//! impl Viscosity for Constant {
//!     fn nu(&self) -> f64 {
//!         self.0
//!     }
//! }
//!
//! let mut registry: ModelRegistry<dyn Viscosity, f64> = ModelRegistry::new("viscosity model");
//! registry
//!     .register("constant", |nu: &f64| -> Result<Box<dyn Viscosity>, RegistryError> {
//!         Ok(Box::new(Constant(*nu)))
//!     })
//!     .unwrap();
//!
//! let model = registry.create("constant", &1e-5).unwrap();
//! assert_eq!(model.nu(), 1e-5);
//! assert!(registry.create("powerLaw", &1e-5).is_err());
//! ```

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{Factory, ModelRegistry};
