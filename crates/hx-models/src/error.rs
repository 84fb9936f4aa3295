//! Registry error types.

use thiserror::Error;

/// Errors raised while registering or selecting a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same type name was registered twice for one interface.
    #[error("Duplicate {interface} type '{name}' registered")]
    Duplicate { interface: String, name: String },

    /// The requested type name is not registered.
    #[error("Unknown {interface} type '{name}'. Valid {interface} types are: {}", .valid.join(", "))]
    UnknownModel {
        interface: String,
        name: String,
        valid: Vec<String>,
    },

    /// The factory rejected its construction arguments.
    #[error("Cannot construct {interface} type '{name}': {message}")]
    Construction {
        interface: String,
        name: String,
        message: String,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_lists_alternatives() {
        let err = RegistryError::UnknownModel {
            interface: "chemistry solver".into(),
            name: "odee".into(),
            valid: vec!["EulerImplicit".into(), "none".into(), "ode".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'odee'"));
        assert!(msg.contains("EulerImplicit, none, ode"));
    }
}
