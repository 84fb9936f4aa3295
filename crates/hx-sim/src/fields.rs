//! Per-region field storage.
//!
//! The time loop owns one [`FieldRegistry`] and lends it mutably to the
//! solve step currently running, so no two steps ever touch it at once.

use std::collections::BTreeMap;

use hx_core::Real;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRegistry {
    n_cells: usize,
    fields: BTreeMap<String, Vec<Real>>,
    scalars: BTreeMap<String, Real>,
}

impl FieldRegistry {
    pub fn new(n_cells: usize) -> Self {
        Self {
            n_cells,
            ..Self::default()
        }
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Add or replace a cell field.
    pub fn insert_field(&mut self, name: impl Into<String>, values: Vec<Real>) -> SimResult<()> {
        let name = name.into();
        if values.len() != self.n_cells {
            return Err(SimError::InvalidArg {
                what: format!(
                    "field '{name}' has {} values for {} cells",
                    values.len(),
                    self.n_cells
                ),
            });
        }
        self.fields.insert(name, values);
        Ok(())
    }

    /// Add or replace a field with the same value in every cell.
    pub fn insert_uniform(&mut self, name: impl Into<String>, value: Real) {
        self.fields.insert(name.into(), vec![value; self.n_cells]);
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> SimResult<&[Real]> {
        self.fields
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SimError::UnknownField {
                name: name.to_string(),
            })
    }

    pub fn field_mut(&mut self, name: &str) -> SimResult<&mut [Real]> {
        self.fields
            .get_mut(name)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| SimError::UnknownField {
                name: name.to_string(),
            })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Cell-averaged value of a field.
    pub fn mean(&self, name: &str) -> SimResult<Real> {
        let f = self.field(name)?;
        if f.is_empty() {
            return Ok(0.0);
        }
        Ok(f.iter().sum::<Real>() / f.len() as Real)
    }

    pub fn scalar(&self, name: &str) -> Option<Real> {
        self.scalars.get(name).copied()
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: Real) {
        self.scalars.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_must_cover_every_cell() {
        let mut f = FieldRegistry::new(2);
        assert!(f.insert_field("T", vec![300.0]).is_err());
        f.insert_field("T", vec![300.0, 500.0]).unwrap();
        assert_eq!(f.mean("T").unwrap(), 400.0);
        f.field_mut("T").unwrap()[0] = 310.0;
        assert_eq!(f.field("T").unwrap(), &[310.0, 500.0]);
    }

    #[test]
    fn unknown_field_is_named() {
        let f = FieldRegistry::new(1);
        assert_eq!(f.field("p").unwrap_err().to_string(), "Unknown field 'p'");
    }

    #[test]
    fn scalars_are_separate_from_fields() {
        let mut f = FieldRegistry::new(1);
        f.set_scalar("integratedHeat", 2.0);
        assert_eq!(f.scalar("integratedHeat"), Some(2.0));
        assert!(!f.has_field("integratedHeat"));
        f.insert_uniform("p", 1e5);
        assert_eq!(f.field_names().collect::<Vec<_>>(), vec!["p"]);
    }
}
