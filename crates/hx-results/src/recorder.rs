//! Write sink that collects cell-averaged records.

use hx_sim::objects::{DENSITY, HEAT_RELEASE, PRESSURE, TEMPERATURE};
use hx_sim::{SimResult, WriteEvent, WriteSink};

use crate::types::TimeseriesRecord;

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    species: Vec<String>,
    records: Vec<TimeseriesRecord>,
}

impl Recorder {
    /// Records the mass fractions of `species` alongside T, p and rho.
    pub fn new(species: Vec<String>) -> Self {
        Self {
            species,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[TimeseriesRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TimeseriesRecord> {
        self.records
    }
}

impl WriteSink for Recorder {
    fn write(&mut self, event: &WriteEvent<'_>) -> SimResult<()> {
        let fields = event.fields;
        let qdot_w_m3 = if fields.has_field(HEAT_RELEASE) {
            Some(fields.mean(HEAT_RELEASE)?)
        } else {
            None
        };
        let mass_fractions = self
            .species
            .iter()
            .map(|s| Ok((s.clone(), fields.mean(s)?)))
            .collect::<SimResult<_>>()?;

        tracing::debug!(time = event.time, step = event.step_index, "recording");
        self.records.push(TimeseriesRecord {
            time_s: event.time,
            step: event.step_index,
            delta_t_s: event.delta_t,
            t_k: fields.mean(TEMPERATURE)?,
            p_pa: fields.mean(PRESSURE)?,
            rho_kg_m3: fields.mean(DENSITY)?,
            qdot_w_m3,
            mass_fractions,
            diagnostics: event.diagnostics.iter().cloned().collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_sim::FieldRegistry;

    #[test]
    fn records_cell_averages() {
        let mut fields = FieldRegistry::new(2);
        fields.insert_field(TEMPERATURE, vec![1000.0, 1200.0]).unwrap();
        fields.insert_uniform(PRESSURE, 1e5);
        fields.insert_uniform(DENSITY, 0.3);
        fields.insert_field("O2", vec![0.2, 0.4]).unwrap();
        let diagnostics = vec![("T".to_string(), 1100.0)];

        let mut recorder = Recorder::new(vec!["O2".to_string()]);
        recorder
            .write(&WriteEvent {
                time: 0.5,
                step_index: 5,
                delta_t: 0.1,
                fields: &fields,
                diagnostics: &diagnostics,
            })
            .unwrap();

        let record = &recorder.records()[0];
        assert_eq!(record.step, 5);
        assert!((record.t_k - 1100.0).abs() < 1e-12);
        assert!((record.mass_fractions["O2"] - 0.3).abs() < 1e-12);
        assert_eq!(record.qdot_w_m3, None);
        assert_eq!(record.diagnostics["T"], 1100.0);
    }

    #[test]
    fn missing_specie_is_an_error() {
        let mut fields = FieldRegistry::new(1);
        fields.insert_uniform(TEMPERATURE, 300.0);
        fields.insert_uniform(PRESSURE, 1e5);
        fields.insert_uniform(DENSITY, 1.0);

        let mut recorder = Recorder::new(vec!["H2".to_string()]);
        let event = WriteEvent {
            time: 0.0,
            step_index: 0,
            delta_t: 0.1,
            fields: &fields,
            diagnostics: &[],
        };
        assert!(recorder.write(&event).is_err());
        assert!(recorder.records().is_empty());
    }
}
