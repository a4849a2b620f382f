use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::{Rng, RngCore};
use synthgen_core::{DataType, FieldSpec, FieldValue, RecordData};

use crate::errors::GenerationError;
use crate::faker_rs::LocaleKey;
use crate::model::GenerationContext;

pub mod contextual;
pub mod primitives;
pub mod semantic;

/// Read-only view handed to generators for one record.
pub struct GeneratorContext<'a> {
    /// Zero-based index of the record being generated.
    pub record_index: u64,
    /// Fields produced so far for this record.
    pub current_record: &'a RecordData,
    pub context: &'a GenerationContext,
    pub locale: LocaleKey,
    /// Reference instant for default date ranges, fixed per run.
    pub now: NaiveDateTime,
}

/// Produces one value for a field.
pub trait FieldGenerator: Send + Sync {
    fn id(&self) -> &str;

    fn generate(
        &self,
        field: &FieldSpec,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError>;
}

/// Produces a whole record at once; fields it omits are filled per-field.
pub trait RecordGenerator: Send + Sync {
    fn id(&self) -> &str;

    fn generate_record(
        &self,
        fields: &[FieldSpec],
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<RecordData, GenerationError>;
}

/// Generator lookup by data type, custom name, and optional record generator.
#[derive(Clone)]
pub struct GeneratorRegistry {
    by_type: HashMap<DataType, Arc<dyn FieldGenerator>>,
    custom: HashMap<String, Arc<dyn FieldGenerator>>,
    record_generator: Option<Arc<dyn RecordGenerator>>,
}

impl GeneratorRegistry {
    /// Registry with the rule-based and faker-backed defaults.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        semantic::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            custom: HashMap::new(),
            record_generator: None,
        }
    }

    /// Install or replace the generator for a data type.
    pub fn register_type(&mut self, data_type: DataType, generator: impl FieldGenerator + 'static) {
        self.by_type.insert(data_type, Arc::new(generator));
    }

    /// Register a generator addressable through `FieldSpec::custom_generator`.
    pub fn register_custom(&mut self, name: impl Into<String>, generator: impl FieldGenerator + 'static) {
        self.custom.insert(name.into(), Arc::new(generator));
    }

    pub fn set_record_generator(&mut self, generator: impl RecordGenerator + 'static) {
        self.record_generator = Some(Arc::new(generator));
    }

    pub fn clear_record_generator(&mut self) {
        self.record_generator = None;
    }

    pub fn record_generator(&self) -> Option<Arc<dyn RecordGenerator>> {
        self.record_generator.clone()
    }

    pub fn get(&self, data_type: DataType) -> Result<Arc<dyn FieldGenerator>, GenerationError> {
        self.by_type.get(&data_type).cloned().ok_or_else(|| {
            GenerationError::Config(format!("no generator registered for data type '{data_type}'"))
        })
    }

    /// Generator for a field, honouring `custom_generator` before the type default.
    pub fn resolve(&self, field: &FieldSpec) -> Result<Arc<dyn FieldGenerator>, GenerationError> {
        if let Some(name) = &field.custom_generator {
            return self.custom.get(name).cloned().ok_or_else(|| {
                GenerationError::Config(format!(
                    "field '{}': custom generator '{name}' is not registered",
                    field.name
                ))
            });
        }
        self.get(field.data_type).map_err(|err| match err {
            GenerationError::Config(message) => {
                GenerationError::Config(format!("field '{}': {message}", field.name))
            }
            other => other,
        })
    }

    pub fn generator_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .by_type
            .iter()
            .map(|(data_type, generator)| format!("{data_type}={}", generator.id()))
            .chain(self.custom.keys().map(|name| format!("custom:{name}")))
            .collect();
        ids.sort();
        ids
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generator_ids())
            .field(
                "record_generator",
                &self.record_generator.as_ref().map(|generator| generator.id().to_string()),
            )
            .finish()
    }
}

/// Uniform pick from the field's closed value set, if it has one.
pub fn pick_choice(field: &FieldSpec, rng: &mut dyn RngCore) -> Option<FieldValue> {
    let choices = field.choice_set()?;
    let index = rng.random_range(0..choices.len());
    Some(choices[index].clone())
}
