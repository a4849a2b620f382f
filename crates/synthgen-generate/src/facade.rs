use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use synthgen_core::{Record, Schema, SchemaValidationReport, validate_schema};
use synthgen_eval::{DetailedQualityReport, detailed_quality_report, quality_report};
use tracing::{info, warn};

use crate::errors::GenerationError;
use crate::generators::GeneratorRegistry;
use crate::model::{
    GeneratedDataset, GenerationContext, GenerationFailure, GenerationInsights,
    GenerationMetadata, GenerationParams, GenerationResult, Persona, Strategy,
};
use crate::output::{Table, to_json_string, to_jsonl_string, write_records_csv};
use crate::pipeline::{GenerationPipeline, hash_row_seed};
use crate::sink::{RecordSink, SinkReport};

/// Entry point for schema-driven dataset generation.
///
/// Owns the generator registry and the pipeline strategy; every call to
/// [`generate`](Self::generate) runs an independent pipeline.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDataGenerator {
    registry: GeneratorRegistry,
    strategy: Strategy,
}

impl SyntheticDataGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: GeneratorRegistry) -> Self {
        Self {
            registry,
            strategy: Strategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Register custom or contextual generators before generating.
    pub fn registry_mut(&mut self) -> &mut GeneratorRegistry {
        &mut self.registry
    }

    pub fn validate_schema(&self, schema: &Schema) -> SchemaValidationReport {
        validate_schema(schema)
    }

    /// Validate the schema, then run the pipeline. Never returns partial records.
    pub fn generate(&self, schema: &Schema, params: &GenerationParams) -> GenerationResult {
        self.generate_in_context(schema, params, GenerationContext::default())
    }

    fn generate_in_context(
        &self,
        schema: &Schema,
        params: &GenerationParams,
        mut context: GenerationContext,
    ) -> GenerationResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let report = validate_schema(schema);
        if !report.is_valid() {
            let err = GenerationError::InvalidSchema(report.error_messages());
            warn!(run_id = %run_id, schema = %schema.name, error = %err, "generation failed");
            return GenerationResult::Failure(GenerationFailure::from_error(&err));
        }
        for warning in report.warning_messages() {
            warn!(run_id = %run_id, schema = %schema.name, warning = %warning, "schema warning");
        }

        let mut merged = params.context.clone();
        merged.append(&mut context.params);
        context.params = merged;

        let start = Instant::now();
        let pipeline = GenerationPipeline::new(self.registry.clone(), self.strategy);
        let output = match pipeline.run(schema, params, context) {
            Ok(output) => output,
            Err(err) => {
                warn!(run_id = %run_id, schema = %schema.name, error = %err, "generation failed");
                return GenerationResult::Failure(GenerationFailure::from_error(&err));
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let metadata = GenerationMetadata {
            run_id: run_id.clone(),
            schema_name: schema.name.clone(),
            record_count: output.records.len() as u64,
            requested_records: output.requested,
            strategy: self.strategy,
            timestamp: Utc::now().to_rfc3339(),
            truncated: output.truncated,
            schema_fingerprint: schema.fingerprint().ok(),
            seed: output.seed,
            contextual: params.use_contextual_generation,
            adaptations: output.context.adaptations.len() as u64,
            contextual_records: output.contextual_records,
            fallback_records: output.fallback_records,
            transitions: output.transitions,
            duration_ms,
            personas: BTreeMap::new(),
        };
        info!(
            run_id = %run_id,
            schema = %schema.name,
            records = metadata.record_count,
            validity = output.quality.validity,
            truncated = metadata.truncated,
            duration_ms,
            "generation completed"
        );

        GenerationResult::Success(GeneratedDataset {
            schema: schema.clone(),
            columns: schema.fields.iter().map(|field| field.name.clone()).collect(),
            records: output.records,
            quality_metrics: output.quality,
            validation_errors: output.validation_errors,
            metadata,
        })
    }

    pub fn to_table(&self, result: &GenerationResult) -> Result<Table, GenerationError> {
        let dataset = result.require_dataset()?;
        Ok(Table::from_records(&dataset.columns, &dataset.records))
    }

    pub fn to_json(&self, result: &GenerationResult) -> Result<String, GenerationError> {
        let dataset = result.require_dataset()?;
        to_json_string(&dataset.columns, &dataset.records)
    }

    pub fn to_jsonl(&self, result: &GenerationResult) -> Result<String, GenerationError> {
        let dataset = result.require_dataset()?;
        to_jsonl_string(&dataset.columns, &dataset.records)
    }

    /// Write the dataset as CSV in schema field order; returns bytes written.
    pub fn to_csv(&self, result: &GenerationResult, path: &Path) -> Result<u64, GenerationError> {
        let dataset = result.require_dataset()?;
        Ok(write_records_csv(path, &dataset.columns, &dataset.records)?)
    }

    pub fn generate_table(
        &self,
        schema: &Schema,
        params: &GenerationParams,
    ) -> Result<Table, GenerationError> {
        self.to_table(&self.generate(schema, params))
    }

    pub fn generate_json(
        &self,
        schema: &Schema,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        self.to_json(&self.generate(schema, params))
    }

    pub fn generate_csv(
        &self,
        schema: &Schema,
        params: &GenerationParams,
        path: &Path,
    ) -> Result<u64, GenerationError> {
        self.to_csv(&self.generate(schema, params), path)
    }

    /// Recompute metrics for a successful result, with per-column distributions.
    pub fn quality_report(
        &self,
        result: &GenerationResult,
    ) -> Result<DetailedQualityReport, GenerationError> {
        let dataset = result.require_dataset()?;
        Ok(detailed_quality_report(&dataset.records, &dataset.schema.fields))
    }

    pub fn insights(&self, result: &GenerationResult) -> Result<GenerationInsights, GenerationError> {
        let dataset = result.require_dataset()?;
        let total_records = dataset.records.len() as u64;
        let contextual_rate = if total_records == 0 {
            0.0
        } else {
            dataset.metadata.contextual_records as f64 / total_records as f64 * 100.0
        };
        let quality_issue_records = dataset
            .records
            .iter()
            .filter(|record| {
                record.generation_metadata.get("quality_issue") == Some(&Value::Bool(true))
            })
            .count() as u64;
        Ok(GenerationInsights {
            total_records,
            contextual_records: dataset.metadata.contextual_records,
            fallback_records: dataset.metadata.fallback_records,
            contextual_rate,
            adaptations: dataset.metadata.adaptations,
            quality_issue_records,
            validity: dataset.quality_metrics.validity,
        })
    }

    /// Split the target across personas and combine the runs.
    ///
    /// Each persona gets `target / personas` records and the remainder goes to
    /// the first personas. Any persona failure fails the whole call.
    pub fn generate_with_personas(
        &self,
        schema: &Schema,
        personas: &[Persona],
        params: &GenerationParams,
    ) -> GenerationResult {
        if personas.is_empty() {
            return GenerationResult::Failure(GenerationFailure::from_error(
                &GenerationError::Config("at least one persona is required".to_string()),
            ));
        }

        let total = params.record_count.unwrap_or(schema.record_count);
        let base = total / personas.len() as u64;
        let extra = total % personas.len() as u64;
        let seed = params.seed.unwrap_or_else(|| rand::rng().random());

        let mut combined: Option<GeneratedDataset> = None;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for (index, persona) in personas.iter().enumerate() {
            let index = index as u64;
            let persona_params = GenerationParams {
                record_count: Some(base + u64::from(index < extra)),
                seed: Some(hash_row_seed(seed, index)),
                ..params.clone()
            };
            let context = GenerationContext {
                persona: Some(persona.clone()),
                ..GenerationContext::default()
            };
            let dataset = match self.generate_in_context(schema, &persona_params, context) {
                GenerationResult::Success(dataset) => dataset,
                failure @ GenerationResult::Failure(_) => return failure,
            };
            *counts.entry(persona.name.clone()).or_default() += dataset.records.len() as u64;

            combined = Some(match combined {
                None => dataset,
                Some(mut acc) => {
                    acc.records.extend(dataset.records);
                    acc.validation_errors.extend(dataset.validation_errors);
                    let meta = &mut acc.metadata;
                    meta.truncated |= dataset.metadata.truncated;
                    meta.adaptations += dataset.metadata.adaptations;
                    meta.contextual_records += dataset.metadata.contextual_records;
                    meta.fallback_records += dataset.metadata.fallback_records;
                    meta.transitions += dataset.metadata.transitions;
                    meta.duration_ms += dataset.metadata.duration_ms;
                    acc
                }
            });
        }

        let Some(mut dataset) = combined else {
            return GenerationResult::Failure(GenerationFailure::from_error(
                &GenerationError::Config("at least one persona is required".to_string()),
            ));
        };
        dataset.quality_metrics = quality_report(&dataset.records, &schema.fields);
        let meta = &mut dataset.metadata;
        meta.run_id = uuid::Uuid::new_v4().to_string();
        meta.record_count = dataset.records.len() as u64;
        meta.requested_records = total;
        meta.seed = seed;
        meta.timestamp = Utc::now().to_rfc3339();
        meta.personas = counts;
        info!(
            run_id = %meta.run_id,
            schema = %schema.name,
            personas = personas.len(),
            records = meta.record_count,
            "persona generation completed"
        );
        GenerationResult::Success(dataset)
    }

    /// Generate schemas in order, exposing each dependency's records to its
    /// dependents as the `<dependency>_data` context entry.
    pub fn generate_related(
        &self,
        schemas: &[Schema],
        dependencies: &BTreeMap<String, Vec<String>>,
        params: &GenerationParams,
    ) -> Result<BTreeMap<String, GenerationResult>, GenerationError> {
        let mut results: BTreeMap<String, GenerationResult> = BTreeMap::new();
        for schema in schemas {
            let mut context = GenerationContext::default();
            for dependency in dependencies.get(&schema.name).into_iter().flatten() {
                let dataset = match results.get(dependency) {
                    Some(GenerationResult::Success(dataset)) => dataset,
                    Some(GenerationResult::Failure(_)) => {
                        return Err(GenerationError::Config(format!(
                            "dependency '{dependency}' of '{}' failed to generate",
                            schema.name
                        )));
                    }
                    None => {
                        return Err(GenerationError::Config(format!(
                            "dependency '{dependency}' of '{}' must be generated first",
                            schema.name
                        )));
                    }
                };
                context
                    .params
                    .insert(format!("{dependency}_data"), records_to_context(&dataset.records));
            }
            let result = self.generate_in_context(schema, params, context);
            results.insert(schema.name.clone(), result);
        }
        Ok(results)
    }

    /// Generate and hand a successful dataset to `sink`.
    pub fn generate_and_store(
        &self,
        schema: &Schema,
        params: &GenerationParams,
        sink: &mut dyn RecordSink,
    ) -> Result<(GeneratedDataset, SinkReport), GenerationError> {
        let dataset = self.generate(schema, params).into_dataset()?;
        let report = sink.store(schema, &dataset.records);
        if !report.success {
            warn!(schema = %schema.name, errors = ?report.errors, "sink rejected records");
        }
        Ok((dataset, report))
    }
}

/// Plain row objects for use as generator context.
pub fn records_to_context(records: &[Record]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|record| {
                Value::Object(
                    record
                        .data
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_json()))
                        .collect(),
                )
            })
            .collect(),
    )
}
