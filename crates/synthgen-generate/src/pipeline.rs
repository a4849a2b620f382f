//! Generation state machine.
//!
//! `Init -> Generate -> Validate -> (Adapt ->) Generate | Metrics -> Done`.
//! Every transition counts against the run's iteration budget.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use synthgen_core::{Record, RecordData, Schema};
use synthgen_eval::{QualityReport, RecordValidator, quality_report};
use tracing::{debug, info, warn};

use crate::errors::GenerationError;
use crate::faker_rs::LocaleKey;
use crate::generators::{FieldGenerator, GeneratorContext, GeneratorRegistry, RecordGenerator};
use crate::model::{Adaptation, GenerationContext, GenerationParams, Strategy};

/// Transitions allowed on top of the derived minimum.
const BUDGET_SLACK: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Generate,
    Validate,
    Adapt,
    Metrics,
    Done,
}

/// Everything a run accumulates; owned by exactly one run.
pub struct PipelineState<'a> {
    pub schema: &'a Schema,
    pub stage: Stage,
    pub records: Vec<Record>,
    /// Records generated in the current cycle, awaiting validation.
    pub pending: Vec<Record>,
    /// Raw data of the most recently generated record.
    pub current_record: RecordData,
    pub validation_errors: Vec<String>,
    pub quality: Option<QualityReport>,
    pub context: GenerationContext,
    pub transitions: u64,
    pub target: u64,
    pub requested: u64,
    pub truncated: bool,
    pub seed: u64,
    pub contextual_records: u64,
    pub fallback_records: u64,
    generators: BTreeMap<String, Arc<dyn FieldGenerator>>,
    record_generator: Option<Arc<dyn RecordGenerator>>,
    validator: RecordValidator,
    locale: LocaleKey,
    now: NaiveDateTime,
    generated_at: String,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<Record>,
    pub quality: QualityReport,
    pub validation_errors: Vec<String>,
    pub context: GenerationContext,
    pub transitions: u64,
    pub requested: u64,
    pub truncated: bool,
    pub seed: u64,
    pub contextual_records: u64,
    pub fallback_records: u64,
}

#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    registry: GeneratorRegistry,
    strategy: Strategy,
}

impl GenerationPipeline {
    pub fn new(registry: GeneratorRegistry, strategy: Strategy) -> Self {
        Self { registry, strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Run the state machine to completion.
    ///
    /// Panics raised by generators are converted into `Runtime` errors.
    pub fn run(
        &self,
        schema: &Schema,
        params: &GenerationParams,
        context: GenerationContext,
    ) -> Result<PipelineOutput, GenerationError> {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.run_stages(schema, params, context)
        }));
        match outcome {
            Ok(result) => result,
            Err(panic) => Err(GenerationError::Runtime(format!(
                "generator panicked: {}",
                panic_message(panic)
            ))),
        }
    }

    fn run_stages(
        &self,
        schema: &Schema,
        params: &GenerationParams,
        context: GenerationContext,
    ) -> Result<PipelineOutput, GenerationError> {
        let mut state = self.initial_state(schema, params, context);
        let budget = params
            .recursion_limit
            .unwrap_or_else(|| derived_budget(self.strategy, state.target, params.batch_size));

        while state.stage != Stage::Done {
            let next = match state.stage {
                Stage::Init => self.init(&mut state, params)?,
                Stage::Generate => self.generate(&mut state, params)?,
                Stage::Validate => self.validate(&mut state),
                Stage::Adapt => self.adapt(&mut state, params),
                Stage::Metrics => self.metrics(&mut state),
                Stage::Done => Stage::Done,
            };
            state.transitions += 1;
            if state.transitions > budget {
                warn!(
                    schema = %schema.name,
                    limit = budget,
                    records = state.records.len(),
                    "iteration budget exceeded"
                );
                return Err(GenerationError::BudgetExceeded { limit: budget });
            }
            state.stage = next;
        }

        Ok(PipelineOutput {
            quality: state
                .quality
                .unwrap_or_else(|| quality_report(&state.records, &schema.fields)),
            records: state.records,
            validation_errors: state.validation_errors,
            context: state.context,
            transitions: state.transitions,
            requested: state.requested,
            truncated: state.truncated,
            seed: state.seed,
            contextual_records: state.contextual_records,
            fallback_records: state.fallback_records,
        })
    }

    fn initial_state<'a>(
        &self,
        schema: &'a Schema,
        params: &GenerationParams,
        context: GenerationContext,
    ) -> PipelineState<'a> {
        let requested = params.record_count.unwrap_or(schema.record_count);
        let now = Utc::now().naive_utc();
        PipelineState {
            schema,
            stage: Stage::Init,
            records: Vec::new(),
            pending: Vec::new(),
            current_record: RecordData::new(),
            validation_errors: Vec::new(),
            quality: None,
            context,
            transitions: 0,
            target: requested.min(params.emergency_ceiling),
            requested,
            truncated: requested > params.emergency_ceiling,
            seed: params.seed.unwrap_or_else(|| rand::rng().random()),
            contextual_records: 0,
            fallback_records: 0,
            generators: BTreeMap::new(),
            record_generator: None,
            validator: RecordValidator::new(),
            locale: LocaleKey::default(),
            now: now.with_nanosecond(0).unwrap_or(now),
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    fn init(
        &self,
        state: &mut PipelineState<'_>,
        params: &GenerationParams,
    ) -> Result<Stage, GenerationError> {
        let schema = state.schema;
        state.generators = schema
            .fields
            .iter()
            .map(|field| {
                self.registry
                    .resolve(field)
                    .map(|generator| (field.name.clone(), generator))
            })
            .collect::<Result<_, _>>()?;

        if params.use_contextual_generation {
            let generator = self.registry.record_generator().ok_or_else(|| {
                GenerationError::Config(
                    "contextual generation requested but no record generator is registered"
                        .to_string(),
                )
            })?;
            state.record_generator = Some(generator);
        }
        if self.strategy == Strategy::Batched && params.batch_size == 0 {
            return Err(GenerationError::Config("batch_size must be at least 1".to_string()));
        }
        if self.strategy == Strategy::Adaptive && params.adaptive_window == 0 {
            return Err(GenerationError::Config(
                "adaptive_window must be at least 1".to_string(),
            ));
        }
        state.locale = LocaleKey::parse(&params.locale).ok_or_else(|| {
            GenerationError::Config(format!("unsupported locale '{}'", params.locale))
        })?;
        state.validator = RecordValidator::for_fields(&schema.fields);

        if state.truncated {
            warn!(
                schema = %schema.name,
                requested = state.requested,
                ceiling = params.emergency_ceiling,
                "record count exceeds emergency ceiling; truncating"
            );
        }
        info!(
            schema = %schema.name,
            target = state.target,
            strategy = %self.strategy,
            seed = state.seed,
            contextual = params.use_contextual_generation,
            "generation started"
        );

        Ok(if should_continue(state) {
            Stage::Generate
        } else {
            Stage::Metrics
        })
    }

    fn generate(
        &self,
        state: &mut PipelineState<'_>,
        params: &GenerationParams,
    ) -> Result<Stage, GenerationError> {
        let remaining = state.target.saturating_sub(state.records.len() as u64);
        let size = match self.strategy {
            Strategy::Batched => remaining.min(params.batch_size as u64),
            Strategy::Sequential | Strategy::Adaptive => remaining.min(1),
        };
        let start = state.records.len() as u64;
        for index in start..start + size {
            let record = self.generate_record(state, index)?;
            state.pending.push(record);
        }
        debug!(
            schema = %state.schema.name,
            batch = size,
            generated = start + size,
            "record batch generated"
        );
        Ok(Stage::Validate)
    }

    fn generate_record(
        &self,
        state: &mut PipelineState<'_>,
        index: u64,
    ) -> Result<Record, GenerationError> {
        let schema = state.schema;
        let mut rng = ChaCha8Rng::seed_from_u64(hash_row_seed(state.seed, index));
        let mut data = RecordData::new();
        let mut method = "rule_based";

        if let Some(record_generator) = &state.record_generator {
            let ctx = GeneratorContext {
                record_index: index,
                current_record: &data,
                context: &state.context,
                locale: state.locale,
                now: state.now,
            };
            match record_generator.generate_record(&schema.fields, &ctx, &mut rng) {
                Ok(mut reply) => {
                    reply.retain(|name, _| schema.field(name).is_some());
                    data = reply;
                    method = "contextual";
                    state.contextual_records += 1;
                }
                Err(err) => {
                    warn!(
                        schema = %schema.name,
                        record_index = index,
                        generator = record_generator.id(),
                        error = %err,
                        "record generator failed; falling back to field generators"
                    );
                    method = "rule_based_fallback";
                    state.fallback_records += 1;
                }
            }
        }

        for field in &schema.fields {
            if data.contains_key(&field.name) {
                continue;
            }
            let generator = state.generators.get(&field.name).ok_or_else(|| {
                GenerationError::Config(format!("no generator resolved for field '{}'", field.name))
            })?;
            let ctx = GeneratorContext {
                record_index: index,
                current_record: &data,
                context: &state.context,
                locale: state.locale,
                now: state.now,
            };
            let value = generator.generate(field, &ctx, &mut rng)?;
            data.insert(field.name.clone(), value);
        }

        for field in &schema.fields {
            if let (Some(value), Some(default)) = (data.get_mut(&field.name), &field.default_value)
            {
                if value.is_null() {
                    *value = default.clone();
                }
            }
        }

        state.current_record = data.clone();
        let mut record = Record::new(data)
            .with_metadata("generated_at", state.generated_at.clone())
            .with_metadata("generation_method", method)
            .with_metadata("schema_name", schema.name.clone())
            .with_metadata("record_index", index)
            .with_metadata("strategy", self.strategy.as_str())
            .with_metadata("quality_issue", state.context.quality_issue);
        if let Some(persona) = &state.context.persona {
            record = record.with_metadata("persona", persona.name.clone());
        }
        Ok(record)
    }

    fn validate(&self, state: &mut PipelineState<'_>) -> Stage {
        let schema = state.schema;
        for mut record in std::mem::take(&mut state.pending) {
            let mut errors = state.validator.check(&record, &schema.fields);
            errors.extend(
                state
                    .validator
                    .validate_relationships(&record, schema.relationships.as_ref()),
            );
            state.validation_errors.extend(errors.iter().cloned());
            record.set_validation(errors);
            state.records.push(record);
        }

        if self.strategy == Strategy::Adaptive {
            Stage::Adapt
        } else if should_continue(state) {
            Stage::Generate
        } else {
            Stage::Metrics
        }
    }

    fn adapt(&self, state: &mut PipelineState<'_>, params: &GenerationParams) -> Stage {
        let window = params.adaptive_window;
        if state.records.len() >= window {
            let recent = &state.records[state.records.len() - window..];
            let valid = recent.iter().filter(|record| record.is_valid).count();
            let window_validity = valid as f64 / window as f64 * 100.0;
            if window_validity < params.quality_threshold {
                if !state.context.quality_issue {
                    info!(
                        schema = %state.schema.name,
                        after_records = state.records.len(),
                        window_validity,
                        threshold = params.quality_threshold,
                        "quality issue detected"
                    );
                }
                state.context.quality_issue = true;
                state.context.retry_count += 1;
                state.context.adaptations.push(Adaptation {
                    after_records: state.records.len() as u64,
                    window_validity,
                });
            } else {
                state.context.quality_issue = false;
            }
        }

        if should_continue(state) {
            Stage::Generate
        } else {
            Stage::Metrics
        }
    }

    fn metrics(&self, state: &mut PipelineState<'_>) -> Stage {
        state.quality = Some(quality_report(&state.records, &state.schema.fields));
        Stage::Done
    }
}

fn should_continue(state: &PipelineState<'_>) -> bool {
    (state.records.len() as u64) < state.target
}

/// Smallest budget a well-behaved run needs, plus slack.
pub fn derived_budget(strategy: Strategy, target: u64, batch_size: usize) -> u64 {
    let (cycles, per_cycle) = match strategy {
        Strategy::Sequential => (target, 2),
        Strategy::Batched => (target.div_ceil(batch_size.max(1) as u64), 2),
        Strategy::Adaptive => (target, 3),
    };
    2 + cycles * per_cycle + BUDGET_SLACK
}

/// Per-record seed derived from the run seed.
pub fn hash_row_seed(seed: u64, record_index: u64) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    hash ^= record_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash.wrapping_mul(0x100000001b3)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::{DataType, FieldSpec};

    fn schema(count: u64) -> Schema {
        Schema::new(
            "people",
            vec![
                FieldSpec::new("name", DataType::Name),
                FieldSpec::new("age", DataType::Integer).with_range(18, 80),
            ],
        )
        .with_record_count(count)
    }

    fn run(strategy: Strategy, schema: &Schema, params: &GenerationParams) -> PipelineOutput {
        GenerationPipeline::new(GeneratorRegistry::new(), strategy)
            .run(schema, params, GenerationContext::default())
            .expect("pipeline run")
    }

    #[test]
    fn derived_budget_fits_every_strategy() {
        let params = GenerationParams::default().with_seed(5);
        for strategy in [Strategy::Sequential, Strategy::Batched, Strategy::Adaptive] {
            let output = run(strategy, &schema(23), &params);
            assert_eq!(output.records.len(), 23, "{strategy}");
            assert!(output.transitions <= derived_budget(strategy, 23, params.batch_size));
        }
    }

    #[test]
    fn sequential_transition_count_is_exact() {
        let output = run(Strategy::Sequential, &schema(4), &GenerationParams::default());
        assert_eq!(output.transitions, 2 + 4 * 2);
    }

    #[test]
    fn zero_records_still_reach_metrics() {
        let output = run(Strategy::Sequential, &schema(0), &GenerationParams::default());
        assert!(output.records.is_empty());
        assert_eq!(output.transitions, 2);
        assert_eq!(output.quality.total_records, 0);
        assert_eq!(output.quality.completeness, 0.0);
    }

    #[test]
    fn explicit_budget_is_enforced() {
        let params = GenerationParams::default().with_recursion_limit(5);
        let err = GenerationPipeline::new(GeneratorRegistry::new(), Strategy::Sequential)
            .run(&schema(50), &params, GenerationContext::default())
            .expect_err("budget exceeded");
        assert!(matches!(err, GenerationError::BudgetExceeded { limit: 5 }));
    }

    #[test]
    fn state_tracks_latest_record_and_named_generators() {
        let schema = schema(3);
        let params = GenerationParams::default().with_seed(1);
        let pipeline = GenerationPipeline::new(GeneratorRegistry::new(), Strategy::Sequential);
        let mut state = pipeline.initial_state(&schema, &params, GenerationContext::default());

        assert_eq!(pipeline.init(&mut state, &params).expect("init"), Stage::Generate);
        let names: Vec<&str> = state.generators.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["age", "name"]);

        assert_eq!(pipeline.generate(&mut state, &params).expect("generate"), Stage::Validate);
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.current_record, state.pending[0].data);
    }

    #[test]
    fn row_seeds_differ_per_index() {
        assert_ne!(hash_row_seed(1, 0), hash_row_seed(1, 1));
        assert_eq!(hash_row_seed(9, 3), hash_row_seed(9, 3));
    }

    #[test]
    fn unsupported_locale_is_a_config_error() {
        let params = GenerationParams::default().with_locale("fr_FR");
        let err = GenerationPipeline::new(GeneratorRegistry::new(), Strategy::Sequential)
            .run(&schema(3), &params, GenerationContext::default())
            .expect_err("locale");
        assert!(matches!(err, GenerationError::Config(_)));
    }
}
