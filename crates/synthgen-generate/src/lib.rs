//! Schema-driven synthetic dataset generation.
//!
//! [`SyntheticDataGenerator`] validates a [`Schema`](synthgen_core::Schema),
//! drives the generation pipeline with the configured [`Strategy`] and
//! materializes the result as records, a table, JSON, JSONL or CSV.

pub mod errors;
pub mod facade;
pub mod faker_rs;
pub mod generators;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sink;

pub use errors::GenerationError;
pub use facade::{SyntheticDataGenerator, records_to_context};
pub use generators::contextual::{CompletionClient, ContextualRecordGenerator};
pub use generators::{FieldGenerator, GeneratorContext, GeneratorRegistry, RecordGenerator};
pub use model::{
    Adaptation, FailureKind, GeneratedDataset, GenerationContext, GenerationFailure,
    GenerationInsights, GenerationMetadata, GenerationParams, GenerationResult, Persona, Strategy,
};
pub use output::Table;
pub use pipeline::{GenerationPipeline, PipelineOutput, Stage};
pub use sink::{JsonlSink, MemorySink, RecordSink, SinkReport};
