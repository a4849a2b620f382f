mod completion;
mod config;
mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use synthgen_core::{LoadedSchema, Schema, load_schema, schema_json_schema};
use synthgen_eval::{EvalError, EvaluateOptions, EvaluationEngine, render_quality_report};
use synthgen_generate::{
    ContextualRecordGenerator, GenerationError, GenerationParams, GenerationResult, Persona,
    Strategy, SyntheticDataGenerator,
};
use thiserror::Error;
use uuid::Uuid;

use completion::CommandCompletionClient;
use config::{ConfigError, FileConfig, GenerationSection, OutputFormat};
use registry::{RunContext, init_logging, start_run, write_json, write_text};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid schema {path}: {message}")]
    InvalidSchema { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

#[derive(Parser, Debug)]
#[command(name = "synthgen", version, about = "Schema-driven synthetic data generator")]
struct Cli {
    /// TOML config file; defaults to ./synthgen.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset into a new run directory.
    Generate(GenerateArgs),
    /// Check a schema document without generating.
    ValidateSchema(ValidateArgs),
    /// Re-validate an exported dataset and write quality reports.
    Report(ReportArgs),
    /// Print the JSON Schema of the schema document format.
    EmitJsonSchema(EmitArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Schema document (JSON).
    #[arg(long)]
    schema: PathBuf,
    /// Override the schema's record_count.
    #[arg(long)]
    records: Option<u64>,
    /// sequential, batched or adaptive.
    #[arg(long)]
    strategy: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    /// Faker locale (en_US or pt_BR).
    #[arg(long)]
    locale: Option<String>,
    #[arg(long)]
    batch_size: Option<usize>,
    /// Hard cap on generated records.
    #[arg(long)]
    emergency_ceiling: Option<u64>,
    /// Cap on pipeline state transitions.
    #[arg(long)]
    recursion_limit: Option<u64>,
    #[arg(long)]
    quality_threshold: Option<f64>,
    #[arg(long)]
    adaptive_window: Option<usize>,
    /// Generate whole records through the completion command.
    #[arg(long)]
    contextual: bool,
    /// Command that answers prompts on stdin, e.g. "llm -m model".
    #[arg(long)]
    completion_command: Option<String>,
    /// Persona names; the target is split across them.
    #[arg(long = "persona", value_name = "NAME")]
    personas: Vec<String>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Schema document (JSON).
    schema: PathBuf,
    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long)]
    schema: PathBuf,
    /// Dataset export (csv, json or jsonl).
    #[arg(long)]
    dataset: PathBuf,
    /// Output directory; defaults to the dataset's directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Fail on invalid records or unparseable cells.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Fields to report uniqueness for.
    #[arg(long = "unique", value_name = "FIELD")]
    unique_fields: Vec<String>,
}

#[derive(Args, Debug)]
struct EmitArgs {
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => run_generate(args, &config),
        Command::ValidateSchema(args) => run_validate(args),
        Command::Report(args) => run_report(args),
        Command::EmitJsonSchema(args) => run_emit(args),
    }
}

fn run_generate(args: GenerateArgs, config: &FileConfig) -> Result<(), CliError> {
    let overrides = GenerationSection {
        strategy: args.strategy.clone(),
        seed: args.seed,
        locale: args.locale.clone(),
        batch_size: args.batch_size,
        emergency_ceiling: args.emergency_ceiling,
        recursion_limit: args.recursion_limit,
        quality_threshold: args.quality_threshold,
        adaptive_window: args.adaptive_window,
        contextual: args.contextual.then_some(true),
        completion_command: args
            .completion_command
            .as_deref()
            .map(|command| command.split_whitespace().map(str::to_string).collect()),
    };
    let settings = config.merge_generation(&overrides);
    let format = config.format(args.format);
    let strategy = match settings.strategy.as_deref() {
        Some(value) => value.parse::<Strategy>()?,
        None => Strategy::default(),
    };
    let params = build_params(&settings, args.records);

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: "generate".to_string(),
        schema_path: args.schema.clone(),
        run_dir: config.run_dir(args.run_dir),
        settings: serde_json::json!({
            "generation": settings,
            "strategy": strategy,
            "format": format,
            "records": args.records,
            "personas": args.personas,
        }),
    };
    let run_paths = start_run(&run_ctx)?;
    init_logging(Some(&run_paths.logs_path))?;

    tracing::info!(event = "run_started", run_id = %run_id, schema = %args.schema.display());
    let timer = Instant::now();

    let schema = read_schema(&args.schema)?;
    let mut generator = SyntheticDataGenerator::new().with_strategy(strategy);
    if params.use_contextual_generation {
        let command = settings.completion_command.as_deref().unwrap_or_default();
        let client = CommandCompletionClient::new(command).ok_or_else(|| {
            CliError::InvalidConfig(
                "contextual generation needs --completion-command or generation.completion_command"
                    .to_string(),
            )
        })?;
        generator
            .registry_mut()
            .set_record_generator(ContextualRecordGenerator::new(client));
    }

    let result = if args.personas.is_empty() {
        generator.generate(&schema, &params)
    } else {
        let personas: Vec<Persona> = args.personas.iter().map(Persona::new).collect();
        generator.generate_with_personas(&schema, &personas, &params)
    };
    write_json(&run_paths.result_path, &result)?;

    let dataset = match &result {
        GenerationResult::Success(dataset) => dataset,
        GenerationResult::Failure(failure) => {
            tracing::warn!(
                event = "run_finished",
                status = "failure",
                kind = ?failure.kind,
                error = %failure.error
            );
            return Err(CliError::GenerationFailed(failure.error.clone()));
        }
    };

    let dataset_path = run_paths.dataset_path(format.extension());
    match format {
        OutputFormat::Csv => {
            generator.to_csv(&result, &dataset_path)?;
        }
        OutputFormat::Json => write_text(&dataset_path, &generator.to_json(&result)?)?,
        OutputFormat::Jsonl => write_text(&dataset_path, &generator.to_jsonl(&result)?)?,
    }
    tracing::info!(event = "dataset_written", path = %dataset_path.display());

    let quality = generator.quality_report(&result)?;
    write_json(&run_paths.quality_json_path, &quality)?;
    let warnings = generator.validate_schema(&schema).warning_messages();
    write_text(
        &run_paths.quality_report_path,
        &render_quality_report(&schema.name, &quality, &warnings),
    )?;
    tracing::info!(event = "quality_written", path = %run_paths.quality_report_path.display());

    tracing::info!(
        event = "run_finished",
        status = "success",
        records = dataset.records.len(),
        validity = dataset.quality_metrics.validity,
        truncated = dataset.metadata.truncated,
        duration_ms = timer.elapsed().as_millis() as u64
    );
    println!("{}", run_paths.root.display());
    Ok(())
}

fn build_params(settings: &GenerationSection, records: Option<u64>) -> GenerationParams {
    let defaults = GenerationParams::default();
    GenerationParams {
        record_count: records,
        recursion_limit: settings.recursion_limit,
        use_contextual_generation: settings.contextual.unwrap_or(false),
        seed: settings.seed,
        locale: settings.locale.clone().unwrap_or(defaults.locale),
        batch_size: settings.batch_size.unwrap_or(defaults.batch_size),
        emergency_ceiling: settings.emergency_ceiling.unwrap_or(defaults.emergency_ceiling),
        quality_threshold: settings.quality_threshold.unwrap_or(defaults.quality_threshold),
        adaptive_window: settings.adaptive_window.unwrap_or(defaults.adaptive_window),
        context: defaults.context,
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let document = read_document(&args.schema)?;
    let report = match load_schema(&document) {
        Ok(LoadedSchema { schema, .. }) => synthgen_core::validate_schema(&schema),
        Err(report) => report,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for issue in &report.errors {
            println!("error   {} [{}]: {}", issue.path, issue.code, issue.message);
        }
        for issue in &report.warnings {
            println!("warning {} [{}]: {}", issue.path, issue.code, issue.message);
        }
        println!(
            "{}: {} error(s), {} warning(s)",
            args.schema.display(),
            report.errors.len(),
            report.warnings.len()
        );
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(CliError::InvalidSchema {
            path: args.schema,
            message: report.error_messages().join("; "),
        })
    }
}

fn run_report(args: ReportArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let schema = read_schema(&args.schema)?;
    let engine = EvaluationEngine::new(EvaluateOptions {
        strict: args.strict,
        unique_fields: args.unique_fields,
        out_dir: args.out,
    });
    let evaluation = engine.run(&schema, &args.dataset)?;
    for (field, percent) in &evaluation.uniqueness {
        println!("uniqueness {field}: {percent:.2}%");
    }
    println!("{}", evaluation.report_path.display());
    Ok(())
}

fn run_emit(args: EmitArgs) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&schema_json_schema())?;
    match args.out {
        Some(path) => write_text(&path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<Value, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_schema(path: &Path) -> Result<Schema, CliError> {
    let document = read_document(path)?;
    let loaded = load_schema(&document).map_err(|report| CliError::InvalidSchema {
        path: path.to_path_buf(),
        message: report.error_messages().join("; "),
    })?;
    for warning in &loaded.warnings {
        tracing::warn!(event = "schema_warning", schema = %loaded.schema.name, warning = %warning);
    }
    Ok(loaded.schema)
}
