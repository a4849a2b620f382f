use std::env;
use std::path::PathBuf;

use synthgen_core::load_schema;
use synthgen_generate::{GenerationParams, Strategy, SyntheticDataGenerator};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut schema_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;
    let mut strategy = Strategy::Sequential;
    let mut params = GenerationParams::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" => schema_path = args.next().map(PathBuf::from),
            "--out" => out_path = args.next().map(PathBuf::from),
            "--strategy" => strategy = args.next().ok_or("missing --strategy value")?.parse()?,
            "--seed" => params.seed = Some(args.next().ok_or("missing --seed value")?.parse()?),
            _ => {
                if schema_path.is_none() {
                    schema_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let schema_path = schema_path.ok_or("missing --schema path")?;
    let document: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&schema_path)?)?;
    let loaded = load_schema(&document)
        .map_err(|report| format!("invalid schema: {}", report.error_messages().join("; ")))?;

    let generator = SyntheticDataGenerator::new().with_strategy(strategy);
    let result = generator.generate(&loaded.schema, &params);
    match out_path {
        Some(path) => {
            let bytes = generator.to_csv(&result, &path)?;
            println!("wrote {bytes} bytes to {}", path.display());
        }
        None => print!("{}", generator.to_jsonl(&result)?),
    }
    Ok(())
}
