//! Whole-record generation backed by a text completion service.
//!
//! The generator describes the schema in a prompt, asks a [`CompletionClient`]
//! for one record and parses the reply. Fields the reply leaves out are filled
//! by the pipeline with the per-field generators.

use std::sync::{Arc, OnceLock};

use rand::RngCore;
use regex::Regex;
use serde_json::Value;
use synthgen_core::{DataType, FieldSpec, FieldValue, RecordData};
use tracing::debug;

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, RecordGenerator};

/// Blocking text completion backend.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

impl<F> CompletionClient for F
where
    F: Fn(&str) -> Result<String, GenerationError> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self(prompt)
    }
}

pub struct ContextualRecordGenerator {
    client: Arc<dyn CompletionClient>,
}

impl ContextualRecordGenerator {
    pub fn new(client: impl CompletionClient + 'static) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn from_shared(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

impl RecordGenerator for ContextualRecordGenerator {
    fn id(&self) -> &str {
        "contextual.completion"
    }

    fn generate_record(
        &self,
        fields: &[FieldSpec],
        ctx: &GeneratorContext<'_>,
        _rng: &mut dyn RngCore,
    ) -> Result<RecordData, GenerationError> {
        let prompt = build_prompt(fields, ctx);
        let reply = self.client.complete(&prompt)?;
        let data = parse_reply(&reply, fields);
        if data.is_empty() {
            return Err(GenerationError::Completion(
                "reply did not contain any schema field".to_string(),
            ));
        }
        debug!(
            record_index = ctx.record_index,
            fields = data.len(),
            "contextual record parsed"
        );
        Ok(data)
    }
}

pub fn build_prompt(fields: &[FieldSpec], ctx: &GeneratorContext<'_>) -> String {
    let mut prompt =
        String::from("Generate realistic synthetic data for a record with these fields:\n");
    for field in fields {
        let mut constraints = Vec::new();
        if let Some(min) = &field.min_value {
            constraints.push(format!("min: {min}"));
        }
        if let Some(max) = &field.max_value {
            constraints.push(format!("max: {max}"));
        }
        if let Some(choices) = field.choice_set() {
            let listed: Vec<String> = choices.iter().map(ToString::to_string).collect();
            constraints.push(format!("choices: [{}]", listed.join(", ")));
        }
        prompt.push_str(&format!("- {}: {}", field.name, field.data_type));
        if !constraints.is_empty() {
            prompt.push_str(&format!(" ({})", constraints.join(", ")));
        }
        prompt.push('\n');
    }

    if let Some(persona) = &ctx.context.persona {
        prompt.push_str(&format!("\nPersona: {}", persona.name));
        if let Some(description) = &persona.description {
            prompt.push_str(&format!(" - {description}"));
        }
        prompt.push('\n');
        for (key, value) in &persona.attributes {
            prompt.push_str(&format!("  {key}: {value}\n"));
        }
    }

    if ctx.context.params.is_empty() {
        prompt.push_str("\nAdditional context: None\n");
    } else {
        let keys: Vec<&str> = ctx.context.params.keys().map(String::as_str).collect();
        prompt.push_str(&format!("\nAdditional context keys: {}\n", keys.join(", ")));
    }

    if ctx.context.quality_issue {
        prompt.push_str(
            "\nRecent records failed validation; follow every constraint above exactly.\n",
        );
    }

    prompt.push_str(
        "\nRequirements:\n\
         - Make all fields contextually consistent with each other\n\
         - Return valid JSON format\n\
         - Ensure data types match requirements\n\nJSON:",
    );
    prompt
}

/// Parse a completion reply into schema fields.
///
/// The first `{...}` span is tried as a JSON object; otherwise `name: value`
/// lines are read with type coercion.
pub fn parse_reply(reply: &str, fields: &[FieldSpec]) -> RecordData {
    if let Some(object) = json_object(reply) {
        return fields
            .iter()
            .filter_map(|field| {
                object
                    .get(&field.name)
                    .map(|value| (field.name.clone(), FieldValue::from_json(value)))
            })
            .collect();
    }
    parse_lines(reply, fields)
}

fn json_object(reply: &str) -> Option<serde_json::Map<String, Value>> {
    static OBJECT: OnceLock<Option<Regex>> = OnceLock::new();
    let matcher = OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()).as_ref()?;
    let span = matcher.find(reply)?;
    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn parse_lines(reply: &str, fields: &[FieldSpec]) -> RecordData {
    let mut data = RecordData::new();
    for line in reply.lines() {
        let Some((key, raw)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches(['-', '*']).trim().trim_matches(['"', '\'']);
        let Some(field) = fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(key))
        else {
            continue;
        };
        let raw = raw.trim().trim_end_matches(',').trim().trim_matches(['"', '\'']);
        data.insert(field.name.clone(), coerce(field.data_type, raw));
    }
    data
}

fn coerce(data_type: DataType, raw: &str) -> FieldValue {
    match data_type {
        DataType::Integer => FieldValue::Int(raw.parse().unwrap_or(1)),
        DataType::Float => FieldValue::Float(raw.parse().unwrap_or(1.0)),
        DataType::Boolean => FieldValue::Bool(matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        )),
        _ => FieldValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faker_rs::LocaleKey;
    use crate::model::{GenerationContext, Persona};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Mutex;
    use synthgen_core::temporal::parse_iso;

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("name", DataType::Name),
            FieldSpec::new("age", DataType::Integer).with_range(18, 80),
            FieldSpec::new("score", DataType::Float),
            FieldSpec::new("active", DataType::Boolean),
            FieldSpec::new("tier", DataType::String).with_choices(["gold", "silver"]),
        ]
    }

    #[test]
    fn parses_embedded_json_object() {
        let reply = "Sure! Here it is:\n{\"name\": \"Ana\", \"age\": 31, \"extra\": 1}\nThanks";
        let data = parse_reply(reply, &fields());
        assert_eq!(data.get("name"), Some(&FieldValue::from("Ana")));
        assert_eq!(data.get("age"), Some(&FieldValue::Int(31)));
        assert!(!data.contains_key("extra"));
    }

    #[test]
    fn falls_back_to_line_parsing_with_coercion() {
        let reply = "- name: \"Ana Souza\"\nAge: thirty\nscore: abc\nactive: Yes\nnotes: ignored";
        let data = parse_reply(reply, &fields());
        assert_eq!(data.get("name"), Some(&FieldValue::from("Ana Souza")));
        assert_eq!(data.get("age"), Some(&FieldValue::Int(1)));
        assert_eq!(data.get("score"), Some(&FieldValue::Float(1.0)));
        assert_eq!(data.get("active"), Some(&FieldValue::Bool(true)));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn prompt_lists_constraints_persona_and_quality_note() {
        let record = RecordData::new();
        let mut context = GenerationContext {
            persona: Some(
                Persona::new("student")
                    .with_description("university student")
                    .with_attribute("city", Value::from("Recife")),
            ),
            quality_issue: true,
            ..GenerationContext::default()
        };
        context.params.insert("users_data".to_string(), Value::Array(Vec::new()));
        let ctx = GeneratorContext {
            record_index: 0,
            current_record: &record,
            context: &context,
            locale: LocaleKey::EnUs,
            now: parse_iso("2024-01-01").expect("now"),
        };
        let prompt = build_prompt(&fields(), &ctx);
        assert!(prompt.contains("- age: integer (min: 18, max: 80)"), "{prompt}");
        assert!(prompt.contains("choices: [gold, silver]"));
        assert!(prompt.contains("Persona: student - university student\n  city: \"Recife\"\n"));
        assert!(prompt.contains("Additional context keys: users_data\n"));
        assert!(prompt.contains("Recent records failed validation"));
    }

    #[test]
    fn empty_reply_is_a_completion_error() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&prompts);
        let generator = ContextualRecordGenerator::new(
            move |prompt: &str| -> Result<String, GenerationError> {
                seen.lock().expect("lock").push(prompt.to_string());
                Ok("I cannot help with that.".to_string())
            },
        );
        let record = RecordData::new();
        let context = GenerationContext::default();
        let ctx = GeneratorContext {
            record_index: 3,
            current_record: &record,
            context: &context,
            locale: LocaleKey::EnUs,
            now: parse_iso("2024-01-01").expect("now"),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = generator
            .generate_record(&fields(), &ctx, &mut rng)
            .expect_err("no fields parsed");
        assert!(matches!(err, GenerationError::Completion(_)));
        assert_eq!(prompts.lock().expect("lock").len(), 1);
    }
}
