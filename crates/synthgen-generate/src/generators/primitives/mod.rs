use chrono::{Duration, NaiveDateTime, NaiveTime};
use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;
use synthgen_core::temporal::{format_date, format_timestamp, parse_iso};
use synthgen_core::{DataType, FieldSpec, FieldValue};
use tracing::warn;

use crate::errors::GenerationError;
use crate::faker_rs::{FakerKind, fake_text};
use crate::generators::{FieldGenerator, GeneratorContext, GeneratorRegistry, pick_choice};

const DEFAULT_TEXT_MIN: usize = 5;
const DEFAULT_TEXT_MAX: usize = 20;
const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 1000;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 1000.0;
const DEFAULT_DATE_SPAN_DAYS: i64 = 365;
const DEFAULT_MAX_REPEAT: u32 = 32;
const FLOAT_SCALE: i32 = 2;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_type(DataType::String, TextGenerator);
    registry.register_type(DataType::Integer, IntRangeGenerator);
    registry.register_type(DataType::Float, FloatRangeGenerator);
    registry.register_type(DataType::Boolean, BoolGenerator);
    registry.register_type(
        DataType::Date,
        TemporalRangeGenerator {
            id: "primitive.date",
            date_only: true,
        },
    );
    registry.register_type(
        DataType::Datetime,
        TemporalRangeGenerator {
            id: "primitive.datetime",
            date_only: false,
        },
    );
}

pub struct TextGenerator;

impl FieldGenerator for TextGenerator {
    fn id(&self) -> &str {
        "primitive.text"
    }

    fn generate(
        &self,
        field: &FieldSpec,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError> {
        if let Some(choice) = pick_choice(field, rng) {
            return Ok(choice);
        }
        let (min_len, max_len) = text_bounds(field);

        if let Some(pattern) = &field.pattern {
            match RandRegex::compile(strip_anchors(pattern), DEFAULT_MAX_REPEAT) {
                Ok(regex) => {
                    let value: String = rng.sample(regex);
                    let value = match field.max_length {
                        Some(max) => truncate_chars(value, max),
                        None => value,
                    };
                    return Ok(FieldValue::Text(value));
                }
                Err(err) => {
                    warn!(field = %field.name, pattern = %pattern, error = %err, "pattern not generatable; using lorem text");
                }
            }
        }

        Ok(FieldValue::Text(lorem_text(ctx, rng, min_len, max_len)))
    }
}

/// Drop a leading `^` and an unescaped trailing `$`, which `rand_regex` rejects.
fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(body) => {
            let escapes = body.chars().rev().take_while(|c| *c == '\\').count();
            if escapes % 2 == 0 { body } else { pattern }
        }
        None => pattern,
    }
}

/// Length bounds with defaults; an inverted pair collapses to the maximum.
fn text_bounds(field: &FieldSpec) -> (usize, usize) {
    let min_len = field.min_length.unwrap_or(DEFAULT_TEXT_MIN);
    let max_len = field
        .max_length
        .unwrap_or_else(|| DEFAULT_TEXT_MAX.max(min_len));
    (min_len.min(max_len), max_len)
}

fn lorem_text(
    ctx: &GeneratorContext<'_>,
    rng: &mut dyn RngCore,
    min_len: usize,
    max_len: usize,
) -> String {
    let target = if min_len == max_len {
        min_len
    } else {
        rng.random_range(min_len..=max_len)
    };
    let mut text = String::new();
    while text.chars().count() < target {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&fake_text(FakerKind::Word, ctx.locale, rng));
    }
    let mut text = truncate_chars(text, target);
    if text.ends_with(' ') {
        text.pop();
        text.push('a');
    }
    text
}

fn truncate_chars(value: String, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value
    } else {
        value.chars().take(max_len).collect()
    }
}

pub struct IntRangeGenerator;

impl FieldGenerator for IntRangeGenerator {
    fn id(&self) -> &str {
        "primitive.int.range"
    }

    fn generate(
        &self,
        field: &FieldSpec,
        _ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError> {
        if let Some(choice) = pick_choice(field, rng) {
            return Ok(choice);
        }
        let min = field
            .min_value
            .as_ref()
            .and_then(FieldValue::as_f64)
            .map(|value| value.ceil() as i64)
            .unwrap_or(DEFAULT_INT_MIN);
        let max = field
            .max_value
            .as_ref()
            .and_then(FieldValue::as_f64)
            .map(|value| value.floor() as i64)
            .unwrap_or_else(|| DEFAULT_INT_MAX.max(min));
        if min > max {
            return Err(GenerationError::Runtime(format!(
                "field '{}': no integer between {min} and {max}",
                field.name
            )));
        }
        Ok(FieldValue::Int(rng.random_range(min..=max)))
    }
}

pub struct FloatRangeGenerator;

impl FieldGenerator for FloatRangeGenerator {
    fn id(&self) -> &str {
        "primitive.float.range"
    }

    fn generate(
        &self,
        field: &FieldSpec,
        _ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError> {
        if let Some(choice) = pick_choice(field, rng) {
            return Ok(choice);
        }
        let min = field
            .min_value
            .as_ref()
            .and_then(FieldValue::as_f64)
            .unwrap_or(DEFAULT_FLOAT_MIN);
        let max = field
            .max_value
            .as_ref()
            .and_then(FieldValue::as_f64)
            .unwrap_or_else(|| DEFAULT_FLOAT_MAX.max(min));
        if min > max {
            return Err(GenerationError::Runtime(format!(
                "field '{}': min_value {min} exceeds max_value {max}",
                field.name
            )));
        }
        let factor = 10_f64.powi(FLOAT_SCALE);
        let low = (min * factor).ceil() / factor;
        let high = (max * factor).floor() / factor;
        if low > high {
            // No two-decimal value fits; keep full precision.
            return Ok(FieldValue::Float(rng.random_range(min..=max)));
        }
        let value = rng.random_range(low..=high);
        let rounded = ((value * factor).round() / factor).clamp(low, high);
        Ok(FieldValue::Float(rounded))
    }
}

pub struct BoolGenerator;

impl FieldGenerator for BoolGenerator {
    fn id(&self) -> &str {
        "primitive.bool"
    }

    fn generate(
        &self,
        field: &FieldSpec,
        _ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError> {
        if let Some(choice) = pick_choice(field, rng) {
            return Ok(choice);
        }
        Ok(FieldValue::Bool(rng.random_bool(0.5)))
    }
}

pub struct TemporalRangeGenerator {
    id: &'static str,
    date_only: bool,
}

impl FieldGenerator for TemporalRangeGenerator {
    fn id(&self) -> &str {
        self.id
    }

    fn generate(
        &self,
        field: &FieldSpec,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<FieldValue, GenerationError> {
        if let Some(choice) = pick_choice(field, rng) {
            return Ok(choice);
        }
        let (start, end) = temporal_bounds(field, ctx.now)?;
        let value = if self.date_only {
            // A date is compared as midnight, so a lower bound with a time part
            // starts on the following day.
            let first = if start.time() > NaiveTime::MIN {
                start.date() + Duration::days(1)
            } else {
                start.date()
            };
            if first > end.date() {
                return Err(GenerationError::Runtime(format!(
                    "field '{}': no whole day between {start} and {end}",
                    field.name
                )));
            }
            let span = (end.date() - first).num_days();
            let offset = rng.random_range(0..=span);
            format_date(first + Duration::days(offset))
        } else {
            let span = (end - start).num_seconds();
            let offset = rng.random_range(0..=span.max(0));
            format_timestamp(start + Duration::seconds(offset))
        };
        Ok(FieldValue::Text(value))
    }
}

/// Range defaults: upper bound is `now`, lower bound one year before the upper.
fn temporal_bounds(
    field: &FieldSpec,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), GenerationError> {
    let parse = |bound: &Option<FieldValue>, key: &str| -> Result<Option<NaiveDateTime>, GenerationError> {
        match bound {
            None => Ok(None),
            Some(value) => value.as_str().and_then(parse_iso).map(Some).ok_or_else(|| {
                GenerationError::Runtime(format!(
                    "field '{}': {key} '{value}' is not an ISO-8601 date",
                    field.name
                ))
            }),
        }
    };
    let min = parse(&field.min_value, "min_value")?;
    let max = parse(&field.max_value, "max_value")?;

    let (start, end) = match (min, max) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, now.max(start + Duration::days(DEFAULT_DATE_SPAN_DAYS))),
        (None, Some(end)) => (end - Duration::days(DEFAULT_DATE_SPAN_DAYS), end),
        (None, None) => (now - Duration::days(DEFAULT_DATE_SPAN_DAYS), now),
    };
    if start > end {
        return Err(GenerationError::Runtime(format!(
            "field '{}': min_value is after max_value",
            field.name
        )));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationContext;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use synthgen_core::RecordData;

    fn with_ctx<T>(f: impl FnOnce(&GeneratorContext<'_>) -> T) -> T {
        let record = RecordData::new();
        let context = GenerationContext::default();
        let now = parse_iso("2024-06-15T12:00:00").expect("fixed now");
        let ctx = GeneratorContext {
            record_index: 0,
            current_record: &record,
            context: &context,
            locale: Default::default(),
            now,
        };
        f(&ctx)
    }

    #[test]
    fn integers_stay_within_bounds() {
        let field = FieldSpec::new("age", DataType::Integer).with_range(18, 80);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        with_ctx(|ctx| {
            for _ in 0..200 {
                let value = IntRangeGenerator.generate(&field, ctx, &mut rng).expect("int");
                let value = value.as_i64().expect("integer value");
                assert!((18..=80).contains(&value));
            }
        });
    }

    #[test]
    fn floats_are_rounded_and_bounded() {
        let field = FieldSpec::new("price", DataType::Float).with_range(1.5, 2.5);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        with_ctx(|ctx| {
            for _ in 0..200 {
                let value = FloatRangeGenerator
                    .generate(&field, ctx, &mut rng)
                    .expect("float")
                    .as_f64()
                    .expect("float value");
                assert!((1.5..=2.5).contains(&value));
                assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);
            }
        });
    }

    #[test]
    fn choices_override_ranges() {
        let field = FieldSpec::new("tier", DataType::Integer)
            .with_range(0, 1000)
            .with_choices([1, 2, 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        with_ctx(|ctx| {
            for _ in 0..50 {
                let value = IntRangeGenerator.generate(&field, ctx, &mut rng).expect("int");
                assert!(matches!(value, FieldValue::Int(1..=3)));
            }
        });
    }

    #[test]
    fn text_respects_length_bounds_and_patterns() {
        let plain = FieldSpec::new("note", DataType::String).with_length(Some(8), Some(12));
        let coded = FieldSpec::new("code", DataType::String).with_pattern("^[A-Z]{3}$");
        let matcher = regex::Regex::new("^[A-Z]{3}$").expect("regex");
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        with_ctx(|ctx| {
            for _ in 0..50 {
                let note = TextGenerator.generate(&plain, ctx, &mut rng).expect("note");
                let len = note.as_str().expect("text").chars().count();
                assert!((8..=12).contains(&len), "length {len}");

                let code = TextGenerator.generate(&coded, ctx, &mut rng).expect("code");
                assert!(matcher.is_match(code.as_str().expect("text")));
            }
        });
    }

    #[test]
    fn anchors_are_stripped_unless_escaped() {
        assert_eq!(strip_anchors("^[A-Z]{3}$"), "[A-Z]{3}");
        assert_eq!(strip_anchors("[0-9]+"), "[0-9]+");
        assert_eq!(strip_anchors(r"^cost\$"), r"cost\$");
        assert_eq!(strip_anchors(r"^dir\\$"), r"dir\\");
    }

    #[test]
    fn anchored_patterns_are_generated_not_replaced() {
        let field = FieldSpec::new("sku", DataType::String).with_pattern("^[A-Z]{2}-[0-9]{4}$");
        let matcher = regex::Regex::new("^[A-Z]{2}-[0-9]{4}$").expect("regex");
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        with_ctx(|ctx| {
            for _ in 0..50 {
                let value = TextGenerator.generate(&field, ctx, &mut rng).expect("sku");
                let value = value.as_str().expect("text");
                assert!(matcher.is_match(value), "{value}");
            }
        });
    }

    #[test]
    fn float_bounds_are_rounded_inward() {
        let narrow = FieldSpec::new("rate", DataType::Float).with_range(1.551, 1.579);
        let gridless = FieldSpec::new("rate", DataType::Float).with_range(1.555, 1.557);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        with_ctx(|ctx| {
            for _ in 0..100 {
                let value = FloatRangeGenerator
                    .generate(&narrow, ctx, &mut rng)
                    .expect("float")
                    .as_f64()
                    .expect("float value");
                assert!((1.56..=1.57).contains(&value), "{value}");
                assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);

                let value = FloatRangeGenerator
                    .generate(&gridless, ctx, &mut rng)
                    .expect("float")
                    .as_f64()
                    .expect("float value");
                assert!((1.555..=1.557).contains(&value), "{value}");
            }
        });
    }

    #[test]
    fn date_window_without_a_whole_day_is_an_error() {
        let field = FieldSpec::new("d", DataType::Date)
            .with_range("2024-01-01T12:00:00", "2024-01-01T18:00:00");
        let generator = TemporalRangeGenerator {
            id: "primitive.date",
            date_only: true,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        with_ctx(|ctx| {
            let err = generator.generate(&field, ctx, &mut rng).expect_err("empty window");
            assert!(matches!(err, GenerationError::Runtime(_)));
        });
    }

    #[test]
    fn dates_fall_inside_declared_window() {
        let field = FieldSpec::new("signup", DataType::Date).with_range("2024-01-01", "2024-01-31");
        let unbounded = FieldSpec::new("seen_at", DataType::Datetime);
        let low = parse_iso("2024-01-01").expect("low");
        let high = parse_iso("2024-01-31").expect("high");
        let now = parse_iso("2024-06-15T12:00:00").expect("now");
        let generator = TemporalRangeGenerator {
            id: "primitive.date",
            date_only: true,
        };
        let datetime = TemporalRangeGenerator {
            id: "primitive.datetime",
            date_only: false,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        with_ctx(|ctx| {
            for _ in 0..50 {
                let value = generator.generate(&field, ctx, &mut rng).expect("date");
                let parsed = parse_iso(value.as_str().expect("text")).expect("iso date");
                assert!(parsed >= low && parsed <= high);

                let value = datetime.generate(&unbounded, ctx, &mut rng).expect("datetime");
                let parsed = parse_iso(value.as_str().expect("text")).expect("iso datetime");
                assert!(parsed <= now && parsed >= now - Duration::days(365));
            }
        });
    }
}
