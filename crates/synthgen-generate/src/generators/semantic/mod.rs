use rand::RngCore;
use synthgen_core::{DataType, FieldSpec, FieldValue};

use crate::errors::GenerationError;
use crate::faker_rs::{FakerKind, fake_text};
use crate::generators::{FieldGenerator, GeneratorContext, GeneratorRegistry, pick_choice};

pub fn register(registry: &mut GeneratorRegistry) {
    for (data_type, id, kind) in [
        (DataType::Email, "semantic.email", FakerKind::Email),
        (DataType::Phone, "semantic.phone", FakerKind::Phone),
        (DataType::Address, "semantic.address", FakerKind::Address),
        (DataType::Name, "semantic.name", FakerKind::Name),
    ] {
        registry.register_type(data_type, FakerGenerator { id, kind });
    }
}

/// Realistic-looking text from the run's faker locale; no cross-record uniqueness.
pub struct FakerGenerator {
    id: &'static str,
    kind: FakerKind,
}

impl FieldGenerator for FakerGenerator {
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
        Ok(FieldValue::Text(fake_text(self.kind, ctx.locale, rng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faker_rs::LocaleKey;
    use crate::model::GenerationContext;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use synthgen_core::RecordData;
    use synthgen_core::temporal::parse_iso;

    #[test]
    fn emails_pass_the_validator_regex() {
        let registry = GeneratorRegistry::new();
        let field = FieldSpec::new("email", DataType::Email);
        let generator = registry.resolve(&field).expect("email generator");
        let matcher = regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex");
        let record = RecordData::new();
        let context = GenerationContext::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for locale in [LocaleKey::EnUs, LocaleKey::PtBr] {
            let ctx = GeneratorContext {
                record_index: 0,
                current_record: &record,
                context: &context,
                locale,
                now: parse_iso("2024-01-01").expect("now"),
            };
            for _ in 0..50 {
                let value = generator.generate(&field, &ctx, &mut rng).expect("email");
                let email = value.as_str().expect("text");
                assert!(matcher.is_match(email), "{email} is not a valid email");
            }
        }
    }

    #[test]
    fn choices_override_faker_values() {
        let field = FieldSpec::new("name", DataType::Name).with_choices(["Ana", "Bia"]);
        let generator = FakerGenerator {
            id: "semantic.name",
            kind: FakerKind::Name,
        };
        let record = RecordData::new();
        let context = GenerationContext::default();
        let ctx = GeneratorContext {
            record_index: 0,
            current_record: &record,
            context: &context,
            locale: LocaleKey::EnUs,
            now: parse_iso("2024-01-01").expect("now"),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..20 {
            let value = generator.generate(&field, &ctx, &mut rng).expect("name");
            assert!(matches!(value.as_str(), Some("Ana" | "Bia")));
        }
    }
}
