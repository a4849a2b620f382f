//! Locale-aware wrappers over the `fake` crate.

pub mod locales;

use fake::Fake;
use fake::faker::address::{en as address_en, pt_br as address_pt_br};
use fake::faker::internet::{en as internet_en, pt_br as internet_pt_br};
use fake::faker::lorem::en as lorem_en;
use fake::faker::name::{en as name_en, pt_br as name_pt_br};
use fake::faker::phone_number::{en as phone_en, pt_br as phone_pt_br};
use rand::RngCore;

pub use locales::LocaleKey;

/// Semantic value families backed by faker data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakerKind {
    Name,
    Email,
    Phone,
    Address,
    Word,
}

pub fn fake_text(kind: FakerKind, locale: LocaleKey, rng: &mut dyn RngCore) -> String {
    match (kind, locale) {
        (FakerKind::Name, LocaleKey::EnUs) => name_en::Name().fake_with_rng(rng),
        (FakerKind::Name, LocaleKey::PtBr) => name_pt_br::Name().fake_with_rng(rng),
        (FakerKind::Email, LocaleKey::EnUs) => {
            sanitize_email(internet_en::SafeEmail().fake_with_rng(rng))
        }
        (FakerKind::Email, LocaleKey::PtBr) => {
            sanitize_email(internet_pt_br::SafeEmail().fake_with_rng(rng))
        }
        (FakerKind::Phone, LocaleKey::EnUs) => phone_en::PhoneNumber().fake_with_rng(rng),
        (FakerKind::Phone, LocaleKey::PtBr) => phone_pt_br::PhoneNumber().fake_with_rng(rng),
        (FakerKind::Address, LocaleKey::EnUs) => {
            let number: String = address_en::BuildingNumber().fake_with_rng(rng);
            let street: String = address_en::StreetName().fake_with_rng(rng);
            let city: String = address_en::CityName().fake_with_rng(rng);
            let state: String = address_en::StateAbbr().fake_with_rng(rng);
            let zip: String = address_en::ZipCode().fake_with_rng(rng);
            format!("{number} {street}, {city}, {state} {zip}")
        }
        (FakerKind::Address, LocaleKey::PtBr) => {
            let street: String = address_pt_br::StreetName().fake_with_rng(rng);
            let number: String = address_pt_br::BuildingNumber().fake_with_rng(rng);
            let city: String = address_pt_br::CityName().fake_with_rng(rng);
            let state: String = address_pt_br::StateAbbr().fake_with_rng(rng);
            let zip: String = address_pt_br::ZipCode().fake_with_rng(rng);
            format!("{street}, {number}, {city} - {state}, {zip}")
        }
        (FakerKind::Word, _) => lorem_en::Word().fake_with_rng(rng),
    }
}

/// Keep the local part within the characters a plain email regex accepts.
fn sanitize_email(email: String) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email;
    };
    let local: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
        .collect();
    let local = if local.is_empty() { "user".to_string() } else { local };
    format!("{}@{}", local.to_ascii_lowercase(), domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn sanitizes_accented_local_parts() {
        assert_eq!(sanitize_email("joão.silva@example.com".to_string()), "joo.silva@example.com");
        assert_eq!(sanitize_email("ção@example.org".to_string()), "o@example.org");
        assert_eq!(sanitize_email("çã@example.org".to_string()), "user@example.org");
    }

    #[test]
    fn produces_text_for_every_kind_and_locale() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for locale in [LocaleKey::EnUs, LocaleKey::PtBr] {
            for kind in [
                FakerKind::Name,
                FakerKind::Email,
                FakerKind::Phone,
                FakerKind::Address,
                FakerKind::Word,
            ] {
                let value = fake_text(kind, locale, &mut rng);
                assert!(!value.is_empty(), "{kind:?} {locale} produced empty text");
            }
        }
    }
}
