use std::fmt;

/// Faker locales supported by the semantic generators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocaleKey {
    #[default]
    EnUs,
    PtBr,
}

impl LocaleKey {
    /// Accepts `en_US`/`pt_BR` in any case, with `_` or `-`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "en_us" | "en" => Some(Self::EnUs),
            "pt_br" => Some(Self::PtBr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
        }
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!(LocaleKey::parse("en_US"), Some(LocaleKey::EnUs));
        assert_eq!(LocaleKey::parse("pt-br"), Some(LocaleKey::PtBr));
        assert_eq!(LocaleKey::parse("fr_FR"), None);
    }
}
