use std::fmt;
use std::str::FromStr;

/// The closed set of delivery languages, in their canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    En,
    Ct,
    Cs,
    Ja,
    Th,
    PtBr,
    Ru,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::En,
        Language::Ct,
        Language::Cs,
        Language::Ja,
        Language::Th,
        Language::PtBr,
        Language::Ru,
    ];

    /// Arbiter for KEY uniqueness; every other language mirrors its decisions.
    pub const MASTER: Language = Language::En;

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Ct => "CT",
            Language::Cs => "CS",
            Language::Ja => "JA",
            Language::Th => "TH",
            Language::PtBr => "PT-BR",
            Language::Ru => "RU",
        }
    }

    pub fn is_master(self) -> bool {
        self == Self::MASTER
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language code '{}'", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert!("en".parse::<Language>().is_err());
        assert!("PT".parse::<Language>().is_err());
        assert_eq!("PT-BR".parse::<Language>().unwrap(), Language::PtBr);
    }

    #[test]
    fn test_master_is_first() {
        assert_eq!(Language::ALL[0], Language::MASTER);
        assert!(Language::En.is_master());
        assert!(!Language::Ru.is_master());
    }
}
