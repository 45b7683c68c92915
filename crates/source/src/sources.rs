//! Concrete source adapters

use serde_json::Value;

pub mod kennisartikel;
pub mod objecten;
pub mod smoelenboek;
pub mod vac;

pub use kennisartikel::KennisartikelSource;
pub use objecten::{ObjectTypesClient, ObjectenClient};
pub use smoelenboek::SmoelenboekSource;
pub use vac::{VacObjectTypes, VacSource};

/// The sources selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Kennisartikel,
    Smoelenboek,
    Vac,
}

impl SourceKind {
    /// Resolves a source by name, case-insensitively. Unknown or absent
    /// names fall back to [`SourceKind::Kennisartikel`].
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_lowercase).as_deref() {
            Some("smoelenboek" | "medewerkers") => Self::Smoelenboek,
            Some("vac") => Self::Vac,
            _ => Self::Kennisartikel,
        }
    }
}

/// The string at `key` in `value`, unless it is blank.
fn non_blank<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Joins the non-blank strings at `keys` with single spaces.
fn join_fields(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| non_blank(value, key))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn source_kind_from_name() {
        assert_eq!(SourceKind::from_name(Some("Smoelenboek")), SourceKind::Smoelenboek);
        assert_eq!(SourceKind::from_name(Some("medewerkers")), SourceKind::Smoelenboek);
        assert_eq!(SourceKind::from_name(Some("VAC")), SourceKind::Vac);
        assert_eq!(SourceKind::from_name(Some("anything")), SourceKind::Kennisartikel);
        assert_eq!(SourceKind::from_name(None), SourceKind::Kennisartikel);
    }

    #[test]
    fn join_fields_skips_blank_and_missing() {
        let value = json!({ "voornaam": "Jan", "voorvoegselAchternaam": " ", "achternaam": "Vries", "x": 1 });

        assert_eq!(
            join_fields(&value, &["voornaam", "voorvoegselAchternaam", "achternaam", "x", "y"]),
            "Jan Vries"
        );
        assert_eq!(join_fields(&json!(null), &["voornaam"]), "");
    }
}
