//! Serde helpers that compile regex fields while the document is parsed, so a
//! malformed pattern fails the load instead of surfacing mid-evaluation.

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

fn compile<E: serde::de::Error>(source: &str) -> Result<Regex, E> {
    Regex::new(source).map_err(|e| E::custom(format!("invalid pattern `{}`: {}", source, e)))
}

pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
    let source = String::deserialize(deserializer)?;
    compile(&source)
}

pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Regex>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|source| compile(&source))
        .transpose()
}

pub fn optional_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Regex>>, D::Error> {
    let Some(sources) = Option::<Vec<String>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if sources.is_empty() {
        return Err(D::Error::custom("pattern list must not be empty when present"));
    }
    sources
        .iter()
        .map(|s| compile(s))
        .collect::<Result<Vec<_>, D::Error>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Doc {
        #[serde(deserialize_with = "required")]
        name: Regex,
        #[serde(default, deserialize_with = "optional")]
        title: Option<Regex>,
        #[serde(default, deserialize_with = "optional_list")]
        files: Option<Vec<Regex>>,
    }

    #[test]
    fn test_compiles_all_fields() {
        let doc: Doc = toml::from_str(
            r#"
name = '^a+$'
title = 'chore'
files = ['\.json$', '\.txt$']
"#,
        )
        .unwrap();
        assert!(doc.name.is_match("aaa"));
        assert!(doc.title.unwrap().is_match("chore: x"));
        assert_eq!(doc.files.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_optionals_default_to_none() {
        let doc: Doc = toml::from_str("name = 'x'").unwrap();
        assert!(doc.title.is_none());
        assert!(doc.files.is_none());
    }

    #[test]
    fn test_invalid_pattern_fails_load() {
        let err = toml::from_str::<Doc>("name = '(unclosed'").unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_empty_list_is_rejected() {
        assert!(toml::from_str::<Doc>("name = 'x'\nfiles = []").is_err());
    }
}
