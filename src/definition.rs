//! Declarative tree definitions.
//! A definition is either a mapping from path segment to entry, or a flat list
//! of literal paths that name themselves. Definitions can be written inline
//! with `serde_json::json!` or loaded from JSON / YAML files.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::constants::DEFINITION_FILES;
use crate::error::{PathtreesError, PathtreesResult};
use crate::tree::Tree;

/// The body of a tree: nested segments, or plain paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Definition {
    /// Segment (possibly a placeholder) to entry. The empty segment names the
    /// directory that holds the mapping.
    Map(IndexMap<String, Entry>),
    /// Literal paths, each registered under its own text.
    List(Vec<String>),
}

/// What a segment maps to.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    /// The logical name of the node at this segment.
    Name(String),
    /// More segments below this one.
    Subtree(Definition),
    /// An already built tree, re-rooted at this segment.
    #[serde(skip)]
    Tree(Tree),
}

impl Definition {
    pub fn from_json_str(content: &str) -> PathtreesResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> PathtreesResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a definition file, choosing the format by extension.
    /// Unknown extensions are tried as JSON first, then YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> PathtreesResult<Self> {
        let path = path.as_ref();
        debug!("Loading tree definition from {}", path.display());
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yml" | "yaml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content).or_else(|_| Self::from_yaml_str(&content)),
        }
    }

    /// Loads the first definition file found in `dir`.
    ///
    /// # Errors
    /// * `PathtreesError::InvalidDefinition` if none of `DEFINITION_FILES` exists
    pub fn find<P: AsRef<Path>>(dir: P) -> PathtreesResult<Self> {
        for file in DEFINITION_FILES {
            let candidate = dir.as_ref().join(file);
            if candidate.exists() {
                return Self::load(candidate);
            }
        }

        Err(PathtreesError::InvalidDefinition(format!(
            "no definition file found in {} (tried: {})",
            dir.as_ref().display(),
            DEFINITION_FILES.join(", ")
        )))
    }
}

impl TryFrom<Value> for Definition {
    type Error = PathtreesError;

    fn try_from(value: Value) -> PathtreesResult<Self> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(segment, entry)| -> PathtreesResult<(String, Entry)> {
                    Ok((segment, Entry::try_from(entry)?))
                })
                .collect::<PathtreesResult<IndexMap<_, _>>>()
                .map(Definition::Map),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(path) => Ok(path),
                    other => Err(PathtreesError::InvalidDefinition(format!(
                        "list entries must be strings, got {other}"
                    ))),
                })
                .collect::<PathtreesResult<Vec<_>>>()
                .map(Definition::List),
            other => Err(PathtreesError::InvalidDefinition(format!(
                "expected a mapping or a list, got {other}"
            ))),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Definition {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Definition::List(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> From<Vec<S>> for Definition {
    fn from(paths: Vec<S>) -> Self {
        paths.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Definition {
    fn from(paths: [S; N]) -> Self {
        paths.into_iter().collect()
    }
}

impl TryFrom<Value> for Entry {
    type Error = PathtreesError;

    fn try_from(value: Value) -> PathtreesResult<Self> {
        match value {
            Value::String(name) => Ok(Entry::Name(name)),
            subtree @ (Value::Object(_) | Value::Array(_)) => {
                Ok(Entry::Subtree(Definition::try_from(subtree)?))
            }
            other => Err(PathtreesError::InvalidDefinition(format!(
                "expected a name or a nested definition, got {other}"
            ))),
        }
    }
}

impl From<&str> for Entry {
    fn from(name: &str) -> Self {
        Entry::Name(name.to_string())
    }
}

impl From<String> for Entry {
    fn from(name: String) -> Self {
        Entry::Name(name)
    }
}

impl From<Definition> for Entry {
    fn from(definition: Definition) -> Self {
        Entry::Subtree(definition)
    }
}

impl From<Tree> for Entry {
    fn from(tree: Tree) -> Self {
        Entry::Tree(tree)
    }
}

impl From<&Tree> for Entry {
    fn from(tree: &Tree) -> Self {
        Entry::Tree(tree.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let definition = Definition::try_from(json!({
            "": "root",
            "{log_id}": {"model.h5": "model"},
            "extra": ["a", "b"],
        }))
        .unwrap();

        let Definition::Map(map) = definition else { panic!("Expected a mapping") };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["", "{log_id}", "extra"]);
        assert!(matches!(&map[""], Entry::Name(name) if name == "root"));
        assert!(matches!(&map["extra"], Entry::Subtree(Definition::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(Definition::try_from(json!(3)), Err(PathtreesError::InvalidDefinition(_))));
        assert!(matches!(
            Definition::try_from(json!({"a": 3})),
            Err(PathtreesError::InvalidDefinition(_))
        ));
        assert!(matches!(Definition::try_from(json!([1])), Err(PathtreesError::InvalidDefinition(_))));
    }

    #[test]
    fn test_yaml_keeps_order() {
        let definition = Definition::from_yaml_str(
            "'': root\n'{log_id}':\n  model.h5: model\n  plots: [a.png]\nmeta.json: meta\n",
        )
        .unwrap();
        let Definition::Map(map) = definition else { panic!("Expected a mapping") };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["", "{log_id}", "meta.json"]);
    }
}
