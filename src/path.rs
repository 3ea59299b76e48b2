//! Rendered paths that still carry their template and bindings.
//! A `Path` reads like a string but keeps enough state to be specified
//! further, globbed, parsed, or translated to a sibling path of its tree.

use generational_arena::Index;
use log::debug;
use serde_json::Value;
use std::fmt;
use std::ops::Div;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{PathtreesError, PathtreesResult};
use crate::filesystem::{Filesystem, LocalFilesystem, Matches};
use crate::template::{Data, Template};
use crate::tree::{to_data, Structure};

/// Where a path came from, for sibling and parent lookups.
#[derive(Debug, Clone)]
struct Origin {
    structure: Arc<Structure>,
    index: Index,
}

/// A partially or fully rendered template.
#[derive(Debug, Clone)]
pub struct Path {
    template: Template,
    data: Data,
    rendered: String,
    origin: Option<Origin>,
}

/// Result of rendering a path that may still have open placeholders.
#[derive(Debug, Clone)]
pub enum Formatted {
    Complete(String),
    Partial(Path),
}

impl Formatted {
    pub fn is_complete(&self) -> bool {
        matches!(self, Formatted::Complete(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Formatted::Complete(s) => s.as_str(),
            Formatted::Partial(path) => path.as_str(),
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Formatted::Partial(path) => Some(path),
            Formatted::Complete(_) => None,
        }
    }
}

impl fmt::Display for Formatted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Path {
    /// A free-standing path with no bindings.
    pub fn new<S: Into<String>>(raw: S) -> PathtreesResult<Self> {
        Self::with_data(raw, Data::new())
    }

    pub fn with_data<S: Into<String>>(raw: S, data: Data) -> PathtreesResult<Self> {
        Ok(Self::build(Template::new(raw)?, data, None))
    }

    pub(crate) fn from_node(structure: Arc<Structure>, index: Index, data: Data) -> Option<Self> {
        let template = structure.node(index)?.template().clone();
        Some(Self::build(template, data, Some(Origin { structure, index })))
    }

    fn build(template: Template, data: Data, origin: Option<Origin>) -> Self {
        let rendered = template
            .format_lenient(&data)
            .unwrap_or_else(|_| template.partial_format(&data));
        Self { template, data, rendered, origin }
    }

    fn derive(&self, template: Template, data: Data) -> Self {
        Self::build(template, data, self.origin.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// The unformatted template string.
    pub fn raw(&self) -> &str {
        self.template.raw()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    /// The logical name of the tree node this path was made from.
    pub fn name(&self) -> Option<&str> {
        let origin = self.origin.as_ref()?;
        origin.structure.node(origin.index)?.name()
    }

    /// The last component of the rendered path.
    pub fn file_name(&self) -> Option<&str> {
        std::path::Path::new(&self.rendered).file_name()?.to_str()
    }

    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(self.rendered)
    }

    pub fn specify<I, K, V>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut data = self.data.clone();
        data.extend(to_data(bindings));
        self.derive(self.template.clone(), data)
    }

    pub fn unspecify<I, K>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut data = self.data.clone();
        for name in names {
            data.shift_remove(name.as_ref());
        }
        self.derive(self.template.clone(), data)
    }

    pub fn fully_specified(&self) -> bool {
        self.template.fully_specified(&self.data)
    }

    /// Placeholder names that are still unbound.
    pub fn unspecified(&self) -> Vec<String> {
        self.template.missing(&self.data)
    }

    pub fn format(&self) -> PathtreesResult<String> {
        self.template.format(&self.data)
    }

    pub fn format_with<I, K, V>(&self, bindings: I) -> PathtreesResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).format()
    }

    pub fn partial_format(&self) -> String {
        self.template.partial_format(&self.data)
    }

    pub fn partial_format_with<I, K, V>(&self, bindings: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).partial_format()
    }

    /// The finished string when every placeholder is bound, otherwise this
    /// path. Values a format spec can't render are written as is.
    pub fn maybe_format(&self) -> Formatted {
        if self.fully_specified() {
            Formatted::Complete(self.rendered.clone())
        } else {
            Formatted::Partial(self.clone())
        }
    }

    pub fn glob_format(&self) -> String {
        self.template.glob_format(&self.data)
    }

    pub fn glob_format_with<I, K, V>(&self, bindings: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).glob_format()
    }

    /// Existing paths matching `glob_format`, sorted.
    pub fn glob(&self) -> PathtreesResult<Vec<String>> {
        self.glob_in(&LocalFilesystem)
    }

    pub fn glob_with<I, K, V>(&self, bindings: I) -> PathtreesResult<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).glob()
    }

    pub fn glob_in(&self, fs: &dyn Filesystem) -> PathtreesResult<Vec<String>> {
        let mut found = self.iglob_in(fs)?.collect::<PathtreesResult<Vec<_>>>()?;
        found.sort();
        Ok(found)
    }

    /// Existing paths matching `glob_format`, produced lazily in walk order.
    pub fn iglob(&self) -> PathtreesResult<Matches> {
        self.iglob_in(&LocalFilesystem)
    }

    pub fn iglob_with<I, K, V>(&self, bindings: I) -> PathtreesResult<Matches>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).iglob()
    }

    pub fn iglob_in(&self, fs: &dyn Filesystem) -> PathtreesResult<Matches> {
        fs.iglob(&self.glob_format())
    }

    pub fn parse(&self, path: &str) -> PathtreesResult<Data> {
        self.template.parse(path)
    }

    /// Parses `path` with this template and renders the sibling `to` with the
    /// parsed values layered over this path's bindings.
    ///
    /// # Errors
    /// * `PathtreesError::NoSuchPath` if `to` isn't registered in this path's tree
    pub fn translate(&self, path: &str, to: &str) -> PathtreesResult<Path> {
        let origin = self
            .origin
            .as_ref()
            .ok_or_else(|| PathtreesError::NoSuchPath(to.to_string()))?;
        let target = origin.structure.lookup(to)?;
        let mut data = self.data.clone();
        data.extend(self.parse(path)?);
        Path::from_node(Arc::clone(&origin.structure), target, data)
            .ok_or_else(|| PathtreesError::NoSuchPath(to.to_string()))
    }

    /// Appends a segment, which may contain placeholders.
    pub fn join(&self, segment: &str) -> PathtreesResult<Path> {
        Ok(Self::build(self.template.join(segment)?, self.data.clone(), None))
    }

    /// Expands a leading `~` to the home directory.
    pub fn expanduser(&self) -> PathtreesResult<Path> {
        let expanded = shellexpand::tilde(self.raw());
        if expanded == self.raw() {
            return Ok(self.clone());
        }
        Ok(Self::build(Template::new(expanded.into_owned())?, self.data.clone(), None))
    }

    /// The enclosing directory: the parent node when this path belongs to a
    /// tree, otherwise the template cut at its last separator.
    pub fn parent(&self) -> Option<Path> {
        if let Some(origin) = &self.origin {
            if let Some(parent) = origin.structure.parent(origin.index) {
                return Path::from_node(Arc::clone(&origin.structure), parent, self.data.clone());
            }
        }
        let template = self.template.parent()?;
        Some(Self::build(template, self.data.clone(), None))
    }

    /// Direct children of this path's tree node.
    pub fn children(&self) -> Vec<Path> {
        let Some(origin) = &self.origin else { return Vec::new() };
        origin
            .structure
            .children(origin.index)
            .iter()
            .filter_map(|&child| {
                Path::from_node(Arc::clone(&origin.structure), child, self.data.clone())
            })
            .collect()
    }

    pub fn exists(&self) -> bool {
        self.fully_specified() && std::path::Path::new(self.as_str()).exists()
    }

    /// Removes the file this path points to.
    ///
    /// # Errors
    /// * `PathtreesError::MissingKey` if the path isn't fully specified
    pub fn rm(&self) -> PathtreesResult<()> {
        let target = self.format()?;
        LocalFilesystem.remove(&target)
    }

    /// Removes every file matching `glob_format` and returns what was removed.
    /// Directories are left in place.
    pub fn rmglob(&self) -> PathtreesResult<Vec<String>> {
        let fs = LocalFilesystem;
        let mut removed = Vec::new();
        for found in self.glob_in(&fs)? {
            if std::path::Path::new(&found).is_dir() {
                debug!("Skipping directory {}", found);
                continue;
            }
            fs.remove(&found)?;
            removed.push(found);
        }
        Ok(removed)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rendered)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

impl AsRef<std::path::Path> for Path {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.rendered)
    }
}

impl PartialEq<str> for Path {
    fn eq(&self, other: &str) -> bool {
        self.rendered == other
    }
}

impl PartialEq<&str> for Path {
    fn eq(&self, other: &&str) -> bool {
        self.rendered == *other
    }
}

impl PartialEq<String> for Path {
    fn eq(&self, other: &String) -> bool {
        &self.rendered == other
    }
}

impl Div<&str> for &Path {
    type Output = PathtreesResult<Path>;

    fn div(self, segment: &str) -> PathtreesResult<Path> {
        self.join(segment)
    }
}

impl Div<&str> for Path {
    type Output = PathtreesResult<Path>;

    fn div(self, segment: &str) -> PathtreesResult<Path> {
        self.join(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rendered_form() {
        let path = Path::new("a/{{b}}/{c}").unwrap();
        assert_eq!(path.as_str(), "a/{{b}}/{c}");
        let path = path.specify([("c", "x")]);
        assert_eq!(path.as_str(), "a/{b}/x");
        assert!(path.fully_specified());
    }

    #[test]
    fn test_maybe_format() {
        let path = Path::new("{a}/{b}").unwrap().specify([("a", json!(1))]);
        let formatted = path.maybe_format();
        assert!(!formatted.is_complete());
        assert_eq!(formatted.as_str(), "1/{b}");
        assert!(path.specify([("b", "z")]).maybe_format().is_complete());
    }

    #[test]
    fn test_free_path_has_no_siblings() {
        let path = Path::new("a/{x}").unwrap();
        assert!(matches!(path.translate("a/1", "other"), Err(PathtreesError::NoSuchPath(_))));
        assert!(path.children().is_empty());
        assert_eq!(path.parent().unwrap().raw(), "a");
    }
}
