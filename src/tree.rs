//! Named path trees.
//! A tree is built once from a declarative definition into an arena of
//! nodes, each holding the full template of its path. The structure is shared
//! between tree values; `specify`, `unspecify` and `add` return new trees and
//! never touch the receiver.

use generational_arena::{Arena, Index};
use indexmap::IndexMap;
use log::{debug, trace};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::constants::SEPARATOR;
use crate::definition::{Definition, Entry};
use crate::error::{PathtreesError, PathtreesResult};
use crate::filesystem::{Filesystem, LocalFilesystem};
use crate::path::{Formatted, Path};
use crate::template::{join_raw, Data, Template};

/// A directory or file in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    name: Option<String>,
    segment: String,
    template: Template,
    parent: Option<Index>,
    children: Vec<Index>,
}

impl Node {
    /// The first logical name registered for this node, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The segment this node adds below its parent.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn raw(&self) -> &str {
        self.template.raw()
    }
}

/// Arena storage shared by every tree value derived from the same build.
#[derive(Debug, Clone)]
pub(crate) struct Structure {
    arena: Arena<Node>,
    /// `roots[0]` is the tree root; further roots come from grafts at
    /// prefixes outside of it.
    roots: Vec<Index>,
    names: IndexMap<String, Index>,
}

impl Structure {
    fn new() -> Self {
        Self { arena: Arena::new(), roots: Vec::new(), names: IndexMap::new() }
    }

    fn root(&self) -> Option<Index> {
        self.roots.first().copied()
    }

    pub(crate) fn node(&self, index: Index) -> Option<&Node> {
        self.arena.get(index)
    }



    pub(crate) fn parent(&self, index: Index) -> Option<Index> {
        self.node(index).and_then(|node| node.parent)
    }

    pub(crate) fn children(&self, index: Index) -> &[Index] {
        self.node(index).map(|node| node.children.as_slice()).unwrap_or_default()
    }

    pub(crate) fn lookup(&self, name: &str) -> PathtreesResult<Index> {
        self.names.get(name).copied().ok_or_else(|| PathtreesError::NoSuchPath(name.to_string()))
    }

    fn insert(&mut self, segment: &str, parent: Option<Index>) -> PathtreesResult<Index> {
        let raw = match parent.and_then(|p| self.arena.get(p)) {
            Some(parent) => join_raw(parent.raw(), segment),
            None => segment.to_string(),
        };
        let node = Node {
            name: None,
            segment: segment.to_string(),
            template: Template::new(raw)?,
            parent,
            children: Vec::new(),
        };
        trace!("Inserting node {}", node.raw());
        let index = self.arena.insert(node);

        match parent.and_then(|p| self.arena.get_mut(p)) {
            Some(parent) => parent.children.push(index),
            None => self.roots.push(index),
        }
        Ok(index)
    }

    /// Returns the child of `parent` at `segment`, creating it if needed.
    fn child(&mut self, parent: Index, segment: &str) -> PathtreesResult<Index> {
        let existing = self
            .children(parent)
            .iter()
            .copied()
            .find(|&c| self.arena.get(c).is_some_and(|node| node.segment == segment));
        match existing {
            Some(index) => Ok(index),
            None => self.insert(segment, Some(parent)),
        }
    }

    fn register(&mut self, index: Index, name: &str) -> PathtreesResult<()> {
        if self.names.contains_key(name) {
            return Err(PathtreesError::DuplicateName(name.to_string()));
        }
        self.names.insert(name.to_string(), index);
        if let Some(node) = self.arena.get_mut(index) {
            node.name.get_or_insert_with(|| name.to_string());
        }
        Ok(())
    }

    fn attach(&mut self, at: Index, entry: Entry, data: &mut Data) -> PathtreesResult<()> {
        match entry {
            Entry::Name(name) => self.register(at, &name),
            Entry::Subtree(definition) => self.build(at, definition, data),
            Entry::Tree(tree) => self.graft(at, &tree, data),
        }
    }

    fn build(&mut self, at: Index, definition: Definition, data: &mut Data) -> PathtreesResult<()> {
        match definition {
            Definition::Map(entries) => {
                for (segment, entry) in entries {
                    let target = if is_here(&segment) { at } else { self.child(at, &segment)? };
                    self.attach(target, entry, data)?;
                }
            }
            Definition::List(paths) => {
                for path in paths {
                    let target = self.child(at, &path)?;
                    self.register(target, &path)?;
                }
            }
        }
        Ok(())
    }

    /// Copies another tree's nodes below `at`. Its bindings fill in keys this
    /// tree doesn't bind yet.
    fn graft(&mut self, at: Index, tree: &Tree, data: &mut Data) -> PathtreesResult<()> {
        let other = &tree.structure;
        for &root in &other.roots {
            self.copy(at, other, root)?;
        }
        for (key, value) in &tree.data {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Ok(())
    }

    fn copy(&mut self, at: Index, other: &Structure, index: Index) -> PathtreesResult<()> {
        let Some(node) = other.node(index) else { return Ok(()) };
        let target = if is_here(&node.segment) { at } else { self.child(at, &node.segment)? };

        for (name, _) in other.names.iter().filter(|(_, i)| **i == index) {
            self.register(target, name)?;
        }
        for &child in &node.children {
            self.copy(target, other, child)?;
        }
        Ok(())
    }

    /// The node whose template is exactly `prefix`.
    fn find(&self, prefix: &str) -> Option<Index> {
        let prefix = normalize(prefix);
        self.arena.iter().find(|(_, node)| normalize(node.raw()) == prefix).map(|(index, _)| index)
    }

    /// Creates a node at `prefix` below the deepest node that contains it.
    fn synthesize(&mut self, prefix: &str) -> PathtreesResult<Index> {
        let prefix = normalize(prefix);
        let host = self
            .arena
            .iter()
            .filter_map(|(index, node)| {
                let raw = normalize(node.raw());
                let inside = raw.is_empty()
                    || prefix
                        .strip_prefix(raw)
                        .is_some_and(|rest| rest.starts_with(SEPARATOR));
                inside.then_some((index, raw.len()))
            })
            .max_by_key(|(_, len)| *len);

        match host {
            Some((index, len)) => {
                let rest = prefix[len..].trim_start_matches(SEPARATOR);
                debug!("Creating '{}' below '{}'", rest, &prefix[..len]);
                self.insert(rest, Some(index))
            }
            None => {
                debug!("Creating detached root '{}'", prefix);
                self.insert(prefix, None)
            }
        }
    }
}

/// `''` and `.` both name the directory they appear in.
fn is_here(segment: &str) -> bool {
    segment.is_empty() || segment == "."
}

fn normalize(raw: &str) -> &str {
    if raw.len() > 1 {
        raw.trim_end_matches(SEPARATOR)
    } else {
        raw
    }
}

/// Converts `(name, value)` pairs into bound data.
pub(crate) fn to_data<I, K, V>(bindings: I) -> Data
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    bindings.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// A set of named path templates sharing one set of bindings.
#[derive(Debug, Clone)]
pub struct Tree {
    structure: Arc<Structure>,
    data: Data,
}

impl Tree {
    /// Builds a tree whose root directory is `root`.
    ///
    /// # Errors
    /// * `PathtreesError::DuplicateName` if two nodes claim the same logical name
    /// * `PathtreesError::InvalidTemplate` if a segment isn't a valid template
    pub fn new<D>(root: &str, definition: D) -> PathtreesResult<Self>
    where
        D: TryInto<Definition>,
        PathtreesError: From<D::Error>,
    {
        let definition = definition.try_into()?;
        let mut structure = Structure::new();
        let mut data = Data::new();
        let root_index = structure.insert(root, None)?;
        structure.build(root_index, definition, &mut data)?;
        debug!("Built tree '{}' with {} named paths", root, structure.names.len());
        Ok(Self { structure: Arc::new(structure), data })
    }

    /// Builds a tree without a root directory.
    pub fn from_definition<D>(definition: D) -> PathtreesResult<Self>
    where
        D: TryInto<Definition>,
        PathtreesError: From<D::Error>,
    {
        Self::new("", definition)
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.structure.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structure.names.is_empty()
    }

    /// Logical names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.structure.names.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.structure.names.contains_key(name)
    }

    /// The node registered under `name`.
    pub fn node(&self, name: &str) -> PathtreesResult<&Node> {
        let index = self.structure.lookup(name)?;
        self.structure.node(index).ok_or_else(|| PathtreesError::NoSuchPath(name.to_string()))
    }

    /// The path registered under `name`, carrying this tree's bindings.
    ///
    /// # Errors
    /// * `PathtreesError::NoSuchPath` if `name` isn't registered
    pub fn get_path(&self, name: &str) -> PathtreesResult<Path> {
        let index = self.structure.lookup(name)?;
        self.path_at(index, self.data.clone())
            .ok_or_else(|| PathtreesError::NoSuchPath(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Path> {
        self.get_path(name).ok()
    }

    /// The root directory.
    pub fn root(&self) -> Option<Path> {
        self.path_at(self.structure.root()?, self.data.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Path)> + '_ {
        self.structure
            .names
            .iter()
            .filter_map(|(name, &index)| {
                Some((name.as_str(), self.path_at(index, self.data.clone())?))
            })
    }

    fn path_at(&self, index: Index, data: Data) -> Option<Path> {
        Path::from_node(Arc::clone(&self.structure), index, data)
    }

    fn named_templates(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.structure.names.iter().filter_map(|(name, &index)| {
            self.structure.node(index).map(|node| (name.as_str(), node.template()))
        })
    }

    /// Returns a new tree with `bindings` layered over the current ones.
    pub fn specify<I, K, V>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut data = self.data.clone();
        data.extend(to_data(bindings));
        Self { structure: Arc::clone(&self.structure), data }
    }

    /// Returns a new tree without the given bindings. Unknown names are ignored.
    pub fn unspecify<I, K>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut data = self.data.clone();
        for name in names {
            data.shift_remove(name.as_ref());
        }
        Self { structure: Arc::clone(&self.structure), data }
    }

    pub fn fully_specified(&self) -> bool {
        self.named_templates().all(|(_, template)| template.fully_specified(&self.data))
    }

    /// Placeholder names still unbound somewhere in the tree.
    pub fn unspecified(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.named_templates()
            .flat_map(|(_, template)| template.missing(&self.data))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Formats every path, failing on the first one that isn't fully specified.
    pub fn format(&self) -> PathtreesResult<IndexMap<String, String>> {
        self.named_templates()
            .map(|(name, template)| -> PathtreesResult<(String, String)> {
                let formatted = template.format(&self.data).map_err(|e| match e {
                    PathtreesError::MissingKey { keys, .. } => PathtreesError::MissingKey {
                        target: format!("'{}' ({})", name, template.raw()),
                        keys,
                    },
                    other => other,
                })?;
                Ok((name.to_string(), formatted))
            })
            .collect()
    }

    pub fn format_with<I, K, V>(&self, bindings: I) -> PathtreesResult<IndexMap<String, String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).format()
    }

    /// A finished string for each fully specified path and a partial `Path`
    /// for the others.
    pub fn maybe_format(&self) -> IndexMap<String, Formatted> {
        self.iter().map(|(name, path)| (name.to_string(), path.maybe_format())).collect()
    }

    pub fn maybe_format_with<I, K, V>(&self, bindings: I) -> IndexMap<String, Formatted>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).maybe_format()
    }

    /// A `Path` for every name, whether or not it is fully specified.
    pub fn partial_format(&self) -> IndexMap<String, Path> {
        self.iter().map(|(name, path)| (name.to_string(), path)).collect()
    }

    pub fn partial_format_with<I, K, V>(&self, bindings: I) -> IndexMap<String, Path>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.specify(bindings).partial_format()
    }

    /// Glob patterns for every name.
    pub fn glob_format(&self) -> IndexMap<String, String> {
        self.named_templates()
            .map(|(name, template)| (name.to_string(), template.glob_format(&self.data)))
            .collect()
    }

    /// Existing paths for every name, each list sorted.
    pub fn glob(&self) -> PathtreesResult<IndexMap<String, Vec<String>>> {
        self.glob_in(&LocalFilesystem)
    }

    pub fn glob_in(&self, fs: &dyn Filesystem) -> PathtreesResult<IndexMap<String, Vec<String>>> {
        self.iter()
            .map(|(name, path)| -> PathtreesResult<(String, Vec<String>)> {
                Ok((name.to_string(), path.glob_in(fs)?))
            })
            .collect()
    }

    /// Extracts slot values from `path` using the template registered as `name`.
    pub fn parse(&self, path: &str, name: &str) -> PathtreesResult<Data> {
        self.node(name)?.template().parse(path)
    }

    /// Parses `path` as a `from` path and renders the `to` path with the
    /// result. With `use_data` the tree's bindings fill in whatever the
    /// parsed path doesn't provide; without it only parsed values are used.
    pub fn translate(
        &self,
        path: &str,
        from: &str,
        to: &str,
        use_data: bool,
    ) -> PathtreesResult<Path> {
        let parsed = self.parse(path, from)?;
        let target = self.structure.lookup(to)?;
        let data = if use_data {
            let mut data = self.data.clone();
            data.extend(parsed);
            data
        } else {
            parsed
        };
        self.path_at(target, data).ok_or_else(|| PathtreesError::NoSuchPath(to.to_string()))
    }

    /// Returns a new tree with `entry` attached at the node whose template is
    /// `prefix`. A directory node is created there if none exists.
    ///
    /// # Errors
    /// * `PathtreesError::DuplicateName` if the entry reuses a registered name
    pub fn add<E>(&self, prefix: &str, entry: E) -> PathtreesResult<Self>
    where
        E: TryInto<Entry>,
        PathtreesError: From<E::Error>,
    {
        let entry = entry.try_into()?;
        let mut structure = (*self.structure).clone();
        let mut data = self.data.clone();

        let at = match structure.find(prefix) {
            Some(index) => index,
            None => structure.synthesize(prefix)?,
        };
        structure.attach(at, entry, &mut data)?;
        debug!("Added paths at '{}', {} named paths", prefix, structure.names.len());

        Ok(Self { structure: Arc::new(structure), data })
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(
            f: &mut fmt::Formatter<'_>,
            structure: &Structure,
            index: Index,
            depth: usize,
        ) -> fmt::Result {
            let Some(node) = structure.node(index) else { return Ok(()) };
            let label = if node.segment.is_empty() { "." } else { node.segment.as_str() };
            write!(f, "{}{}", "  ".repeat(depth), label)?;
            if let Some(name) = node.name() {
                write!(f, " ({name})")?;
            }
            writeln!(f)?;
            for &child in &node.children {
                write_node(f, structure, child, depth + 1)?;
            }
            Ok(())
        }

        for &root in &self.structure.roots {
            write_node(f, &self.structure, root, 0)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = (&'a str, Path);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, Path)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
