//! pathtrees describes a directory structure as a tree of named path
//! templates such as `logs/{log_id}/model.h5`. Placeholders can be bound
//! incrementally, rendered strictly or partially, turned into glob patterns,
//! and parsed back out of concrete paths.
//!
//! ```ignore
//! use serde_json::json;
//!
//! let paths = pathtrees::tree("logs", json!({
//!     "": "root",
//!     "{log_id}": {"model.h5": "model"},
//! }))?;
//! let paths = paths.specify([("log_id", "a")]);
//! assert_eq!(paths.format()?["model"], "logs/a/model.h5");
//! ```

/// Common constants: separator, wildcard and definition file names
pub mod constants;

/// Declarative tree definitions, inline or loaded from JSON / YAML files
pub mod definition;

/// PathtreesError types and handling for pathtrees
pub mod error;

/// Host filesystem collaborator used for globbing and removal
pub mod filesystem;

/// Format spec suffixes such as `{step:03d}`
pub mod format_spec;

/// Rendered path values that keep their template and bindings
pub mod path;

/// Placeholder templates: format, partial format, glob and parse
pub mod template;

/// Named path trees built from definitions
pub mod tree;

pub use definition::{Definition, Entry};
pub use error::{PathtreesError, PathtreesResult};
pub use filesystem::{Filesystem, LocalFilesystem};
pub use path::{Formatted, Path};
pub use template::{Data, Template};
pub use tree::{Node, Tree};

/// Builds a tree rooted at `root` from a definition.
///
/// The definition can be a `serde_json::Value` mapping or list, a list of
/// literal paths, or an already built `Definition`.
pub fn tree<D>(root: &str, definition: D) -> PathtreesResult<Tree>
where
    D: TryInto<Definition>,
    PathtreesError: From<D::Error>,
{
    Tree::new(root, definition)
}
