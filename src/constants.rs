//! Common constants used throughout pathtrees.

/// Supported tree definition file names
pub const DEFINITION_FILES: [&str; 3] = ["pathtrees.json", "pathtrees.yml", "pathtrees.yaml"];

/// Separator used to join path segments
pub const SEPARATOR: char = '/';

/// Single-segment wildcard substituted for unbound placeholders
pub const WILDCARD: &str = "*";
