//! Build configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Node kinds treated as opaque roots by default.
pub const DEFAULT_BLACKLIST: &[&str] = &["transparent_bsdf", "ShaderNodeBsdfTransparent"];

/// Configuration for discovery and atlas building.
#[derive(Debug, Clone, PartialEq)]
pub struct PackerConfig {
    /// Side length in pixels of an atlas at group scale 1.
    pub max_resolution: u32,
    /// Node kind names that are never treated as texture roots.
    pub node_blacklist: BTreeSet<String>,
    /// Directory atlas PNGs are written to.
    pub output_dir: PathBuf,
    /// Write atlas files. When false atlases only live in the scene.
    pub write_files: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            max_resolution: 4096,
            node_blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            output_dir: PathBuf::from("."),
            write_files: true,
        }
    }
}

impl PackerConfig {
    pub fn with_max_resolution(mut self, max_resolution: u32) -> Self {
        self.max_resolution = max_resolution;
        self
    }

    /// Add node kinds to the blacklist.
    pub fn with_blacklist<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_blacklist.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_write_files(mut self, write_files: bool) -> Self {
        self.write_files = write_files;
        self
    }
}
