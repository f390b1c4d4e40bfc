use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, Dependent};

/// Priority given to packages that don't declare one.
pub const DEFAULT_PRIORITY: i32 = 50;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn on() -> bool {
    true
}

/// A filesystem path to the contents of a package. May be relative to the
/// [`ModProfile`](crate::ModProfile) containing it.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct ModFile(pub(crate) PathBuf);

impl ModFile {
    pub fn make_absolute(&mut self, base: &Path) {
        if self.0.is_relative() {
            self.0 = base.join(&self.0);
        }
    }
}

/// A package is a source of files that override files the game requests. It points to a local
/// directory whose contents mirror the hierarchy they would be served under in the game's
/// virtual filesystem.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct Package {
    /// The unique identifier for this package.
    pub(crate) id: String,

    /// A path to the source of this package.
    #[serde(rename = "path", alias = "source")]
    pub(crate) source: ModFile,

    /// Files from packages with a higher priority win over files from packages with a lower one.
    #[serde(default = "default_priority")]
    pub(crate) priority: i32,

    /// Should this package be considered at all?
    #[serde(default = "on")]
    pub(crate) enabled: bool,

    /// Wildcard patterns, relative to the package root, of files that should not be served.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) exclude_files: Vec<String>,

    /// A list of package IDs that this package should load after.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) load_after: Vec<Dependent<String>>,

    /// A list of packages that this package should load before.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) load_before: Vec<Dependent<String>>,
}

impl Package {
    pub fn new(path: PathBuf) -> Self {
        let id = path
            .file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .into_owned();

        Self::with_id(id, path)
    }

    pub fn with_id<S: Into<String>>(id: S, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            source: ModFile(path),
            priority: DEFAULT_PRIORITY,
            enabled: true,
            exclude_files: vec![],
            load_after: vec![],
            load_before: vec![],
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_excluded_file<S: Into<String>>(mut self, pattern: S) -> Self {
        self.exclude_files.push(pattern.into());
        self
    }

    pub fn load_after(mut self, dependency: Dependent<String>) -> Self {
        self.load_after.push(dependency);
        self
    }

    pub fn load_before(mut self, dependency: Dependent<String>) -> Self {
        self.load_before.push(dependency);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Makes the package's source absolute using a given base directory (this is usually the mod
    /// profile's parent path).
    pub fn make_absolute(&mut self, base: &Path) {
        self.source.make_absolute(base);
    }
}

impl Dependency for Package {
    type UniqueId = String;

    fn id(&self) -> Self::UniqueId {
        self.id.clone()
    }

    fn loads_after(&self) -> &[Dependent<Self::UniqueId>] {
        &self.load_after
    }

    fn loads_before(&self) -> &[Dependent<Self::UniqueId>] {
        &self.load_before
    }
}

/// Anything that can contribute a directory of override files.
pub trait AssetOverrideSource {
    /// Identity reported alongside every override this source contributes.
    fn source_id(&self) -> &str;

    fn asset_path(&self) -> &Path;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn excluded_files(&self) -> &[String] {
        &[]
    }
}

impl AssetOverrideSource for Package {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn asset_path(&self) -> &Path {
        self.source.0.as_path()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn excluded_files(&self) -> &[String] {
        &self.exclude_files
    }
}

impl<T: AssetOverrideSource> AssetOverrideSource for &T {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn asset_path(&self) -> &Path {
        (**self).asset_path()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn excluded_files(&self) -> &[String] {
        (**self).excluded_files()
    }
}
