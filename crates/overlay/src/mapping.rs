use std::{
    collections::VecDeque,
    fmt,
    fs::read_dir,
    io,
    path::{Path, PathBuf, StripPrefixError},
};

use modfs_mod_protocol::{
    dependency::{Dependency, DependencyError},
    package::AssetOverrideSource,
    ModProfile,
};
use normpath::PathExt;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::{
    resolver::{FileResolver, OverrideCandidate},
    wildcard,
};

/// Collects override files contributed by packages into a [`FileResolver`].
#[derive(Default)]
pub struct OverrideMapping {
    resolver: FileResolver,
}

#[derive(Debug, Error)]
pub enum OverrideMappingError {
    #[error("Package source specified is not a directory {0}.")]
    InvalidDirectory(PathBuf),

    #[error("Could not read directory while discovering override assets {0}")]
    ReadDir(io::Error),

    #[error("Could not acquire directory entry")]
    StripPrefix(#[from] StripPrefixError),

    #[error("Could not order packages: {0}")]
    Dependency(#[from] DependencyError),
}

impl OverrideMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    pub fn into_resolver(self) -> FileResolver {
        self.resolver
    }

    /// Registers a candidate that doesn't come from a package directory, such as a wildcard
    /// override supplied by a plugin.
    pub fn register(&mut self, candidate: OverrideCandidate) {
        self.resolver.register(candidate);
    }

    /// Scans every enabled package of `profile` in load order, skipping packages whose ID matches
    /// one of the profile's exclusion patterns.
    #[instrument(skip_all)]
    pub fn scan_profile(&mut self, profile: &ModProfile) -> Result<(), OverrideMappingError> {
        let excluded = profile.exclude_packages();

        for package in profile.ordered_packages()? {
            let id = package.id();

            if excluded.iter().any(|pattern| wildcard::matches(pattern, &id)) {
                info!(package = %id, "package excluded by profile");
                continue;
            }

            self.scan_package(&package)?;
        }

        Ok(())
    }

    /// Scans a set of packages, mapping discovered assets into itself.
    pub fn scan_packages<I, S>(&mut self, sources: I) -> Result<(), OverrideMappingError>
    where
        I: IntoIterator<Item = S>,
        S: AssetOverrideSource,
    {
        sources
            .into_iter()
            .try_for_each(|source| self.scan_package(source))
    }

    /// Traverses a package's folder structure, registering every file it contains as an override
    /// for the virtual path it sits at.
    #[instrument(skip_all, fields(source = source.source_id()))]
    pub fn scan_package<S: AssetOverrideSource>(
        &mut self,
        source: S,
    ) -> Result<(), OverrideMappingError> {
        let base_directory = source
            .asset_path()
            .normalize()
            .map_err(|_| OverrideMappingError::InvalidDirectory(source.asset_path().to_owned()))?
            .into_path_buf();

        if !base_directory.is_dir() {
            return Err(OverrideMappingError::InvalidDirectory(base_directory));
        }

        let mut registered = 0usize;
        let mut paths_to_scan = VecDeque::from(vec![base_directory.clone()]);

        while let Some(current_path) = paths_to_scan.pop_front() {
            let entries = match read_dir(&current_path) {
                Ok(entries) => entries,
                Err(e) if current_path == base_directory => {
                    return Err(OverrideMappingError::ReadDir(e));
                }
                Err(e) => {
                    error!(
                        path = ?current_path,
                        error = %e,
                        "unable to read override files in directory"
                    );
                    continue;
                }
            };

            for dir_entry in entries.flatten().map(|e| e.path()) {
                if dir_entry.is_dir() {
                    paths_to_scan.push_back(dir_entry);
                    continue;
                }

                let vfs_path = VfsKey::relative_path(&dir_entry, &base_directory)?;

                if source
                    .excluded_files()
                    .iter()
                    .any(|pattern| wildcard::matches(pattern, &vfs_path))
                {
                    debug!(path = %vfs_path, "file excluded by package");
                    continue;
                }

                self.resolver.register(OverrideCandidate::new(
                    source.source_id(),
                    source.priority(),
                    vfs_path,
                    dir_entry,
                ));

                registered += 1;
            }
        }

        info!(path = ?base_directory, registered, "scanned package");

        Ok(())
    }

    /// Disk path of the file that should be served for a virtual path like
    /// `data0:/event/m10.emevd`.
    pub fn vfs_override<S: AsRef<str>>(&self, path: S) -> Option<&Path> {
        self.resolver.override_path(path.as_ref())
    }
}

impl fmt::Debug for OverrideMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.resolver
                    .candidates()
                    .iter()
                    .map(|candidate| (&candidate.pattern, &candidate.file)),
            )
            .finish()
    }
}

/// Lookup key for a virtual path: `/`-separated, without a device prefix (`data0:`) or empty
/// segments, case folded.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct VfsKey(String);

impl VfsKey {
    pub(crate) fn for_vfs_path(path: &str) -> Self {
        let normalized = path
            .split(['/', '\\'])
            .filter(|c| !c.is_empty() && *c != ".")
            .skip_while(|c| c.ends_with(':'))
            .collect::<Vec<_>>()
            .join("/")
            .to_lowercase();

        Self(normalized)
    }

    /// Turns a file inside `base` into the `/`-separated virtual path it overrides. Case is kept
    /// so the path can double as a readable pattern.
    fn relative_path(path: &Path, base: &Path) -> Result<String, StripPrefixError> {
        let relative = path.strip_prefix(base)?;

        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}
