//! Scratch directories for files derived from overrides (merged data, converted assets).
//!
//! A [`CacheDirectory`] owns one namespace under the cache root. Paths are handed out inside
//! numbered buckets so that two unrelated producers asking for the same file name never write to
//! the same place:
//!
//! ```text
//! <root>/<namespace>/0/<key>   keys requested as unique
//! <root>/<namespace>/1/<key>   first shared bucket
//! <root>/<namespace>/2/<key>   ... used when bucket 1 already holds <key>
//! ```
//!
//! Every path returned by [`CacheDirectory::get_cache_path`] is a directory that exists on disk.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io, mem,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use modfs_env::CacheVars;
use normpath::PathExt;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Bucket reserved for keys requested as unique.
pub const UNIQUE_BUCKET: u32 = 0;

/// First bucket used for shared requests.
pub const FIRST_SHARED_BUCKET: u32 = 1;

/// Last bucket considered before giving up on a key.
pub const MAX_BUCKET: u32 = u32::MAX;

/// Where cache namespaces live. Passed explicitly to every [`CacheDirectory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub root: PathBuf,
}

impl CacheConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Uses `MODFS_CACHE_ROOT` when it is set, `default_root` otherwise.
    pub fn from_vars(vars: CacheVars, default_root: &Path) -> Self {
        Self::new(vars.root.unwrap_or_else(|| default_root.to_path_buf()))
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("cache namespace {0:?} must be a single directory name")]
    InvalidNamespace(String),

    #[error("could not create cache directory {path:?}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not resolve cache directory {path:?}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("the cache directory has not been started")]
    NotStarted,

    #[error("cache key {0:?} does not name a path inside the cache namespace")]
    InvalidKey(String),

    #[error("could not create cache directory {path:?}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every bucket up to [`MAX_BUCKET`] already holds the key. Not expected to happen in
    /// practice; treat it as an internal invariant violation.
    #[error("no cache bucket left for {0:?}")]
    Exhausted(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Started,
    Shutdown,
}

/// A [`CacheDirectory`] shared between threads. Directory creation and index updates happen
/// under the same lock.
pub type SharedCacheDirectory = Arc<Mutex<CacheDirectory>>;

#[derive(Debug)]
pub struct CacheDirectory {
    config: CacheConfig,
    state: State,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Started(Namespace),
    Shutdown,
}

#[derive(Debug)]
struct Namespace {
    name: String,
    relative: PathBuf,
    absolute: PathBuf,

    /// Relative paths (`"1"`, `"1/models/hud.txd"`) that already exist on disk.
    index: BTreeSet<String>,

    /// Bucket each shared key was first placed in.
    shared: BTreeMap<String, u32>,
}

impl CacheDirectory {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: State::Uninitialized,
        }
    }

    pub fn into_shared(self) -> SharedCacheDirectory {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn state(&self) -> CacheState {
        match self.state {
            State::Uninitialized => CacheState::Uninitialized,
            State::Started(_) => CacheState::Started,
            State::Shutdown => CacheState::Shutdown,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match &self.state {
            State::Started(namespace) => Some(&namespace.name),
            _ => None,
        }
    }

    /// Creates `<root>/<namespace>` along with the unique bucket and the first shared bucket.
    ///
    /// Starting an already started cache directory leaves the old namespace on disk and switches
    /// to the new one.
    #[instrument(skip(self), fields(root = ?self.config.root))]
    pub fn startup(&mut self, namespace: &str) -> Result<(), InitError> {
        if !is_single_component(namespace) {
            return Err(InitError::InvalidNamespace(namespace.to_string()));
        }

        if let State::Started(previous) = &self.state {
            debug!(previous = %previous.name, "replacing started cache namespace");
        }

        let relative = self.config.root.join(namespace);

        fs::create_dir_all(&relative).map_err(|source| InitError::CreateDirectory {
            path: relative.clone(),
            source,
        })?;

        let absolute = relative
            .normalize()
            .map_err(|source| InitError::Resolve {
                path: relative.clone(),
                source,
            })?
            .into_path_buf();

        let mut index = BTreeSet::new();
        for bucket in [UNIQUE_BUCKET, FIRST_SHARED_BUCKET] {
            let path = absolute.join(bucket.to_string());

            fs::create_dir_all(&path)
                .map_err(|source| InitError::CreateDirectory { path, source })?;

            index.insert(bucket.to_string());
        }

        info!(path = ?absolute, "cache namespace ready");

        self.state = State::Started(Namespace {
            name: namespace.to_string(),
            relative,
            absolute,
            index,
            shared: BTreeMap::new(),
        });

        Ok(())
    }

    /// Forgets every handed out path. With `destroy` the namespace directory is removed from disk
    /// as well. Does nothing unless the cache directory is started.
    #[instrument(skip(self))]
    pub fn shutdown(&mut self, destroy: bool) {
        let namespace = match mem::replace(&mut self.state, State::Shutdown) {
            State::Started(namespace) => namespace,
            previous => {
                self.state = previous;
                return;
            }
        };

        if destroy {
            match fs::remove_dir_all(&namespace.absolute) {
                Ok(()) => info!(path = ?namespace.absolute, "removed cache namespace"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(
                        path = ?namespace.absolute,
                        error = %e,
                        "unable to remove cache namespace"
                    )
                }
            }
        }
    }

    /// Base directory of the started namespace.
    pub fn base_path(&self, absolute: bool) -> Option<&Path> {
        match &self.state {
            State::Started(namespace) => Some(namespace.base(absolute)),
            _ => None,
        }
    }

    /// Returns a directory for `key`, creating it if needed.
    ///
    /// Unique keys always live in bucket [`UNIQUE_BUCKET`]. Shared keys are placed in the first
    /// bucket that doesn't hold them yet; asking again for a shared key returns the path it was
    /// first placed at.
    pub fn get_cache_path(
        &mut self,
        key: &str,
        absolute: bool,
        unique: bool,
    ) -> Result<PathBuf, AllocationError> {
        let key = normalize_key(key)?;
        let namespace = self.started_mut()?;

        if unique {
            return namespace.place(UNIQUE_BUCKET, &key, absolute);
        }

        if let Some(&bucket) = namespace.shared.get(&key) {
            return namespace.place(bucket, &key, absolute);
        }

        let (bucket, path) = namespace.place_in_free_bucket(&key, absolute)?;
        namespace.shared.insert(key, bucket);

        Ok(path)
    }

    /// Places `key` in the next shared bucket that doesn't hold it yet, for callers that need a
    /// separate copy of a key already handed out.
    pub fn get_distinct_cache_path(
        &mut self,
        key: &str,
        absolute: bool,
    ) -> Result<PathBuf, AllocationError> {
        let key = normalize_key(key)?;
        let namespace = self.started_mut()?;
        let (bucket, path) = namespace.place_in_free_bucket(&key, absolute)?;

        namespace.shared.entry(key).or_insert(bucket);

        Ok(path)
    }

    fn started_mut(&mut self) -> Result<&mut Namespace, AllocationError> {
        match &mut self.state {
            State::Started(namespace) => Ok(namespace),
            _ => Err(AllocationError::NotStarted),
        }
    }
}

impl Namespace {
    fn base(&self, absolute: bool) -> &Path {
        if absolute {
            &self.absolute
        } else {
            &self.relative
        }
    }

    fn place_in_free_bucket(
        &mut self,
        key: &str,
        absolute: bool,
    ) -> Result<(u32, PathBuf), AllocationError> {
        for bucket in FIRST_SHARED_BUCKET..=MAX_BUCKET {
            if !self.index.contains(&entry_name(bucket, key)) {
                return Ok((bucket, self.place(bucket, key, absolute)?));
            }
        }

        error!(key, "every cache bucket already holds this key");

        Err(AllocationError::Exhausted(key.to_string()))
    }

    fn place(
        &mut self,
        bucket: u32,
        key: &str,
        absolute: bool,
    ) -> Result<PathBuf, AllocationError> {
        let bucket_name = bucket.to_string();
        let entry = entry_name(bucket, key);

        for name in [bucket_name, entry.clone()] {
            if self.index.contains(&name) {
                continue;
            }

            let path = join_relative(&self.absolute, &name);
            fs::create_dir_all(&path)
                .map_err(|source| AllocationError::CreateDirectory { path, source })?;

            debug!(entry = %name, "created cache directory");
            self.index.insert(name);
        }

        Ok(join_relative(self.base(absolute), &entry))
    }
}

fn entry_name(bucket: u32, key: &str) -> String {
    format!("{bucket}/{key}")
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(base.to_path_buf(), |path, component| path.join(component))
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':'])
}

/// Cache keys are virtual paths: `/`-separated and compared case-insensitively. Anything that
/// would leave the bucket (`..`, drive or device prefixes) is rejected.
fn normalize_key(key: &str) -> Result<String, AllocationError> {
    let components = key
        .split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>();

    if components.is_empty() || components.iter().any(|c| *c == ".." || c.contains(':')) {
        return Err(AllocationError::InvalidKey(key.to_string()));
    }

    Ok(components.join("/").to_lowercase())
}
