use std::{
    cmp::Reverse,
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
    cache::{AllocationError, CacheDirectory},
    mapping::VfsKey,
    wildcard,
};

/// A file proposed by a mod source as a replacement for whatever matches `pattern`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideCandidate {
    /// Identity of the package or plugin that registered this file.
    pub source: String,

    /// Higher priorities win.
    pub priority: i32,

    /// Virtual path (or wildcard pattern over virtual paths) this file overrides.
    pub pattern: String,

    /// Where the replacement lives on disk.
    pub file: PathBuf,
}

impl OverrideCandidate {
    pub fn new<S, P, F>(source: S, priority: i32, pattern: P, file: F) -> Self
    where
        S: Into<String>,
        P: Into<String>,
        F: Into<PathBuf>,
    {
        Self {
            source: source.into(),
            priority,
            pattern: pattern.into(),
            file: file.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        wildcard::matches(&self.pattern, path)
    }
}

/// How a request is served once every eligible candidate is known.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A single candidate wins and its file is served as-is.
    Direct(&'a OverrideCandidate),

    /// Several candidates contribute to one merged file that the consumer writes into
    /// `cache_path`. Sources are ordered winner first.
    Merged {
        sources: Vec<&'a OverrideCandidate>,
        cache_path: PathBuf,
    },
}

impl Resolution<'_> {
    /// The winning candidate. Only a hand-built `Merged` without sources has none.
    pub fn winner(&self) -> Option<&OverrideCandidate> {
        match self {
            Resolution::Direct(candidate) => Some(*candidate),
            Resolution::Merged { sources, .. } => sources.first().copied(),
        }
    }
}

/// Picks which registered candidate serves a virtual path.
///
/// Among candidates whose pattern matches, the highest priority wins; between equal priorities
/// the one registered last wins, so sources registered later in load order shadow earlier ones.
#[derive(Debug, Default)]
pub struct FileResolver {
    candidates: Vec<OverrideCandidate>,

    /// Candidates without wildcards, indexed by lookup key.
    literals: HashMap<VfsKey, Vec<usize>>,

    /// Candidates whose pattern has to be matched against every request.
    wildcards: Vec<usize>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[OverrideCandidate] {
        &self.candidates
    }

    pub fn register(&mut self, candidate: OverrideCandidate) {
        let index = self.candidates.len();

        if wildcard::is_literal(&candidate.pattern) {
            self.literals
                .entry(VfsKey::for_vfs_path(&candidate.pattern))
                .or_default()
                .push(index);
        } else {
            self.wildcards.push(index);
        }

        self.candidates.push(candidate);
    }

    /// Returns the candidate that wins for `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&OverrideCandidate> {
        self.eligible(path)
            .into_iter()
            .max_by_key(|(index, candidate)| (candidate.priority, *index))
            .map(|(_, candidate)| candidate)
    }

    /// Returns every candidate for `path`, winner first.
    pub fn resolve_all(&self, path: &str) -> Vec<&OverrideCandidate> {
        let mut eligible = self.eligible(path);
        eligible.sort_by_key(|(index, candidate)| Reverse((candidate.priority, *index)));
        eligible.into_iter().map(|(_, candidate)| candidate).collect()
    }

    /// Resolves `path`, allocating a cache directory for the merged result when more than one
    /// candidate applies.
    #[instrument(skip(self, cache))]
    pub fn resolve_with_cache(
        &self,
        path: &str,
        cache: &mut CacheDirectory,
    ) -> Result<Option<Resolution<'_>>, AllocationError> {
        let mut sources = self.resolve_all(path);

        match sources.len() {
            0 => Ok(None),
            1 => Ok(sources.pop().map(Resolution::Direct)),
            count => {
                let key = VfsKey::for_vfs_path(path);
                let cache_path = cache.get_cache_path(key.as_str(), true, false)?;

                debug!(count, cache_path = ?cache_path, "merging overrides");

                Ok(Some(Resolution::Merged {
                    sources,
                    cache_path,
                }))
            }
        }
    }

    /// Disk path of the winning file for `path`.
    pub fn override_path(&self, path: &str) -> Option<&Path> {
        self.resolve(path).map(|candidate| candidate.file.as_path())
    }

    fn eligible(&self, path: &str) -> Vec<(usize, &OverrideCandidate)> {
        let key = VfsKey::for_vfs_path(path);

        let literal = self.literals.get(&key).into_iter().flatten().copied();
        let wildcards = self
            .wildcards
            .iter()
            .copied()
            .filter(|index| self.candidates[*index].matches(key.as_str()));

        literal
            .chain(wildcards)
            .map(|index| (index, &self.candidates[index]))
            .collect()
    }
}
