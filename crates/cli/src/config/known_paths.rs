use std::path::{Path, PathBuf};

use directories::ProjectDirs;

#[derive(Debug)]
pub struct KnownDirs {
    /// The current working directory we launched from.
    cwd: Option<Box<Path>>,

    /// Linux installation prefix (defaults to /)
    #[cfg(target_os = "linux")]
    prefix: Option<Box<Path>>,

    project_dirs: Option<ProjectDirs>,
}

pub trait OptionalPathExt {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>;
}

impl<S: AsRef<Path>> OptionalPathExt for Option<S> {
    fn join<P>(&self, path: P) -> Option<Box<Path>>
    where
        P: AsRef<Path>,
    {
        self.as_ref()
            .map(|parent| parent.as_ref().join(path).into_boxed_path())
    }
}

const PROJECT_QUALIFIER: &str = "com.github";
const PROJECT_ORG: &str = "modfs";
const PROJECT_NAME: &str = "modfs";

impl Default for KnownDirs {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir()
                .map(PathBuf::into_boxed_path)
                .ok(),

            #[cfg(target_os = "linux")]
            prefix: Some(Box::from(Path::new("/"))),
            project_dirs: ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORG, PROJECT_NAME),
        }
    }
}

impl KnownDirs {
    /// Discover the cache directory. Cache namespaces holding merged override files are created
    /// under this location.
    pub fn cache_dir(&self) -> Option<Box<Path>> {
        self.project_dirs
            .as_ref()
            .map(|dirs| Box::from(dirs.cache_dir()))
            .or_else(|| self.cwd.join(".modfs-cache"))
    }

    /// Discover the canonical directory for profile files.
    pub fn profile_dir(&self) -> Option<Box<Path>> {
        self.project_dirs
            .as_ref()
            .map(|dir| dir.config_local_dir().join("profiles").into_boxed_path())
    }

    /// Discover the candidate paths to configuration directories, ordered from least priority
    /// to highest.
    ///
    /// These can be one of the following:
    ///
    /// - $PREFIX/etc/modfs (Linux)
    /// - $XDG_CONFIG_DIR:=$HOME/.config/modfs (Linux)
    /// - %LOCALAPPDATA%/modfs/modfs/config (Windows)
    /// - ./modfs.toml
    pub fn config_dirs(&self) -> impl Iterator<Item = Box<Path>> {
        let config_dirs = [
            #[cfg(target_os = "linux")]
            self.prefix.join("etc/modfs"),
            self.project_dirs
                .as_ref()
                .map(|proj| Box::from(proj.config_local_dir())),
            self.cwd.clone(),
        ];

        config_dirs.into_iter().flatten()
    }
}
