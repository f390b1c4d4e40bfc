use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::eyre, Result};
use modfs_env::{deserialize_from_env, CacheVars, TelemetryVars};
use modfs_overlay::CacheConfig;
use serde::{Deserialize, Serialize};
use tracing::error;

pub mod known_paths;

pub use known_paths::KnownDirs;

#[derive(Debug, clap::Args, Serialize, Deserialize, Default, PartialEq, Eq)]
#[group(multiple = true)]
#[serde(default)]
pub struct Options {
    /// Override the directory cache namespaces are created in.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::DirPath)]
    pub(crate) cache_dir: Option<Box<Path>>,

    /// Override the directory profiles are looked up in.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::DirPath)]
    pub(crate) profile_dir: Option<Box<Path>>,

    /// Also write logs to this file.
    #[clap(long, help_heading = "Configuration", value_hint = clap::ValueHint::FilePath)]
    pub(crate) log_file: Option<Box<Path>>,
}

pub struct Config {
    pub options: Options,
    pub known_dirs: KnownDirs,
}

impl Config {
    /// Cache root, from the command line or configuration files first, then `MODFS_CACHE_ROOT`,
    /// then the platform cache directory.
    pub fn cache_config(&self) -> Result<CacheConfig> {
        if let Some(dir) = &self.options.cache_dir {
            return Ok(CacheConfig::new(dir.to_path_buf()));
        }

        let vars = deserialize_from_env::<CacheVars>()?;

        match self.known_dirs.cache_dir() {
            Some(default_root) => Ok(CacheConfig::from_vars(vars, &default_root)),
            None => vars
                .root
                .map(CacheConfig::new)
                .ok_or_else(|| eyre!("no cache directory could be determined, pass --cache-dir")),
        }
    }

    pub fn profile_dir(&self) -> Option<Box<Path>> {
        self.options
            .profile_dir
            .clone()
            .or_else(|| self.known_dirs.profile_dir())
    }

    pub fn log_file(&self) -> Option<Box<Path>> {
        self.options.log_file.clone().or_else(|| {
            deserialize_from_env::<TelemetryVars>()
                .ok()
                .and_then(|vars| vars.log_file_path)
                .map(PathBuf::into_boxed_path)
        })
    }

    /// A profile is either a path to an existing file or a name looked up in the profile
    /// directory.
    pub fn resolve_profile(&self, profile_name: &str) -> Result<PathBuf> {
        if let Ok(true) = fs::exists(profile_name) {
            return Ok(PathBuf::from(profile_name));
        }

        let profile_dir = self
            .profile_dir()
            .ok_or_else(|| eyre!("no profile directory could be determined, pass --profile-dir"))?;

        ["toml", "json"]
            .into_iter()
            .map(|ext| profile_dir.join(format!("{profile_name}.{ext}")))
            .find(|path| path.is_file())
            .ok_or_else(|| eyre!("no profile named {profile_name} in {profile_dir:?}"))
    }
}

impl Options {
    pub fn merge(self, other: Self) -> Self {
        Self {
            cache_dir: other.cache_dir.or(self.cache_dir),
            profile_dir: other.profile_dir.or(self.profile_dir),
            log_file: other.log_file.or(self.log_file),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let encoded_toml = fs::read_to_string(path)?;
        let toml = toml::from_str(&encoded_toml)?;

        Ok(toml)
    }

    pub fn from_files<P: AsRef<Path>>(files: impl IntoIterator<Item = P>) -> Options {
        let mut config = Options::default();

        for file in files.into_iter() {
            let path = file.as_ref();

            if !path.is_file() {
                continue;
            }

            match Options::from_file(path) {
                Ok(item) => config = config.merge(item),
                Err(error) => {
                    error!(?path, ?error, "failed to load configuration")
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use super::{Config, KnownDirs, Options};

    #[test]
    fn later_options_win() {
        let base = Options {
            cache_dir: Some(Box::from(Path::new("/base/cache"))),
            profile_dir: Some(Box::from(Path::new("/base/profiles"))),
            log_file: None,
        };
        let overrides = Options {
            cache_dir: Some(Box::from(Path::new("/cli/cache"))),
            ..Default::default()
        };

        let merged = base.merge(overrides);

        assert_eq!(merged.cache_dir.as_deref(), Some(Path::new("/cli/cache")));
        assert_eq!(merged.profile_dir.as_deref(), Some(Path::new("/base/profiles")));
        assert_eq!(merged.log_file, None);
    }

    #[test]
    fn reads_and_merges_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(
            &first,
            "cache_dir = \"/first/cache\"\nprofile_dir = \"/first/profiles\"\n",
        )
        .unwrap();
        fs::write(&second, "cache_dir = \"/second/cache\"\n").unwrap();

        let options = Options::from_files([first, second, dir.path().join("missing.toml")]);

        assert_eq!(options.cache_dir.as_deref(), Some(Path::new("/second/cache")));
        assert_eq!(options.profile_dir.as_deref(), Some(Path::new("/first/profiles")));
    }

    #[test]
    fn profiles_are_found_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mine.toml"), "profileVersion = \"v1\"\n").unwrap();

        let config = Config {
            options: Options {
                profile_dir: Some(Box::from(dir.path())),
                ..Default::default()
            },
            known_dirs: KnownDirs::default(),
        };

        assert_eq!(
            config.resolve_profile("mine").unwrap(),
            dir.path().join("mine.toml")
        );
        assert!(config.resolve_profile("theirs").is_err());
    }

    #[test]
    fn command_line_cache_dir_wins() {
        let config = Config {
            options: Options {
                cache_dir: Some(Box::from(Path::new("/cli/cache"))),
                ..Default::default()
            },
            known_dirs: KnownDirs::default(),
        };

        assert_eq!(
            config.cache_config().unwrap().root,
            Path::new("/cli/cache")
        );
    }
}
