use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    dependency::{sort_dependencies, DependencyError},
    package::Package,
};

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "profileVersion")]
pub enum ModProfile {
    #[serde(rename = "v1")]
    V1(ModProfileV1),
}

impl Default for ModProfile {
    fn default() -> Self {
        ModProfile::V1(ModProfileV1::default())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ModProfileV1 {
    /// A collection of packages containing files that override the game's own.
    #[serde(default, alias = "package")]
    pub packages: Vec<Package>,

    /// Wildcard patterns of package IDs that should be skipped even if they are enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_packages: Vec<String>,
}

impl ModProfile {
    /// Reads a profile from disk and resolves relative package paths against the directory
    /// containing it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        let mut profile: ModProfile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let mut file_contents = String::new();
                let _ = file.read_to_string(&mut file_contents)?;

                toml::from_str(&file_contents).map_err(io::Error::other)?
            }
            Some("json") => serde_json::from_reader(file).map_err(io::Error::other)?,
            ext => {
                return Err(io::Error::other(format!(
                    "\"{}\" is unsupported",
                    ext.unwrap_or("no file extension")
                )));
            }
        };

        if let Some(base) = path.parent() {
            profile.make_absolute(base);
        }

        Ok(profile)
    }

    pub fn make_absolute(&mut self, base: &Path) {
        match self {
            ModProfile::V1(v1) => v1
                .packages
                .iter_mut()
                .for_each(|package| package.make_absolute(base)),
        }
    }

    pub fn packages(&self) -> &[Package] {
        match self {
            ModProfile::V1(v1) => &v1.packages,
        }
    }

    pub fn exclude_packages(&self) -> &[String] {
        match self {
            ModProfile::V1(v1) => &v1.exclude_packages,
        }
    }

    /// Enabled packages in the order their files should be layered, lowest first.
    pub fn ordered_packages(&self) -> Result<Vec<Package>, DependencyError> {
        let enabled = self
            .packages()
            .iter()
            .filter(|package| package.is_enabled())
            .cloned()
            .collect();

        sort_dependencies(enabled)
    }
}
