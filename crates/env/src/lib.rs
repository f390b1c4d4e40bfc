use std::{collections::HashMap, path::PathBuf};

use serde::{de::value::MapDeserializer, Deserialize, Serialize};
use serde_json::Value;

pub trait EnvVars {
    const PREFIX: &'static str;
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheVars {
    /// Directory that cache namespaces are created under.
    pub root: Option<PathBuf>,
}

impl EnvVars for CacheVars {
    const PREFIX: &'static str = "MODFS_CACHE_";
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryVars {
    /// Also write logs to this file.
    pub log_file_path: Option<PathBuf>,
}

impl EnvVars for TelemetryVars {
    const PREFIX: &'static str = "MODFS_TELEMETRY_";
}

pub fn deserialize_from_env<T>() -> Result<T, serde_json::Error>
where
    T: for<'de> Deserialize<'de> + EnvVars,
{
    deserialize(
        std::env::vars()
            .filter(|(k, _)| k.starts_with(T::PREFIX))
            .map(|(k, v)| (k.trim_start_matches(T::PREFIX).to_ascii_lowercase(), v)),
    )
}

/// Values are read as JSON, falling back to a plain string for values that aren't valid JSON
/// (paths, names).
pub fn deserialize<'de, T: Deserialize<'de>>(
    input: impl IntoIterator<Item = (String, String)>,
) -> Result<T, serde_json::Error> {
    T::deserialize(MapDeserializer::new(input.into_iter().map(|(k, v)| {
        let value = serde_json::from_str::<Value>(&v).unwrap_or(Value::String(v));
        (k, value)
    })))
}

pub fn serialize<T: Serialize>(input: T) -> Result<HashMap<String, String>, serde_json::Error> {
    let value = serde_json::to_value(input)?;
    let map: HashMap<String, Value> = serde_json::from_value(value)?;

    let serialized_map: HashMap<String, String> = map
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .flat_map(|(k, v)| serde_json::to_string(&v).map(|serialized| (k, serialized)))
        .collect();

    Ok(serialized_map)
}

/// Renders `vars` as `PREFIX_KEY=value` pairs.
pub fn to_env_pairs<T: Serialize + EnvVars>(
    vars: T,
) -> Result<Vec<(String, String)>, serde_json::Error> {
    let mut pairs = serialize(vars)?
        .into_iter()
        .map(|(k, v)| (format!("{}{}", T::PREFIX, k.to_ascii_uppercase()), v))
        .collect::<Vec<_>>();

    pairs.sort();

    Ok(pairs)
}
