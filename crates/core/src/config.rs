// Grounded on the teacher's crates/agentgateway/src/config.rs pattern: environment
// variables take precedence over file-based configuration, parsed with FromStr.

use std::env;
use std::str::FromStr;

use anyhow::Context;

/// Reads `name` from the environment and parses it, returning `Ok(None)` if unset.
/// Mirrors the teacher's `parse::<T>("ENV_NAME")?.or(raw.field)` idiom used throughout
/// `config.rs` to let environment variables override file-based configuration.
pub fn parse_env<T: FromStr>(name: &str) -> anyhow::Result<Option<T>>
where
	T::Err: std::fmt::Display,
{
	match env::var(name) {
		Ok(val) if !val.is_empty() => T::from_str(&val)
			.map(Some)
			.map_err(|e| anyhow::anyhow!("invalid value for {name}: {e}")),
		_ => Ok(None),
	}
}

/// Reads a raw string environment variable, returning `None` if unset or empty.
pub fn env_str(name: &str) -> Option<String> {
	env::var(name).ok().filter(|v| !v.is_empty())
}

/// Loads a YAML configuration file, falling back to `T::default()` when `path` is `None`.
pub fn load_yaml<T>(path: Option<&std::path::Path>) -> anyhow::Result<T>
where
	T: serde::de::DeserializeOwned + Default,
{
	match path {
		None => Ok(T::default()),
		Some(path) => {
			let contents = std::fs::read_to_string(path)
				.with_context(|| format!("reading config file {}", path.display()))?;
			serde_yaml::from_str(&contents)
				.with_context(|| format!("parsing config file {}", path.display()))
		},
	}
}
