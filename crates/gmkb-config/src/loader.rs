//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the user config file (explicit path or `<config dir>/gmkb/config.toml`)
//! 3. Apply `GMKB_*` env var fallbacks for fields the file left unset
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration using the process environment.
///
/// With `path` set, that file must exist. Without it, the default location
/// from [`default_config_path`] is used when present.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable or malformed, an env
/// var does not parse, or the result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Like [`load`], with an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut file_fields = HashSet::new();

    let overlay = match path {
        Some(p) => Some((read_toml(p)?, p.to_path_buf())),
        None => match default_config_path() {
            Some(p) => try_load_file(&p)?.map(|overlay| (overlay, p)),
            None => {
                debug!("no config directory available, using defaults");
                None
            },
        },
    };

    if let Some((overlay, p)) = overlay {
        deep_merge(&mut merged, &overlay, "", &mut file_fields);
        info!(path = %p.display(), "loaded config");
    }

    let env_count = apply_env_fallbacks(&mut merged, &file_fields, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a specific file path (no defaults layer, no env).
///
/// Missing sections and fields take their [`Default`] values.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Parse and validate a config from a TOML string.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is malformed or fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<string>".to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// `<config dir>/gmkb/config.toml`, if the platform has a config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("gmkb").join("config.toml"))
}

fn read_bounded(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, &content)?;
    Ok(content)
}

fn check_size(path: &Path, content: &str) -> ConfigResult<()> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }
    Ok(())
}

fn read_toml(path: &Path) -> ConfigResult<toml::Value> {
    let content = read_bounded(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_toml(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// Merge `overlay` into `base`, recording every leaf path the overlay set.
fn deep_merge(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    set_fields: &mut HashSet<String>,
) {
    if !(base.is_table() && overlay.is_table()) {
        *base = overlay.clone();
        set_fields.insert(prefix.to_owned());
        return;
    }
    let (Some(base_table), Some(overlay_table)) = (base.as_table_mut(), overlay.as_table()) else {
        return;
    };

    for (key, value) in overlay_table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match base_table.get_mut(key) {
            Some(existing) if existing.is_table() && value.is_table() => {
                deep_merge(existing, value, &path, set_fields);
            },
            None if value.is_table() => {
                let mut table = toml::Value::Table(toml::map::Map::new());
                deep_merge(&mut table, value, &path, set_fields);
                base_table.insert(key.clone(), table);
            },
            _ => {
                base_table.insert(key.clone(), value.clone());
                set_fields.insert(path);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_try_load_file_missing() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [startup]
            watchdog_timeout_ms = 12000
            required_systems = ["state_manager"]

            [logging]
            format = "json"
        "#,
        );
        let config = load_with_env(Some(file.path()), &no_env()).unwrap();
        assert_eq!(config.startup.watchdog_timeout_ms, 12_000);
        assert_eq!(config.startup.required_systems, ["state_manager"]);
        assert_eq!(config.logging.format, "json");
        // Untouched fields keep their defaults.
        assert_eq!(config.startup.systems_poll_interval_ms, 50);
        assert_eq!(config.events.history_limit, 100);
    }

    #[test]
    fn test_env_fills_only_unset_fields() {
        let file = write_config("[logging]\nlevel = \"warn\"\n");
        let env = HashMap::from([
            ("GMKB_LOG_LEVEL".to_owned(), "trace".to_owned()),
            ("GMKB_WATCHDOG_MS".to_owned(), "9000".to_owned()),
        ]);
        let config = load_with_env(Some(file.path()), &env).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.startup.watchdog_timeout_ms, 9000);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = load_with_env(Some(Path::new("/nonexistent/gmkb.toml")), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let file = write_config("[startup\nwatchdog_timeout_ms = ");
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let file = write_config("[events]\nhistory_limit = \"lots\"\n");
        let err = load_with_env(Some(file.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let err = from_toml_str("[startup]\nwatchdog_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_partial_string_uses_defaults() {
        let config = from_toml_str("[events]\nstart_ready = true\n").unwrap();
        assert!(config.events.start_ready);
        assert_eq!(config.events.replay_timeout_ms, 5000);
        assert_eq!(config.startup, crate::StartupSection::default());
    }

    #[test]
    fn test_deep_merge_records_leaves() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n[b]\nz = true\n").unwrap();
        let mut fields = HashSet::new();
        deep_merge(&mut base, &overlay, "", &mut fields);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert!(fields.contains("a.y"));
        assert!(fields.contains("b.z"));
        assert_eq!(base["b"]["z"].as_bool(), Some(true));
        assert!(!fields.contains("a.x"));
    }
}
