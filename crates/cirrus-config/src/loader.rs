//! Layered configuration loading.
//!
//! Layers are applied in call order; later layers win:
//!
//! 1. A preset ([`with_defaults`](ConfigLoader::with_defaults),
//!    [`with_development`](ConfigLoader::with_development),
//!    [`with_production`](ConfigLoader::with_production))
//! 2. TOML or JSON files and strings, merged key by key over the current
//!    values
//! 3. A `.env` file, which only populates the process environment
//! 4. `PREFIX__SECTION__KEY` environment variables, applied by
//!    [`load`](ConfigLoader::load)

use crate::{ConfigError, FunctionConfig, LogFormat};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;

/// Builder that assembles a [`FunctionConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use cirrus_config::ConfigLoader;
///
/// # fn main() -> Result<(), cirrus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("function.toml")?
///     .with_dotenv()?
///     .with_env_prefix("CIRRUS")
///     .load()?;
/// # let _ = config;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: FunctionConfig,
    env_prefix: Option<String>,
    files_loaded: Vec<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from [`FunctionConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = FunctionConfig::default();
        self
    }

    /// Resets to [`FunctionConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = FunctionConfig::development();
        self
    }

    /// Resets to [`FunctionConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = FunctionConfig::production();
        self
    }

    /// Merges a TOML or JSON file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, has an unknown extension,
    /// does not parse, or names a key the schema does not have.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let layer = Self::parse_file(&content, path)?;
        self.merge_layer(layer)?;
        self.files_loaded.push(path.display().to_string());
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration given inline. `format` is `"toml"` or `"json"`.
    ///
    /// # Example
    ///
    /// ```
    /// use cirrus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[cors]\nallow_origin = \"https://app.example.com\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.cors.allow_origin, "https://app.example.com");
    /// assert_eq!(config.cors.allow_headers.len(), 2);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer = Self::parse_str(content, format)?;
        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Sets the prefix for environment overrides.
    ///
    /// With prefix `CIRRUS`, `CIRRUS__CORS__ALLOW_ORIGIN=https://a.example`
    /// overrides `cors.allow_origin`. Custom error kinds use
    /// `CIRRUS__ERRORS__KINDS__<CODE>=<status>`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory into the process environment.
    ///
    /// A missing `.env` is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a specific dotenv file into the process environment.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Returns the files merged so far, in order.
    #[must_use]
    pub fn files_loaded(&self) -> &[String] {
        &self.files_loaded
    }

    /// Applies environment overrides and validates the result.
    pub fn load(mut self) -> Result<FunctionConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> FunctionConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<Value, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => Self::parse_str(content, format),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse_str(content: &str, format: &str) -> Result<Value, ConfigError> {
        match format.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    // Keys absent from the layer keep their current value.
    fn merge_layer(&mut self, layer: Value) -> Result<(), ConfigError> {
        let mut current = serde_json::to_value(&self.config)?;
        merge_values(&mut current, layer);
        self.config = serde_json::from_value(current)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = rest.split("__").collect();
        let cors = &mut self.config.cors;
        let errors = &mut self.config.errors;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["CORS", "ALLOW_ORIGIN"] => cors.allow_origin = value.to_string(),
            ["CORS", "ALLOW_METHODS"] => cors.allow_methods = parse_list(value),
            ["CORS", "ALLOW_HEADERS"] => cors.allow_headers = parse_list(value),
            ["CORS", "ALLOW_CREDENTIALS"] => {
                cors.allow_credentials = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["CORS", "MAX_AGE_SECS"] => {
                cors.max_age_secs = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::env_parse_error(key, "expected integer or 'none'")
                    })?)
                };
            }

            ["ERRORS", "EXPOSE_INTERNAL_ERRORS"] => {
                errors.expose_internal_errors = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["ERRORS", "INTERNAL_ERROR_MESSAGE"] => {
                errors.internal_error_message = value.to_string();
            }
            ["ERRORS", "KINDS", code] => {
                let status = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected status code"))?;
                errors.kinds.insert((*code).to_string(), status);
            }

            ["LOGGING", "ENABLED"] => {
                logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => {
                logging.span_events = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "FILE_LINE_INFO"] => {
                logging.file_line_info = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            _ => {}
        }

        Ok(())
    }
}

fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
