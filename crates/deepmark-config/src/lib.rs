//! Configuration management for deepmark.
//!
//! Parses `deepmark.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Caller settings can be applied during load via [`Overrides`].
//!
//! ## Example
//!
//! ```toml
//! [render]
//! extra_mode = true
//! safe_mode = true
//! no_follow_links = true
//! url_base_location = "https://${DOCS_HOST:-docs.example.com}/guide"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `render.url_base_location`
//! - `render.url_root_location`

mod expand;

use std::path::{Path, PathBuf};

use deepmark::RenderOptions;
use serde::Deserialize;

/// Settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Override the extended dialect flag.
    pub extra_mode: Option<bool>,
    /// Override safe mode.
    pub safe_mode: Option<bool>,
    /// Override the base url for relative links and images.
    pub url_base_location: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "deepmark.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering options.
    pub render: RenderOptions,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.url_base_location`").
        field: String,
        /// Error message (e.g., "${`DOCS_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `deepmark.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// Overrides are applied after loading, so they take precedence over
    /// config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        overrides: Option<&Overrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            tracing::debug!("No config file found, using defaults");
            Self::default()
        };

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
            config.validate()?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or parsed, an environment
    /// variable is missing, or validation fails.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply overrides to the configuration.
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(extra_mode) = overrides.extra_mode {
            self.render.extra_mode = extra_mode;
        }
        if let Some(safe_mode) = overrides.safe_mode {
            self.render.safe_mode = safe_mode;
        }
        if let Some(url) = &overrides.url_base_location {
            self.render.url_base_location = Some(url.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        discover_config_from(&current)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;

        if let Some(base) = &render.url_base_location {
            require_non_empty(base, "render.url_base_location")?;
            require_http_url(base, "render.url_base_location")?;
        }

        if let Some(root) = &render.url_root_location {
            require_non_empty(root, "render.url_root_location")?;
            require_http_url(root, "render.url_root_location")?;
            if render.url_base_location.is_none() {
                return Err(ConfigError::Validation(
                    "render.url_root_location requires render.url_base_location to be set"
                        .to_owned(),
                ));
            }
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref base) = self.render.url_base_location {
            self.render.url_base_location =
                Some(expand::expand_env(base, "render.url_base_location")?);
        }
        if let Some(ref root) = self.render.url_root_location {
            self.render.url_root_location =
                Some(expand::expand_env(root, "render.url_root_location")?);
        }
        Ok(())
    }
}

/// Search for the config file in `start` and its parents.
fn discover_config_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "Discovered config file");
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render, RenderOptions::default());
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.render, RenderOptions::default());
    }

    #[test]
    fn test_parse_render_config() {
        let toml = r#"
[render]
extra_mode = true
safe_mode = true
auto_heading_ids = false
no_follow_links = true
new_window_for_external_links = true
url_base_location = "https://docs.example.com/guide"
url_root_location = "https://cdn.example.com"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let render = &config.render;
        assert!(render.extra_mode);
        assert!(render.safe_mode);
        assert!(!render.auto_heading_ids);
        assert!(render.no_follow_links);
        assert!(render.new_window_for_external_links);
        assert!(!render.new_window_for_local_links);
        assert_eq!(
            render.url_base_location.as_deref(),
            Some("https://docs.example.com/guide")
        );
        assert_eq!(
            render.url_root_location.as_deref(),
            Some("https://cdn.example.com")
        );
    }

    #[test]
    fn test_parse_partial_render_keeps_defaults() {
        let toml = r"
[render]
titled_image = true
";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.render.titled_image);
        assert!(config.render.auto_heading_ids);
        assert!(!config.render.extra_mode);
    }

    #[test]
    fn test_parse_invalid_type() {
        let toml = r#"
[render]
extra_mode = "yes"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let overrides = Overrides {
            extra_mode: Some(true),
            url_base_location: Some("https://x.com".to_owned()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert!(config.render.extra_mode);
        assert!(!config.render.safe_mode); // Unchanged
        assert_eq!(
            config.render.url_base_location.as_deref(),
            Some("https://x.com")
        );
    }

    #[test]
    fn test_apply_empty_overrides() {
        let mut config = Config::default();
        config.render.safe_mode = true;

        config.apply_overrides(&Overrides::default());

        assert!(config.render.safe_mode);
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DEEPMARK_UNSET_HOST");
        }
        let toml = r#"
[render]
url_base_location = "https://${DEEPMARK_UNSET_HOST:-docs.example.com}/guide"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.render.url_base_location.as_deref(),
            Some("https://docs.example.com/guide")
        );
    }

    #[test]
    fn test_expand_env_vars_missing_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DEEPMARK_MISSING_ROOT");
        }
        let toml = r#"
[render]
url_base_location = "https://x.com"
url_root_location = "${DEEPMARK_MISSING_ROOT}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("DEEPMARK_MISSING_ROOT"));
        assert!(err.to_string().contains("render.url_root_location"));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    fn config_with_urls(base: Option<&str>, root: Option<&str>) -> Config {
        let mut config = Config::default();
        config.render.url_base_location = base.map(str::to_owned);
        config.render.url_root_location = root.map(str::to_owned);
        config
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_urls_pass() {
        let config = config_with_urls(Some("https://x.com/docs"), Some("http://cdn.x.com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let config = config_with_urls(Some(""), None);
        assert_validation_error(&config, &["render.url_base_location", "empty"]);
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let config = config_with_urls(Some("ftp://x.com"), None);
        assert_validation_error(&config, &["render.url_base_location", "http://"]);
    }

    #[test]
    fn test_validate_root_url_scheme() {
        let config = config_with_urls(Some("https://x.com"), Some("cdn.x.com"));
        assert_validation_error(&config, &["render.url_root_location", "https://"]);
    }

    #[test]
    fn test_validate_root_requires_base() {
        let config = config_with_urls(None, Some("https://cdn.x.com"));
        assert_validation_error(&config, &["url_root_location", "url_base_location"]);
    }

    // Loading tests

    #[test]
    fn test_load_explicit_path_not_found() {
        let result = Config::load(Some(Path::new("/nonexistent/deepmark.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[render]\nextra_mode = true\nurl_base_location = \"https://x.com\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert!(config.render.extra_mode);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[render]\nextra_mode = true\n").unwrap();
        let overrides = Overrides {
            extra_mode: Some(false),
            safe_mode: Some(true),
            ..Default::default()
        };

        let config = Config::load(Some(&path), Some(&overrides)).unwrap();

        assert!(!config.render.extra_mode);
        assert!(config.render.safe_mode);
    }

    #[test]
    fn test_load_rejects_invalid_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "").unwrap();
        let overrides = Overrides {
            url_base_location: Some("x.com".to_owned()),
            ..Default::default()
        };

        let result = Config::load(Some(&path), Some(&overrides));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_from_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[render\n").unwrap();

        let result = Config::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "[render]\nurl_root_location = \"https://cdn.x.com\"\n").unwrap();

        let result = Config::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "").unwrap();

        assert_eq!(discover_config_from(&nested), Some(path));
    }

    #[test]
    fn test_discover_config_prefers_nearest() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("project");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();
        let nearest = nested.join(CONFIG_FILENAME);
        fs::write(&nearest, "").unwrap();

        assert_eq!(discover_config_from(&nested), Some(nearest));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/x/deepmark.toml"));
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /x/deepmark.toml"
        );

        let err = ConfigError::EnvVar {
            field: "render.url_base_location".to_owned(),
            message: "${HOST} not set".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Environment variable error in render.url_base_location: ${HOST} not set"
        );
    }
}
