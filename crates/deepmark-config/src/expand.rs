//! `${VAR}` and `${VAR:-default}` expansion for url settings.

use crate::ConfigError;

/// Expand environment variable references in a config value.
///
/// Values without `${` are returned unchanged, so a bare `$` in a url
/// never triggers a lookup. An unset variable without a default is an
/// [`ConfigError::EnvVar`] naming `field`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| std::env::var(var).map(Some))
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}
