//! Environment-bound configuration source.

use figment::providers::Env;
use figment::Figment;

use crate::error::ConfigurationError;

/// A prefix plus the variable keys bound under it.
///
/// With prefix `APP` and key `LOG_LEVEL` the bound variable is `APP_LOG_LEVEL`
/// and the value is read back as `log_level`. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSource {
    prefix: String,
    keys: Vec<String>,
}

impl EnvironmentSource {
    /// Fails with [`ConfigurationError::EmptyKeySet`] when `keys` is empty.
    pub fn new<S: Into<String>>(
        prefix: impl Into<String>,
        keys: impl IntoIterator<Item = S>,
    ) -> Result<Self, ConfigurationError> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(ConfigurationError::EmptyKeySet);
        }
        Ok(Self {
            prefix: prefix.into(),
            keys,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Full variable name for `key`, e.g. `APP_LOG_LEVEL`.
    pub fn variable_name(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, key).to_uppercase()
        }
    }

    /// Bind every key and snapshot the current environment.
    ///
    /// Any key that cannot name an environment variable aborts the whole bind.
    pub(crate) fn bind(&self) -> Result<Figment, ConfigurationError> {
        for key in &self.keys {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(ConfigurationError::InvalidEnvironmentKey(key.clone()));
            }
        }

        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let provider = if self.prefix.is_empty() {
            Env::raw()
        } else {
            Env::prefixed(&format!("{}_", self.prefix))
        };

        Ok(Figment::from(provider.only(&keys)))
    }
}
