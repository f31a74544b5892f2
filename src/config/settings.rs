//! Loaded configuration handle returned by the registry.

use figment::Figment;
use serde::Deserialize;

use super::env::EnvironmentSource;
use super::file::FileSource;
use crate::error::ConfigurationError;

/// Where a [`Settings`] value was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOrigin {
    Environment(EnvironmentSource),
    File(FileSource),
}

/// Key/value data bound from the environment or parsed from a file.
///
/// Keys are addressed with figment's dotted syntax (`http.port`).
#[derive(Debug, Clone)]
pub struct Settings {
    origin: SettingsOrigin,
    figment: Figment,
}

impl Settings {
    pub(crate) fn new(origin: SettingsOrigin, figment: Figment) -> Self {
        Self { origin, figment }
    }

    pub fn origin(&self) -> &SettingsOrigin {
        &self.origin
    }

    /// Check whether a value is present for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.figment.contains(key)
    }

    /// Deserialize the value stored under `key`.
    pub fn get<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<T, ConfigurationError> {
        Ok(self.figment.extract_inner(key)?)
    }

    /// Deserialize the whole source into `T`.
    pub fn extract<'de, T: Deserialize<'de>>(&self) -> Result<T, ConfigurationError> {
        Ok(self.figment.extract()?)
    }

    /// Borrow the underlying provider, e.g. to merge it into a larger figment.
    pub fn figment(&self) -> &Figment {
        &self.figment
    }
}
