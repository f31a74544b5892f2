//! Configuration registry.
//!
//! Holds at most one environment-derived source and any number of uniquely
//! named file-derived sources. The registry is created once by the application
//! root and shared as `Arc<Registry>`; every access goes through one mutex that
//! is held only for a single field read or write.
//!
//! File registration reserves the name first and loads afterwards, outside the
//! lock. While the load runs the entry is `Pending`; a failed load leaves the
//! entry registered but unusable, and every later lookup reports the same
//! failure.

mod env;
mod file;
mod settings;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use env::EnvironmentSource;
pub use file::{FileSource, DEFAULT_CONFIG_TYPE};
pub use settings::{Settings, SettingsOrigin};

use crate::error::ConfigurationError;

/// Load state of a registered file source.
#[derive(Debug, Clone)]
enum LoadState {
    Pending,
    Loaded(Arc<Settings>),
    Failed(Arc<ConfigurationError>),
}

#[derive(Debug)]
struct FileEntry {
    source: FileSource,
    state: LoadState,
}

#[derive(Debug, Default)]
struct Inner {
    environment: Option<Arc<Settings>>,
    files: HashMap<String, FileEntry>,
}

/// Process-wide holder of registered configuration sources.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind and store the environment source.
    ///
    /// Only one environment source may ever be registered; later attempts fail
    /// with [`ConfigurationError::EnvironmentAlreadyRegistered`] and leave the
    /// first one in place. A key that cannot be bound aborts the registration.
    pub fn register_environment(&self, source: EnvironmentSource) -> Result<(), ConfigurationError> {
        let mut inner = self.lock();
        if inner.environment.is_some() {
            return Err(ConfigurationError::EnvironmentAlreadyRegistered);
        }

        let figment = source.bind()?;
        inner.environment = Some(Arc::new(Settings::new(
            SettingsOrigin::Environment(source),
            figment,
        )));
        Ok(())
    }

    /// Register a file source under `name` and load it.
    ///
    /// The name is reserved atomically; a duplicate fails with
    /// [`ConfigurationError::FileConfigurationExists`]. A load failure is
    /// returned but the name stays taken.
    pub fn register_file(
        &self,
        name: impl Into<String>,
        source: FileSource,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();

        match self.lock().files.entry(name.clone()) {
            Entry::Occupied(_) => return Err(ConfigurationError::FileConfigurationExists(name)),
            Entry::Vacant(slot) => {
                slot.insert(FileEntry {
                    source: source.clone(),
                    state: LoadState::Pending,
                });
            }
        }

        let state = match source.load() {
            Ok(figment) => LoadState::Loaded(Arc::new(Settings::new(
                SettingsOrigin::File(source),
                figment,
            ))),
            Err(e) => LoadState::Failed(Arc::new(e)),
        };

        let mut inner = self.lock();
        let entry = inner
            .files
            .get_mut(&name)
            .ok_or_else(|| ConfigurationError::FileConfigurationNotFound(name.clone()))?;
        entry.state = state.clone();

        match state {
            LoadState::Failed(source) => {
                Err(ConfigurationError::FileConfigurationUnusable { name, source })
            }
            _ => Ok(()),
        }
    }

    /// The registered environment settings.
    pub fn environment(&self) -> Result<Arc<Settings>, ConfigurationError> {
        self.lock()
            .environment
            .clone()
            .ok_or(ConfigurationError::EnvironmentNotRegistered)
    }

    /// The loaded settings registered under `name`.
    pub fn file(&self, name: &str) -> Result<Arc<Settings>, ConfigurationError> {
        let inner = self.lock();
        let entry = inner
            .files
            .get(name)
            .ok_or_else(|| ConfigurationError::FileConfigurationNotFound(name.to_string()))?;

        match &entry.state {
            LoadState::Loaded(settings) => Ok(Arc::clone(settings)),
            LoadState::Pending => Err(ConfigurationError::FileConfigurationPending(
                name.to_string(),
            )),
            LoadState::Failed(source) => Err(ConfigurationError::FileConfigurationUnusable {
                name: name.to_string(),
                source: Arc::clone(source),
            }),
        }
    }

    /// The source description registered under `name`, whatever its load state.
    pub fn file_source(&self, name: &str) -> Result<FileSource, ConfigurationError> {
        self.lock()
            .files
            .get(name)
            .map(|entry| entry.source.clone())
            .ok_or_else(|| ConfigurationError::FileConfigurationNotFound(name.to_string()))
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.lock().files.contains_key(name)
    }

    /// Registered file names, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().files.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn write_config(dir: &Path, file: &str, contents: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_environment_registers_once() {
        let registry = Registry::new();
        let first = EnvironmentSource::new("APPKIT_REG_ONCE", ["KEY"]).unwrap();
        registry.register_environment(first.clone()).unwrap();

        let second = EnvironmentSource::new("OTHER", ["KEY"]).unwrap();
        let err = registry.register_environment(second).unwrap_err();
        assert!(matches!(err, ConfigurationError::EnvironmentAlreadyRegistered));

        let settings = registry.environment().unwrap();
        assert_eq!(settings.origin(), &SettingsOrigin::Environment(first));
    }

    #[test]
    fn test_environment_not_registered() {
        let registry = Registry::new();
        assert!(matches!(
            registry.environment(),
            Err(ConfigurationError::EnvironmentNotRegistered)
        ));
    }

    #[test]
    fn test_failed_environment_bind_registers_nothing() {
        let registry = Registry::new();
        let bad = EnvironmentSource::new("APP", ["OK", ""]).unwrap();
        assert!(registry.register_environment(bad).is_err());
        assert!(registry.environment().is_err());

        let good = EnvironmentSource::new("APP", ["OK"]).unwrap();
        registry.register_environment(good).unwrap();
    }

    #[test]
    fn test_environment_values_readable() {
        temp_env::with_var("APPKIT_REG_ENV_PORT", Some("9000"), || {
            let registry = Registry::new();
            let source = EnvironmentSource::new("APPKIT_REG_ENV", ["PORT"]).unwrap();
            registry.register_environment(source).unwrap();

            let settings = registry.environment().unwrap();
            assert!(settings.contains("port"));
            assert_eq!(settings.get::<u16>("port").unwrap(), 9000);
        });
    }

    #[test]
    fn test_distinct_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "a.yaml", "name: a\n");
        write_config(dir.path(), "b.json", r#"{"name": "b"}"#);

        let registry = Registry::new();
        registry
            .register_file("b", FileSource::new("b.json", &[dir.path()]))
            .unwrap();
        registry
            .register_file("a", FileSource::new("a.yaml", &[dir.path()]))
            .unwrap();

        assert_eq!(registry.file_names(), vec!["a", "b"]);
        assert_eq!(registry.file("a").unwrap().get::<String>("name").unwrap(), "a");
        assert_eq!(registry.file("b").unwrap().get::<String>("name").unwrap(), "b");
    }

    #[test]
    fn test_duplicate_file_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "app.yaml", "name: first\n");
        write_config(dir.path(), "other.yaml", "name: second\n");

        let registry = Registry::new();
        registry
            .register_file("app", FileSource::new("app.yaml", &[dir.path()]))
            .unwrap();

        let err = registry
            .register_file("app", FileSource::new("other.yaml", &[dir.path()]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::FileConfigurationExists(n) if n == "app"));
        assert_eq!(
            registry.file("app").unwrap().get::<String>("name").unwrap(),
            "first"
        );
    }

    #[test]
    fn test_unknown_file_name() {
        let registry = Registry::new();
        assert!(matches!(
            registry.file("missing"),
            Err(ConfigurationError::FileConfigurationNotFound(n)) if n == "missing"
        ));
        assert!(registry.file_source("missing").is_err());
        assert!(!registry.has_file("missing"));
    }

    #[test]
    fn test_failed_load_stays_registered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();

        let err = registry
            .register_file("app", FileSource::new("app.yaml", &[dir.path()]))
            .unwrap_err();
        assert!(matches!(
            &err,
            ConfigurationError::FileConfigurationUnusable { source, .. }
                if matches!(**source, ConfigurationError::FileNotFound { .. })
        ));

        // The name is taken and every read reports the same failure
        assert!(registry.has_file("app"));
        assert!(matches!(
            registry.file("app"),
            Err(ConfigurationError::FileConfigurationUnusable { .. })
        ));

        // Creating the file afterwards does not help until restart
        write_config(dir.path(), "app.yaml", "name: late\n");
        assert!(registry.file("app").is_err());
        assert!(matches!(
            registry.register_file("app", FileSource::new("app.yaml", &[dir.path()])),
            Err(ConfigurationError::FileConfigurationExists(_))
        ));
    }

    #[test]
    fn test_concurrent_same_name_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            write_config(dir.path(), &format!("c{i}.yaml"), &format!("id: {i}\n"));
        }

        let registry = Registry::new();
        let results: Vec<(usize, Result<(), ConfigurationError>)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let registry = &registry;
                    let dir = dir.path();
                    s.spawn(move || {
                        let source = FileSource::new(format!("c{i}.yaml"), &[dir]);
                        (i, registry.register_file("shared", source))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<usize> = results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(i, _)| *i)
            .collect();
        assert_eq!(winners.len(), 1);
        for (_, result) in results.iter().filter(|(_, r)| r.is_err()) {
            assert!(matches!(
                result,
                Err(ConfigurationError::FileConfigurationExists(_))
            ));
        }

        let winner = winners[0];
        assert_eq!(
            registry.file_source("shared").unwrap().filename(),
            format!("c{winner}.yaml")
        );
        assert_eq!(
            registry.file("shared").unwrap().get::<usize>("id").unwrap(),
            winner
        );
    }

    #[test]
    fn test_concurrent_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "app.yaml", "ok: true\n");

        let registry = Registry::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let registry = &registry;
                let dir = dir.path();
                s.spawn(move || {
                    registry
                        .register_file(format!("name-{i}"), FileSource::new("app.yaml", &[dir]))
                        .unwrap();
                });
            }
        });

        assert_eq!(registry.file_names().len(), 8);
        for name in registry.file_names() {
            assert!(registry.file(&name).unwrap().get::<bool>("ok").unwrap());
        }
    }
}
