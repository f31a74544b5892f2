//! Application bootstrap.
//!
//! [`Application`] composes a clap root command with a `version` sub-command and
//! owns the configuration [`Registry`]. The registry is handed out as an
//! `Arc` to whatever needs it; there is no process-global instance.

use std::path::Path;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::{EnvironmentSource, FileSource, Registry};
use crate::error::{AppError, ConfigurationError};
use crate::logging::LogFormat;

/// Name of the sub-command added by [`Application::new`].
pub const VERSION_COMMAND: &str = "version";

/// Build metadata printed by the `version` sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub semver: String,
    pub commit: String,
    pub date: String,
}

impl Version {
    /// Version of this build. Commit and date come from `APPKIT_COMMIT` /
    /// `APPKIT_BUILD_DATE` at compile time; the date falls back to now.
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("APPKIT_COMMIT").unwrap_or("unknown").to_string(),
            date: option_env!("APPKIT_BUILD_DATE")
                .map(str::to_string)
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        }
    }

    fn command() -> Command {
        Command::new(VERSION_COMMAND).about("Print version details")
    }

    pub fn details(&self) -> String {
        format!(
            "APP VERSION DETAILS\nVersion: {}\nCommit: {}\nDate: {}",
            self.semver, self.commit, self.date
        )
    }
}

/// Root command, version metadata and configuration registry.
#[derive(Debug)]
pub struct Application {
    root: Command,
    version: Version,
    registry: Arc<Registry>,
}

impl Application {
    /// Wrap `root`, replacing clap's `--version` flag with a `version`
    /// sub-command.
    pub fn new(root: Command, version: Version) -> Self {
        Self::with_registry(root, version, Arc::new(Registry::new()))
    }

    pub fn with_registry(root: Command, version: Version, registry: Arc<Registry>) -> Self {
        let root = root
            .disable_version_flag(true)
            .subcommand(Version::command());
        Self {
            root,
            version,
            registry,
        }
    }

    pub fn command(&self) -> &Command {
        &self.root
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Create and register the environment source.
    pub fn register_environment<S: Into<String>>(
        &self,
        prefix: &str,
        keys: impl IntoIterator<Item = S>,
    ) -> Result<(), ConfigurationError> {
        let source = EnvironmentSource::new(prefix, keys)?;
        self.registry.register_environment(source)
    }

    /// Create, register and load a file source under `name`.
    pub fn register_configuration<P: AsRef<Path>>(
        &self,
        name: &str,
        file: impl AsRef<Path>,
        search_paths: &[P],
    ) -> Result<(), ConfigurationError> {
        if self.registry.has_file(name) {
            return Err(ConfigurationError::FileConfigurationExists(name.to_string()));
        }
        self.registry
            .register_file(name, FileSource::new(file, search_paths))
    }

    /// Parse arguments, exiting with usage on error.
    pub fn get_matches(&self) -> ArgMatches {
        self.root.clone().get_matches()
    }

    pub fn try_get_matches_from<I, T>(&self, args: I) -> Result<ArgMatches, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.root.clone().try_get_matches_from(args)
    }

    /// Whether the parsed arguments select the `version` sub-command.
    pub fn version_requested(matches: &ArgMatches) -> bool {
        matches.subcommand_name() == Some(VERSION_COMMAND)
    }
}

const CONFIG_FILE_ARG: &str = "config";
const CONFIG_PATH_ARG: &str = "config-path";
const LOG_LEVEL_ARG: &str = "log-level";
const LOG_FORMAT_ARG: &str = "log-format";

/// Configuration file selection from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFileFlags {
    pub file: String,
    pub paths: Vec<String>,
}

impl ConfigFileFlags {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            file: matches
                .get_one::<String>(CONFIG_FILE_ARG)
                .cloned()
                .unwrap_or_default(),
            paths: matches
                .get_many::<String>(CONFIG_PATH_ARG)
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Logging selection from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogFlags {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl LogFlags {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            level: matches.get_one::<String>(LOG_LEVEL_ARG).cloned(),
            format: matches.get_one::<String>(LOG_FORMAT_ARG).cloned(),
        }
    }

    /// Output format from `--log-format`, else `fallback`, else text.
    pub fn log_format(&self, fallback: Option<String>) -> Result<LogFormat, AppError> {
        self.format
            .clone()
            .or(fallback)
            .map(|format| format.parse::<LogFormat>().map_err(AppError::InvalidLogFormat))
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

/// Add global `--config/-c` and repeatable `--config-path/-p` flags.
pub fn add_config_file_flags(
    cmd: Command,
    default_file: &'static str,
    default_paths: &'static [&'static str],
) -> Command {
    let paths = Arg::new(CONFIG_PATH_ARG)
        .short('p')
        .long(CONFIG_PATH_ARG)
        .global(true)
        .action(ArgAction::Append)
        .value_delimiter(',')
        .help("Directories searched for the configuration file");
    let paths = if default_paths.is_empty() {
        paths
    } else {
        paths.default_values(default_paths.iter().copied())
    };

    cmd.arg(
        Arg::new(CONFIG_FILE_ARG)
            .short('c')
            .long(CONFIG_FILE_ARG)
            .global(true)
            .default_value(default_file)
            .help("Configuration file name or path"),
    )
    .arg(paths)
}

/// Add global `--log-level/-l` and `--log-format` flags.
pub fn add_log_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new(LOG_LEVEL_ARG)
            .short('l')
            .long(LOG_LEVEL_ARG)
            .global(true)
            .help("Log level (error, warn, info, debug) or filter directive"),
    )
    .arg(
        Arg::new(LOG_FORMAT_ARG)
            .long(LOG_FORMAT_ARG)
            .global(true)
            .help("Log format (text or json)"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> Version {
        Version {
            semver: "1.2.3".to_string(),
            commit: "abc123".to_string(),
            date: "2024-01-01".to_string(),
        }
    }

    fn application() -> Application {
        let root = Command::new("demo").version("9.9.9");
        let root = add_log_flags(add_config_file_flags(root, "demo.yaml", &[".", "config"]));
        Application::new(root, version())
    }

    #[test]
    fn test_version_subcommand_added() {
        let app = application();
        let matches = app.try_get_matches_from(["demo", "version"]).unwrap();
        assert!(Application::version_requested(&matches));
        assert!(app.version().details().contains("Version: 1.2.3"));
        assert!(app.version().details().contains("Commit: abc123"));
    }

    #[test]
    fn test_builtin_version_flag_removed() {
        let app = application();
        assert!(app.try_get_matches_from(["demo", "--version"]).is_err());
    }

    #[test]
    fn test_config_flags_defaults_and_overrides() {
        let app = application();
        let matches = app.try_get_matches_from(["demo"]).unwrap();
        let flags = ConfigFileFlags::from_matches(&matches);
        assert_eq!(flags.file, "demo.yaml");
        assert_eq!(flags.paths, vec![".", "config"]);

        let matches = app
            .try_get_matches_from(["demo", "-c", "other.json", "-p", "/etc/demo,./conf"])
            .unwrap();
        let flags = ConfigFileFlags::from_matches(&matches);
        assert_eq!(flags.file, "other.json");
        assert_eq!(flags.paths, vec!["/etc/demo", "./conf"]);
    }

    #[test]
    fn test_log_flags() {
        let app = application();
        let matches = app
            .try_get_matches_from(["demo", "--log-level", "debug", "--log-format", "json"])
            .unwrap();
        let flags = LogFlags::from_matches(&matches);
        assert_eq!(flags.level.as_deref(), Some("debug"));
        assert_eq!(flags.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_log_format_priority() {
        let app = application();
        let matches = app
            .try_get_matches_from(["demo", "--log-format", "json"])
            .unwrap();
        let flags = LogFlags::from_matches(&matches);
        assert_eq!(flags.log_format(Some("text".into())).unwrap(), LogFormat::Json);

        let matches = app.try_get_matches_from(["demo"]).unwrap();
        let flags = LogFlags::from_matches(&matches);
        assert_eq!(flags.log_format(Some("JSON".into())).unwrap(), LogFormat::Json);
        assert_eq!(flags.log_format(None).unwrap(), LogFormat::Text);
    }

    #[test]
    fn test_log_format_invalid() {
        let app = application();
        let matches = app
            .try_get_matches_from(["demo", "--log-format", "xml"])
            .unwrap();
        let err = LogFlags::from_matches(&matches).log_format(None).unwrap_err();
        assert!(matches!(&err, AppError::InvalidLogFormat(msg) if msg.contains("xml")));
        assert!(err.to_string().starts_with("invalid log format"));
    }

    #[test]
    fn test_register_environment_empty_keys() {
        let app = application();
        let err = app
            .register_environment("DEMO", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyKeySet));
        assert!(app.registry().environment().is_err());
    }

    #[test]
    fn test_register_configuration() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.yaml"), "http:\n  port: 9090\n").unwrap();

        let app = application();
        app.register_configuration("main", "demo.yaml", &[dir.path()])
            .unwrap();
        let settings = app.registry().file("main").unwrap();
        assert_eq!(settings.get::<u16>("http.port").unwrap(), 9090);

        let err = app
            .register_configuration("main", "demo.yaml", &[dir.path()])
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::FileConfigurationExists(_)));
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(Registry::new());
        let app = Application::with_registry(Command::new("demo"), version(), Arc::clone(&registry));
        app.register_environment("DEMO_SHARED", ["KEY"]).unwrap();
        assert!(registry.environment().is_ok());
    }
}
