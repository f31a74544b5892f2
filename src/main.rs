//! appkit demo application.
//!
//! Wires the command line to the configuration registry (environment source
//! `APPKIT_*` plus the `server` file source) and runs the demo HTTP server
//! until a termination signal arrives.

use appkit::app::{
    add_config_file_flags, add_log_flags, Application, ConfigFileFlags, LogFlags, Version,
};
use appkit::error::{AppError, ConfigurationError};
use appkit::http::{HttpServer, ServerConfig, ServerState};
use appkit::logging::{filter_directive, init_tracing, DEFAULT_LOG_FILTER};
use appkit::routes::create_router;
use clap::Command;
use tokio_util::sync::CancellationToken;

/// Prefix of the environment variables read at startup
const ENV_PREFIX: &str = "APPKIT";

/// Keys bound under [`ENV_PREFIX`]
const ENV_KEYS: [&str; 2] = ["LOG_LEVEL", "LOG_FORMAT"];

/// Registry name of the server configuration file
const SERVER_CONFIG_NAME: &str = "server";

const DEFAULT_CONFIG_FILE: &str = "appkit.toml";
const DEFAULT_SEARCH_PATHS: &[&str] = &[".", "config"];

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let root = Command::new("appkit")
        .about("Configuration and HTTP server bootstrap kit")
        .subcommand(Command::new("serve").about("Run the demo HTTP server"));
    let root = add_log_flags(add_config_file_flags(
        root,
        DEFAULT_CONFIG_FILE,
        DEFAULT_SEARCH_PATHS,
    ));

    let app = Application::new(root, Version::current());
    let matches = app.get_matches();

    if Application::version_requested(&matches) {
        println!("{}", app.version().details());
        return Ok(());
    }

    app.register_environment(ENV_PREFIX, ENV_KEYS)?;
    let env = app.registry().environment()?;

    // Priority: CLI > APPKIT_* > RUST_LOG > default
    let log_flags = LogFlags::from_matches(&matches);
    let log_filter = log_flags
        .level
        .clone()
        .or_else(|| env.get::<String>("log_level").ok())
        .map(|level| filter_directive(&level))
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let log_format = log_flags.log_format(env.get::<String>("log_format").ok())?;

    init_tracing(&log_filter, log_format);

    match matches.subcommand_name() {
        Some("serve") => serve(&app, &ConfigFileFlags::from_matches(&matches)).await?,
        _ => {
            app.command().clone().print_help()?;
            println!();
        }
    }

    Ok(())
}

async fn serve(app: &Application, flags: &ConfigFileFlags) -> Result<(), ConfigurationError> {
    let config = match app.register_configuration(SERVER_CONFIG_NAME, &flags.file, &flags.paths) {
        Ok(()) => {
            let settings = app.registry().file(SERVER_CONFIG_NAME)?;
            if settings.contains("http") {
                settings.get::<ServerConfig>("http")?
            } else {
                ServerConfig::default()
            }
        }
        Err(ConfigurationError::FileConfigurationUnusable { ref source, .. })
            if matches!(**source, ConfigurationError::FileNotFound { .. }) =>
        {
            tracing::warn!(file = %flags.file, paths = ?flags.paths, "No configuration file found, using defaults");
            ServerConfig::default()
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        address = %config.address,
        port = config.port,
        tls = config.cert_path.is_some() && config.key_path.is_some(),
        "Loaded server configuration"
    );

    let router = create_router(app.version().clone(), app.registry());
    let state = HttpServer::from_config(&config, router)
        .run(CancellationToken::new())
        .await;

    if state != ServerState::Stopped {
        tracing::warn!(state = ?state, "Server did not stop cleanly");
    }
    Ok(())
}
