mod app;
mod cli;
mod model;
mod plan;
mod stage;

use std::process::ExitCode;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use app::App;
use cli::{Cli, USAGE};
use model::config::{AppConfig, LoggingConfig};

fn main() -> ExitCode {
    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("adf-stage: {err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("adf-stage error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.overrides)?;
    let _guard = init_logging(&config.logging, cli.verbose)?;

    tracing::debug!("working directory {}", config.working_dir()?.display());

    let app = App::new(config);
    let mut stdout = std::io::stdout().lock();
    app.run(&cli.command, &mut stdout)
}

/// Diagnostics go to stderr. With `[logging] file = true` they are also kept
/// in a daily log under the user data directory.
fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("adf_stage={level}")));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if config.file {
        let log_dir = directories::ProjectDirs::from("", "", "adf-stage")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("adf-stage"));
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "adf-stage.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
