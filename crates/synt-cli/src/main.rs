use clap::Parser;
use std::process::ExitCode;
use synt_cli::{commands, settings, Cli, Settings};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let base_dir = settings::base_dir(cli.diretorio.as_deref());
    let settings = Settings::load(settings::install_dir().as_deref(), &base_dir);

    let level = match (&cli.log_level, &settings) {
        (Some(level), _) => *level,
        (None, Ok(settings)) => settings.log_level().unwrap_or(tracing::Level::INFO),
        (None, Err(_)) => tracing::Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("failed to load settings: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    info!(dir = %base_dir.display(), "synt {}", env!("CARGO_PKG_VERSION"));

    match commands::run(&cli.command, &settings, &base_dir) {
        Ok(report) => {
            info!(
                exported = report.succeeded.len(),
                failed = report.failed.len(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("synt failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
