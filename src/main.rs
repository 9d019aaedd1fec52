use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use litlisten::app::{run_play_command, run_process_command, run_session_command};
use litlisten::cli::{Cli, Commands, ConfigAction};
use litlisten::config::Config;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Play { file, playback } => {
            let config = load_config(cli.config.as_deref(), cli.backend.as_deref())?;
            run_play_command(config, &file, playback, cli.quiet).await?;
        }
        Commands::Process {
            file,
            processing_type,
            params,
        } => {
            let config = load_config(cli.config.as_deref(), cli.backend.as_deref())?;
            run_process_command(config, &file, processing_type, &params, cli.quiet).await?;
        }
        Commands::Session { file, playback } => {
            let config = load_config(cli.config.as_deref(), cli.backend.as_deref())?;
            run_session_command(config, file, playback, cli.quiet).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref(), cli.backend.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "litlisten", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Map `-v` / `-q` onto a log level. `RUST_LOG` still wins when set.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path().context("Could not determine config directory"),
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/litlisten/config.toml)
/// 3. Built-in defaults
///
/// Environment overrides apply on top, then `--backend`.
fn load_config(custom_path: Option<&Path>, backend: Option<&str>) -> Result<Config> {
    let mut config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    }
    .with_env_overrides();

    if let Some(url) = backend {
        config.backend.base_url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&Path>,
    backend: Option<&str>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path, backend)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(custom_path)?.display());
        }
        ConfigAction::Init { force } => {
            let path = config_path(custom_path)?;
            if path.exists() && !force {
                eprintln!(
                    "{}",
                    format!(
                        "Config already exists at {} (use --force to overwrite)",
                        path.display()
                    )
                    .yellow()
                );
                std::process::exit(1);
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, Config::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format!("Wrote {}", path.display()).green());
        }
    }
    Ok(())
}
