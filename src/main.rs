use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use voxledger::cli::{Cli, Commands, ConfigAction, log_filter};
use voxledger::config::Config;
use voxledger::pipeline::{ParsePipeline, ParseRequest};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            voxledger::server::serve(&config).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            voxledger::server::serve(&config).await?;
        }
        Some(Commands::Parse {
            text,
            audio,
            tz,
            timeout,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            return handle_parse(&config, text, audio.as_deref(), tz, timeout).await;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "voxledger",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(quiet: bool, verbose: u8) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter(quiet, verbose).into()),
        )
        .init();
}

fn config_path(custom_path: Option<&Path>) -> Option<PathBuf> {
    custom_path.map(Path::to_path_buf).or_else(Config::default_path)
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        // An explicit path must exist
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn handle_parse(
    config: &Config,
    text: Option<String>,
    audio: Option<&Path>,
    tz: Option<String>,
    timeout: Option<Duration>,
) -> Result<ExitCode> {
    let mut pipeline = ParsePipeline::from_config(config)?;
    if let Some(timeout) = timeout {
        pipeline = pipeline.with_request_timeout(timeout);
    }

    let mut request = ParseRequest::new();
    if let Some(path) = audio {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read audio file {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        request = request.with_audio(filename, bytes);
    }
    if let Some(text) = text {
        request = request.with_hint_text(text);
    }
    if let Some(tz) = tz {
        request = request.with_timezone(tz);
    }

    let run = pipeline.run(request).await;
    if run.degraded() {
        eprintln!("{}", "transcription failed, parsed hint text instead".yellow());
    }
    match run.into_result() {
        Ok(entry) => {
            println!("{}", String::from_utf8_lossy(&entry.json));
            eprintln!(
                "{} {} ({})",
                "parsed".green(),
                entry.transcript.dimmed(),
                entry.date_resolution.as_str()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            println!("{}", serde_json::to_string(&failure.to_body())?);
            eprintln!("{} {}", format!("[{}]", failure.status()).red(), failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::Path => match config_path(custom_path) {
            Some(path) => {
                let marker = if path.exists() {
                    "(exists)".green().to_string()
                } else {
                    "(not found, using defaults)".yellow().to_string()
                };
                println!("{} {}", path.display(), marker);
            }
            None => {
                eprintln!("{}", "No configuration directory on this platform".yellow());
            }
        },
    }
    Ok(())
}
