use std::{
    env,
    fs::{File, OpenOptions},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{CommandFactory, Parser, ValueEnum};
use pacs_upload_rs::{
    find_archives, preflight, run_batch, PacsClient, PollPolicy, StartupError, UploadConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// PACS server URL, e.g. https://pacs.example.org [env: SERVER]
    #[clap(short, long)]
    server: Option<String>,
    /// PACS server URL, used when --server is not given
    #[clap(value_name = "SERVER")]
    server_arg: Option<String>,
    /// Directory searched recursively for .zip archives
    #[clap(short = 'p', long, env = "PATH-IMAGES", default_value = "./")]
    path_images: PathBuf,
    /// Modality to send every uploaded patient to. Nothing is sent when unset
    #[clap(short = 'm', long, env = "MODALITY-SEND")]
    modality_send: Option<String>,
    /// Write logs to this file instead of the console
    #[clap(short = 'l', long, env = "LOGFILE")]
    logfile: Option<PathBuf>,
    /// Number of archives uploaded at the same time
    #[clap(short = 't', long, env = "THREADS", default_value = "3")]
    threads: NonZeroUsize,
    /// Delete the images from the PACS once sent to the modality. Requires --modality-send
    #[clap(
        short = 'd',
        long,
        env = "DELETE-PAC",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    delete_pac: bool,
    /// Seconds between two status checks of a modality job
    #[clap(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,
    /// Status checks of a modality job before giving up
    #[clap(long, default_value = "40", value_parser = clap::value_parser!(u32).range(1..))]
    poll_attempts: u32,
    /// Set the log level
    #[arg(value_enum)]
    #[clap(short = 'L', long, default_value = "info")]
    log_level: LogLevel,
    /// Display timestamps with log messages
    #[clap(short = 'T', long)]
    timestamp: bool,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Quiet,
}

#[tokio::main]
pub async fn main() {
    // Must run before parsing so the env fallbacks see the .env entries.
    let env_file = load_env_file();

    let args = Args::parse();

    let Some(server) = server_from(&args, env::var("SERVER").ok()) else {
        eprintln!("No PACS server given, use --server or set SERVER.\n");
        let _ = Args::command().print_help();
        process::exit(2);
    };

    if let Err(e) = tracing_subscriber_handler(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match env_file {
        Ok(true) => info!("Loaded settings from .env"),
        Ok(false) => {}
        Err(e) => warn!("Ignoring .env: {}", e),
    }

    let config = config_from_args(&args, &server);
    if config.delete_after_send && config.modality.is_none() {
        warn!("--delete-pac has no effect without --modality-send.");
    }

    let client = match PacsClient::new(&config.server) {
        Ok(client) => client,
        Err(e) => {
            error!("Error while building the HTTP client: {}", e);
            process::exit(1);
        }
    };

    info!("Checking PACS server {}.", client.server());
    if let Err(e) = preflight(&client, &config).await {
        fatal(&args, e);
    }

    let archives = match find_archives(&args.path_images) {
        Ok(archives) => archives,
        Err(e) => fatal(&args, e),
    };
    info!(
        "{} archive(s) found in {}.",
        archives.len(),
        args.path_images.display()
    );

    run_batch(Arc::new(client), Arc::new(config), archives).await;
}

/// `--server` first, then the positional argument, then the `SERVER` variable.
fn server_from(args: &Args, env_server: Option<String>) -> Option<String> {
    args.server
        .clone()
        .or_else(|| args.server_arg.clone())
        .or(env_server)
        .filter(|s| !s.trim().is_empty())
}

fn config_from_args(args: &Args, server: &str) -> UploadConfig {
    let mut config = UploadConfig::new(server);
    config.modality = args.modality_send.clone().filter(|m| !m.is_empty());
    config.workers = args.threads;
    config.delete_after_send = args.delete_pac;
    config.poll = PollPolicy {
        interval: Duration::from_secs(args.poll_interval),
        max_attempts: args.poll_attempts,
    };
    config
}

/// Loads `.env` from the working directory. A missing file is not an error.
fn load_env_file() -> Result<bool, dotenvy::Error> {
    dotenvy::from_path(".env")
        .map(|_| true)
        .or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(err),
        })
}

fn fatal(args: &Args, e: StartupError) -> ! {
    error!("{}", e);
    // Also on the console when logging to a file.
    if args.logfile.is_some() {
        eprintln!("Error: {}", e);
    }
    process::exit(1);
}

/// Opens `path` for appending, creating it if needed.
fn open_log_sink(path: &Path) -> Result<File, StartupError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StartupError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn tracing_subscriber_handler(args: &Args) -> Result<(), StartupError> {
    let env_filter = match args.log_level {
        LogLevel::Debug => "pacs_upload_rs=debug",
        LogLevel::Info => "pacs_upload_rs=info",
        LogLevel::Warn => "pacs_upload_rs=warn",
        LogLevel::Error => "pacs_upload_rs=error",
        LogLevel::Quiet => "pacs_upload_rs=off",
    };

    let (writer, ansi) = match &args.logfile {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log_sink(path)?)), false),
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    // "if" because the subscriber doesn't yield the same type with or without time wich prevents
    // using a match statement.
    let installed = if args.timestamp {
        tracing::subscriber::set_global_default(builder.finish())
    } else {
        tracing::subscriber::set_global_default(builder.without_time().finish())
    };
    if installed.is_err() {
        eprintln!("Error while setting subscriber for tracing.");
    }
    Ok(())
}
