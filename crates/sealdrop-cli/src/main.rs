//! sealdrop: end-to-end encrypted file sharing from the terminal
//!
//! Commands:
//!   send <path>          - encrypt locally, upload ciphertext, print share link
//!   receive <link>       - download, decrypt and save the file behind a link
//!   config show          - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sealdrop_core::config::SealdropConfig;
use sealdrop_core::{DecryptedFile, SealdropError, SourceFile};
use sealdrop_flow::{DownloadFlow, ProgressObserver, UploadFlow};
use sealdrop_transfer::build_from_core_config;

/// How long the backend keeps an uploaded file
const RETENTION_NOTICE: &str = "The file will be deleted from the server after 7 days.";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealdrop",
    version,
    about = "End-to-end encrypted file sharing",
    long_about = "sealdrop: files are encrypted before they leave this machine; \
                  the key travels only in the share link's #fragment"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "SEALDROP_CONFIG",
        default_value = "~/.config/sealdrop/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides log.level
    #[arg(long, env = "SEALDROP_LOG")]
    log: Option<String>,

    /// Log format; overrides log.format
    #[arg(long, env = "SEALDROP_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file and upload it, printing a share link
    Send {
        /// File to share
        path: PathBuf,
        /// Origin to build the share link on (overrides share.origin)
        #[arg(long)]
        origin: Option<String>,
        /// MIME type recorded for the file (default: guessed from extension)
        #[arg(long)]
        mime_type: Option<String>,
        /// Re-run a failed upload this many times (overrides transfer.max_retries)
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Download and decrypt the file behind a share link
    ///
    /// Quote the link: everything after '#' is the key.
    Receive {
        /// Full share link, including the #key=...&iv=... fragment
        link: String,
        /// Directory to save into (default: current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite an existing file with the same name
        #[arg(long)]
        force: bool,
        /// Re-attempt a failed download this many times (overrides transfer.max_retries)
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match &cli.log_format {
        Some(format) => format.clone(),
        None if config.log.format.eq_ignore_ascii_case("json") => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(&level, &format);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "sealdrop starting"
    );

    match cli.command {
        Commands::Send {
            path,
            origin,
            mime_type,
            retries,
        } => cmd_send(&config, &path, origin.as_deref(), mime_type.as_deref(), retries).await,
        Commands::Receive {
            link,
            output,
            force,
            retries,
        } => cmd_receive(&config, &link, output.as_deref(), force, retries).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout carries only the share link / results
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<SealdropConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(SealdropConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

// ── Progress + cancellation helpers ───────────────────────────────────────────

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Mirror flow progress onto `pb`: position is the overall percent, the
/// message is the current stage.
fn bar_observer(pb: &ProgressBar) -> ProgressObserver {
    let pb = pb.clone();
    std::sync::Arc::new(move |stage: &'static str, percent: f64| {
        pb.set_position(percent.round() as u64);
        pb.set_message(stage);
    })
}

/// A token that fires on the first Ctrl-C, and the listener task behind it.
///
/// While the listener runs it swallows SIGINT, so abort it as soon as the
/// transfer is over.
fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling transfer");
            trigger.cancel();
        }
    });
    (token, listener)
}

/// Attach kind-specific advice to a flow error.
fn with_guidance(err: SealdropError) -> anyhow::Error {
    let guidance = err.guidance();
    anyhow::Error::new(err).context(guidance)
}

fn should_retry(err: &SealdropError, attempt: u32, retries: u32, cancel: &CancellationToken) -> bool {
    // A user interrupt is final even though Cancelled is retryable
    attempt < retries && err.is_retryable() && !cancel.is_cancelled()
}

// ── `sealdrop send` ───────────────────────────────────────────────────────────

async fn cmd_send(
    config: &SealdropConfig,
    path: &Path,
    origin: Option<&str>,
    mime_type: Option<&str>,
    retries: Option<u32>,
) -> Result<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("not a regular file: {}", path.display());
    }

    // Refuse oversized files before reading them into memory
    let max = config.transfer.max_file_size;
    if meta.len() > max {
        return Err(with_guidance(SealdropError::TooLarge {
            size: meta.len(),
            max,
        }));
    }

    let transport = build_from_core_config(config).context("building transfer client")?;
    let origin = origin.unwrap_or_else(|| config.share_origin()).to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());
    let mime_type = mime_type
        .map(str::to_string)
        .unwrap_or_else(|| guess_mime_type(path));
    let retries = retries.unwrap_or(config.transfer.max_retries);

    info!(file = %path.display(), bytes = meta.len(), mime = %mime_type, "send: starting");

    let (cancel, interrupt_listener) = cancel_on_ctrl_c();
    let pb = make_progress_bar("send");
    let mut flow = UploadFlow::new(transport, origin)
        .with_max_file_size(max)
        .with_observer(bar_observer(&pb))
        .with_cancellation(cancel.clone());

    let outcome = async {
        let mut attempt = 0;
        loop {
            // Each attempt starts again from the file on disk
            let data = match tokio::fs::read(path).await {
                Ok(data) => data,
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("reading {}", path.display())))
                }
            };
            match flow.submit(SourceFile::new(&name, &mime_type, data)).await {
                Ok(link) => return Ok(link),
                Err(e) if should_retry(&e, attempt, retries, &cancel) => {
                    attempt += 1;
                    pb.println(format!("  attempt {attempt} failed: {e}; retrying"));
                    flow.reset();
                }
                Err(e) => return Err(with_guidance(e)),
            }
        }
    }
    .await;
    interrupt_listener.abort();

    let link = match outcome {
        Ok(link) => link,
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    println!("{link}");
    eprintln!();
    eprintln!("  {name} ({})", fmt_bytes(meta.len()));
    eprintln!("  {RETENTION_NOTICE}");
    eprintln!("  Anyone with this link can decrypt the file: the key is part of the link.");

    Ok(())
}

/// Best-effort MIME type from the file extension.
fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

// ── `sealdrop receive` ────────────────────────────────────────────────────────

async fn cmd_receive(
    config: &SealdropConfig,
    link: &str,
    output: Option<&Path>,
    force: bool,
    retries: Option<u32>,
) -> Result<()> {
    let transport = build_from_core_config(config).context("building transfer client")?;
    let retries = retries.unwrap_or(config.transfer.max_retries);

    let (cancel, interrupt_listener) = cancel_on_ctrl_c();
    let pb = make_progress_bar("receive");
    let mut flow = DownloadFlow::new(transport, link)
        .with_observer(bar_observer(&pb))
        .with_cancellation(cancel.clone());

    let mut result = flow.start().await;
    let mut attempt = 0;
    while let Err(e) = &result {
        if !should_retry(e, attempt, retries, &cancel) {
            break;
        }
        attempt += 1;
        pb.println(format!("  attempt {attempt} failed: {e}; retrying"));
        result = flow.retry().await;
    }
    // Ctrl-C interrupts the process again while the file is saved
    interrupt_listener.abort();

    if let Err(e) = result {
        pb.abandon();
        return Err(with_guidance(e));
    }
    pb.finish_and_clear();

    let file = flow
        .take_file()
        .context("download finished without a decrypted file")?;
    let dir = output.unwrap_or_else(|| Path::new("."));
    let dest = save_file(dir, &file, force).await?;

    println!("{}", dest.display());
    eprintln!("  {} ({}, {})", file.filename, fmt_bytes(file.data.len() as u64), file.mime_type);

    Ok(())
}

/// Write `file` into `dir` under its sanitized original name.
async fn save_file(dir: &Path, file: &DecryptedFile, force: bool) -> Result<PathBuf> {
    let dest = dir.join(file.safe_filename());
    if !force && tokio::fs::try_exists(&dest).await.unwrap_or(false) {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            dest.display()
        );
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    tokio::fs::write(&dest, &file.data)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    info!(path = %dest.display(), bytes = file.data.len(), "receive: saved");
    Ok(dest)
}

// ── `sealdrop config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealdropConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
