//! tts-reader - Turn documents into per-chapter audio through a TTS reader service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use reader_client::{Endpoints, HttpBackend, SessionId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tts_reader::config::ReaderConfig;
use tts_reader::download;
use tts_reader::input::InputSelection;
use tts_reader::progress::CancelHandle;
use tts_reader::render::FileListView;
use tts_reader::speak;
use tts_reader::view::{TerminalView, WorkflowView};
use tts_reader::workflow::{GenerateOutcome, WorkflowController};

/// Conventional exit status after SIGINT.
const INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "tts-reader")]
#[command(
    about = "Turn documents into per-chapter audio through a TTS reader service",
    long_about = None
)]
#[command(version)]
struct Args {
    /// Document to process (.txt, .pdf or .epub)
    file: Option<PathBuf>,

    /// Text to process instead of a file
    #[arg(long)]
    text: Option<String>,

    /// Voice to synthesize with (default from config)
    #[arg(long)]
    voice: Option<String>,

    /// Reader service base URL (default from config)
    #[arg(long)]
    server: Option<String>,

    /// Download the session archive when generation finishes
    #[arg(long)]
    download: bool,

    /// Fetch every playable audio file when generation finishes
    #[arg(long)]
    save_audio: bool,

    /// Directory for downloads (default: config, then the download dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the archive of an earlier session
    Download {
        session: String,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Download one audio file of an earlier session
    Audio {
        session: String,
        filename: String,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Synthesize a whole document or text into one WAV file
    Speak {
        /// Document to read (.txt, .pdf or .epub)
        file: Option<PathBuf>,
        /// Text to read instead of a file
        #[arg(long)]
        text: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the reader service URL
    SetServer { url: String },
    /// Set the default voice
    SetVoice { voice: String },
    /// Set the simulated per-chapter progress delay
    SetChapterDelay {
        /// Milliseconds
        ms: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    match &args.command {
        Some(Commands::Config { action }) => {
            handle_config_command(action)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Download {
            session,
            output_dir,
            server,
        }) => {
            let config = load_config(server.as_deref())?;
            let endpoints = Endpoints::new(&config.server_url)?;
            let session = SessionId::new(session.as_str());
            let dir = config.resolve_output_dir(output_dir.as_ref());
            let cancel = cancel_on_ctrl_c(CancelHandle::new());
            let client = http_client(&config)?;
            if !save_archive(&client, &endpoints, &session, &dir, &cancel).await? {
                return Ok(ExitCode::from(INTERRUPTED));
            }
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Audio {
            session,
            filename,
            output_dir,
            server,
        }) => {
            let config = load_config(server.as_deref())?;
            let endpoints = Endpoints::new(&config.server_url)?;
            let url = endpoints.audio(&SessionId::new(session.as_str()), filename);
            let dir = config.resolve_output_dir(output_dir.as_ref());
            let dest = download::destination(&dir, filename);
            let cancel = cancel_on_ctrl_c(CancelHandle::new());
            let client = http_client(&config)?;
            let saved =
                download::download_or_cancel(&client, &url, &dest, filename, &cancel).await?;
            if saved.is_none() {
                return Ok(ExitCode::from(INTERRUPTED));
            }
            println!("Saved {}", dest.display());
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Speak {
            file,
            text,
            output_dir,
            server,
        }) => {
            let config = load_config(server.as_deref())?;
            let backend = HttpBackend::new(&config.server_url, config.request_timeout())?;
            let mut input = InputSelection::new();
            if let Some(text) = text {
                input.set_text(text.as_str());
            }
            input.select_file(file.clone());
            let dir = config.resolve_output_dir(output_dir.as_ref());
            let cancel = cancel_on_ctrl_c(CancelHandle::new());
            let mut view = TerminalView::new();

            let spoken = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(ExitCode::from(INTERRUPTED)),
                result = speak::speak(&backend, &input, &dir, &mut view) => result,
            };
            return match spoken {
                Ok(path) => {
                    println!("Saved {}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                // Already reported through the view
                Err(_) => Ok(ExitCode::FAILURE),
            };
        }
        None => {}
    }

    run_workflow(&args).await
}

/// Ingest, generate, render; then the optional downloads.
async fn run_workflow(args: &Args) -> Result<ExitCode> {
    let config = load_config(args.server.as_deref())?;
    let voice = args.voice.clone().unwrap_or_else(|| config.voice.clone());

    let backend = Arc::new(HttpBackend::new(&config.server_url, config.request_timeout())?);
    let endpoints = Endpoints::new(&config.server_url)?;
    let mut controller = WorkflowController::from_config(backend, &config);
    let mut view = TerminalView::new();

    if args.file.is_some() && args.text.is_some() {
        warn!("Both a file and --text were given; using the file");
    }
    if let Some(text) = &args.text {
        controller.input_mut().set_text(text.as_str());
    }
    controller.input_mut().select_file(args.file.clone());

    let cancel = cancel_on_ctrl_c(controller.teardown_handle());

    let ingested = tokio::select! {
        biased;
        result = controller.ingest(&mut view) => Some(result),
        _ = cancel.cancelled() => None,
    };
    match ingested {
        Some(Ok(())) => {}
        // Already reported through the view
        Some(Err(_)) => return Ok(ExitCode::FAILURE),
        None => return Ok(ExitCode::from(INTERRUPTED)),
    }

    info!("Generating audio with voice {}", voice);
    let generated = tokio::select! {
        biased;
        result = controller.generate_audio(&voice, &mut view) => Some(result),
        _ = cancel.cancelled() => None,
    };
    match generated {
        Some(Ok(GenerateOutcome::Rendered)) => {}
        Some(Ok(GenerateOutcome::TornDown)) => {
            if let Some(session) = controller.session() {
                eprintln!(
                    "Interrupted. Audio for session {} can still be fetched with \
                     `tts-reader download {}`",
                    session, session
                );
            }
            return Ok(ExitCode::from(INTERRUPTED));
        }
        Some(Err(_)) => return Ok(ExitCode::FAILURE),
        None => return Ok(ExitCode::from(INTERRUPTED)),
    }

    if !args.download && !args.save_audio {
        return Ok(ExitCode::SUCCESS);
    }

    let client = http_client(&config)?;
    let dir = config.resolve_output_dir(args.output_dir.as_ref());
    let mut code = ExitCode::SUCCESS;

    let Some(session) = controller.session().cloned() else {
        return Ok(code);
    };

    if args.download {
        // A failed archive download is reported; there is no retry
        match save_archive(&client, &endpoints, &session, &dir, &cancel).await {
            Ok(true) => {}
            Ok(false) => return Ok(ExitCode::from(INTERRUPTED)),
            Err(e) => {
                view.alert(&format!("Download failed: {e:#}"));
                code = ExitCode::FAILURE;
            }
        }
    }

    if args.save_audio {
        if let Some(files) = controller.files_mut() {
            match save_players(&client, files, &dir, &cancel).await {
                None => return Ok(ExitCode::from(INTERRUPTED)),
                Some(0) => {}
                Some(_) => {
                    view.show_files(files);
                    code = ExitCode::FAILURE;
                }
            }
        }
    }

    Ok(code)
}

/// Cancel `handle` on the first Ctrl-C.
fn cancel_on_ctrl_c(handle: CancelHandle) -> CancelHandle {
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                handle.cancel();
            }
        }
    });
    handle
}

/// Fetch each player's audio. A failure marks only that entry.
/// Returns the number of failures, or `None` when interrupted.
async fn save_players(
    client: &reqwest::Client,
    files: &mut FileListView,
    dir: &Path,
    cancel: &CancelHandle,
) -> Option<usize> {
    let mut failed = 0;

    for index in files.player_indices() {
        let entry = &files.entries()[index];
        let Some(player) = entry.player() else {
            continue;
        };
        let url = player.source.clone();
        let filename = entry.filename.clone();
        let dest = download::destination(dir, &filename);

        match download::download_or_cancel(client, &url, &dest, &filename, cancel).await {
            Ok(Some(_)) => println!("Saved {}", dest.display()),
            Ok(None) => return None,
            Err(e) => {
                warn!("{}: {:#}", filename, e);
                files.mark_load_failed(index);
                failed += 1;
            }
        }
    }

    Some(failed)
}

/// Returns false when interrupted before the archive was complete.
async fn save_archive(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    session: &SessionId,
    dir: &Path,
    cancel: &CancelHandle,
) -> Result<bool> {
    let name = download::archive_filename(session);
    let dest = dir.join(&name);
    let saved =
        download::download_or_cancel(client, &endpoints.archive(session), &dest, &name, cancel)
            .await
            .with_context(|| format!("Failed to download archive for session {}", session))?;
    if saved.is_none() {
        return Ok(false);
    }
    println!("Saved {}", dest.display());
    Ok(true)
}

fn load_config(server: Option<&str>) -> Result<ReaderConfig> {
    let mut config = ReaderConfig::load().context("Failed to load configuration")?;
    if let Some(server) = server {
        config.server_url = server.to_string();
    }
    Ok(config)
}

fn http_client(config: &ReaderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(config.request_timeout())
        .build()
        .context("Failed to create HTTP client")
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = ReaderConfig::load()?;
            println!("Configuration file: {:?}", ReaderConfig::config_path()?);
            println!();
            println!("server_url = \"{}\"", config.server_url);
            println!("voice = \"{}\"", config.voice);
            println!("chapter_delay_ms = {}", config.chapter_delay_ms);
            println!("finalize_delay_ms = {}", config.finalize_delay_ms);
            println!("request_timeout_secs = {}", config.request_timeout_secs);
            println!("max_upload_mb = {}", config.max_upload_mb);
            if let Some(dir) = &config.output_dir {
                println!("output_dir = \"{}\"", dir.display());
            } else {
                println!(
                    "output_dir = (default: {})",
                    config.resolve_output_dir(None).display()
                );
            }
        }
        ConfigAction::SetServer { url } => {
            Endpoints::new(url)?;
            let mut config = ReaderConfig::load()?;
            config.server_url = url.clone();
            config.save()?;
            println!("Server set to: {}", url);
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = ReaderConfig::load()?;
            config.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetChapterDelay { ms } => {
            let mut config = ReaderConfig::load()?;
            config.chapter_delay_ms = *ms;
            config.save()?;
            println!("Chapter delay set to: {} ms", ms);
        }
    }
    Ok(())
}
