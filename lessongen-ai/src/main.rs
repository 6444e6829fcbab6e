//! lessongen-ai - AI lesson content generation driver
//!
//! Runs one generation session against the lesson content API: selects the
//! given sources, submits a job per requested content type, follows the
//! job over the progress stream and optionally saves the result into a
//! lesson folder.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lessongen_ai::collaborators::{Collaborators, FixedDecision, LessonApiClient};
use lessongen_ai::models::{SourceItem, SourceKind};
use lessongen_ai::progress::{GenerationSession, SseProgressChannel};
use lessongen_ai::services::{
    GenerateOutcome, GenerationOrchestrator, GenerationSettingsStore, PersistOutcome,
};
use lessongen_ai::{default_progress_url, OverwriteDecision};
use lessongen_common::config::{load_config, TomlConfig};
use lessongen_common::events::{EventBus, GenerationEvent, GenerationType};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lessongen-ai
#[derive(Parser, Debug)]
#[command(name = "lessongen-ai")]
#[command(about = "AI lesson content generation")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "LESSONGEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Lesson content API base URL (overrides config)
    #[arg(long, env = "LESSONGEN_API_URL", global = true)]
    api_url: Option<String>,

    /// Job progress event stream URL (overrides config)
    #[arg(long, env = "LESSONGEN_PROGRESS_URL", global = true)]
    progress_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate audio and/or video content from uploaded sources
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Content type to generate (repeat for both, in order)
    #[arg(long = "type", value_enum, required = true)]
    types: Vec<ContentTypeArg>,

    /// Uploaded source file reference (.pdf or .txt)
    #[arg(long = "source", required = true)]
    sources: Vec<String>,

    /// Voice name
    #[arg(long)]
    voice: Option<String>,

    /// Language code
    #[arg(long)]
    language: Option<String>,

    /// Speaking rate
    #[arg(long)]
    rate: Option<f32>,

    /// Destination lesson folder id
    #[arg(long)]
    folder: Option<String>,

    /// Save each generated result into the destination folder
    #[arg(long)]
    save: bool,

    /// What happens to unsaved content when the next type is generated
    #[arg(long, value_enum, default_value = "discard")]
    on_switch: OnSwitchArg,

    /// Seconds to wait for each job to finish
    #[arg(long, default_value = "600")]
    wait_secs: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ContentTypeArg {
    Audio,
    Video,
}

impl From<ContentTypeArg> for GenerationType {
    fn from(arg: ContentTypeArg) -> Self {
        match arg {
            ContentTypeArg::Audio => GenerationType::Audio,
            ContentTypeArg::Video => GenerationType::Video,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnSwitchArg {
    Save,
    Discard,
}

impl From<OnSwitchArg> for OverwriteDecision {
    fn from(arg: OnSwitchArg) -> Self {
        match arg {
            OnSwitchArg::Save => OverwriteDecision::SaveFirst,
            OnSwitchArg::Discard => OverwriteDecision::Discard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(api_url) = args.api_url {
        config.api_base_url = api_url;
    }
    if let Some(progress_url) = args.progress_url {
        config.progress_stream_url = Some(progress_url);
    }
    config.validate()?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lessongen-ai {}", env!("CARGO_PKG_VERSION"));
    info!("Lesson content API: {}", config.api_base_url);

    match args.command {
        Command::Generate(generate) => run_generate(&config, generate).await,
    }
}

async fn run_generate(config: &TomlConfig, args: GenerateArgs) -> Result<()> {
    let api = Arc::new(LessonApiClient::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let collaborators = Collaborators {
        gateway: api.clone(),
        materials: api,
        confirmer: Arc::new(FixedDecision(args.on_switch.into())),
    };

    let mut settings = GenerationSettingsStore::with_defaults(&config.defaults);
    if args.voice.is_some() {
        settings.set_voice(args.voice.clone());
    }
    if args.language.is_some() {
        settings.set_language(args.language.clone());
    }
    if args.rate.is_some() {
        settings.set_speaking_rate(args.rate);
    }
    if args.folder.is_some() {
        settings.set_destination_folder_id(args.folder.clone());
    }

    let event_bus = EventBus::new(config.event_bus_capacity);
    let orchestrator = Arc::new(GenerationOrchestrator::with_settings(
        collaborators,
        event_bus,
        settings,
    ));

    for (index, file_ref) in args.sources.iter().enumerate() {
        let Some(kind) = SourceKind::from_file_name(file_ref) else {
            bail!("Unsupported source file (expected .pdf or .txt): {}", file_ref);
        };
        let name = file_ref.rsplit('/').next().unwrap_or(file_ref);
        let item = SourceItem::new(format!("source-{}", index + 1), name, kind)
            .with_file_ref(file_ref.as_str())
            .checked(true);
        orchestrator.edit_sources(|sources| sources.add_source(item));
    }

    let progress_url = config
        .progress_stream_url
        .clone()
        .unwrap_or_else(|| default_progress_url(&config.api_base_url));
    let channel = SseProgressChannel::connect(progress_url)
        .await
        .context("Failed to connect to progress stream")?;
    let session = GenerationSession::spawn(Arc::clone(&orchestrator), channel);

    let result = generate_all(&orchestrator, &args).await;

    if let Some(staged) = orchestrator.staged_content() {
        warn!("Unsaved content discarded at shutdown: {}", staged.title);
    }
    session.shutdown().await;
    result
}

async fn generate_all(orchestrator: &GenerationOrchestrator, args: &GenerateArgs) -> Result<()> {
    let wait = Duration::from_secs(args.wait_secs);

    for generation_type in args.types.iter().copied().map(GenerationType::from) {
        let mut events = orchestrator.subscribe();

        let job_id = match orchestrator.confirm_generate(generation_type).await? {
            GenerateOutcome::Submitted { job_id } => job_id,
            GenerateOutcome::NotReady(reason) => {
                bail!("{} generation not ready: {:?}", generation_type, reason)
            }
            GenerateOutcome::Dismissed => {
                info!("{} generation dismissed", generation_type);
                continue;
            }
        };
        info!("{} job submitted: {}", generation_type, job_id);

        let outcome = tokio::time::timeout(wait, wait_for_terminal(&mut events, &job_id))
            .await
            .with_context(|| format!("Timed out waiting for job {}", job_id))??;

        match outcome {
            GenerationEvent::ContentGenerated { content, .. } => {
                info!(
                    "Generated \"{}\" ({} s, {})",
                    content.title, content.duration_seconds, content.blob_name
                );
            }
            GenerationEvent::GenerationFailed { reason, .. } => {
                error!("{} generation failed: {}", generation_type, reason);
                continue;
            }
            _ => continue,
        }

        if args.save {
            let folder_id = orchestrator.settings().destination_folder_id;
            match orchestrator.persist_staged_content(folder_id.as_deref()).await? {
                PersistOutcome::Saved { source_url } => info!("Saved lesson material {}", source_url),
                PersistOutcome::NotReady(reason) => warn!("Generated content not saved: {:?}", reason),
            }
        }
    }

    Ok(())
}

/// Job id of a terminal generation notification
fn terminal_job_id(event: &GenerationEvent) -> Option<&str> {
    match event {
        GenerationEvent::ContentGenerated { job_id, .. }
        | GenerationEvent::GenerationFailed { job_id, .. } => Some(job_id),
        _ => None,
    }
}

/// Wait for the terminal notification of `job_id`
async fn wait_for_terminal(
    events: &mut broadcast::Receiver<GenerationEvent>,
    job_id: &str,
) -> Result<GenerationEvent> {
    loop {
        match events.recv().await {
            Ok(event) => {
                if terminal_job_id(&event) == Some(job_id) {
                    return Ok(event);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event receiver lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => bail!("Event bus closed"),
        }
    }
}
