use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsreel_core::{
    create_llm_client, load_config, metrics, validate_config, BaiduLongformSynthesizer,
    BlurLetterbox, CommandPublisher, Compositor, Config, CueBuilder, DashScopeSynthesizer,
    Director, DirectorConfig, FfmpegCompositor, HotListSource, ImageGenerator,
    ImagePostProcessor, LlmScriptWriter, NewsSource, Publisher, RetryPolicy, RunId, RunStore,
    ScriptWriter, SpeechBackend, SpeechSynthesizer, WanxiangGenerator,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to sleep between day-rollover checks.
const ROLLOVER_POLL: Duration = Duration::from_secs(30 * 60);

/// File under the data root recording the last successfully produced run.
const LAST_RUN_FILE: &str = ".last_run";

#[derive(Parser, Debug)]
#[command(name = "newsreel")]
#[command(about = "Automated daily news video bulletins", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml", env = "NEWSREEL_CONFIG_FILE")]
    config: PathBuf,

    /// Produce one run and exit instead of waiting for day rollovers
    #[arg(long)]
    once: bool,

    /// Run key to produce (YYYY_MM_DD); defaults to today. Implies --once.
    #[arg(long)]
    run_date: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    info!(version = VERSION, "newsreel starting");
    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!(
        config = %serde_json::to_string(&config.sanitized()).unwrap_or_default(),
        "Configuration loaded"
    );

    register_metrics();

    // Wire collaborators and check the local toolchain before entering the
    // loop; a missing ffmpeg should fail startup, not tonight's run.
    let compositor = Arc::new(FfmpegCompositor::new(config.compositor.clone()));
    compositor.validate().await.context("ffmpeg not usable")?;
    let director = build_director(&config, Arc::clone(&compositor) as Arc<dyn Compositor>)?;

    if let Some(ref key) = args.run_date {
        let run = RunId::parse(key).with_context(|| format!("Invalid run date: {}", key))?;
        return produce_run(&director, &config, run).await;
    }

    if args.once {
        let run = RunId::from_date(Local::now().date_naive());
        return produce_run(&director, &config, run).await;
    }

    // Daemon loop: wait for a new calendar day, produce it, record it.
    loop {
        let today = RunId::from_date(Local::now().date_naive());
        let last = read_last_run(&config.data.root).await;

        // Zero-padded date keys compare correctly as strings.
        if last.as_deref().is_some_and(|l| l >= today.as_str()) {
            info!(run = %today, "already produced today, waiting for rollover");
            if wait_or_shutdown(ROLLOVER_POLL).await {
                break;
            }
            continue;
        }

        match produce_run(&director, &config, today.clone()).await {
            Ok(()) => {
                write_last_run(&config.data.root, &today).await?;
            }
            Err(e) => {
                // Artifacts from the failed run stay on disk; the next
                // iteration resumes from the first absent one.
                error!(run = %today, error = %format!("{:#}", e), "run failed, will retry");
                metrics::RUNS_TOTAL.with_label_values(&["failed"]).inc();
                if wait_or_shutdown(ROLLOVER_POLL).await {
                    break;
                }
                continue;
            }
        }

        if wait_or_shutdown(ROLLOVER_POLL).await {
            break;
        }
    }

    info!("newsreel stopped");
    Ok(())
}

/// Builds the director from config. The LLM client is shared between the
/// script writer and the publisher's description composer.
fn build_director(config: &Config, compositor: Arc<dyn Compositor>) -> Result<Director> {
    let llm = create_llm_client(&config.llm).context("Failed to create LLM client")?;
    info!(provider = llm.provider(), model = llm.model(), "LLM client ready");

    let news: Arc<dyn NewsSource> = Arc::new(HotListSource::new(config.news.clone()));
    let scripter: Arc<dyn ScriptWriter> =
        Arc::new(LlmScriptWriter::new(Arc::clone(&llm), config.script.clone()));

    let poll = RetryPolicy::from_config(&config.retry.synthesis);
    let speech: Arc<dyn SpeechSynthesizer> = match config.speech.backend {
        SpeechBackend::DashScope => {
            let backend_config = config
                .speech
                .dash_scope
                .clone()
                .context("speech.dash_scope section missing")?;
            info!("Initializing DashScope synthesizer");
            Arc::new(DashScopeSynthesizer::new(backend_config))
        }
        SpeechBackend::BaiduLongform => {
            let backend_config = config
                .speech
                .baidu
                .clone()
                .context("speech.baidu section missing")?;
            info!("Initializing Baidu long-form synthesizer");
            Arc::new(BaiduLongformSynthesizer::new(backend_config, poll.clone()))
        }
    };

    let images: Arc<dyn ImageGenerator> =
        Arc::new(WanxiangGenerator::new(config.imagery.clone(), poll));
    let post: Arc<dyn ImagePostProcessor> =
        Arc::new(BlurLetterbox::new(config.imagery.blur.clone()));
    let publisher: Arc<dyn Publisher> =
        Arc::new(CommandPublisher::new(llm, config.publisher.clone()));

    let cues = CueBuilder::new(config.subtitle.wrap_width)
        .with_sentinel(config.subtitle.no_speech_sentinel.clone());

    Ok(Director::new(
        DirectorConfig::from_config(config),
        news,
        scripter,
        speech,
        images,
        post,
        compositor,
        publisher,
        cues,
    ))
}

async fn produce_run(director: &Director, config: &Config, run: RunId) -> Result<()> {
    let store = RunStore::open(&config.data.root, run.clone())
        .await
        .with_context(|| format!("Failed to open store for run {}", run))?;

    let report = director
        .produce(&store)
        .await
        .with_context(|| format!("Run {} failed", run))?;

    metrics::RUNS_TOTAL.with_label_values(&["completed"]).inc();
    let executed: Vec<&str> = report
        .stages
        .iter()
        .filter(|(_, o)| matches!(o, newsreel_core::StageOutcome::Ran { .. }))
        .map(|(s, _)| s.name())
        .collect();
    info!(
        run = %run,
        published = report.published,
        executed = executed.join(","),
        "run complete"
    );
    Ok(())
}

fn register_metrics() {
    let registry = prometheus::default_registry();
    for metric in metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

async fn read_last_run(root: &Path) -> Option<String> {
    tokio::fs::read_to_string(root.join(LAST_RUN_FILE))
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn write_last_run(root: &Path, run: &RunId) -> Result<()> {
    tokio::fs::create_dir_all(root).await.ok();
    tokio::fs::write(root.join(LAST_RUN_FILE), format!("{}\n", run))
        .await
        .context("Failed to record last run")
}

/// Sleeps for `duration`, returning true if a shutdown signal arrived.
async fn wait_or_shutdown(duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            true
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
