use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mini_recorder::session::SessionOverrides;
use mini_recorder::video::ffmpeg_available;
use mini_recorder::{
    create_router, AppState, AviInfo, Config, DeviceFactory, LatestFramePreview, NativeDevices,
    RecordingSession, Resolution, SessionOutcome, SyntheticDevices, VideoEncoder,
    VideoSourceKind,
};
use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mini-recorder", version)]
#[command(about = "Record webcam or screen video with microphone audio")]
struct Cli {
    /// Config file (TOML); defaults plus MINI_RECORDER__* env vars if omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record until Ctrl+C, the duration elapses or the source runs dry
    Record(RecordArgs),

    /// Run the HTTP controller
    Serve {
        /// Use the synthetic tone and test pattern instead of hardware
        #[arg(long)]
        synthetic: bool,
    },

    /// Print the header of an AVI file
    Probe {
        file: PathBuf,
    },

    /// List capture devices available to this build
    Devices,
}

#[derive(Args)]
struct RecordArgs {
    /// Video source: webcam, screen or test-pattern
    #[arg(short, long)]
    source: Option<VideoSourceKind>,

    /// Output resolution, e.g. 1280x720
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Start with the microphone muted
    #[arg(long)]
    no_mic: bool,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Video encoder: raw or ffmpeg
    #[arg(short, long)]
    encoder: Option<VideoEncoder>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Use the synthetic tone and test pattern instead of hardware
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_recorder=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Record(args) => record(&cfg, args).await,
        Command::Serve { synthetic } => serve(&cfg, synthetic).await,
        Command::Probe { file } => probe(&file),
        Command::Devices => {
            devices();
            Ok(())
        }
    }
}

fn device_factory(synthetic: bool) -> Arc<dyn DeviceFactory> {
    if synthetic {
        Arc::new(SyntheticDevices::new())
    } else {
        Arc::new(NativeDevices::default())
    }
}

async fn record(cfg: &Config, args: RecordArgs) -> Result<()> {
    let overrides = SessionOverrides {
        source: args.source,
        resolution: args.resolution,
        frame_rate: args.fps,
        mic_enabled: args.no_mic.then_some(false),
        encoder: args.encoder,
        directory: args
            .output_dir
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref())),
        ..Default::default()
    };
    let config = overrides.apply(&cfg.session_config()?);

    if config.encoder == VideoEncoder::Ffmpeg && !ffmpeg_available() {
        warn!("ffmpeg not found on PATH; the ffmpeg encoder will fail to start");
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Recording {} at {} @ {} fps into {}",
        config.source,
        config.resolution,
        config.frame_rate,
        config.output.directory.display()
    );

    let session = RecordingSession::new(config.clone(), device_factory(args.synthetic));
    session
        .start(config)
        .await
        .context("Failed to start recording")?;

    info!("Recording started! Press Ctrl+C to stop");

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => pending::<()>().await,
        }
    };

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, stopping");
            session.stop().await
        }
        _ = deadline => {
            info!("Duration elapsed, stopping");
            session.stop().await
        }
    };

    // A stop racing an autonomous end reports nothing; fall back to the record
    let outcome = outcome
        .or_else(|| session.last_outcome())
        .context("Session ended without an outcome")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome {
        SessionOutcome::Completed(_) => Ok(()),
        SessionOutcome::Failed { kind, message, .. } => {
            anyhow::bail!("Recording failed ({}): {}", kind, message)
        }
    }
}

async fn serve(cfg: &Config, synthetic: bool) -> Result<()> {
    let preview = Arc::new(LatestFramePreview::new());
    let session = Arc::new(
        RecordingSession::new(cfg.session_config()?, device_factory(synthetic))
            .with_preview(preview.clone()),
    );

    let app = create_router(AppState::new(Arc::clone(&session), preview));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on http://{}", cfg.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")?;

    if let Some(outcome) = session.stop().await {
        info!("Recording stopped on shutdown: {:?}", outcome);
    }

    Ok(())
}

fn probe(file: &Path) -> Result<()> {
    let info = AviInfo::read(file)?;

    println!("File:        {}", file.display());
    println!("Resolution:  {}", info.resolution());
    println!("Frame rate:  {:.2} fps", info.frame_rate);
    println!("Frames:      {} (header), {} (chunks)", info.total_frames, info.frame_chunks);
    println!("Codec:       {} ({} bpp)", info.handler, info.bit_count);
    if info.frame_rate > 0.0 {
        println!(
            "Duration:    {:.2}s",
            info.frame_chunks as f64 / info.frame_rate
        );
    }

    Ok(())
}

fn devices() {
    #[cfg(feature = "mic")]
    {
        println!("Audio inputs:");
        for name in mini_recorder::audio::list_input_devices() {
            println!("  - {}", name);
        }
    }
    #[cfg(not(feature = "mic"))]
    println!("Audio inputs: unavailable (built without `mic`)");

    #[cfg(feature = "webcam")]
    {
        println!("Cameras:");
        for name in mini_recorder::video::list_cameras() {
            println!("  - {}", name);
        }
    }
    #[cfg(not(feature = "webcam"))]
    println!("Cameras: unavailable (built without `webcam`)");

    #[cfg(feature = "screen")]
    {
        println!("Displays:");
        for name in mini_recorder::video::list_displays() {
            println!("  - {}", name);
        }
    }
    #[cfg(not(feature = "screen"))]
    println!("Displays: unavailable (built without `screen`)");

    println!(
        "ffmpeg encoder: {}",
        if ffmpeg_available() { "available" } else { "not found" }
    );
}
