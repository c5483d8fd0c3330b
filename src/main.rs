use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use voice_bridge::{create_router, AppState, Config, ProviderRegistry};

#[derive(Debug, Parser)]
#[command(
    name = "voice-bridge",
    about = "Telephony audio bridge into an ASR → agent → TTS pipeline"
)]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/voice-bridge")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&cfg.recordings.dir).with_context(|| {
        format!("Failed to create recordings directory {}", cfg.recordings.dir.display())
    })?;
    info!("Recordings directory: {}", cfg.recordings.dir.display());

    let registry = ProviderRegistry::with_builtin(&cfg.providers);
    info!(
        "Providers: asr={:?} (default {}), tts={:?} (default {})",
        registry.asr_names(),
        registry.default_asr(),
        registry.tts_names(),
        registry.default_tts()
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let router = create_router(AppState::new(cfg, registry));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router).await.context("HTTP server failed")?;

    Ok(())
}
