use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sous_voice::audio::MicrophoneCapture;
use sous_voice::recipes::HttpRecipeSource;
use sous_voice::session::{SessionConfig, SessionDeps, VoiceSession};
use sous_voice::speech::{HttpTtsEngine, Synthesizer};
use sous_voice::transport::WsConnector;
use sous_voice::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "sous-voice", about = "Voice cooking agent client")]
struct Cli {
    /// Config file (without extension), merged with SOUS_VOICE__* env vars
    #[arg(short, long, default_value = "config/sous-voice")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control API for the step-navigation view
    Serve,
    /// Drive a single voice session from the terminal until Ctrl-C
    Run {
        /// Recipe to cook
        #[arg(long)]
        recipe_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(cfg).await,
        Commands::Run { recipe_id } => run_session(cfg, recipe_id).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let mut state = AppState::new(cfg.api.base_url.clone());
    state.capture = cfg.capture_config();
    state.tts = cfg.tts_config();
    state.debug_dump_dir = cfg.audio.debug_dump_dir.as_ref().map(Into::into);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("{} listening on {}", cfg.service.name, addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn run_session(cfg: Config, recipe_id: String) -> Result<()> {
    let mut session_config = SessionConfig::new(recipe_id, cfg.api.base_url.clone());
    session_config.capture = cfg.capture_config();
    session_config.debug_dump_dir = cfg.audio.debug_dump_dir.as_ref().map(Into::into);

    let (synthesizer, speech_events) =
        Synthesizer::spawn(Box::new(HttpTtsEngine::new(cfg.tts_config())));

    let deps = SessionDeps {
        capture: Box::new(MicrophoneCapture::new(session_config.capture.clone())),
        synthesizer,
        speech_events,
        recipes: Arc::new(HttpRecipeSource::new(cfg.api.base_url.clone())),
        connector: Arc::new(WsConnector),
    };

    let session = VoiceSession::spawn(session_config, deps);
    session.start_listening().await;

    // Mirror state transitions to the terminal until interrupted
    let mut state_rx = session.subscribe();
    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow().clone();
                info!(
                    step = state.current_step,
                    listening = state.listening,
                    speaking = state.speaking,
                    muted = state.muted,
                    "{}",
                    state.current_step_text().unwrap_or("(no step)")
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
