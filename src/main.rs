use anyhow::{Context, Result};
use babelcast::engine::registry::{ModelRegistry, RecognizerFactory};
use babelcast::engine::translate::CommandTranslator;
use babelcast::engine::tts::PiperSynthesizer;
use babelcast::{create_router, AppState, Config, Engines};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "babelcast", about = "Real-time transcription and translation relay")]
struct Args {
    /// Configuration file (TOML, extension omitted)
    #[arg(long, default_value = "config/babelcast")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        config.service.http.port = port;
    }

    info!("{} starting", config.service.name);

    let factory = recognizer_factory(&config);
    let engines = Engines {
        registry: Arc::new(ModelRegistry::new(factory)),
        translator: Arc::new(CommandTranslator::new(config.translation.command.clone())),
        synthesizer: Arc::new(PiperSynthesizer::new(config.tts.clone())),
    };

    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let state = AppState::new(config, engines);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(feature = "whisper")]
fn recognizer_factory(config: &Config) -> RecognizerFactory {
    use babelcast::engine::whisper::WhisperRecognizer;
    use babelcast::engine::SharedRecognizer;

    let models_dir = config.recognition.models_dir.clone();
    Arc::new(move |model: &str| {
        let recognizer = WhisperRecognizer::load(&models_dir, model)?;
        Ok(Arc::new(recognizer) as SharedRecognizer)
    })
}

#[cfg(not(feature = "whisper"))]
fn recognizer_factory(_config: &Config) -> RecognizerFactory {
    Arc::new(|model: &str| {
        anyhow::bail!(
            "No recognition backend compiled in (requested model {model}); \
             rebuild with --features whisper"
        )
    })
}
