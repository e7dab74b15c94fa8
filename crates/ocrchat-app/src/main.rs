//! ocrchat application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialise tracing
//! 3. Build the inference client and OCR engine
//! 4. Serve the chat page and JSON API on localhost

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ocrchat_api::routes;
use ocrchat_api::state::AppState;
use ocrchat_chat::InferenceClient;
use ocrchat_core::config::OcrChatConfig;
use ocrchat_ocr::OcrEngine;

use crate::cli::CliArgs;

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing exists, so load errors are logged below.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = if config_file.exists() {
        match OcrChatConfig::load(&config_file) {
            Ok(config) => (config, None),
            Err(e) => (OcrChatConfig::default(), Some(e)),
        }
    } else {
        (OcrChatConfig::default(), None)
    };
    args.apply_overrides(&mut config)?;

    init_tracing(args.log_level.as_deref(), &config.general.log_level);

    tracing::info!("Starting ocrchat v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }

    let client = InferenceClient::from_config(&config.inference)?;
    tracing::info!(
        mode = %config.inference.mode,
        model = %config.inference.model,
        base_url = %config.inference.base_url,
        timeout_secs = config.inference.timeout_secs,
        "Inference client ready"
    );

    let ocr = OcrEngine::from_config(&config.ocr);
    tracing::info!(engine = ocr.name(), language = %config.ocr.language, "OCR engine ready");

    let state = AppState::new(config.clone(), client, ocr);

    tracing::info!(
        "Chat page at http://127.0.0.1:{}/ui",
        config.general.port
    );

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "Server stopped");
        return Err(e.into());
    }

    Ok(())
}
