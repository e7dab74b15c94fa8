//! CLI argument definitions for the ocrchat binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use ocrchat_core::config::{InferenceMode, OcrChatConfig};
use ocrchat_core::error::Result;

/// ocrchat - chat with a local language model about text read from images.
#[derive(Parser, Debug)]
#[command(name = "ocrchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Model name passed to the inference server.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Inference mode: generate, chat or mock.
    #[arg(long = "mode")]
    pub mode: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > OCRCHAT_CONFIG env var > ~/.ocrchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("OCRCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the HTTP port.
    ///
    /// Priority: --port flag > OCRCHAT_PORT env var > config file value > 8501.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        port_from(
            self.port,
            std::env::var("OCRCHAT_PORT").ok().as_deref(),
            config_port,
        )
    }

    /// Resolve the inference mode; `--mode` wins over the config file.
    pub fn resolve_mode(&self, config_mode: InferenceMode) -> Result<InferenceMode> {
        match self.mode {
            Some(ref mode) => mode.parse(),
            None => Ok(config_mode),
        }
    }

    /// Apply every CLI/env override to a loaded configuration.
    pub fn apply_overrides(&self, config: &mut OcrChatConfig) -> Result<()> {
        config.general.port = self.resolve_port(config.general.port);
        config.inference.mode = self.resolve_mode(config.inference.mode)?;
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref model) = self.model {
            config.inference.model = model.clone();
        }
        Ok(())
    }
}

fn port_from(flag: Option<u16>, env: Option<&str>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Some(p) = env.and_then(|val| val.parse::<u16>().ok()) {
        return p;
    }
    if config_port != 0 {
        return config_port;
    }
    8501
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ocrchat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ocrchat").join("config.toml");
    }
    PathBuf::from("config.toml")
}
