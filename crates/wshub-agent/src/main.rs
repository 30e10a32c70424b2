//! # wshub
//!
//! WebSocket hub binary: loads settings, starts logging and metrics, serves
//! the hub and its liveness monitor, and shuts down cleanly on ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use wshub_auth::{JwtTokenProvider, TokenOptions};
use wshub_server::{HubConfig, HubServer};
use wshub_settings::HubSettings;

/// WebSocket hub server.
#[derive(Parser, Debug)]
#[command(name = "wshub", about = "WebSocket hub server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.wshub/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(wshub_settings::settings_path)
    }
}

/// Layered settings with the CLI flags applied last.
fn resolve_settings(cli: &Cli, path: &Path) -> Result<HubSettings> {
    let mut settings = wshub_settings::load_settings_from_path(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(host) = &cli.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = resolve_settings(&args, &args.settings_path())?;
    let _ = wshub_settings::init_settings(settings);
    let settings = wshub_settings::get_settings();

    wshub_logging::init_subscriber(&settings.logging);
    if settings.token.uses_development_key() {
        tracing::warn!("using the built-in development signing key; set WSHUB_TOKEN_SECRET");
    }

    let tokens = JwtTokenProvider::new(TokenOptions::from(&settings.token))
        .context("Invalid token settings")?;
    let metrics_handle = wshub_server::metrics::install_recorder();
    let server = HubServer::new(HubConfig::from(settings), tokens).with_metrics(metrics_handle);

    let (addr, serve) = server.listen().await.context("Failed to bind server")?;
    let monitor = server.spawn_monitor();
    tracing::info!(
        interval_secs = server.config().monitor_interval.as_secs(),
        "wshub listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if server.shutdown(vec![monitor, serve]).await {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("Shutdown timed out with tasks still running");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_settings() {
        let cli = Cli::parse_from(["wshub"]);
        assert_eq!(cli.host, None);
        assert_eq!(cli.port, None);
        assert!(cli.settings_path().ends_with(".wshub/settings.json"));
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "wshub",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--settings",
            "/tmp/hub.json",
        ]);
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.settings_path(), PathBuf::from("/tmp/hub.json"));
    }

    #[test]
    fn cli_rejects_out_of_range_port() {
        assert!(Cli::try_parse_from(["wshub", "--port", "70000"]).is_err());
    }

    #[test]
    fn flags_win_over_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let file = serde_json::json!({
            "server": { "host": "10.0.0.1", "port": 6000 },
            "monitor": { "intervalSecs": 5 }
        });
        std::fs::write(&path, file.to_string()).unwrap();

        let cli = Cli::parse_from(["wshub", "--port", "7000"]);
        let settings = resolve_settings(&cli, &path).unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.server.host, "10.0.0.1");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["wshub"]);
        let settings = resolve_settings(&cli, &dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.server.max_message_size, 8192);
    }

    #[test]
    fn zero_monitor_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"monitor":{"intervalSecs":0}}"#).unwrap();
        let cli = Cli::parse_from(["wshub"]);
        assert!(resolve_settings(&cli, &path).is_err());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cli = Cli::parse_from(["wshub"]);
        assert!(resolve_settings(&cli, &path).is_err());
    }
}
