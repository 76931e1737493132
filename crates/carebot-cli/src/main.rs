//! `carebot`: terminal chat client for the carebot server.
//!
//! # Usage
//!
//! ```
//! carebot --url http://localhost:3000 --patient 129 --topic symptom_checker
//! carebot --config ~/.config/carebot/cli.toml
//! ```

mod app;
mod client;

use anyhow::{Context, Result};
use app::{App, DEFAULT_TOPIC, HELP};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "carebot", about = "Terminal chat client for the carebot server")]
struct Args {
  /// Path to a TOML config file (url, username, password, patient, topic).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the carebot server (default: http://localhost:3000).
  #[arg(long, env = "CAREBOT_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "CAREBOT_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "CAREBOT_PASSWORD")]
  password: Option<String>,

  /// Patient id whose records ground the conversation.
  #[arg(long, env = "CAREBOT_PATIENT")]
  patient: Option<String>,

  /// Topic to start in.
  #[arg(long)]
  topic: Option<String>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  patient:  String,
  #[serde(default)]
  topic:    String,
}

/// First of `flag` and a non-empty file value.
fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_owned()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: pick(args.url, &file_cfg.url)
      .unwrap_or_else(|| "http://localhost:3000".to_string()),
    username: pick(args.user, &file_cfg.username).unwrap_or_default(),
    password: pick(args.password, &file_cfg.password).unwrap_or_default(),
  };
  let patient = pick(args.patient, &file_cfg.patient)
    .context("no patient id, pass --patient or set it in the config file")?;
  let topic = pick(args.topic, &file_cfg.topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string());

  let client = ApiClient::new(api_config)?;
  let mut app = App::new(client, patient, topic);

  run(&mut app).await
}

// ─── REPL ─────────────────────────────────────────────────────────────────────

async fn run(app: &mut App) -> Result<()> {
  let mut stdout = tokio::io::stdout();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  stdout.write_all(format!("{HELP}\n\n").as_bytes()).await?;

  loop {
    stdout.write_all(app.prompt().as_bytes()).await?;
    stdout.flush().await?;

    let Some(line) = lines.next_line().await.context("reading stdin")? else {
      break;
    };
    match app.handle(&line).await {
      Some(out) if out.is_empty() => {}
      Some(out) => stdout.write_all(format!("{out}\n").as_bytes()).await?,
      None => break,
    }
  }

  Ok(())
}
