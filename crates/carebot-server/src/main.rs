//! carebot server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `CAREBOT_*` environment variables, opens the SQLite record store, and
//! serves the chat and record API over HTTP.
//!
//! Nested keys use a double underscore, e.g. `CAREBOT_CHAT__API_KEY`.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```
//! cargo run -p carebot-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use carebot_core::{conversation::ConversationManager, keeper::RecordKeeper};
use carebot_providers::{AnyEmbedder, OpenAiChat, create_embedder};
use carebot_server::{ServerConfig, populate::populate};
use carebot_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "carebot healthcare assistant server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Seed the store with demo records for one patient.
  Populate {
    #[arg(long, default_value = "129")]
    user: String,
    /// Also seed vitals, activity, past prompts and diet.
    #[arg(long)]
    all:  bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("CAREBOT")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path, server_cfg.embedding.dims)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let embedder = create_embedder(&server_cfg.embedding).context("invalid embedding config")?;
  let keeper = RecordKeeper::new(
    Arc::new(store),
    Arc::new(embedder),
    server_cfg.conversation.retry(),
  )
  .context("embedder and store disagree")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Populate { user, all } => {
      let seeded = populate(&keeper, &user, all)
        .await
        .context("failed to populate store")?;
      println!("{}", serde_json::to_string_pretty(&seeded)?);
      Ok(())
    }
    Command::Serve => serve(server_cfg, keeper).await,
  }
}

async fn serve(
  server_cfg: ServerConfig,
  keeper: RecordKeeper<SqliteStore, AnyEmbedder>,
) -> anyhow::Result<()> {
  let chat = OpenAiChat::new(&server_cfg.chat).context("invalid chat config")?;
  let conversations = ConversationManager::new(
    Arc::new(keeper),
    Arc::new(chat),
    server_cfg.conversation.settings(),
  )
  .context("invalid [conversation] config")?;

  let auth = server_cfg.auth();
  if auth.is_none() {
    tracing::warn!("auth_username/auth_password_hash not set, API is unauthenticated");
  }

  let app = carebot_server::router(Arc::new(conversations), auth);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
