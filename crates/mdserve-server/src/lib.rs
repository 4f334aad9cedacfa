//! HTTP server for the mdserve content engine.
//!
//! Serves a content directory over HTTP: markdown files render through
//! the engine into a page template, other files stream raw, directories
//! fall back from `index.html` to `index.md` to a synthesized listing.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mdserve_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         content_dir: PathBuf::from("content"),
//!         template_path: PathBuf::from("template.html"),
//!         ..ServerConfig::default()
//!     };
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (catch-all GET)
//!                        │
//!                        └─► ContentResolver
//!                                │
//!                                ├─► raw file bytes
//!                                ├─► MarkdownEngine + template
//!                                └─► DirectoryIndexer + engine
//! ```

mod app;
mod error;
mod handlers;
mod state;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use mdserve_content::{ContentResolver, PageTemplate, ResolverConfig, build_tree};
use mdserve_renderer::{EmojiRecord, EngineOptions, MarkdownEngine};

use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Content root directory.
    pub content_dir: PathBuf,
    /// Page template with `%PAGE_TITLE%`/`%PAGE_CONTENT%` placeholders.
    pub template_path: PathBuf,
    /// URL prefix the content is mounted under (empty for the root).
    pub prefix: String,
    /// Metadata sidecar extension.
    pub meta_ext: String,
    /// Emoji mapping file (TOML); `None` disables emoji shortcodes.
    pub emoji_file: Option<PathBuf>,
    /// Enable `$`/`$$` math spans.
    pub allow_latex: bool,
    /// Disable synthesized listings for directories without an override.
    pub disable_default_indexing: bool,
    /// Scheme used when building absolute listing links.
    pub scheme: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            content_dir: PathBuf::from("content"),
            template_path: PathBuf::from("template.html"),
            prefix: String::new(),
            meta_ext: ".meta".to_owned(),
            emoji_file: None,
            allow_latex: true,
            disable_default_indexing: false,
            scheme: "http".to_owned(),
        }
    }
}

/// Error loading the emoji mapping file.
#[derive(Debug, thiserror::Error)]
pub enum EmojiConfigError {
    /// The file could not be read.
    #[error("failed to read emoji file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid mapping.
    #[error("invalid emoji file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load an emoji shortcode mapping from a TOML file.
///
/// The file is a table of records keyed by shortcode name:
///
/// ```toml
/// [smile]
/// type = "char"
/// char = "😄"
///
/// ["+1"]
/// type = "img"
/// url = "/assets/plus1.png"
/// ```
pub fn load_emoji_mapping(path: &Path) -> Result<HashMap<String, EmojiRecord>, EmojiConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if startup configuration (template, emoji mapping,
/// socket) fails; request-level failures never escape the handlers.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let emojis = config
        .emoji_file
        .as_deref()
        .map(load_emoji_mapping)
        .transpose()?;
    let engine = MarkdownEngine::new(EngineOptions {
        emojis,
        allow_latex: config.allow_latex,
    });
    let template = PageTemplate::load(&config.template_path)?;

    let resolver_config = ResolverConfig::new(&config.content_dir)
        .with_prefix(&config.prefix)
        .with_meta_ext(config.meta_ext.clone())
        .with_default_indexing_disabled(config.disable_default_indexing);
    let tree = build_tree(
        &config.content_dir,
        &resolver_config.prefix,
        &resolver_config.meta_ext,
    );
    if tree.is_none() {
        tracing::warn!(
            content_dir = %config.content_dir.display(),
            "Content directory unreadable; directory indexing disabled"
        );
    }

    let resolver = ContentResolver::new(resolver_config, engine, template, tree);
    let state = Arc::new(AppState {
        resolver,
        scheme: config.scheme.clone(),
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
