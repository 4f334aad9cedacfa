//! `mdserve serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdserve_server::{ServerConfig, run_server};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Content root directory.
    #[arg(short = 'd', long, default_value = "content")]
    content_dir: PathBuf,

    /// Page template file with %PAGE_TITLE% and %PAGE_CONTENT% placeholders.
    #[arg(short, long, default_value = "template.html")]
    template: PathBuf,

    /// Host to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// URL prefix the content is mounted under.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Metadata sidecar extension.
    #[arg(long, default_value = ".meta")]
    meta_ext: String,

    /// Emoji mapping file (TOML).
    #[arg(long)]
    emoji_file: Option<PathBuf>,

    /// Disable math span rendering.
    #[arg(long)]
    no_latex: bool,

    /// Disable synthesized directory listings by default.
    #[arg(long)]
    no_default_indexing: bool,

    /// Scheme used when building absolute listing links.
    #[arg(long, default_value = "http")]
    scheme: String,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable or the server
    /// fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        if !self.content_dir.is_dir() {
            return Err(CliError::Validation(format!(
                "content directory does not exist: {}",
                self.content_dir.display()
            )));
        }
        if !self.template.is_file() {
            return Err(CliError::Validation(format!(
                "template file does not exist: {}",
                self.template.display()
            )));
        }

        output.info(&format!("Starting server on {}:{}", self.host, self.port));
        output.info(&format!("Content directory: {}", self.content_dir.display()));
        if let Some(emoji_file) = &self.emoji_file {
            output.info(&format!("Emoji mapping: {}", emoji_file.display()));
        }
        if self.no_latex {
            output.info("Math rendering: disabled");
        }

        let config = ServerConfig {
            host: self.host,
            port: self.port,
            content_dir: self.content_dir,
            template_path: self.template,
            prefix: self.prefix,
            meta_ext: self.meta_ext,
            emoji_file: self.emoji_file,
            allow_latex: !self.no_latex,
            disable_default_indexing: self.no_default_indexing,
            scheme: self.scheme,
        };

        run_server(config)
            .await
            .map_err(|err| CliError::Server(err.to_string()))
    }
}
