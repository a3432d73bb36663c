//! Command-line and environment configuration.

use clap::Parser;
use std::path::PathBuf;

/// Real-time presence server for a shared 2-D world
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Where the world snapshot is stored
    #[arg(long, env = "WORLD_FILE", default_value = "world_state.json")]
    pub data_file: PathBuf,

    /// Static page served at `/` and `/index.html`
    #[arg(long, default_value = "public/index.html")]
    pub index_file: PathBuf,

    /// JSON object of sprite key to glyph, replacing the built-in table
    #[arg(long)]
    pub sprites_file: Option<PathBuf>,

    /// Messages queued per session before further ones are dropped
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u16).range(1..))]
    pub outbound_buffer: u16,
}

impl Args {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
