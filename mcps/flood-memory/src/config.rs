//! Command-line and environment configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mcp_common::HttpConfig;

/// Database file name inside the data directory
pub const DB_FILE: &str = "memory.db";

#[derive(Debug, Parser)]
#[command(name = "flood-memory")]
#[command(about = "Persistent linked-note memory served over MCP", version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default)
    #[default]
    Stdio,
    /// Serve MCP over HTTP at /mcp
    Http,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directory holding the memory database
    #[arg(long, env = "FLOOD_MEMORY_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Address to bind in HTTP mode
    #[arg(long, env = "FLOOD_MEMORY_HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    /// Port to bind in HTTP mode
    #[arg(long, env = "FLOOD_MEMORY_PORT", default_value_t = 8080, global = true)]
    pub port: u16,

    /// Bearer token required on HTTP requests; empty disables auth
    #[arg(long, env = "FLOOD_MEMORY_AUTH_TOKEN", hide_env_values = true, global = true)]
    pub auth_token: Option<String>,
}

impl Config {
    /// Data directory, defaulting to `~/flood/memory`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("flood")
                .join("memory")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(DB_FILE)
    }

    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            host: self.host.clone(),
            port: self.port,
            auth_token: self.auth_token.clone().filter(|token| !token.is_empty()),
        }
    }
}
