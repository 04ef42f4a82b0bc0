//! Command-line interface parsing for the Canvas MCP server
//!
//! Every option can also come from the environment, which is how MCP hosts
//! usually configure servers they launch.

use clap::Parser;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default Canvas instance
pub const DEFAULT_BASE_URL: &str = "https://canvas.instructure.com";

/// Error types for configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// No access token given on the command line or in the environment
    #[error("Missing Canvas API token: pass --api-token or set CANVAS_API_TOKEN")]
    MissingToken,

    /// The base URL is not an http(s) URL
    #[error("Invalid Canvas base URL: '{0}'. Expected something like https://school.instructure.com")]
    InvalidBaseUrl(String),

    /// Cache entries must live for at least one second
    #[error("Invalid cache TTL: {0}. Must be a positive number of seconds")]
    InvalidTtl(u64),

    /// Requests need a non-zero timeout
    #[error("Invalid request timeout: {0}. Must be a positive number of seconds")]
    InvalidTimeout(u64),
}

/// Canvas MCP - Canvas LMS tools for AI assistants over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "canvas-mcp")]
#[command(about = "Canvas LMS tools for AI assistants over the Model Context Protocol (stdio)")]
#[command(version)]
pub struct Cli {
    /// Base URL of the Canvas instance
    #[arg(long, env = "CANVAS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Canvas API access token (Account > Settings > New Access Token)
    #[arg(long, env = "CANVAS_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// How long API responses stay cached, in seconds
    #[arg(long, env = "CANVAS_CACHE_TTL", default_value_t = 300)]
    pub cache_ttl: u64,

    /// HTTP request timeout, in seconds
    #[arg(long, env = "CANVAS_REQUEST_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Log filter, e.g. "info" or "canvas_mcp=debug"; logs go to stderr
    #[arg(long, env = "CANVAS_MCP_LOG", default_value = "info")]
    pub log_level: String,
}

/// Validated server settings
#[derive(Clone)]
pub struct ServerConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    pub api_token: String,
    pub cache_ttl_secs: u64,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("request_timeout", &self.request_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ServerConfig {
    /// Creates a ServerConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` with a normalized base URL
    /// * `Err(CliError)` if the token is missing or a value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_token = cli
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CliError::MissingToken)?
            .to_string();

        let base_url = cli.base_url.trim().trim_end_matches('/').to_string();
        let host = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"));
        if host.map_or(true, str::is_empty) {
            return Err(CliError::InvalidBaseUrl(cli.base_url.clone()));
        }

        if cli.cache_ttl == 0 {
            return Err(CliError::InvalidTtl(cli.cache_ttl));
        }
        if cli.timeout == 0 {
            return Err(CliError::InvalidTimeout(cli.timeout));
        }

        Ok(Self {
            base_url,
            api_token,
            cache_ttl_secs: cli.cache_ttl,
            request_timeout: Duration::from_secs(cli.timeout),
            log_level: cli.log_level.clone(),
        })
    }
}
