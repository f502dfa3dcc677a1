//! `[AMBIENT]` Configuration (§6): the six required server options, with
//! defaults mirroring the upstream Go server's flag set, sourced from CLI
//! flags (`clap`) with an optional TOML file overlay (`serde` + `toml`).
//! CLI flags take precedence over the file, which takes precedence over
//! the defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

/// Command-line flags for `redigo-server`. Every option is optional here so
/// that an unset flag can fall through to the config file, then to the
/// built-in default — see [`ServerConfig::load`].
#[derive(Debug, Clone, Parser)]
#[command(
    name = "redigo-server",
    about = "A Redis-compatible in-memory key/value server speaking a RESP3 subset"
)]
pub struct Cli {
    /// Path to an optional TOML config file, applied before defaults and
    /// after CLI flags.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Host or IP to bind.
    #[arg(long)]
    pub listen_address: Option<String>,

    /// TCP port to bind.
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Number of worker tasks to spawn.
    #[arg(long)]
    pub worker_count: Option<usize>,

    /// Per-connection idle deadline between reads, in seconds.
    #[arg(long)]
    pub keep_alive_secs: Option<u64>,

    /// Ceiling, in bytes, for one logical message including carry across
    /// reads.
    #[arg(long)]
    pub message_size_limit: Option<usize>,

    /// Grace period, in seconds, between receiving a termination signal
    /// and forcibly exiting.
    #[arg(long)]
    pub shutdown_tolerance_secs: Option<u64>,
}

/// The subset of [`ServerConfig`]'s fields that may come from a TOML file.
/// Every field is optional; an absent key simply falls through to the next
/// layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub listen_address: Option<String>,
    pub listen_port: Option<u16>,
    pub worker_count: Option<usize>,
    pub keep_alive_secs: Option<u64>,
    pub message_size_limit: Option<usize>,
    pub shutdown_tolerance_secs: Option<u64>,
}

/// Errors that can occur while assembling a [`ServerConfig`]. Distinct from
/// [`crate::error::Error`] — this is entirely a startup-time concern and
/// never reaches a connected client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("listen address {0:?} did not resolve to any socket address")]
    UnresolvableAddress(String),
}

/// The fully resolved, immutable configuration a dispatcher is built from.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub worker_count: usize,
    pub keep_alive: Duration,
    pub message_size_limit: usize,
    pub shutdown_tolerance: Duration,
}

impl ServerConfig {
    pub const DEFAULT_LISTEN_ADDRESS: &'static str = "127.0.0.1";
    pub const DEFAULT_LISTEN_PORT: u16 = 6543;
    pub const DEFAULT_WORKER_COUNT: usize = 10;
    pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;
    pub const DEFAULT_MESSAGE_SIZE_LIMIT: usize = 10240;
    pub const DEFAULT_SHUTDOWN_TOLERANCE_SECS: u64 = 5;

    /// Assembles a [`ServerConfig`] from CLI flags, an optional TOML file
    /// named by `cli.config`, and the defaults above, in that precedence
    /// order (highest first).
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };

        Ok(ServerConfig {
            listen_address: cli
                .listen_address
                .or(file.listen_address)
                .unwrap_or_else(|| Self::DEFAULT_LISTEN_ADDRESS.to_string()),
            listen_port: cli
                .listen_port
                .or(file.listen_port)
                .unwrap_or(Self::DEFAULT_LISTEN_PORT),
            worker_count: cli
                .worker_count
                .or(file.worker_count)
                .unwrap_or(Self::DEFAULT_WORKER_COUNT)
                .max(1),
            keep_alive: Duration::from_secs(
                cli.keep_alive_secs
                    .or(file.keep_alive_secs)
                    .unwrap_or(Self::DEFAULT_KEEP_ALIVE_SECS),
            ),
            message_size_limit: cli
                .message_size_limit
                .or(file.message_size_limit)
                .unwrap_or(Self::DEFAULT_MESSAGE_SIZE_LIMIT),
            shutdown_tolerance: Duration::from_secs(
                cli.shutdown_tolerance_secs
                    .or(file.shutdown_tolerance_secs)
                    .unwrap_or(Self::DEFAULT_SHUTDOWN_TOLERANCE_SECS),
            ),
        })
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
    }

    /// Resolves the listen address/port pair to a concrete [`SocketAddr`],
    /// performing DNS resolution if `listen_address` is a hostname.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.listen_address.as_str(), self.listen_port)
            .to_socket_addrs()
            .map_err(|_| ConfigError::UnresolvableAddress(self.listen_address.clone()))?
            .next()
            .ok_or_else(|| ConfigError::UnresolvableAddress(self.listen_address.clone()))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: Self::DEFAULT_LISTEN_ADDRESS.to_string(),
            listen_port: Self::DEFAULT_LISTEN_PORT,
            worker_count: Self::DEFAULT_WORKER_COUNT,
            keep_alive: Duration::from_secs(Self::DEFAULT_KEEP_ALIVE_SECS),
            message_size_limit: Self::DEFAULT_MESSAGE_SIZE_LIMIT,
            shutdown_tolerance: Duration::from_secs(Self::DEFAULT_SHUTDOWN_TOLERANCE_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_cli() -> Cli {
        Cli {
            config: None,
            listen_address: None,
            listen_port: None,
            worker_count: None,
            keep_alive_secs: None,
            message_size_limit: None,
            shutdown_tolerance_secs: None,
        }
    }

    #[test]
    fn no_flags_and_no_file_uses_defaults() {
        let config = ServerConfig::load(bare_cli()).unwrap();
        assert_eq!(config.listen_address, ServerConfig::DEFAULT_LISTEN_ADDRESS);
        assert_eq!(config.listen_port, ServerConfig::DEFAULT_LISTEN_PORT);
        assert_eq!(config.worker_count, ServerConfig::DEFAULT_WORKER_COUNT);
        assert_eq!(
            config.keep_alive,
            Duration::from_secs(ServerConfig::DEFAULT_KEEP_ALIVE_SECS)
        );
        assert_eq!(
            config.message_size_limit,
            ServerConfig::DEFAULT_MESSAGE_SIZE_LIMIT
        );
        assert_eq!(
            config.shutdown_tolerance,
            Duration::from_secs(ServerConfig::DEFAULT_SHUTDOWN_TOLERANCE_SECS)
        );
    }

    #[test]
    fn cli_flags_override_defaults() {
        let mut cli = bare_cli();
        cli.listen_port = Some(7777);
        cli.worker_count = Some(4);
        let config = ServerConfig::load(cli).unwrap();
        assert_eq!(config.listen_port, 7777);
        assert_eq!(config.worker_count, 4);
    }

    #[test]
    fn file_fills_in_what_cli_does_not_set() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("redigo-test-config-{}.toml", std::process::id()));
        std::fs::write(&path, "listen_port = 9999\nworker_count = 3\n").unwrap();

        let mut cli = bare_cli();
        cli.config = Some(path.clone());
        let config = ServerConfig::load(cli).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.listen_port, 9999);
        assert_eq!(config.worker_count, 3);
        // Unset by both CLI and file: falls back to the default.
        assert_eq!(
            config.keep_alive,
            Duration::from_secs(ServerConfig::DEFAULT_KEEP_ALIVE_SECS)
        );
    }

    #[test]
    fn cli_flag_wins_over_file_value() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("redigo-test-config-prec-{}.toml", std::process::id()));
        std::fs::write(&path, "listen_port = 9999\n").unwrap();

        let mut cli = bare_cli();
        cli.config = Some(path.clone());
        cli.listen_port = Some(1111);
        let config = ServerConfig::load(cli).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.listen_port, 1111);
    }

    #[test]
    fn worker_count_of_zero_is_clamped_to_one() {
        let mut cli = bare_cli();
        cli.worker_count = Some(0);
        let config = ServerConfig::load(cli).unwrap();
        assert_eq!(config.worker_count, 1);
    }
}
