//! Configuration for coedit
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// coedit - real-time collaborative document synchronization server
#[derive(Parser, Debug, Clone)]
#[command(name = "coedit")]
#[command(about = "Real-time collaborative document synchronization server")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (admits ?account= without a token)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Undo/redo entries kept per session; the oldest is dropped past the cap
    #[arg(long, env = "HISTORY_LIMIT", default_value = "256")]
    pub history_limit: usize,

    /// Maximum concurrent WebSocket connections
    #[arg(long, env = "MAX_CONNECTIONS", default_value = "4096")]
    pub max_connections: usize,

    /// Comma-separated `token=account` pairs admitted at the collab endpoint
    /// (required in production mode)
    #[arg(long, env = "ACCESS_TOKENS")]
    pub access_tokens: Option<String>,

    /// Comma-separated `account=Display Name` pairs seeding the static
    /// display-name directory
    #[arg(long, env = "DIRECTORY")]
    pub directory: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.access_tokens.is_none() {
            return Err("ACCESS_TOKENS is required in production mode".to_string());
        }

        if self.history_limit == 0 {
            return Err("HISTORY_LIMIT must be at least 1".to_string());
        }

        if self.max_connections == 0 {
            return Err("MAX_CONNECTIONS must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:0".parse().unwrap(),
            dev_mode: true,
            log_level: "info".to_string(),
            history_limit: 256,
            max_connections: 4096,
            access_tokens: None,
            directory: None,
        }
    }

    #[test]
    fn test_dev_mode_needs_no_tokens() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_production_requires_tokens() {
        let mut args = base_args();
        args.dev_mode = false;
        assert!(args.validate().is_err());

        args.access_tokens = Some("t=alice".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut args = base_args();
        args.history_limit = 0;
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.max_connections = 0;
        assert!(args.validate().is_err());
    }
}
