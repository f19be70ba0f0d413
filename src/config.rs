//! Server configuration from environment variables.

use std::net::SocketAddr;

const DEFAULT_BIND: &str = "0.0.0.0:7943";
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Directory the frontend assets are served from.
    pub static_dir: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = match std::env::var("SPYFALL_BIND") {
            Ok(raw) => parse_bind_addr(&raw),
            Err(_) => default_bind_addr(),
        };

        let static_dir = std::env::var("SPYFALL_STATIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());

        Self {
            bind_addr,
            static_dir,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    DEFAULT_BIND.parse().expect("default bind address parses")
}

fn parse_bind_addr(raw: &str) -> SocketAddr {
    match raw.trim().parse() {
        Ok(addr) => addr,
        Err(_) => {
            tracing::warn!(value = raw, "invalid SPYFALL_BIND, using default");
            default_bind_addr()
        }
    }
}
