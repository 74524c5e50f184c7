use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    pub cors_origin: Option<String>,
    pub max_connections: u32,
}

impl ServerConfig {
    pub fn resolve(
        bind: &str,
        cors_origin: Option<String>,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let bind = bind
            .parse()
            .with_context(|| format!("invalid bind address '{bind}'"))?;
        let database_url = database_url()?;
        let cors_origin = cors_origin
            .or_else(|| std::env::var("FRONTEND_URL").ok())
            .filter(|origin| !origin.trim().is_empty());

        Ok(Self {
            bind,
            database_url,
            cors_origin,
            max_connections: max_connections.max(1),
        })
    }
}

pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the survey Postgres instance")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_bind_address_fails_before_env_lookup() {
        let err = ServerConfig::resolve("not-an-address", None, 5).unwrap_err();
        assert!(err.to_string().contains("invalid bind address"));
    }

    #[test]
    fn default_bind_matches_legacy_port() {
        let addr: SocketAddr = DEFAULT_BIND.parse().unwrap();
        assert_eq!(addr.port(), 3001);
    }
}
