//! Process configuration for the API binary.

use std::net::SocketAddr;

use stockroom_infra::config::LedgerConfig;

pub const BIND_ADDR_VAR: &str = "STOCKROOM_BIND_ADDR";
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres event store; in-memory when absent.
    pub database_url: Option<String>,
    pub ledger: LedgerConfig,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = match lookup(BIND_ADDR_VAR) {
            None => default_bind_addr(),
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid {BIND_ADDR_VAR}; using {DEFAULT_BIND_ADDR}");
                default_bind_addr()
            }),
        };

        let jwt_secret = match lookup(JWT_SECRET_VAR).filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_url = lookup(DATABASE_URL_VAR).filter(|s| !s.trim().is_empty());

        Self {
            bind_addr,
            jwt_secret,
            database_url,
            ledger: LedgerConfig::from_lookup(&lookup),
        }
    }

    /// In-memory configuration with the given secret (tests and local runs).
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            ledger: LedgerConfig::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = ApiConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.ledger, LedgerConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
            (JWT_SECRET_VAR, "s3cret"),
            (DATABASE_URL_VAR, "postgres://localhost/stockroom"),
            ("STOCKROOM_MAX_CONFLICT_RETRIES", "9"),
        ]));
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/stockroom"));
        assert_eq!(cfg.ledger.max_conflict_retries, 9);
    }

    #[test]
    fn bad_bind_address_falls_back() {
        let cfg = ApiConfig::from_lookup(lookup(&[(BIND_ADDR_VAR, "not an address"), (DATABASE_URL_VAR, " ")]));
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(cfg.database_url.is_none());
    }
}
