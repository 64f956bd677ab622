use std::str::FromStr;

use anyhow::{Context, Result};

use crate::packing::solver::SolverLimits;

/// Application configuration loaded from environment variables.
/// Fails at startup if a numeric variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL. `None` selects the in-memory pack set store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// Upper bound on `amount + max pack size` accepted by the solver.
    pub solver_max_table_size: usize,
    /// Upper bound on table cells times distinct pack sizes for one solve.
    pub solver_max_steps: u128,
    pub result_cache_capacity: usize,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            host: optional_env("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            environment: optional_env("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            rust_log: optional_env("LOG_LEVEL")
                .or_else(|| optional_env("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
            solver_max_table_size: parse_env("SOLVER_MAX_TABLE_SIZE", 10_000_000)?,
            solver_max_steps: parse_env("SOLVER_MAX_STEPS", 100_000_000)?,
            result_cache_capacity: parse_env("RESULT_CACHE_CAPACITY", 10_000)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn solver_limits(&self) -> SolverLimits {
        SolverLimits {
            max_table_size: self.solver_max_table_size,
            max_steps: self.solver_max_steps,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            db_max_connections: 10,
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
            rust_log: "info".to_string(),
            solver_max_table_size: 10_000_000,
            solver_max_steps: 100_000_000,
            result_cache_capacity: 10_000,
            request_timeout_secs: 30,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_address() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert!(!config.is_production());
    }

    #[test]
    fn test_default_solver_limits() {
        let limits = Config::default().solver_limits();
        assert_eq!(limits.max_table_size, 10_000_000);
        assert_eq!(limits.max_steps, 100_000_000);
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("PACKULATOR_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("PACKULATOR_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16> = parse_env("PACKULATOR_TEST_BAD_PORT", 8080);
        assert!(result.is_err());
        std::env::remove_var("PACKULATOR_TEST_BAD_PORT");
    }
}
