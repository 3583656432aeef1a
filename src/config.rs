use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without one the directory lives in memory.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub log_level: String,
    pub import: ImportOptions,
}

/// Knobs for CSV reconciliation.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Plain text hashed into the credential placeholder of every new user.
    pub initial_password: String,
    pub chain_policy: ChainPolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            initial_password: "password".to_string(),
            chain_policy: ChainPolicy::All,
        }
    }
}

/// Which chains of command are recomputed after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPolicy {
    /// Every user in the directory.
    All,
    /// Users created or re-parented by the batch, plus everyone below them.
    Changed,
}

impl ChainPolicy {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(ChainPolicy::All),
            "changed" => Ok(ChainPolicy::Changed),
            other => Err(format!(
                "Invalid ROSTER_CHAIN_POLICY '{other}': expected 'all' or 'changed'"
            )),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let host: IpAddr = env_or("ROSTER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_HOST: {e}"))?;

        let port: u16 = env_or("ROSTER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_PORT: {e}"))?;

        let max_body_size: usize = env_or("ROSTER_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid ROSTER_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("ROSTER_LOG_LEVEL", "info");

        let import = ImportOptions {
            initial_password: env_or("ROSTER_INITIAL_PASSWORD", "password"),
            chain_policy: ChainPolicy::parse(&env_or("ROSTER_CHAIN_POLICY", "all"))?,
        };

        Ok(Config {
            database_url,
            host,
            port,
            max_body_size,
            log_level,
            import,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
