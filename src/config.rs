use anyhow::Context;

/// Upper bound on EXTGATE_TOKEN_TTL_SECS: 30 days.
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Max pooled Postgres connections.
    /// Set via EXTGATE_DB_MAX_CONNECTIONS env var. Default: 10.
    pub db_max_connections: u32,
    /// Lifetime of an extension token in seconds.
    /// Set via EXTGATE_TOKEN_TTL_SECS env var. Default: 3600.
    pub token_ttl_secs: i64,
    /// When false, every token rejection reads "Invalid token".
    /// Set via EXTGATE_DISCLOSE_FAILURE_REASONS env var. Default: true.
    pub disclose_failure_reasons: bool,
    /// Comma-separated list of extra web origins allowed by CORS.
    /// Browser-extension origins are always allowed.
    pub allowed_origins: Vec<String>,
    /// Seconds between expired-token purges. 0 disables the job.
    pub purge_interval_secs: u64,
    /// How long an expired token row is kept before purging, in hours.
    pub purge_retention_hours: i64,
}

impl Config {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "postgres://localhost/extgate".into(),
            db_max_connections: 10,
            token_ttl_secs: 3600,
            disclose_failure_reasons: true,
            allowed_origins: Vec::new(),
            purge_interval_secs: 3600,
            purge_retention_hours: 24,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any key lookup. `load` feeds it the process environment.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let token_ttl_secs = parse_or(&lookup, "EXTGATE_TOKEN_TTL_SECS", defaults.token_ttl_secs)?;
    if token_ttl_secs <= 0 {
        anyhow::bail!("EXTGATE_TOKEN_TTL_SECS must be positive, got {}", token_ttl_secs);
    }
    if token_ttl_secs > MAX_TOKEN_TTL_SECS {
        anyhow::bail!(
            "EXTGATE_TOKEN_TTL_SECS must be at most {}, got {}",
            MAX_TOKEN_TTL_SECS,
            token_ttl_secs
        );
    }

    let purge_retention_hours = parse_or(
        &lookup,
        "EXTGATE_PURGE_RETENTION_HOURS",
        defaults.purge_retention_hours,
    )?;
    if purge_retention_hours < 0 {
        anyhow::bail!(
            "EXTGATE_PURGE_RETENTION_HOURS must not be negative, got {}",
            purge_retention_hours
        );
    }

    Ok(Config {
        port: parse_or(&lookup, "EXTGATE_PORT", defaults.port)?,
        database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
        db_max_connections: parse_or(
            &lookup,
            "EXTGATE_DB_MAX_CONNECTIONS",
            defaults.db_max_connections,
        )?,
        token_ttl_secs,
        disclose_failure_reasons: parse_or(
            &lookup,
            "EXTGATE_DISCLOSE_FAILURE_REASONS",
            defaults.disclose_failure_reasons,
        )?,
        allowed_origins: lookup("EXTGATE_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        purge_interval_secs: parse_or(
            &lookup,
            "EXTGATE_PURGE_INTERVAL_SECS",
            defaults.purge_interval_secs,
        )?,
        purge_retention_hours,
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
