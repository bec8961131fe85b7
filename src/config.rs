/// Server configuration loaded from environment variables.
pub struct Config {
    pub port: u16,
    pub runtime_url: String,
    pub sentry_dsn: Option<String>,
    pub environment: String,
    /// Ambient object-storage credentials, used only as the fallback when a
    /// mount request carries no explicit credentials.
    pub storage_access_key_id: Option<String>,
    pub storage_secret_access_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_raw_values(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("RUNTIME_URL").ok().as_deref(),
            std::env::var("SENTRY_DSN").ok().as_deref(),
            std::env::var("ENVIRONMENT").ok().as_deref(),
            std::env::var("AWS_ACCESS_KEY_ID").ok().as_deref(),
            std::env::var("AWS_SECRET_ACCESS_KEY").ok().as_deref(),
        )
    }

    /// Build a Config from raw string values (as they would come from env vars).
    /// Used directly in tests to avoid mutating process-global environment.
    pub fn from_raw_values(
        port: Option<&str>,
        runtime_url: Option<&str>,
        sentry_dsn: Option<&str>,
        environment: Option<&str>,
        storage_access_key_id: Option<&str>,
        storage_secret_access_key: Option<&str>,
    ) -> Self {
        let port = port.and_then(|v| v.parse().ok()).unwrap_or(8787);

        let runtime_url = runtime_url
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let sentry_dsn = sentry_dsn.filter(|s| !s.is_empty()).map(String::from);

        let environment = environment
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| "local".to_string());

        let storage_access_key_id = storage_access_key_id
            .filter(|s| !s.is_empty())
            .map(String::from);

        let storage_secret_access_key = storage_secret_access_key
            .filter(|s| !s.is_empty())
            .map(String::from);

        Config {
            port,
            runtime_url,
            sentry_dsn,
            environment,
            storage_access_key_id,
            storage_secret_access_key,
        }
    }

    /// Both halves of the ambient storage credential pair, or None when
    /// either half is missing.
    pub fn storage_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.storage_access_key_id.as_deref(),
            self.storage_secret_access_key.as_deref(),
        ) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        }
    }
}
