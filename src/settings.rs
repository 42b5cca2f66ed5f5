//! Process-wide, read-only API configuration.

use once_cell::sync::OnceCell;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::policy::RetryPolicy;

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "FETCHGUARD_API_URL";
/// Environment variable selecting the deployment environment.
pub const ENV_ENVIRONMENT: &str = "FETCHGUARD_ENV";
/// Environment variable overriding the retry count.
pub const ENV_RETRY_ATTEMPTS: &str = "FETCHGUARD_RETRY_ATTEMPTS";
/// Environment variable overriding the base retry delay, in milliseconds.
pub const ENV_RETRY_DELAY_MS: &str = "FETCHGUARD_RETRY_DELAY_MS";
/// Environment variable overriding the request timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "FETCHGUARD_TIMEOUT_MS";

static GLOBAL: OnceCell<ApiConfig> = OnceCell::new();

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development. Boundaries show error details.
    #[default]
    Development,
    /// Pre-production.
    Staging,
    /// Production.
    Production,
    /// Automated tests.
    Test,
}

impl Environment {
    /// Whether this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        f.write_str(name)
    }
}

/// API client settings shared by every fetch handle in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
    environment: Environment,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(10),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            environment: Environment::Development,
        }
    }
}

impl ApiConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides from an arbitrary key/value source.
    ///
    /// Missing keys keep their defaults. Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|url| !url.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(environment) = parse(&lookup, ENV_ENVIRONMENT) {
            config.environment = environment;
        }
        if let Some(attempts) = parse(&lookup, ENV_RETRY_ATTEMPTS) {
            config.retry_attempts = attempts;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, ENV_RETRY_DELAY_MS) {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, ENV_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(ms);
        }

        config
    }

    /// Returns the process configuration, reading the environment on first use.
    pub fn global() -> &'static ApiConfig {
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Installs `config` as the process configuration.
    ///
    /// Fails with the rejected config if one is already installed.
    pub fn install(config: ApiConfig) -> Result<(), ApiConfig> {
        GLOBAL.set(config)
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout handed to HTTP collaborators.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry count.
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Sets the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the deployment environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request timeout for HTTP collaborators.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of retries after the initial attempt.
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Base retry delay.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Deployment environment.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self)
    }

    /// Joins `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse<V, F>(lookup: &F, key: &str) -> Option<V>
where
    V: FromStr,
    V::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, "ignoring invalid configuration value");
            None
        }
    }
}
