//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Core
//! - `NEYISEK_HOST` - Bind address (default: 127.0.0.1)
//! - `NEYISEK_PORT` - Listen port (default: 3000)
//! - `NEYISEK_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string.
//!   When unset the server runs against the in-memory store.
//! - `APP_ENV` / `NODE_ENV` - `development`, `production` or `test`
//!   (default: development)
//! - `NEXT_PUBLIC_SITE_URL` / `SITE_URL` - Public site URL used in links
//!
//! ## Integrations (each optional; features degrade when absent)
//! - `FIREBASE_PROJECT_ID`, `FIREBASE_CLIENT_EMAIL`, `FIREBASE_PRIVATE_KEY` -
//!   Push messaging service account. All three are required.
//! - `GEMINI_API_KEY`, `GEMINI_MODEL` - AI model
//! - `GOOGLE_MAPS_API_KEY` / `NEXT_PUBLIC_GOOGLE_MAPS_API_KEY` - Geocoding
//! - `EMAIL_USER`, `EMAIL_PASSWORD`, `EMAIL_SMTP_HOST`, `EMAIL_SMTP_PORT`,
//!   `EMAIL_ADMIN_ADDRESS` - SMTP relay
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_SITE_URL: &str = "https://neyisek.com";
const DEFAULT_ADMIN_ADDRESS: &str = "admin@neyisek.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    pub environment: Environment,
    /// Public site URL, without trailing slash
    pub site_url: String,
    pub firebase: Option<FirebaseConfig>,
    pub gemini: Option<GeminiConfig>,
    pub maps: Option<MapsConfig>,
    pub email: EmailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Push messaging service account.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: SecretString,
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// AI model configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Geocoding configuration.
#[derive(Clone)]
pub struct MapsConfig {
    pub api_key: SecretString,
}

impl fmt::Debug for MapsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapsConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// SMTP relay configuration.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// SMTP username, also used as the sender address
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Where restaurant applications are delivered
    pub admin_address: String,
}

impl EmailConfig {
    /// Whether SMTP credentials are present.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("admin_address", &self.admin_address)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_env(env, "NEYISEK_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_env(env, "NEYISEK_PORT", 3000_u16)?;
        let database_url = first_of(env, &["NEYISEK_DATABASE_URL", "DATABASE_URL"])
            .map(SecretString::from);

        let environment = match first_of(env, &["APP_ENV", "NODE_ENV"]) {
            Some(value) => value
                .parse::<Environment>()
                .map_err(|e| ConfigError::InvalidEnvVar("APP_ENV".to_string(), e))?,
            None => Environment::default(),
        };

        let site_url = first_of(env, &["NEXT_PUBLIC_SITE_URL", "SITE_URL"])
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host,
            port,
            database_url,
            environment,
            site_url,
            firebase: FirebaseConfig::from_lookup(env),
            gemini: GeminiConfig::from_lookup(env),
            maps: MapsConfig::from_lookup(env),
            email: EmailConfig::from_lookup(env)?,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT")
                .or_else(|| Some(environment.as_str().to_string())),
            sentry_sample_rate: parse_env(env, "SENTRY_SAMPLE_RATE", 1.0_f32)?,
            sentry_traces_sample_rate: parse_env(env, "SENTRY_TRACES_SAMPLE_RATE", 0.1_f32)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FirebaseConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        let project_id = get_optional_env(env, "FIREBASE_PROJECT_ID")?;
        let client_email = get_optional_env(env, "FIREBASE_CLIENT_EMAIL")?;
        // Keys pasted into dotenv files usually carry literal "\n" sequences.
        let private_key = get_optional_env(env, "FIREBASE_PRIVATE_KEY")?.replace("\\n", "\n");

        Some(Self {
            project_id,
            client_email,
            private_key: SecretString::from(private_key),
        })
    }
}

impl GeminiConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = get_optional_env(env, "GEMINI_API_KEY")?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: get_env_or_default(env, "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        })
    }
}

impl MapsConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = first_of(env, &["GOOGLE_MAPS_API_KEY", "NEXT_PUBLIC_GOOGLE_MAPS_API_KEY"])?;
        Some(Self {
            api_key: SecretString::from(api_key),
        })
    }
}

impl EmailConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let username = get_optional_env(env, "EMAIL_USER");
        let admin_address = get_optional_env(env, "EMAIL_ADMIN_ADDRESS")
            .or_else(|| username.clone())
            .unwrap_or_else(|| DEFAULT_ADMIN_ADDRESS.to_string());

        Ok(Self {
            smtp_host: get_env_or_default(env, "EMAIL_SMTP_HOST", "smtp.gmail.com"),
            smtp_port: parse_env(env, "EMAIL_SMTP_PORT", 587_u16)?,
            username,
            password: get_optional_env(env, "EMAIL_PASSWORD").map(SecretString::from),
            admin_address,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset or blank.
pub fn get_required_env(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    get_optional_env(env, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// First of several variables that is set.
fn first_of(env: &dyn Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| get_optional_env(env, key))
}

/// Parse a variable, falling back to `default` when unset.
fn parse_env<T>(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_optional_env(env, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
