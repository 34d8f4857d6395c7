use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // 2FA (TOTP) settings
    /// Issuer name shown in authenticator apps
    pub totp_issuer: String,

    /// AES-256 envelope key (Base64-encoded, 32 bytes).
    /// Loaded once at startup; never rotated at runtime.
    pub encryption_key: SecretBox<String>,

    // Bearer token settings
    /// HMAC secret for token signing
    pub token_secret: SecretBox<String>,
    /// Access token lifetime in minutes
    #[serde(default = "default_access_token_ttl_mins")]
    pub access_token_ttl_mins: i64,
    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ACCESS_TOKEN_TTL_MINS: i64 = 15;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_access_token_ttl_mins() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_MINS
}

fn default_refresh_token_ttl_days() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_DAYS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
