//! Application configuration loaded from environment variables.

use crowdfund_core::TransitionPolicy;

use crate::errors::{Result, ServerError};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// HS256 signing key for access tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub jwt_ttl_secs: i64,
    /// Whether off-table status moves are applied or refused
    pub transition_policy: TransitionPolicy,
    /// Optional HTTP relay for outgoing email
    pub mail_relay_url: Option<String>,
    /// Optional HTTP relay for push notifications
    pub push_relay_url: Option<String>,
    /// Shared secret for payment webhook signatures
    pub stripe_webhook_secret: Option<String>,
    /// Seeded on startup when both are set and the email is unknown
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./crowdfund.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid API_PORT".to_string()))?,
            jwt_secret: env_var("JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    ServerError::Config("JWT_SECRET environment variable is required".to_string())
                })?,
            jwt_ttl_secs: env_var("JWT_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid JWT_TTL_SECS".to_string()))?,
            transition_policy: parse_policy(
                &env_var("TRANSITION_POLICY").unwrap_or_else(|_| "permissive".to_string()),
            )?,
            mail_relay_url: env_var("MAIL_RELAY_URL").ok(),
            push_relay_url: env_var("PUSH_RELAY_URL").ok(),
            stripe_webhook_secret: env_var("STRIPE_WEBHOOK_SECRET").ok(),
            bootstrap_admin: env_var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .zip(env_var("BOOTSTRAP_ADMIN_PASSWORD").ok()),
        })
    }
}

fn parse_policy(raw: &str) -> Result<TransitionPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "permissive" => Ok(TransitionPolicy::Permissive),
        "strict" => Ok(TransitionPolicy::Strict),
        other => Err(ServerError::Config(format!(
            "Invalid TRANSITION_POLICY: {other} (expected permissive or strict)"
        ))),
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ServerError::Config(format!("Missing env var: {key}")))
}

#[cfg(test)]
impl Config {
    /// Configuration used by in-process tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            api_port: 0,
            jwt_secret: "test-secret-not-for-production".to_string(),
            jwt_ttl_secs: 3600,
            transition_policy: TransitionPolicy::Permissive,
            mail_relay_url: None,
            push_relay_url: None,
            stripe_webhook_secret: None,
            bootstrap_admin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!(parse_policy("Strict").unwrap(), TransitionPolicy::Strict);
        assert_eq!(parse_policy(" permissive ").unwrap(), TransitionPolicy::Permissive);
        assert!(parse_policy("lenient").is_err());
    }
}
