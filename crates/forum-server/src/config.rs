use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// Staff account created or promoted at startup, when both are set.
    pub admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("FORUM_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FORUM_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let db_path = std::env::var("FORUM_DB_PATH").unwrap_or_else(|_| "forum.db".into()).into();
        let host = std::env::var("FORUM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("FORUM_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("FORUM_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port).parse().context("invalid FORUM_HOST")?;

        let token_ttl_days: i64 = std::env::var("FORUM_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .context("FORUM_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("FORUM_TOKEN_TTL_DAYS must be positive");
        }

        let admin = match (std::env::var("FORUM_ADMIN_USERNAME"), std::env::var("FORUM_ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        };

        Ok(Self {
            db_path,
            addr,
            jwt_secret,
            token_ttl_days,
            admin,
        })
    }
}
