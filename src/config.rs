use std::env;
use std::fmt::Display;
use std::str::FromStr;

use log::{info, warn};

pub const DEFAULT_COMMIT_URL: &str = "https://gitlab.archlinux.org/archlinux/aurweb/-/commits/%s";

/// Site configuration, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_address: String,
    /// Full commit hash of the running build, if known.
    pub commit_hash: Option<String>,
    /// Commit URL template; `%s` is replaced with the short hash.
    pub commit_url: String,
    /// Seconds a session may stay idle before it expires.
    pub login_timeout: i64,
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_owned(),
            listen_address: "127.0.0.1:8080".to_owned(),
            commit_hash: None,
            commit_url: DEFAULT_COMMIT_URL.to_owned(),
            login_timeout: 7200,
            secure_cookies: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;

        Ok(Self {
            database_url,
            listen_address: env::var("LISTEN_ADDRESS").unwrap_or(defaults.listen_address),
            commit_hash: env::var("COMMIT_HASH").ok().filter(|h| !h.is_empty()),
            commit_url: env::var("COMMIT_URL").unwrap_or(defaults.commit_url),
            login_timeout: try_load("LOGIN_TIMEOUT", defaults.login_timeout)?,
            secure_cookies: try_load("SECURE_COOKIES", defaults.secure_cookies)?,
            bcrypt_cost: try_load("BCRYPT_COST", defaults.bcrypt_cost)?,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e| {
            warn!("Invalid {} value: {}", key, e);
            anyhow::anyhow!("{} malformed", key)
        }),
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
