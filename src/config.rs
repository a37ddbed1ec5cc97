use std::{env, fmt::Display, str::FromStr, sync::OnceLock};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Dev,
    Prd,
    Other,
}

impl AppEnv {
    pub fn is_dev(self) -> bool {
        self == AppEnv::Dev
    }
}

impl FromStr for AppEnv {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "dev" => AppEnv::Dev,
            "prd" => AppEnv::Prd,
            _ => AppEnv::Other,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub session_key: String,
    pub app_env: AppEnv,
    pub bind_addr: String,
}

static APP_ENV: OnceLock<AppEnv> = OnceLock::new();

/// Environment the error pages render for. Unset counts as production.
pub fn app_env() -> AppEnv {
    APP_ENV.get().copied().unwrap_or(AppEnv::Prd)
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let app_env: AppEnv = try_load("APP_ENV", "prd");

        let session_key = match var("SESSION_KEY") {
            Ok(key) => key,
            Err(()) if app_env.is_dev() => {
                warn!("SESSION_KEY not set, using an insecure development key");
                "development-session-key".to_owned()
            }
            Err(()) => anyhow::bail!("SESSION_KEY must be set outside the dev environment"),
        };

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://roomdesk.db?mode=rwc"),
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "16"),
            session_key,
            app_env,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080"),
        })
    }

    /// Publishes `app_env` for code that has no access to the state.
    pub fn install(&self) {
        if APP_ENV.set(self.app_env).is_err() {
            warn!("APP_ENV already installed, keeping the first value");
        }
    }

    /// Cookies are marked `Secure` everywhere except local development.
    pub fn secure_cookies(&self) -> bool {
        !self.app_env.is_dev()
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        match default.parse() {
            Ok(value) => value,
            Err(_) => unreachable!("default for {key} must parse"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_parses_known_names() {
        assert_eq!("dev".parse::<AppEnv>().unwrap(), AppEnv::Dev);
        assert_eq!("prd".parse::<AppEnv>().unwrap(), AppEnv::Prd);
        assert_eq!("staging".parse::<AppEnv>().unwrap(), AppEnv::Other);
    }

    #[test]
    fn unset_numbers_fall_back_to_default() {
        let value: u32 = try_load("ROOMDESK_TEST_SURELY_UNSET_VAR", "7");
        assert_eq!(value, 7);
    }
}
