use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: String,
    pub cart_session_key: String,
    pub admin_password: Option<String>,
    pub user_password: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            secret: required("SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            cart_session_key: optional("CART_SESSION_KEY").unwrap_or_else(|| "cart".to_string()),
            admin_password: optional("ADMIN_PASSWORD"),
            user_password: optional("USER_PASSWORD"),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
