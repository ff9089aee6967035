use std::env;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Origin allowed by CORS; absent means same-origin deployments only.
    pub cors_origin: Option<String>,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("SERVER_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let listen_addr =
            env::var("SERVER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty());

        let auth = AuthConfig::from_env()?;

        Ok(Self {
            database_url,
            listen_addr,
            cors_origin,
            auth,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base64-encoded HMAC secret for bearer tokens, at least 32 bytes.
    jwt_secret: SecretString,
}

impl AuthConfig {
    pub fn new(jwt_secret: SecretString) -> Result<Self, ConfigError> {
        validate_jwt_secret(jwt_secret.expose_secret())?;
        Ok(Self { jwt_secret })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            env::var("KANBAN_JWT_SECRET").map_err(|_| ConfigError::MissingVar("KANBAN_JWT_SECRET"))?;
        Self::new(SecretString::new(jwt_secret.into()))
    }

    pub fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ConfigError> {
    let decoded = BASE64_STANDARD
        .decode(secret.as_bytes())
        .map_err(|_| ConfigError::InvalidVar("KANBAN_JWT_SECRET"))?;

    if decoded.len() < 32 {
        return Err(ConfigError::InvalidVar("KANBAN_JWT_SECRET"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};

    use super::validate_jwt_secret;

    #[test]
    fn rejects_non_base64_secret() {
        assert!(validate_jwt_secret("not base64!!!").is_err());
    }

    #[test]
    fn rejects_short_secret() {
        let short = BASE64_STANDARD.encode([7u8; 16]);
        assert!(validate_jwt_secret(&short).is_err());
    }

    #[test]
    fn accepts_32_byte_secret() {
        let ok = BASE64_STANDARD.encode([7u8; 32]);
        assert!(validate_jwt_secret(&ok).is_ok());
    }
}
