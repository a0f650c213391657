//! Server configuration.
//!
//! Every setting can come from a flag or an environment variable; `main`
//! loads a `.env` file first so local setups can keep secrets there.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;

use crate::api::{SecurityConfig, TokenVerifier};
use crate::generator::{DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port for HTTP API
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Database file (defaults to the platform data directory)
    #[arg(long, env = "COURSEGEN_DB")]
    pub database: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Gemini REST API root
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    /// Upper bound on a single generation call, in seconds
    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value = "60")]
    pub generation_timeout_secs: u64,

    /// Identity provider issuer URL; tokens are checked against its JWKS
    #[arg(long, env = "AUTH0_ISSUER_BASE_URL")]
    pub auth_issuer: Option<String>,

    /// Expected token audience
    #[arg(long, env = "AUTH0_AUDIENCE")]
    pub auth_audience: Option<String>,

    /// Verify HS256 tokens with this secret instead of the issuer's JWKS
    #[arg(long, env = "AUTH_HS256_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Allowed CORS origins, comma-separated (any origin if unset)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,
}

impl ServeArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn security(&self) -> Result<SecurityConfig> {
        let security = match (&self.auth_issuer, &self.auth_audience, &self.auth_secret) {
            (issuer, audience, Some(secret)) => {
                SecurityConfig::with_verifier(TokenVerifier::shared_secret(
                    secret.as_bytes(),
                    issuer.clone(),
                    audience.clone(),
                ))
            }
            (Some(issuer), Some(audience), None) => {
                SecurityConfig::with_verifier(TokenVerifier::jwks(issuer, audience))
            }
            (None, None, None) => {
                tracing::warn!("No identity provider configured, authentication is disabled");
                SecurityConfig::disabled()
            }
            _ => bail!("AUTH0_ISSUER_BASE_URL and AUTH0_AUDIENCE must be set together"),
        };

        Ok(security.cors_origins(self.cors_origins.clone()))
    }
}
