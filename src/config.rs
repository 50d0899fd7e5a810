//! Service settings.
//!
//! Loaded with the `config` crate from, in increasing precedence:
//! 1. Built-in defaults
//! 2. A TOML file
//! 3. Environment variables prefixed with `PIP_`, nested with `__`
//!    (`PIP_SEED_HEX`, `PIP_CLAIMS__MODE`, `PIP_RSA__KEYS__BLIND_RSA_PUBLIC_KEY_1700000000`)

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::claims::{ClaimMode, DEFAULT_CAPACITY};
use crate::error::{Error, Result};
use crate::pss::{Hash, Options};
use crate::rotation::MIN_LIVE_PAIRS;

pub const DEFAULT_AUTH_CONTEXT: &str = "per-client-pip-key";
pub const ENV_PREFIX: &str = "PIP";
/// PSS salt length the deployed requesters blind with.
pub const DEFAULT_SALT_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Dev,
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Hex master seed for per-context service keys
    #[serde(default)]
    pub seed_hex: String,
    #[serde(default = "default_auth_context")]
    pub auth_context: String,
    /// Pre-shared key for the sign and issue endpoints
    #[serde(default)]
    pub svc_psk: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    /// Admit every claim. Ignored in `prod`.
    #[serde(default)]
    pub bypass_auth: bool,
    #[serde(default)]
    pub rsa: RsaSettings,
    #[serde(default)]
    pub claims: ClaimSettings,
}

#[derive(Clone, Deserialize)]
pub struct RsaSettings {
    /// `BLIND_RSA_{PRIVATE,PUBLIC}_KEY_<epoch>` to JWK JSON
    #[serde(default)]
    pub keys: HashMap<String, String>,
    #[serde(default = "default_min_retained")]
    pub min_retained: usize,
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClaimSettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub mode: ClaimMode,
}

fn default_auth_context() -> String {
    DEFAULT_AUTH_CONTEXT.to_string()
}

fn default_min_retained() -> usize {
    MIN_LIVE_PAIRS
}

fn default_salt_len() -> usize {
    DEFAULT_SALT_LEN
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for RsaSettings {
    fn default() -> Self {
        RsaSettings {
            keys: HashMap::new(),
            min_retained: default_min_retained(),
            salt_len: default_salt_len(),
        }
    }
}

impl Default for ClaimSettings {
    fn default() -> Self {
        ClaimSettings {
            capacity: default_capacity(),
            mode: ClaimMode::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("auth_context", &self.auth_context)
            .field("svc_psk", &self.svc_psk.as_ref().map(|_| ".."))
            .field("environment", &self.environment)
            .field("bypass_auth", &self.bypass_auth)
            .field("rsa", &self.rsa)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RsaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("RsaSettings")
            .field("keys", &names)
            .field("min_retained", &self.min_retained)
            .field("salt_len", &self.salt_len)
            .finish()
    }
}

fn config_error(e: config::ConfigError) -> Error {
    warn!("configuration: {}", e);
    Error::Config
}

impl Settings {
    /// Load from an optional TOML file, then `PIP_*` environment variables.
    pub fn from_sources(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );
        Self::finish(builder.build().map_err(config_error)?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(config_error)?;
        Self::finish(cfg)
    }

    fn finish(cfg: config::Config) -> Result<Self> {
        let mut settings: Settings = cfg.try_deserialize().map_err(config_error)?;
        // environment sources lowercase their keys
        settings.rsa.keys = settings
            .rsa
            .keys
            .into_iter()
            .map(|(name, jwk)| (name.to_ascii_uppercase(), jwk))
            .collect();
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth_context.is_empty() {
            warn!("configuration: empty auth_context");
            return Err(Error::EmptySecretOrContext);
        }
        if self.bypass_auth && self.environment == Environment::Prod {
            warn!("configuration: bypass_auth is ignored in prod");
        }
        Ok(())
    }

    /// Whether claims are admitted without verification.
    pub fn bypass_active(&self) -> bool {
        self.bypass_auth && self.environment != Environment::Prod
    }

    pub fn options(&self) -> Options {
        Options::new(Hash::Sha384, self.rsa.salt_len)
    }
}
