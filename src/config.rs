//! Account credentials and connection options

use crate::error::{Error, Result};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::time::Duration;

const IMPLICIT_TLS_PORT: u16 = 993;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the TLS layer is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// TLS from the first byte (usually port 993).
    Tls,
    /// Plain TCP upgraded with the STARTTLS command.
    StartTls,
}

/// Options for reaching the mail server.
///
/// Only `port` is mandatory. Keys this crate does not know about are
/// kept in `extra` and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub port: u16,
    /// Server host. Defaults to the domain part of the account address.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub security: Option<Security>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            host: None,
            security: None,
            accept_invalid_certs: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra: BTreeMap::new(),
        }
    }

    /// Security mode, falling back to implicit TLS on port 993 and
    /// STARTTLS everywhere else.
    #[must_use]
    pub fn security(&self) -> Security {
        self.security.unwrap_or(if self.port == IMPLICIT_TLS_PORT {
            Security::Tls
        } else {
            Security::StartTls
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load connection options from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `MAIL_PORT`
    ///
    /// Optional:
    /// - `MAIL_HOST` (default: the address domain)
    /// - `MAIL_SECURITY` (`tls` or `starttls`)
    /// - `MAIL_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `MAIL_TIMEOUT_SECS` (default: `30`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is missing or malformed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("MAIL_PORT")
            .map_err(|_| Error::Config("MAIL_PORT not set".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("Invalid MAIL_PORT: {e}")))?;

        let mut options = Self::new(port);
        options.host = env::var("MAIL_HOST").ok().filter(|h| !h.is_empty());

        if let Ok(security) = env::var("MAIL_SECURITY") {
            options.security = Some(match security.to_ascii_lowercase().as_str() {
                "tls" => Security::Tls,
                "starttls" => Security::StartTls,
                other => {
                    return Err(Error::Config(format!("Invalid MAIL_SECURITY: {other}")));
                }
            });
        }

        if let Ok(accept) = env::var("MAIL_ACCEPT_INVALID_CERTS") {
            options.accept_invalid_certs = accept
                .parse()
                .map_err(|e| Error::Config(format!("Invalid MAIL_ACCEPT_INVALID_CERTS: {e}")))?;
        }

        if let Ok(secs) = env::var("MAIL_TIMEOUT_SECS") {
            options.timeout_secs = secs
                .parse()
                .map_err(|e| Error::Config(format!("Invalid MAIL_TIMEOUT_SECS: {e}")))?;
        }

        Ok(options)
    }
}

/// A syntactically valid address and its password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Validate `email` and pair it with `password`.
    ///
    /// Returns `None` for anything that is not a well-formed address.
    #[must_use]
    pub fn parse(email: &str, password: &str) -> Option<Self> {
        if !email.contains('@') || !EmailAddress::is_valid(email) {
            return None;
        }
        Some(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Domain part of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.email.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Email and password loaded from the environment, for the CLI.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub email: String,
    pub password: String,
    pub options: ConnectionOptions,
}

impl AccountConfig {
    /// Load the account from `MAIL_EMAIL`, `MAIL_PASSWORD` and the
    /// variables read by [`ConnectionOptions::from_env`].
    ///
    /// The address is not validated here; an invalid one produces a
    /// session that answers `NotReady`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is missing or malformed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            email: env::var("MAIL_EMAIL")
                .map_err(|_| Error::Config("MAIL_EMAIL not set".into()))?,
            password: env::var("MAIL_PASSWORD")
                .map_err(|_| Error::Config("MAIL_PASSWORD not set".into()))?,
            options: ConnectionOptions::from_env()?,
        })
    }
}
