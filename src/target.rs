//! Server locators
//!
//! A [`TargetDescriptor`] names the server as `{host:port}`. A [`Scope`]
//! adds a folder, as in `{imap.example.com:993}INBOX`. The empty folder
//! is the server root, used for listing and liveness checks.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    pub host: String,
    pub port: u16,
}

impl TargetDescriptor {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Scope this target to `folder`.
    #[must_use]
    pub fn scope(&self, folder: &str) -> Scope {
        Scope {
            target: self.clone(),
            folder: folder.to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> Scope {
        self.scope("")
    }

    /// Remove this target's `{host:port}` prefix from a folder name.
    ///
    /// Names without the prefix are returned unchanged.
    #[must_use]
    pub fn strip<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(&self.to_string()).unwrap_or(name)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.host, self.port)
    }
}

/// A target narrowed to one folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub target: TargetDescriptor,
    pub folder: String,
}

impl Scope {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.folder.is_empty()
    }

    /// Parse the `{host:port}folder` text form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('{')?;
        let (locator, folder) = rest.split_once('}')?;
        let (host, port) = locator.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            target: TargetDescriptor::new(host, port.parse().ok()?),
            folder: folder.to_string(),
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.target, self.folder)
    }
}
