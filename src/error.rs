//! Error types for imap-envelope
//!
//! Two layers live here. [`Error`] is what a transport or the
//! configuration loader reports, with the full cause. [`MailError`] is
//! what every public session operation returns: a closed
//! [`ErrorKind`] plus the transport's last diagnostic, verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The server rejected a command (tagged NO/BAD) or returned no data.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// The connection is gone or could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Message parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Whether the failure invalidated the connection handle.
    ///
    /// A session drops its handle after a fatal error so that the next
    /// call starts from a fresh connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Io(_) | Self::Tls(_) | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error keys reported in a KO envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The session was built from an invalid address and never runs I/O.
    NotReady,
    ConnectFail,
    DisconnectFail,
    GetFoldersError,
    GetFolderInfosError,
    GetQuotaFail,
    PingFail,
    GetMailsFail,
    GetMessageFail,
    CheckFail,
    #[serde(other)]
    Unknown,
}

impl ErrorKind {
    /// The key as it appears in the `error_key` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotReady => "NotReady",
            Self::ConnectFail => "ConnectFail",
            Self::DisconnectFail => "DisconnectFail",
            Self::GetFoldersError => "GetFoldersError",
            Self::GetFolderInfosError => "GetFolderInfosError",
            Self::GetQuotaFail => "GetQuotaFail",
            Self::PingFail => "PingFail",
            Self::GetMailsFail => "GetMailsFail",
            Self::GetMessageFail => "GetMessageFail",
            Self::CheckFail => "CheckFail",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in an operation a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotReady,
    /// Opening or reselecting the connection handle.
    Open,
    /// An operation that needs an existing handle found none.
    NotConnected,
    Close,
    ListFolders,
    FolderStatus,
    /// The transport lost the folder scope while aggregating status.
    FolderUnreachable,
    Check,
    Overview,
    Body,
    Quota,
    Ping,
}

impl Failure {
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::NotReady => ErrorKind::NotReady,
            Self::Open | Self::NotConnected | Self::FolderUnreachable => ErrorKind::ConnectFail,
            Self::Close => ErrorKind::DisconnectFail,
            Self::ListFolders => ErrorKind::GetFoldersError,
            Self::FolderStatus => ErrorKind::GetFolderInfosError,
            Self::Check => ErrorKind::CheckFail,
            Self::Overview => ErrorKind::GetMailsFail,
            Self::Body => ErrorKind::GetMessageFail,
            Self::Quota => ErrorKind::GetQuotaFail,
            Self::Ping => ErrorKind::PingFail,
        }
    }
}

/// A classified failure of a public session operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {last_error}")]
pub struct MailError {
    #[serde(rename = "error_key")]
    pub kind: ErrorKind,
    pub last_error: String,
}

pub type MailResult<T> = std::result::Result<T, MailError>;

/// Map a failure context and the transport's diagnostic to a [`MailError`].
///
/// The diagnostic is kept as given, including when it is empty.
#[must_use]
pub fn classify(failure: Failure, diagnostic: impl Into<String>) -> MailError {
    MailError {
        kind: failure.kind(),
        last_error: diagnostic.into(),
    }
}
