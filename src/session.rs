//! Mailbox session lifecycle
//!
//! A [`MailboxSession`] owns one account, one server target and at most
//! one connection handle. The handle is opened lazily on first use and
//! then reused: moving to another folder reselects it instead of paying
//! for a new TCP, TLS and login round trip.
//!
//! Every public operation takes `&mut self`, so the selected folder can
//! never be raced by two calls on the same session. To share a session
//! between tasks, put it behind a `tokio::sync::Mutex`.

use crate::config::{ConnectionOptions, Credentials};
use crate::connection::ImapTransport;
use crate::error::{Error, Failure, MailError, MailResult, classify};
use crate::target::{Scope, TargetDescriptor};
use crate::transport::{MailTransport, MailboxCheck, QuotaReport};
use tracing::{debug, info, warn};

/// Credentials plus the target derived from them. Present only on a
/// ready session.
#[derive(Debug, Clone)]
struct Account {
    credentials: Credentials,
    target: TargetDescriptor,
}

/// An open handle and the folder it currently points at.
///
/// `folder` is `None` after a failed SELECT, when the server has left
/// no folder selected.
pub(crate) struct Connection<H> {
    pub(crate) handle: H,
    pub(crate) folder: Option<String>,
}

/// A single-account, single-target mailbox session.
///
/// Built from an address that fails validation, the session is
/// permanently not ready: every operation returns
/// [`ErrorKind::NotReady`](crate::ErrorKind::NotReady) without touching
/// the network.
pub struct MailboxSession<T: MailTransport = ImapTransport> {
    pub(crate) transport: T,
    account: Option<Account>,
    options: ConnectionOptions,
    pub(crate) connection: Option<Connection<T::Handle>>,
}

impl MailboxSession<ImapTransport> {
    /// Create a session that talks IMAP over TLS.
    #[must_use]
    pub fn new(email: &str, password: &str, options: ConnectionOptions) -> Self {
        let transport = ImapTransport::new(&options);
        Self::with_transport(email, password, options, transport)
    }
}

impl<T: MailTransport> MailboxSession<T> {
    /// Create a session over any transport.
    ///
    /// The host is the `host` option when set, otherwise the domain of
    /// `email`.
    #[must_use]
    pub fn with_transport(
        email: &str,
        password: &str,
        options: ConnectionOptions,
        transport: T,
    ) -> Self {
        let account = Credentials::parse(email, password).map(|credentials| {
            let host = options
                .host
                .clone()
                .unwrap_or_else(|| credentials.domain().to_string());
            let target = TargetDescriptor::new(host, options.port);
            Account {
                credentials,
                target,
            }
        });

        if account.is_none() {
            warn!("Invalid email address {:?}, session disabled", email);
        }

        Self {
            transport,
            account,
            options,
            connection: None,
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.account.is_some()
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// The account address, if the session is ready.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.credentials.email())
    }

    #[must_use]
    pub fn target(&self) -> Option<&TargetDescriptor> {
        self.account.as_ref().map(|a| &a.target)
    }

    #[must_use]
    pub const fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Folder the current handle points at, `""` for the server root.
    ///
    /// `None` without a handle, or when the last reselect failed.
    #[must_use]
    pub fn current_folder(&self) -> Option<&str> {
        self.connection.as_ref().and_then(|c| c.folder.as_deref())
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the connection, or reselect the server root on the
    /// existing one.
    ///
    /// Returns the account address.
    ///
    /// # Errors
    ///
    /// `NotReady` for an invalid account, `ConnectFail` when the server
    /// cannot be reached or refuses the login.
    pub async fn connect(&mut self) -> MailResult<String> {
        let scope = self.scope("")?;
        if let Some(conn) = self.connection.as_mut() {
            debug!("Reselecting {}", scope);
            let result = self.transport.reopen(&mut conn.handle, &scope).await;
            if let Err(e) = result {
                return Err(self.fail(Failure::Open, &e));
            }
            conn.folder = Some(String::new());
        } else {
            self.open(&scope).await?;
        }

        let email = self.email().unwrap_or_default().to_string();
        info!("Connected {} to {}", email, scope.target);
        Ok(email)
    }

    /// Close the connection handle.
    ///
    /// The handle is discarded whether or not the server acknowledges
    /// the logout; the next operation opens a fresh one.
    ///
    /// # Errors
    ///
    /// `NotReady` for an invalid account, `ConnectFail` when no handle
    /// is open, `DisconnectFail` when the logout fails.
    pub async fn disconnect(&mut self) -> MailResult<()> {
        self.scope("")?;
        let Some(conn) = self.connection.take() else {
            return Err(self.classify(Failure::NotConnected));
        };

        match self.transport.close(conn.handle).await {
            Ok(()) => {
                let target = self.target().map(ToString::to_string).unwrap_or_default();
                info!("Disconnected from {}", target);
                Ok(())
            }
            Err(e) => Err(self.fail(Failure::Close, &e)),
        }
    }

    /// Check that the server still answers.
    ///
    /// # Errors
    ///
    /// `NotReady`, `ConnectFail` when no handle can be obtained, or
    /// `PingFail` when the server does not answer. A failed ping drops
    /// the handle.
    pub async fn ping(&mut self) -> MailResult<()> {
        self.ensure_connected().await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };
        if self.transport.ping(&mut conn.handle).await {
            return Ok(());
        }
        self.connection = None;
        Err(self.classify(Failure::Ping))
    }

    /// Quota roots and usage for `folder`.
    ///
    /// # Errors
    ///
    /// `NotReady`, `ConnectFail`, or `GetQuotaFail` when the server
    /// rejects the quota lookup.
    pub async fn get_quota(&mut self, folder: &str) -> MailResult<QuotaReport> {
        self.ensure_connected().await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };
        let result = self.transport.quota_root(&mut conn.handle, folder).await;
        result.map_err(|e| self.fail(Failure::Quota, &e))
    }

    /// Message and recent counts of `folder`, selecting it first.
    ///
    /// # Errors
    ///
    /// `NotReady`, `ConnectFail` when the folder cannot be selected, or
    /// `CheckFail` when the status query fails.
    pub async fn check(&mut self, folder: &str) -> MailResult<MailboxCheck> {
        let scope = self.open_folder(folder).await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };
        let result = self.transport.check(&mut conn.handle, &scope).await;
        result.map_err(|e| self.fail(Failure::Check, &e))
    }

    /// Make sure the handle exists and points at `folder`.
    ///
    /// Opens a handle when there is none, reselects when the current
    /// folder differs or is unknown, and does nothing otherwise. A failed
    /// reselect leaves no folder selected, so the next call reselects
    /// whatever folder it names.
    pub(crate) async fn open_folder(&mut self, folder: &str) -> MailResult<Scope> {
        let scope = self.scope(folder)?;
        let Some(conn) = self.connection.as_mut() else {
            self.open(&scope).await?;
            return Ok(scope);
        };
        if conn.folder.as_deref() == Some(folder) {
            return Ok(scope);
        }

        debug!("Reselecting {:?} -> {}", conn.folder, folder);
        match self.transport.reopen(&mut conn.handle, &scope).await {
            Ok(()) => {
                conn.folder = Some(folder.to_string());
                Ok(scope)
            }
            Err(e) => {
                conn.folder = None;
                Err(self.fail(Failure::Open, &e))
            }
        }
    }

    /// Make sure a handle exists, whatever folder it points at.
    pub(crate) async fn ensure_connected(&mut self) -> MailResult<Scope> {
        let scope = self.scope("")?;
        if self.connection.is_none() {
            self.open(&scope).await?;
        }
        Ok(scope)
    }

    /// Root or folder scope of this session's target.
    pub(crate) fn scope(&self, folder: &str) -> MailResult<Scope> {
        match &self.account {
            Some(account) => Ok(account.target.scope(folder)),
            None => Err(self.classify(Failure::NotReady)),
        }
    }

    async fn open(&mut self, scope: &Scope) -> MailResult<()> {
        let Some(account) = self.account.as_ref() else {
            return Err(self.classify(Failure::NotReady));
        };
        debug!("Opening {}", scope);
        match self.transport.open(scope, &account.credentials).await {
            Ok(handle) => {
                self.connection = Some(Connection {
                    handle,
                    folder: Some(scope.folder.clone()),
                });
                Ok(())
            }
            Err(e) => Err(self.fail(Failure::Open, &e)),
        }
    }

    /// Classify a transport failure, dropping the handle if the
    /// transport invalidated it.
    pub(crate) fn fail(&mut self, failure: Failure, error: &Error) -> MailError {
        if error.is_fatal() && self.connection.take().is_some() {
            warn!("Connection handle dropped after {}", error);
        }
        self.classify(failure)
    }

    pub(crate) fn classify(&self, failure: Failure) -> MailError {
        let err = classify(failure, self.transport.last_diagnostic());
        warn!("{:?} failed: {}", failure, err);
        err
    }
}
