//! IMAP transport over async-imap and rustls
//!
//! [`ImapTransport`] is the [`MailTransport`] used by default. Each
//! handle is one authenticated TLS session; folder switches are plain
//! SELECTs on that session.

use crate::config::{ConnectionOptions, Credentials, Security};
use crate::error::{Error, Result};
use crate::message::{decode_body, overview_from_fetch};
use crate::target::{Scope, TargetDescriptor};
use crate::transport::{
    FolderEntry, FolderStatus, MailTransport, MailboxCheck, MessageOverview, QuotaReport,
    QuotaResource, QuotaUsage, SequenceRange,
};
use async_imap::Session;
use async_imap::types::{Fetch, Name, NameAttribute, QuotaResourceName};
use chrono::Utc;
use futures::TryStreamExt;
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

const STATUS_ITEMS: &str = "(MESSAGES RECENT UNSEEN UIDNEXT UIDVALIDITY)";
const CHECK_ITEMS: &str = "(MESSAGES RECENT)";
const OVERVIEW_QUERY: &str = "(UID FLAGS RFC822.SIZE INTERNALDATE BODY.PEEK[HEADER])";
const BODY_QUERY: &str = "(UID BODY.PEEK[])";

/// An open connection and the folder it has selected.
pub struct ImapHandle {
    session: ImapSession,
    selected: Option<String>,
}

impl ImapHandle {
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

/// [`MailTransport`] speaking IMAP over TLS.
#[derive(Debug, Clone)]
pub struct ImapTransport {
    security: Security,
    accept_invalid_certs: bool,
    timeout: Duration,
    last_error: String,
}

impl ImapTransport {
    #[must_use]
    pub fn new(options: &ConnectionOptions) -> Self {
        Self {
            security: options.security(),
            accept_invalid_certs: options.accept_invalid_certs,
            timeout: options.timeout(),
            last_error: String::new(),
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("IMAP transport failure: {}", e);
            self.last_error = e.to_string();
        }
        result
    }
}

impl MailTransport for ImapTransport {
    type Handle = ImapHandle;

    async fn open(&mut self, scope: &Scope, credentials: &Credentials) -> Result<ImapHandle> {
        let session = within(
            self.timeout,
            connect(
                &scope.target,
                credentials,
                self.security,
                self.accept_invalid_certs,
            ),
        )
        .await;
        let mut handle = ImapHandle {
            session: self.record(session)?,
            selected: None,
        };

        if !scope.is_root() {
            if let Err(e) = self.reopen(&mut handle, scope).await {
                handle.session.logout().await.ok();
                return Err(e);
            }
        }
        Ok(handle)
    }

    async fn reopen(&mut self, handle: &mut ImapHandle, scope: &Scope) -> Result<()> {
        let result = if scope.is_root() {
            debug!("NOOP on {}", scope);
            within(self.timeout, async {
                handle.session.noop().await.map_err(|e| imap_error("NOOP", e))
            })
            .await
        } else {
            // A rejected SELECT leaves the server with no folder selected.
            let selected = within(self.timeout, select(&mut handle.session, &scope.folder)).await;
            handle.selected = selected.is_ok().then(|| scope.folder.clone());
            selected
        };
        self.record(result)
    }

    async fn close(&mut self, mut handle: ImapHandle) -> Result<()> {
        let result = within(self.timeout, async {
            handle
                .session
                .logout()
                .await
                .map_err(|e| imap_error("LOGOUT", e))
        })
        .await;
        if result.is_ok() {
            info!("Logged out");
        }
        self.record(result)
    }

    async fn list_folders(
        &mut self,
        handle: &mut ImapHandle,
        scope: &Scope,
        pattern: &str,
    ) -> Result<Vec<FolderEntry>> {
        debug!("LIST {} {}", scope, pattern);
        let result = within(self.timeout, async {
            let names: Vec<Name> = handle
                .session
                .list(Some(""), Some(pattern))
                .await
                .map_err(|e| imap_error("LIST", e))?
                .try_collect()
                .await
                .map_err(|e| imap_error("LIST", e))?;
            Ok(names.iter().map(folder_entry).collect())
        })
        .await;
        self.record(result)
    }

    async fn folder_status(
        &mut self,
        handle: &mut ImapHandle,
        scope: &Scope,
    ) -> Result<FolderStatus> {
        debug!("STATUS {}", scope);
        let result = within(self.timeout, async {
            let mailbox = handle
                .session
                .status(&scope.folder, STATUS_ITEMS)
                .await
                .map_err(|e| imap_error(&format!("STATUS {}", scope.folder), e))?;
            Ok(FolderStatus {
                messages: mailbox.exists,
                unseen: mailbox.unseen.unwrap_or(0),
                recent: mailbox.recent,
                uid_next: mailbox.uid_next,
                uid_validity: mailbox.uid_validity,
            })
        })
        .await;
        self.record(result)
    }

    async fn check(&mut self, handle: &mut ImapHandle, scope: &Scope) -> Result<MailboxCheck> {
        let result = if scope.is_root() {
            Err(Error::Imap("No folder selected".into()))
        } else {
            within(self.timeout, async {
                let mailbox = handle
                    .session
                    .status(&scope.folder, CHECK_ITEMS)
                    .await
                    .map_err(|e| imap_error(&format!("STATUS {}", scope.folder), e))?;
                Ok(MailboxCheck {
                    date: Utc::now(),
                    mailbox: scope.to_string(),
                    messages: mailbox.exists,
                    recent: mailbox.recent,
                })
            })
            .await
        };
        self.record(result)
    }

    async fn fetch_overview(
        &mut self,
        handle: &mut ImapHandle,
        range: SequenceRange,
    ) -> Result<Vec<MessageOverview>> {
        debug!("FETCH {} overview", range);
        let result = within(self.timeout, async {
            let fetches: Vec<Fetch> = handle
                .session
                .fetch(range.to_string(), OVERVIEW_QUERY)
                .await
                .map_err(|e| imap_error("FETCH", e))?
                .try_collect()
                .await
                .map_err(|e| imap_error("FETCH", e))?;
            let mut overviews: Vec<MessageOverview> = fetches
                .iter()
                .filter(|fetch| range.contains(fetch.message))
                .map(overview_from_fetch)
                .collect();
            overviews.sort_by_key(|o| o.msgno);
            overviews.dedup_by_key(|o| o.msgno);
            // A tagged NO or BAD ends the stream without an error item.
            let fetched = u32::try_from(overviews.len()).unwrap_or(u32::MAX);
            if fetched < range.count() {
                return Err(Error::Imap(format!(
                    "FETCH {range} returned {fetched} of {} messages",
                    range.count()
                )));
            }
            Ok(overviews)
        })
        .await;
        self.record(result)
    }

    async fn fetch_body(&mut self, handle: &mut ImapHandle, uid: u32) -> Result<String> {
        debug!("UID FETCH {} body", uid);
        let result = within(self.timeout, async {
            let fetches: Vec<Fetch> = handle
                .session
                .uid_fetch(uid.to_string(), BODY_QUERY)
                .await
                .map_err(|e| imap_error("UID FETCH", e))?
                .try_collect()
                .await
                .map_err(|e| imap_error("UID FETCH", e))?;
            let raw = fetches
                .iter()
                .filter(|fetch| fetch.uid.is_none_or(|u| u == uid))
                .find_map(Fetch::body)
                .ok_or_else(|| Error::Imap(format!("No message with UID {uid}")))?;
            decode_body(raw)
        })
        .await;
        self.record(result)
    }

    async fn quota_root(&mut self, handle: &mut ImapHandle, folder: &str) -> Result<QuotaReport> {
        debug!("GETQUOTAROOT {}", folder);
        let result = within(self.timeout, async {
            let (roots, quotas) = handle
                .session
                .get_quota_root(folder)
                .await
                .map_err(|e| imap_error("GETQUOTAROOT", e))?;
            Ok(QuotaReport {
                roots: roots
                    .into_iter()
                    .flat_map(|root| root.quota_root_names)
                    .collect(),
                quotas: quotas
                    .into_iter()
                    .map(|quota| QuotaUsage {
                        root: quota.root_name,
                        resources: quota
                            .resources
                            .into_iter()
                            .map(|resource| QuotaResource {
                                name: resource_name(&resource.name),
                                usage: resource.usage,
                                limit: resource.limit,
                            })
                            .collect(),
                    })
                    .collect(),
            })
        })
        .await;
        self.record(result)
    }

    async fn ping(&mut self, handle: &mut ImapHandle) -> bool {
        let result = within(self.timeout, async {
            handle.session.noop().await.map_err(|e| imap_error("NOOP", e))
        })
        .await;
        self.record(result).is_ok()
    }

    fn last_diagnostic(&self) -> String {
        self.last_error.clone()
    }
}

/// Run `fut` under `limit`. A zero limit waits forever.
async fn within<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    if limit.is_zero() {
        return fut.await;
    }
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

fn imap_error(context: &str, e: async_imap::error::Error) -> Error {
    match e {
        async_imap::error::Error::Io(e) => Error::Io(e),
        async_imap::error::Error::ConnectionLost => {
            Error::Connection(format!("{context}: connection lost"))
        }
        other => Error::Imap(format!("{context} failed: {other}")),
    }
}

fn folder_entry(name: &Name) -> FolderEntry {
    FolderEntry {
        name: name.name().to_string(),
        delimiter: name.delimiter().map(str::to_string),
        attributes: name.attributes().iter().filter_map(attribute_name).collect(),
    }
}

/// Wire form of a LIST attribute, `\Noselect` for `NoSelect`.
fn attribute_name(attr: &NameAttribute<'_>) -> Option<String> {
    let name = match attr {
        NameAttribute::NoInferiors => "\\Noinferiors",
        NameAttribute::NoSelect => "\\Noselect",
        NameAttribute::Marked => "\\Marked",
        NameAttribute::Unmarked => "\\Unmarked",
        NameAttribute::All => "\\All",
        NameAttribute::Archive => "\\Archive",
        NameAttribute::Drafts => "\\Drafts",
        NameAttribute::Flagged => "\\Flagged",
        NameAttribute::Junk => "\\Junk",
        NameAttribute::Sent => "\\Sent",
        NameAttribute::Trash => "\\Trash",
        NameAttribute::Extension(name) => name.as_ref(),
        _ => return None,
    };
    Some(name.to_string())
}

fn resource_name(name: &QuotaResourceName) -> String {
    match name {
        QuotaResourceName::Storage => "STORAGE".to_string(),
        QuotaResourceName::Message => "MESSAGE".to_string(),
        QuotaResourceName::Atom(atom) => atom.to_string(),
    }
}

/// Build a TLS connector, either trusting the webpki roots or, when
/// `accept_invalid_certs` is set, accepting any certificate.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Open a fresh TLS-wrapped IMAP session.
///
/// Connects to the target via TCP, negotiates TLS (directly or after
/// STARTTLS), and logs in with the account address.
async fn connect(
    target: &TargetDescriptor,
    credentials: &Credentials,
    security: Security,
    accept_invalid_certs: bool,
) -> Result<ImapSession> {
    let addr = format!("{}:{}", target.host, target.port);
    debug!("Connecting to IMAP server at {} ({:?})", addr, security);

    let tcp_stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| Error::Connection(format!("Cannot reach {addr}: {e}")))?;

    let tcp_stream = match security {
        Security::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
            client.into_inner().into_inner()
        }
        Security::Tls => tcp_stream,
    };

    let connector = tls_connector(accept_invalid_certs)?;
    let server_name = ServerName::try_from(target.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))?;

    // The untagged greeting is skipped as an unsolicited response.
    let tls_client = async_imap::Client::new(tls_stream.compat());
    let session = tls_client
        .login(credentials.email(), credentials.password())
        .await
        .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}")))?;

    info!("Logged in to {} as {}", target, credentials.email());
    Ok(session)
}

/// SELECT a folder on an existing session.
async fn select(session: &mut ImapSession, folder: &str) -> Result<()> {
    debug!("SELECT {}", folder);
    session
        .select(folder)
        .await
        .map_err(|e| imap_error(&format!("SELECT {folder}"), e))?;
    Ok(())
}

/// Certificate verifier that accepts all certificates
/// (self-signed bridges and test servers).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
