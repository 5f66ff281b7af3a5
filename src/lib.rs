//! Single-session IMAP mailbox client
//!
//! A [`MailboxSession`] is built from an address, a password and
//! [`ConnectionOptions`]. It opens one connection lazily, reuses it
//! across folders, and exposes folder listing with status counters,
//! paginated header overviews, message bodies, quota and liveness.
//!
//! Every operation returns a [`MailResult`]; its error is a closed
//! [`ErrorKind`] plus the transport's last diagnostic. Wrap a result in
//! an [`Envelope`] to get the `{"status": "OK"|"KO", "data": ...}` JSON
//! form.
//!
//! ```no_run
//! use imap_envelope::{ConnectionOptions, Envelope, MailboxSession};
//!
//! # async fn run() -> serde_json::Result<()> {
//! let options = ConnectionOptions::new(993);
//! let mut session = MailboxSession::new("user@example.com", "secret", options);
//! let folders = session.get_folders().await;
//! println!("{}", Envelope::from(folders).to_json()?);
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod envelope;
mod error;
mod flag;
mod folder;
mod message;
mod session;
mod target;
mod transport;

pub use config::{AccountConfig, ConnectionOptions, Credentials, Security};
pub use connection::{ImapHandle, ImapSession, ImapTransport};
pub use envelope::{Envelope, Payload, Status};
pub use error::{Error, ErrorKind, Failure, MailError, MailResult, Result, classify};
pub use flag::Flag;
pub use folder::{FolderRecord, decode_folder_name};
pub use session::MailboxSession;
pub use target::{Scope, TargetDescriptor};
pub use transport::{
    FolderEntry, FolderStatus, MailTransport, MailboxCheck, MessageOverview, QuotaReport,
    QuotaResource, QuotaUsage, SequenceRange,
};
