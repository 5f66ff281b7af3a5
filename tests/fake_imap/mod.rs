//! Fake IMAP server for integration testing
//!
//! An in-process server speaking enough IMAP to drive a
//! `MailboxSession` end to end over a real TLS socket.
//!
//! - `server`: listener, STARTTLS and command dispatch
//! - `handlers/`: one file per IMAP command
//! - `mailbox`: test data model and builder
//! - `io`: write helpers

mod io;

pub use mailbox::MailboxBuilder;
pub use server::FakeImapServer;
