//! The mail transport capability
//!
//! A session never talks IMAP itself. It drives a [`MailTransport`],
//! which owns the wire protocol and hands back explicit results. The
//! production implementation is [`crate::ImapTransport`].

use crate::config::Credentials;
use crate::error::Result;
use crate::flag::Flag;
use crate::target::Scope;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::fmt;

/// One entry of a folder listing, with the name as the server sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// Folder name in the server's encoding (modified UTF-7).
    pub name: String,
    pub delimiter: Option<String>,
    pub attributes: Vec<String>,
}

/// Status counters of one folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStatus {
    pub messages: u32,
    pub unseen: u32,
    pub recent: u32,
    pub uid_next: Option<u32>,
    pub uid_validity: Option<u32>,
}

/// Current state of the folder a scope points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxCheck {
    pub date: DateTime<Utc>,
    /// Scope text of the checked folder.
    pub mailbox: String,
    pub messages: u32,
    pub recent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaResource {
    pub name: String,
    pub usage: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub root: String,
    pub resources: Vec<QuotaResource>,
}

/// Result of a quota-root lookup for one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaReport {
    pub roots: Vec<String>,
    pub quotas: Vec<QuotaUsage>,
}

/// Header summary of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOverview {
    /// Sequence number within the folder.
    pub msgno: u32,
    pub uid: Option<u32>,
    pub size: Option<u32>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// `Date` header, RFC 3339.
    pub date: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub flags: Vec<Flag>,
}

impl MessageOverview {
    #[must_use]
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.has_flag(&Flag::Seen)
    }
}

/// An inclusive, non-empty range of message sequence numbers.
///
/// Only built through [`page`](SequenceRange::page), so `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    start: u32,
    end: u32,
}

impl SequenceRange {
    /// The page of at most `max` messages starting at `start`, clamped
    /// to a folder holding `total` messages.
    ///
    /// Sequence numbers are 1-based, so a `start` of 0 reads from the
    /// first message. Returns `None` when the page is empty.
    #[must_use]
    pub fn page(start: u32, max: u32, total: u32) -> Option<Self> {
        let start = start.max(1);
        if max == 0 || start > total {
            return None;
        }
        let end = start.saturating_add(max - 1).min(total);
        Some(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Number of messages in the range.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    #[must_use]
    pub const fn contains(&self, msgno: u32) -> bool {
        msgno >= self.start && msgno <= self.end
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Operations a session needs from the wire.
///
/// Every fallible call returns an explicit [`Result`]; the text of the
/// most recent failure is also available from
/// [`last_diagnostic`](MailTransport::last_diagnostic).
#[allow(async_fn_in_trait)]
pub trait MailTransport {
    /// An open, authenticated connection.
    type Handle;

    /// Connect, authenticate and select the scope's folder.
    async fn open(&mut self, scope: &Scope, credentials: &Credentials) -> Result<Self::Handle>;

    /// Point an existing handle at another folder of the same server.
    async fn reopen(&mut self, handle: &mut Self::Handle, scope: &Scope) -> Result<()>;

    async fn close(&mut self, handle: Self::Handle) -> Result<()>;

    async fn list_folders(
        &mut self,
        handle: &mut Self::Handle,
        scope: &Scope,
        pattern: &str,
    ) -> Result<Vec<FolderEntry>>;

    /// Status counters of the folder named by `scope`, without
    /// changing the selected folder.
    async fn folder_status(
        &mut self,
        handle: &mut Self::Handle,
        scope: &Scope,
    ) -> Result<FolderStatus>;

    async fn check(&mut self, handle: &mut Self::Handle, scope: &Scope) -> Result<MailboxCheck>;

    /// Header overviews for every message in `range` of the selected folder.
    async fn fetch_overview(
        &mut self,
        handle: &mut Self::Handle,
        range: SequenceRange,
    ) -> Result<Vec<MessageOverview>>;

    /// Decoded body text of the message with `uid` in the selected folder.
    async fn fetch_body(&mut self, handle: &mut Self::Handle, uid: u32) -> Result<String>;

    async fn quota_root(&mut self, handle: &mut Self::Handle, folder: &str) -> Result<QuotaReport>;

    /// Whether the server still answers on this handle.
    async fn ping(&mut self, handle: &mut Self::Handle) -> bool;

    /// Text of the most recent failure, empty if none occurred yet.
    fn last_diagnostic(&self) -> String;
}
