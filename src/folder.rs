//! Folder listing with status counters

use crate::error::{Failure, MailResult};
use crate::session::MailboxSession;
use crate::transport::{FolderEntry, FolderStatus, MailTransport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Listing pattern matching every folder at every depth.
const ALL_FOLDERS: &str = "*";

/// LIST attributes of names that exist only as hierarchy nodes and
/// have no status to read.
const NO_STATUS_ATTRIBUTES: [&str; 2] = ["\\Noselect", "\\NonExistent"];

/// One folder of the account with its counters at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRecord {
    /// Decoded folder name, without the server prefix.
    pub path: String,
    pub delimiter: Option<String>,
    pub attributes: Vec<String>,
    pub message_count: u32,
    pub unseen_count: u32,
    pub recent_count: u32,
    pub uid_next: Option<u32>,
    pub uid_validity: Option<u32>,
    pub last_check_date: DateTime<Utc>,
}

fn has_no_status(entry: &FolderEntry) -> bool {
    entry.attributes.iter().any(|attr| {
        NO_STATUS_ATTRIBUTES
            .iter()
            .any(|name| attr.eq_ignore_ascii_case(name))
    })
}

/// Decode a folder name from IMAP modified UTF-7.
///
/// ```
/// assert_eq!(imap_envelope::decode_folder_name("Entw&APw-rfe"), "Entwürfe");
/// assert_eq!(imap_envelope::decode_folder_name("INBOX"), "INBOX");
/// ```
#[must_use]
pub fn decode_folder_name(name: &str) -> String {
    utf7_imap::decode_utf7_imap(name.to_string())
}

impl<T: MailTransport> MailboxSession<T> {
    /// Every folder of the account, each with its status counters.
    ///
    /// The result is all or nothing: if any folder's status cannot be
    /// read, no list is returned at all. Names listed as `\Noselect` or
    /// `\NonExistent` are not queried and carry zero counters.
    ///
    /// # Errors
    ///
    /// - `NotReady` for an invalid account
    /// - `ConnectFail` when no handle can be obtained, or when the
    ///   connection is lost while reading a folder's status
    /// - `GetFoldersError` when the listing itself fails
    /// - `GetFolderInfosError` when one folder's status query fails
    pub async fn get_folders(&mut self) -> MailResult<Vec<FolderRecord>> {
        let root = self.ensure_connected().await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };

        let listed = self
            .transport
            .list_folders(&mut conn.handle, &root, ALL_FOLDERS)
            .await;
        let entries: Vec<FolderEntry> = match listed {
            Ok(entries) => entries,
            Err(e) => return Err(self.fail(Failure::ListFolders, &e)),
        };
        debug!("Listed {} folders under {}", entries.len(), root);

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let raw = root.target.strip(&entry.name).to_string();
            let scope = root.target.scope(&raw);

            let status = if has_no_status(&entry) {
                debug!("Skipping STATUS of {}", scope);
                FolderStatus::default()
            } else {
                let Some(conn) = self.connection.as_mut() else {
                    return Err(self.classify(Failure::NotConnected));
                };
                match self.transport.folder_status(&mut conn.handle, &scope).await {
                    Ok(status) => status,
                    Err(e) if e.is_fatal() => {
                        return Err(self.fail(Failure::FolderUnreachable, &e));
                    }
                    Err(e) => return Err(self.fail(Failure::FolderStatus, &e)),
                }
            };

            records.push(FolderRecord {
                path: decode_folder_name(&raw),
                delimiter: entry.delimiter,
                attributes: entry.attributes,
                message_count: status.messages,
                unseen_count: status.unseen,
                recent_count: status.recent,
                uid_next: status.uid_next,
                uid_validity: status.uid_validity,
                last_check_date: Utc::now(),
            });
        }

        Ok(records)
    }
}
