//! Paginated header overviews and message bodies

use crate::error::{Error, Failure, MailResult, Result};
use crate::flag::Flag;
use crate::session::MailboxSession;
use crate::transport::{MailTransport, MessageOverview, SequenceRange};
use async_imap::types::Fetch;
use mail_parser::{Addr, Address, HeaderValue, Message, MessageParser};
use tracing::debug;

impl<T: MailTransport> MailboxSession<T> {
    /// Header overviews of at most `max` messages of `folder`, starting
    /// at sequence number `start`.
    ///
    /// A page that starts past the last message is empty.
    ///
    /// # Errors
    ///
    /// `NotReady`, `ConnectFail` when the folder cannot be selected, or
    /// `GetMailsFail` when counting or fetching fails.
    pub async fn get_messages(
        &mut self,
        folder: &str,
        start: u32,
        max: u32,
    ) -> MailResult<Vec<MessageOverview>> {
        let scope = self.open_folder(folder).await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };

        let total = match self.transport.check(&mut conn.handle, &scope).await {
            Ok(check) => check.messages,
            Err(e) => return Err(self.fail(Failure::Overview, &e)),
        };

        let Some(range) = SequenceRange::page(start, max, total) else {
            debug!("Empty page {}+{} of {} in {}", start, max, total, folder);
            return Ok(Vec::new());
        };

        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };
        let result = self.transport.fetch_overview(&mut conn.handle, range).await;
        result.map_err(|e| self.fail(Failure::Overview, &e))
    }

    /// Decoded body text of the message with `uid` in `folder`.
    ///
    /// # Errors
    ///
    /// `NotReady`, `ConnectFail` when the folder cannot be selected, or
    /// `GetMessageFail` when no such message exists or the fetch fails.
    pub async fn read_message(&mut self, folder: &str, uid: u32) -> MailResult<String> {
        self.open_folder(folder).await?;
        let Some(conn) = self.connection.as_mut() else {
            return Err(self.classify(Failure::NotConnected));
        };
        let result = self.transport.fetch_body(&mut conn.handle, uid).await;
        result.map_err(|e| self.fail(Failure::Body, &e))
    }
}

/// Build an overview from a FETCH response carrying `BODY[HEADER]`.
pub(crate) fn overview_from_fetch(fetch: &Fetch) -> MessageOverview {
    let mut overview = fetch.header().map_or_else(
        || empty_overview(fetch.message),
        |raw| overview_from_headers(fetch.message, raw),
    );
    overview.uid = fetch.uid;
    overview.size = fetch.size;
    overview.internal_date = fetch.internal_date();
    overview.flags = fetch.flags().map(|flag| Flag::from(&flag)).collect();
    overview
}

/// Parse raw header bytes into an overview for message `msgno`.
pub(crate) fn overview_from_headers(msgno: u32, raw: &[u8]) -> MessageOverview {
    let Some(message) = MessageParser::default().parse(raw) else {
        return empty_overview(msgno);
    };
    MessageOverview {
        subject: message.subject().map(str::to_string),
        from: message.from().map(render_address),
        to: message.to().map(render_address),
        date: message.date().map(mail_parser::DateTime::to_rfc3339),
        message_id: message.message_id().map(str::to_string),
        in_reply_to: header_text(message.in_reply_to()),
        references: header_text(message.references()),
        ..empty_overview(msgno)
    }
}

/// Text of a full RFC 5322 message: the first plain-text part, else
/// the first HTML part, else an empty string.
pub(crate) fn decode_body(raw: &[u8]) -> Result<String> {
    let message: Message<'_> = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::Parse("Unparseable message".into()))?;
    Ok(message
        .body_text(0)
        .or_else(|| message.body_html(0))
        .map(|text| text.into_owned())
        .unwrap_or_default())
}

const fn empty_overview(msgno: u32) -> MessageOverview {
    MessageOverview {
        msgno,
        uid: None,
        size: None,
        subject: None,
        from: None,
        to: None,
        date: None,
        message_id: None,
        in_reply_to: None,
        references: None,
        internal_date: None,
        flags: Vec::new(),
    }
}

fn header_text(value: &HeaderValue<'_>) -> Option<String> {
    match value {
        HeaderValue::Text(text) => Some(text.to_string()),
        HeaderValue::TextList(list) => Some(list.join(" ")),
        _ => None,
    }
}

fn render_address(address: &Address<'_>) -> String {
    let addrs: Vec<&Addr<'_>> = match address {
        Address::List(list) => list.iter().collect(),
        Address::Group(groups) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
    };
    addrs
        .into_iter()
        .map(render_addr)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_addr(addr: &Addr<'_>) -> String {
    match (addr.name.as_deref(), addr.address.as_deref()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}
