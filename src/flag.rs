//! Message flags as reported in header overviews
//!
//! System flags get their own variants. Anything else the server sends
//! is kept verbatim as a [`Flag::Keyword`].

use serde::{Serialize, Serializer};
use std::fmt;

/// A flag on a message.
///
/// # Examples
///
/// ```
/// use imap_envelope::Flag;
///
/// assert_eq!(Flag::Seen.as_imap_str(), "\\Seen");
/// assert_eq!(Flag::from_imap_str("$Important"), Flag::Keyword("$Important".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    /// First session to see the message (`\Recent`).
    Recent,
    /// User-defined keyword, or a system flag this crate has no variant for.
    Keyword(String),
}

impl Flag {
    /// The IMAP wire representation of this flag.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(kw) => kw,
        }
    }

    /// Parse a flag from its wire form. System flags match
    /// case-insensitively.
    #[must_use]
    pub fn from_imap_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "\\seen" => Self::Seen,
            "\\answered" => Self::Answered,
            "\\flagged" => Self::Flagged,
            "\\deleted" => Self::Deleted,
            "\\draft" => Self::Draft,
            "\\recent" => Self::Recent,
            _ => Self::Keyword(s.to_string()),
        }
    }
}

impl From<&async_imap::types::Flag<'_>> for Flag {
    fn from(flag: &async_imap::types::Flag<'_>) -> Self {
        use async_imap::types::Flag as Wire;
        match flag {
            Wire::Seen => Self::Seen,
            Wire::Answered => Self::Answered,
            Wire::Flagged => Self::Flagged,
            Wire::Deleted => Self::Deleted,
            Wire::Draft => Self::Draft,
            Wire::Recent => Self::Recent,
            Wire::MayCreate => Self::Keyword("\\*".to_string()),
            Wire::Custom(kw) => Self::from_imap_str(kw),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_imap_str())
    }
}
