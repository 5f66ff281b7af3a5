//! The `{status, data}` result envelope

use crate::error::{MailError, MailResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "KO")]
    Ko,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Data(T),
    Error(MailError),
}

/// Uniform wrapper around the outcome of a session operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: Payload<T>,
}

impl<T> Envelope<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            status: Status::Ok,
            data: Payload::Data(data),
        }
    }

    #[must_use]
    pub const fn ko(error: MailError) -> Self {
        Self {
            status: Status::Ko,
            data: Payload::Error(error),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl<T: Serialize> Envelope<T> {
    /// # Errors
    ///
    /// Fails only if the payload itself cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Fails only if the payload itself cannot be serialized.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<T> From<MailResult<T>> for Envelope<T> {
    fn from(result: MailResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::ko(error),
        }
    }
}
