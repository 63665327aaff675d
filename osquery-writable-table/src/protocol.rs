//! Request and response shapes of the osquery extension protocol.
//!
//! These mirror the thrift definitions osquery uses (`ExtensionPluginRequest`,
//! `ExtensionResponse`, ...) field for field, so a transport can convert them
//! to and from the wire without any interpretation. Fields are optional
//! exactly where thrift makes them optional.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single plugin request: an open map of string keys to string values.
pub type ExtensionPluginRequest = BTreeMap<String, String>;

/// Rows returned by a plugin, each one mapping column names to values.
pub type ExtensionPluginResponse = Vec<BTreeMap<String, String>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtensionStatus {
    pub code: Option<i32>,
    pub message: Option<String>,
    /// Extension uuid; only set by the transport on registration replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<i64>,
}

impl ExtensionStatus {
    pub fn new<C, M, U>(code: C, message: M, uuid: U) -> Self
    where
        C: Into<Option<i32>>,
        M: Into<Option<String>>,
        U: Into<Option<i64>>,
    {
        Self {
            code: code.into(),
            message: message.into(),
            uuid: uuid.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(0, "OK".to_string(), None)
    }

    pub fn is_ok(&self) -> bool {
        self.code == Some(0)
    }
}

impl Default for ExtensionStatus {
    fn default() -> Self {
        Self::ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionResponse {
    pub status: Option<ExtensionStatus>,
    pub response: Option<ExtensionPluginResponse>,
}

impl ExtensionResponse {
    pub fn new<S, R>(status: S, response: R) -> Self
    where
        S: Into<Option<ExtensionStatus>>,
        R: Into<Option<ExtensionPluginResponse>>,
    {
        Self {
            status: status.into(),
            response: response.into(),
        }
    }

    /// Status code of the response, or `None` if no status was set.
    pub fn code(&self) -> Option<i32> {
        self.status.as_ref().and_then(|s| s.code)
    }

    pub fn message(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.message.as_deref())
    }

    /// Rows carried by the response; an absent row list reads as empty.
    pub fn rows(&self) -> &[BTreeMap<String, String>] {
        self.response.as_deref().unwrap_or(&[])
    }
}
