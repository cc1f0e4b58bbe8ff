//! Stored response types.
//!
//! A stored response is an immutable snapshot of a network response kept
//! under a request identity inside one generation.

use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response type as reported by the network boundary.
///
/// Only `Basic` responses are eligible for storage; the others exist so
/// callers can tell why a response was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    #[serde(rename = "opaqueredirect")]
    OpaqueRedirect,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "default" => Ok(ResponseType::Default),
            "error" => Ok(ResponseType::Error),
            "opaque" => Ok(ResponseType::Opaque),
            "opaqueredirect" => Ok(ResponseType::OpaqueRedirect),
            other => Err(Error::InvalidResponseType(other.to_string())),
        }
    }
}

/// Request identity: the (method, URL) pair used as a store lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// Hashed key used as the primary key within a generation.
    pub fn cache_key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// A response snapshot persisted inside a generation.
///
/// `method` and `url` are the request identity the snapshot is stored under;
/// `response_url` is where the response actually came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub response_url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    pub fn request_key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Only successful, same-origin responses may be persisted.
    pub fn is_storable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    pub(crate) fn headers_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))
    }
}
