//! Shared response envelope of the platform API.
//!
//! Every endpoint answers `{status, data?, message?, error?}`, but some
//! gateway-backed routes omit `status` entirely, so classification has a
//! compatibility rule: no status + no error + a message counts as success.

use serde::Deserialize;

use crate::{errors::Error, Result};

pub const GENERIC_FAILURE: &str = "No response message";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "serverTime", default)]
    pub server_time: Option<String>,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        match &self.status {
            Some(s) => s == "success",
            None => self.error.is_none() && self.message.is_some(),
        }
    }

    /// Operator-facing message: `error` wins over `message`, with a
    /// generic fallback when the envelope carries neither.
    pub fn display_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string())
    }

    /// For CRUD endpoints: unwrap `data` on success, otherwise surface
    /// the remote-reported failure.
    pub fn into_data(self) -> Result<serde_json::Value> {
        if self.is_success() {
            Ok(self.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(Error::Api(self.display_message()))
        }
    }
}
