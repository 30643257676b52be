//! Response envelope for invoke-style channels.
//!
//! Every invocation produces exactly one envelope:
//!
//! ```text
//! { success: true,  data: <any> }
//! { success: false, error: "<message>" }
//! ```
//!
//! `data` is carried as a dynamic JSON value so the host can answer any
//! channel without the bridge knowing the handler's Rust type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Uniform `{success, data | error}` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the handler completed without error.
    pub success: bool,
    /// Handler result (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message (failure only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Successful envelope carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope carrying an error message.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Unwrap into the caller's expected type.
    ///
    /// `success: false` becomes [`BridgeError::Remote`]; a `data` value that
    /// does not match `T` becomes a JSON error.
    ///
    /// ```
    /// use hostbridge::protocol::Envelope;
    /// use hostbridge::BridgeError;
    /// use serde_json::json;
    ///
    /// let pong: String = Envelope::ok(json!("pong")).into_result().unwrap();
    /// assert_eq!(pong, "pong");
    ///
    /// let failed = Envelope::err("disk full").into_result::<String>();
    /// assert!(matches!(failed, Err(BridgeError::Remote(m)) if m == "disk full"));
    /// ```
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if !self.success {
            let message = self
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(BridgeError::Remote(message));
        }
        Ok(serde_json::from_value(self.data.unwrap_or(Value::Null))?)
    }
}
