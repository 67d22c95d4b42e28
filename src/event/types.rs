//! Event notification envelopes
//!
//! Outbound: `{"request_id": "7", "name": "tx_irreversibility", "parameters": {...}}`
//! Inbound:  `{"request_id": "7", "name": "tx_irreversibility", "result": {...}}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{YxError, YxResult};

/// Channel lifecycle. `Closing` only exists during the close handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Subscribed,
    Closing,
}

/// Event names understood by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "tx_irreversibility")]
    TxIrreversibility,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::TxIrreversibility => "tx_irreversibility",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tx_irreversibility" => Some(EventName::TxIrreversibility),
            _ => None,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRequest {
    pub request_id: String,
    pub name: EventName,
    pub parameters: Value,
}

/// Inbound message. `name` stays a string so unknown events can be
/// recognised and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub request_id: String,
    pub name: String,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl EventResponse {
    /// Decode the result of a `tx_irreversibility` query
    pub fn irreversibility(&self) -> YxResult<TxIrreversibility> {
        if let Some(error) = &self.error {
            return Err(YxError::channel_state(format!(
                "Event {} request {} failed: {}",
                self.name, self.request_id, error
            )));
        }
        serde_json::from_value(self.result.clone()).map_err(|e| {
            YxError::protocol_violation(format!("Malformed {} result: {}", self.name, e))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxIrreversibilityParameters {
    pub tx_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_num_hint: Option<u64>,
}

/// Node reply once the transaction's block became irreversible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIrreversibility {
    pub tx_id: String,
    pub block_num: u64,
    #[serde(default = "default_irreversible")]
    pub irreversible: bool,
}

fn default_irreversible() -> bool {
    true
}
