//! Client configuration
//!
//! One explicit struct handed to the pipeline, the REST clients and the
//! event channel. Every field has a default so a partial JSON file works.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::codec::Name;
use crate::error::{YxError, YxResult};

pub const DEFAULT_CHAIN_URL: &str = "http://127.0.0.1:8888";
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:8900";
pub const DEFAULT_EVENT_URL: &str = "ws://127.0.0.1:8888";

/// Same two-minute window cleos uses
pub const DEFAULT_TX_EXPIRATION_SECS: u64 = 120;

/// Upper bound on required-keys round trips after a missing-authority rejection
pub const MAX_KEY_RENEGOTIATIONS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain node REST base URL
    pub chain_url: String,
    /// Key daemon REST base URL
    pub wallet_url: String,
    /// Event notification WebSocket base URL
    pub event_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub tx_expiration_secs: u64,
    /// 0 references the head block, N references `head - N`
    pub ref_block_offset: u32,
    /// Extra required-keys round trips allowed on a missing-authority rejection
    pub max_key_renegotiations: u32,
    pub transaction_vote_target: Option<String>,
    pub transaction_fee_payer: Option<String>,
    pub event_query_timeout_secs: u64,
    pub debug_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_url: DEFAULT_CHAIN_URL.to_string(),
            wallet_url: DEFAULT_WALLET_URL.to_string(),
            event_url: DEFAULT_EVENT_URL.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            tx_expiration_secs: DEFAULT_TX_EXPIRATION_SECS,
            ref_block_offset: 0,
            max_key_renegotiations: MAX_KEY_RENEGOTIATIONS,
            transaction_vote_target: None,
            transaction_fee_payer: None,
            event_query_timeout_secs: 60,
            debug_logging: false,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> YxResult<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| YxError::invalid_input(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> YxResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> YxResult<()> {
        validate_url("chain_url", &self.chain_url, &["http", "https"])?;
        validate_url("wallet_url", &self.wallet_url, &["http", "https"])?;
        validate_url("event_url", &self.event_url, &["ws", "wss"])?;

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(YxError::invalid_input("Timeouts must be non-zero"));
        }
        if self.event_query_timeout_secs == 0 {
            return Err(YxError::invalid_input("event_query_timeout_secs must be non-zero"));
        }
        if self.tx_expiration_secs == 0 || self.tx_expiration_secs > u32::MAX as u64 {
            return Err(YxError::invalid_input("tx_expiration_secs out of range"));
        }
        if self.max_key_renegotiations > MAX_KEY_RENEGOTIATIONS {
            return Err(YxError::invalid_input(format!(
                "max_key_renegotiations must be at most {}",
                MAX_KEY_RENEGOTIATIONS
            )));
        }

        self.vote_target()?;
        self.fee_payer()?;
        Ok(())
    }

    pub fn vote_target(&self) -> YxResult<Option<Name>> {
        parse_optional_name(self.transaction_vote_target.as_deref())
    }

    pub fn fee_payer(&self) -> YxResult<Option<Name>> {
        parse_optional_name(self.transaction_fee_payer.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn event_query_timeout(&self) -> Duration {
        Duration::from_secs(self.event_query_timeout_secs)
    }

    /// Full WebSocket endpoint for event notifications
    pub fn event_endpoint(&self) -> String {
        format!("{}/v1/event_notification", self.event_url.trim_end_matches('/'))
    }
}

fn validate_url(field: &str, value: &str, schemes: &[&str]) -> YxResult<()> {
    let parsed = Url::parse(value)
        .map_err(|e| YxError::invalid_input(format!("{}: invalid URL '{}': {}", field, value, e)))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(YxError::invalid_input(format!(
            "{}: unsupported scheme '{}', expected one of {:?}",
            field,
            parsed.scheme(),
            schemes
        )));
    }
    if parsed.host_str().is_none() {
        return Err(YxError::invalid_input(format!("{}: missing host", field)));
    }
    Ok(())
}

fn parse_optional_name(value: Option<&str>) -> YxResult<Option<Name>> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(Name::new(s)?)),
    }
}
