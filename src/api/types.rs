//! Request and response bodies for the chain and wallet REST APIs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::transaction::parse_expiration;
use crate::codec::{Name, Transaction};
use crate::crypto::PublicKey;
use crate::error::{ErrorCode, YxError, YxResult};
use crate::serde_bytes::Bytes32;

// =============================================================================
// Chain state
// =============================================================================

/// `get_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub server_version: String,
    pub chain_id: Bytes32,
    pub head_block_num: u64,
    pub last_irreversible_block_num: u64,
    #[serde(default)]
    pub last_irreversible_block_id: String,
    pub head_block_id: String,
    pub head_block_time: String,
    #[serde(default)]
    pub head_block_producer: String,
    #[serde(default)]
    pub virtual_block_cpu_limit: u64,
    #[serde(default)]
    pub virtual_block_net_limit: u64,
    #[serde(default)]
    pub block_cpu_limit: u64,
    #[serde(default)]
    pub block_net_limit: u64,
}

impl ChainInfo {
    pub fn head_block_id_bytes(&self) -> YxResult<Vec<u8>> {
        Ok(hex::decode(&self.head_block_id)?)
    }

    /// Head block time as epoch seconds
    pub fn head_block_epoch(&self) -> YxResult<u32> {
        parse_expiration(&self.head_block_time).map_err(YxError::parse_error)
    }
}

/// `get_block` (only the fields transaction assembly needs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub id: String,
    pub block_num: u64,
    #[serde(default)]
    pub ref_block_prefix: u32,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub producer: String,
}

impl BlockInfo {
    pub fn id_bytes(&self) -> YxResult<Vec<u8>> {
        Ok(hex::decode(&self.id)?)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GetBlockRequest<'a> {
    pub block_num_or_id: &'a str,
}

// =============================================================================
// ABI translation
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct AbiJsonToBinRequest<'a> {
    pub code: &'a Name,
    pub action: &'a Name,
    pub args: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AbiJsonToBinResponse {
    pub binargs: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AbiBinToJsonRequest<'a> {
    pub code: &'a Name,
    pub action: &'a Name,
    pub binargs: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AbiBinToJsonResponse {
    pub args: Value,
}

// =============================================================================
// Required keys
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GetRequiredKeysRequest<'a> {
    pub transaction: &'a Transaction,
    pub available_keys: &'a [PublicKey],
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetRequiredKeysResponse {
    pub required_keys: Vec<PublicKey>,
}

// =============================================================================
// Push transaction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub status: String,
    #[serde(default)]
    pub cpu_usage_us: u64,
    #[serde(default)]
    pub net_usage_words: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    #[serde(default)]
    pub id: Option<Bytes32>,
    #[serde(default)]
    pub block_num: Option<u64>,
    #[serde(default)]
    pub block_time: Option<String>,
    #[serde(default)]
    pub receipt: Option<TransactionReceipt>,
    #[serde(default)]
    pub elapsed: Option<i64>,
    #[serde(default)]
    pub action_traces: Vec<Value>,
}

/// Node acknowledgement: transaction id plus inclusion receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionResponse {
    pub transaction_id: Bytes32,
    pub processed: ProcessedTransaction,
}

impl PushTransactionResponse {
    pub fn block_num(&self) -> Option<u64> {
        self.processed.block_num
    }
}

// =============================================================================
// Node errors
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeErrorInfo {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub what: String,
    #[serde(default)]
    pub details: Vec<NodeErrorDetail>,
}

/// Structured error body returned with a non-2xx status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: NodeErrorInfo,
}

impl NodeErrorBody {
    /// Map the node's exception name onto a rejection code
    pub fn classify(&self) -> ErrorCode {
        let name = self.error.name.as_str();
        match name {
            "tx_duplicate" => ErrorCode::DuplicateTransaction,
            "expired_tx_exception" => ErrorCode::TransactionExpired,
            "unsatisfied_authorization" | "missing_auth_exception" | "irrelevant_auth_exception" => {
                ErrorCode::MissingAuthority
            }
            _ if name.ends_with("_usage_exceeded")
                || name.starts_with("ram_")
                || name.contains("deadline_exception") =>
            {
                ErrorCode::InsufficientResources
            }
            _ => ErrorCode::TransactionRejected,
        }
    }

    pub fn into_error(self) -> YxError {
        let code = self.classify();
        let message = if self.error.what.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.message, self.error.what)
        };
        let details = self
            .error
            .details
            .iter()
            .map(|d| d.message.as_str())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        let err = YxError::node_rejected(code, message);
        if details.is_empty() {
            err.with_details(self.error.name)
        } else {
            err.with_details(format!("{}: {}", self.error.name, details))
        }
    }
}

// =============================================================================
// Wallet
// =============================================================================

/// `sign_transaction` reply; only the signatures matter to the client
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WalletSignedTransaction {
    #[serde(default)]
    pub signatures: Vec<crate::crypto::Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn error_body(name: &str) -> NodeErrorBody {
        serde_json::from_value(serde_json::json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3040008,
                "name": name,
                "what": "Duplicate transaction",
                "details": [{"message": "duplicate transaction abcd", "file": "producer_plugin.cpp"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_classify_node_errors() {
        assert_eq!(error_body("tx_duplicate").classify(), ErrorCode::DuplicateTransaction);
        assert_eq!(error_body("expired_tx_exception").classify(), ErrorCode::TransactionExpired);
        assert_eq!(
            error_body("unsatisfied_authorization").classify(),
            ErrorCode::MissingAuthority
        );
        assert_eq!(
            error_body("tx_cpu_usage_exceeded").classify(),
            ErrorCode::InsufficientResources
        );
        assert_eq!(error_body("ram_usage_exceeded").classify(), ErrorCode::InsufficientResources);
        assert_eq!(error_body("eosio_assert_message_exception").classify(), ErrorCode::TransactionRejected);
    }

    #[test]
    fn test_into_error_keeps_payload() {
        let err = error_body("tx_duplicate").into_error();
        assert_eq!(err.kind(), ErrorKind::NodeRejection);
        assert!(err.message.contains("Duplicate transaction"));
        assert_eq!(
            err.details.as_deref(),
            Some("tx_duplicate: duplicate transaction abcd")
        );
    }

    #[test]
    fn test_chain_info_parsing() {
        let info: ChainInfo = serde_json::from_value(serde_json::json!({
            "server_version": "0f6695cb",
            "chain_id": "cf057bbfb72640471fd910bcb67639c22df9f92470936cddc1ade0e2f2e7dc4f",
            "head_block_num": 1000,
            "last_irreversible_block_num": 990,
            "head_block_id": "000003e8b1e16ab1b6a6b4bc7c0a6ad3c21b4a0e5d1a5d5c6e7f8091a2b3c4d5",
            "head_block_time": "2018-06-01T12:00:00.500",
            "head_block_producer": "yosemite"
        }))
        .unwrap();
        assert_eq!(info.head_block_epoch().unwrap(), 1527854400);
        assert_eq!(info.head_block_id_bytes().unwrap().len(), 32);
    }

    #[test]
    fn test_push_response_parsing() {
        let res: PushTransactionResponse = serde_json::from_value(serde_json::json!({
            "transaction_id": "a8b1c6b0d4e6f3b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b",
            "processed": {
                "block_num": 1001,
                "receipt": {"status": "executed", "cpu_usage_us": 321, "net_usage_words": 16},
                "action_traces": []
            }
        }))
        .unwrap();
        assert_eq!(res.block_num(), Some(1001));
        assert_eq!(res.processed.receipt.unwrap().status, "executed");
    }
}
