//! Required keys negotiation
//!
//! Asks the node which of the candidate keys are needed to authorize a
//! transaction. The answer is always a subset of the candidates.

use std::sync::Arc;

use crate::api::ChainApi;
use crate::codec::Transaction;
use crate::crypto::PublicKey;
use crate::error::{ErrorKind, YxError, YxResult};
use crate::tx::{KeyHolder, TransactionParameters};
use crate::{log_debug, log_warn};

#[derive(Clone)]
pub struct RequiredKeysResolver {
    chain: Arc<dyn ChainApi>,
    holder: Arc<dyn KeyHolder>,
}

impl RequiredKeysResolver {
    pub fn new(chain: Arc<dyn ChainApi>, holder: Arc<dyn KeyHolder>) -> Self {
        Self { chain, holder }
    }

    /// Caller-supplied keys, or everything the key holder offers
    pub async fn candidates(&self, params: &TransactionParameters) -> YxResult<Vec<PublicKey>> {
        if !params.public_keys().is_empty() {
            return Ok(params.public_keys().to_vec());
        }
        self.holder
            .available_keys()
            .await
            .map_err(|e| negotiation_error("Listing key holder keys failed", e))
    }

    /// Minimal subset of `candidates` the node says is required.
    ///
    /// Keys the node returns that were not offered are dropped.
    pub async fn resolve(
        &self,
        transaction: &Transaction,
        candidates: &[PublicKey],
    ) -> YxResult<Vec<PublicKey>> {
        if candidates.is_empty() {
            return Err(YxError::required_keys_failed("No candidate keys to offer"));
        }

        let returned = self
            .chain
            .get_required_keys(transaction, candidates)
            .await
            .map_err(|e| negotiation_error("get_required_keys failed", e))?;

        let mut required: Vec<PublicKey> = Vec::with_capacity(returned.len());
        for key in returned {
            if !candidates.contains(&key) {
                log_warn!("keys", "node returned a key that was not offered", public_key = key);
                continue;
            }
            if !required.contains(&key) {
                required.push(key);
            }
        }

        log_debug!(
            "keys",
            "resolved required keys",
            offered = candidates.len(),
            required = required.len()
        );
        Ok(required)
    }
}

fn negotiation_error(context: &str, err: YxError) -> YxError {
    if err.kind() == ErrorKind::Negotiation {
        return err;
    }
    let details = match err.details {
        Some(d) => format!("{:?}: {} ({})", err.code, err.message, d),
        None => format!("{:?}: {}", err.code, err.message),
    };
    YxError::required_keys_failed(context).with_details(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{BlockInfo, ChainInfo, PushTransactionResponse};
    use crate::codec::{Action, Name, PackedTransaction, PermissionLevel, TransactionHeader};
    use crate::crypto::PrivateKey;
    use crate::error::ErrorCode;
    use crate::tx::LocalKeyHolder;
    use async_trait::async_trait;
    use serde_json::Value;

    /// Node that requires exactly `needed`, plus optionally a stray key
    struct Node {
        needed: Vec<PublicKey>,
        stray: Option<PublicKey>,
        fail: bool,
    }

    #[async_trait]
    impl ChainApi for Node {
        async fn get_info(&self) -> YxResult<ChainInfo> {
            Err(YxError::internal("unused"))
        }
        async fn get_block(&self, _: &str) -> YxResult<BlockInfo> {
            Err(YxError::internal("unused"))
        }
        async fn abi_json_to_bin(&self, _: &Name, _: &Name, _: &Value) -> YxResult<Vec<u8>> {
            Err(YxError::internal("unused"))
        }
        async fn abi_bin_to_json(&self, _: &Name, _: &Name, _: &[u8]) -> YxResult<Value> {
            Err(YxError::internal("unused"))
        }
        async fn get_required_keys(
            &self,
            _: &Transaction,
            available: &[PublicKey],
        ) -> YxResult<Vec<PublicKey>> {
            if self.fail {
                return Err(YxError::network("connection reset"));
            }
            let mut keys: Vec<PublicKey> = self
                .needed
                .iter()
                .filter(|k| available.contains(k))
                .cloned()
                .collect();
            keys.extend(self.stray.clone());
            Ok(keys)
        }
        async fn push_transaction(&self, _: &PackedTransaction) -> YxResult<PushTransactionResponse> {
            Err(YxError::internal("unused"))
        }
    }

    fn tx() -> Transaction {
        let action = Action::new(
            Name::new("yx.ntoken").unwrap(),
            Name::new("transfer").unwrap(),
            vec![PermissionLevel::active(Name::new("alice").unwrap())],
            Vec::new(),
        );
        Transaction::new(TransactionHeader::default(), Vec::new(), vec![action], Vec::new())
    }

    fn key() -> PublicKey {
        PrivateKey::generate().public_key().unwrap()
    }

    fn resolver(node: Node) -> RequiredKeysResolver {
        RequiredKeysResolver::new(Arc::new(node), Arc::new(LocalKeyHolder::new()))
    }

    #[tokio::test]
    async fn test_subset_of_candidates() {
        let (k1, k2) = (key(), key());
        let r = resolver(Node {
            needed: vec![k1.clone()],
            stray: Some(key()),
            fail: false,
        });
        let required = r.resolve(&tx(), &[k1.clone(), k2]).await.unwrap();
        assert_eq!(required, vec![k1]);
    }

    #[tokio::test]
    async fn test_empty_candidates_rejected() {
        let r = resolver(Node {
            needed: Vec::new(),
            stray: None,
            fail: false,
        });
        let err = r.resolve(&tx(), &[]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredKeysFailed);
    }

    #[tokio::test]
    async fn test_transport_failure_is_negotiation_error() {
        let r = resolver(Node {
            needed: Vec::new(),
            stray: None,
            fail: true,
        });
        let err = r.resolve(&tx(), &[key()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Negotiation);
        assert!(err.details.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_candidates_prefer_params() {
        let mut holder = LocalKeyHolder::new();
        let held = holder.insert(PrivateKey::generate()).unwrap();
        let r = RequiredKeysResolver::new(
            Arc::new(Node {
                needed: Vec::new(),
                stray: None,
                fail: false,
            }),
            Arc::new(holder),
        );

        let explicit = key();
        let params = TransactionParameters::builder()
            .add_public_key(explicit.clone())
            .build();
        assert_eq!(r.candidates(&params).await.unwrap(), vec![explicit]);
        assert_eq!(
            r.candidates(&TransactionParameters::default()).await.unwrap(),
            vec![held]
        );
    }
}
