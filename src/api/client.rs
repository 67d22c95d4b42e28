//! Chain node REST client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::http::{build_client, endpoint, post_json};
use super::types::*;
use crate::codec::{Name, PackedTransaction, Transaction};
use crate::config::ClientConfig;
use crate::crypto::PublicKey;
use crate::error::YxResult;
use crate::log_debug;

/// Node operations the pipeline depends on
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn get_info(&self) -> YxResult<ChainInfo>;

    async fn get_block(&self, block_num_or_id: &str) -> YxResult<BlockInfo>;

    /// Pack JSON action arguments with the contract ABI
    async fn abi_json_to_bin(&self, code: &Name, action: &Name, args: &Value) -> YxResult<Vec<u8>>;

    async fn abi_bin_to_json(&self, code: &Name, action: &Name, binargs: &[u8]) -> YxResult<Value>;

    /// Subset of `available_keys` needed to authorize `transaction`
    async fn get_required_keys(
        &self,
        transaction: &Transaction,
        available_keys: &[PublicKey],
    ) -> YxResult<Vec<PublicKey>>;

    async fn push_transaction(&self, packed: &PackedTransaction) -> YxResult<PushTransactionResponse>;
}

/// [`ChainApi`] over the node's `/v1/chain` HTTP API
#[derive(Debug, Clone)]
pub struct HttpChainApi {
    client: Client,
    base_url: String,
}

impl HttpChainApi {
    pub fn new(config: &ClientConfig) -> YxResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.chain_url.clone(),
        })
    }

    fn url(&self, method: &str) -> String {
        endpoint(&self.base_url, &format!("/v1/chain/{}", method))
    }
}

#[async_trait]
impl ChainApi for HttpChainApi {
    async fn get_info(&self) -> YxResult<ChainInfo> {
        // get_info takes no body; the node accepts an empty object
        post_json(&self.client, &self.url("get_info"), &serde_json::json!({})).await
    }

    async fn get_block(&self, block_num_or_id: &str) -> YxResult<BlockInfo> {
        let body = GetBlockRequest { block_num_or_id };
        post_json(&self.client, &self.url("get_block"), &body).await
    }

    async fn abi_json_to_bin(&self, code: &Name, action: &Name, args: &Value) -> YxResult<Vec<u8>> {
        let body = AbiJsonToBinRequest { code, action, args };
        let res: AbiJsonToBinResponse =
            post_json(&self.client, &self.url("abi_json_to_bin"), &body).await?;
        Ok(hex::decode(res.binargs)?)
    }

    async fn abi_bin_to_json(&self, code: &Name, action: &Name, binargs: &[u8]) -> YxResult<Value> {
        let body = AbiBinToJsonRequest {
            code,
            action,
            binargs: hex::encode(binargs),
        };
        let res: AbiBinToJsonResponse =
            post_json(&self.client, &self.url("abi_bin_to_json"), &body).await?;
        Ok(res.args)
    }

    async fn get_required_keys(
        &self,
        transaction: &Transaction,
        available_keys: &[PublicKey],
    ) -> YxResult<Vec<PublicKey>> {
        let body = GetRequiredKeysRequest {
            transaction,
            available_keys,
        };
        let res: GetRequiredKeysResponse =
            post_json(&self.client, &self.url("get_required_keys"), &body).await?;
        Ok(res.required_keys)
    }

    async fn push_transaction(&self, packed: &PackedTransaction) -> YxResult<PushTransactionResponse> {
        log_debug!("api", "push_transaction", tx_id = packed.id(), signatures = packed.signatures.len());
        post_json(&self.client, &self.url("push_transaction"), packed).await
    }
}
