//! Key daemon (wallet) REST client

use async_trait::async_trait;
use reqwest::Client;

use super::http::{build_client, endpoint, post_json};
use super::types::WalletSignedTransaction;
use crate::codec::Transaction;
use crate::config::ClientConfig;
use crate::crypto::{PublicKey, Signature};
use crate::error::{YxError, YxResult};
use crate::serde_bytes::Bytes32;
use crate::tx::KeyHolder;

/// Remote key holder reached over `/v1/wallet`
#[derive(Debug, Clone)]
pub struct WalletApi {
    client: Client,
    base_url: String,
}

impl WalletApi {
    pub fn new(config: &ClientConfig) -> YxResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.wallet_url.clone(),
        })
    }

    fn url(&self, method: &str) -> String {
        endpoint(&self.base_url, &format!("/v1/wallet/{}", method))
    }

    /// Public keys of every unlocked wallet
    pub async fn get_public_keys(&self) -> YxResult<Vec<PublicKey>> {
        post_json(&self.client, &self.url("get_public_keys"), &serde_json::json!([])).await
    }

    pub async fn sign_digest(&self, digest: &Bytes32, key: &PublicKey) -> YxResult<Signature> {
        let body = (digest.to_hex(), key.to_string());
        post_json(&self.client, &self.url("sign_digest"), &body).await
    }

    /// Let the daemon sign the whole transaction; returns its signatures
    pub async fn sign_transaction(
        &self,
        transaction: &Transaction,
        keys: &[PublicKey],
        chain_id: &Bytes32,
    ) -> YxResult<Vec<Signature>> {
        let body = (transaction, keys, chain_id);
        let signed: WalletSignedTransaction =
            post_json(&self.client, &self.url("sign_transaction"), &body).await?;
        if signed.signatures.len() != keys.len() {
            return Err(YxError::signing_failed(format!(
                "Wallet returned {} signatures for {} keys",
                signed.signatures.len(),
                keys.len()
            )));
        }
        Ok(signed.signatures)
    }
}

#[async_trait]
impl KeyHolder for WalletApi {
    async fn available_keys(&self) -> YxResult<Vec<PublicKey>> {
        self.get_public_keys().await
    }

    async fn sign_digest(&self, digest: &Bytes32, key: &PublicKey) -> YxResult<Signature> {
        WalletApi::sign_digest(self, digest, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_urls() {
        let api = WalletApi::new(&ClientConfig::default()).unwrap();
        assert_eq!(api.url("sign_digest"), "http://127.0.0.1:8900/v1/wallet/sign_digest");
    }

    #[test]
    fn test_sign_digest_body_shape() {
        let key: PublicKey = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV"
            .parse()
            .unwrap();
        let body = (Bytes32([0xab; 32]).to_hex(), key.to_string());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json[0], "ab".repeat(32));
        assert_eq!(json[1], "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV");
    }
}
