//! Digest signer
//!
//! Signs the transaction digest once per required key, in the order the
//! keys were resolved. Any single failure fails the whole set; a partial
//! signature list is never returned.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{Packable, PackedTransaction, Transaction};
use crate::crypto::{signing_digest, PrivateKey, PublicKey, Signature};
use crate::error::{ErrorCode, ErrorKind, YxError, YxResult};
use crate::serde_bytes::Bytes32;
use crate::{log_debug, log_warn};

// =============================================================================
// Key holders
// =============================================================================

/// Something that owns private keys: the remote wallet daemon or an
/// in-memory key set
#[async_trait]
pub trait KeyHolder: Send + Sync {
    /// Public keys this holder can sign for
    async fn available_keys(&self) -> YxResult<Vec<PublicKey>>;

    /// Sign a 32-byte digest with the private key behind `key`
    async fn sign_digest(&self, digest: &Bytes32, key: &PublicKey) -> YxResult<Signature>;
}

/// Signs with private keys held in process memory
#[derive(Clone, Default)]
pub struct LocalKeyHolder {
    keys: HashMap<PublicKey, PrivateKey>,
}

impl LocalKeyHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: impl IntoIterator<Item = PrivateKey>) -> YxResult<Self> {
        let mut holder = Self::new();
        for key in keys {
            holder.insert(key)?;
        }
        Ok(holder)
    }

    /// Import a WIF / `PVT_K1_` key, returning its public key
    pub fn import(&mut self, encoded: &str) -> YxResult<PublicKey> {
        let key: PrivateKey = encoded.parse()?;
        self.insert(key)
    }

    pub fn insert(&mut self, key: PrivateKey) -> YxResult<PublicKey> {
        let public = key.public_key()?;
        self.keys.insert(public.clone(), key);
        Ok(public)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for LocalKeyHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyHolder")
            .field("public_keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl KeyHolder for LocalKeyHolder {
    async fn available_keys(&self) -> YxResult<Vec<PublicKey>> {
        let mut keys: Vec<PublicKey> = self.keys.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn sign_digest(&self, digest: &Bytes32, key: &PublicKey) -> YxResult<Signature> {
        let private = self.keys.get(key).ok_or_else(|| {
            YxError::new(ErrorCode::KeyNotAvailable, format!("No private key for {}", key))
        })?;
        Ok(private.sign_digest(digest.as_bytes())?)
    }
}

// =============================================================================
// Digest signer
// =============================================================================

/// Computes the signing digest and collects one signature per key
#[derive(Clone)]
pub struct DigestSigner {
    holder: Arc<dyn KeyHolder>,
}

impl DigestSigner {
    pub fn new(holder: Arc<dyn KeyHolder>) -> Self {
        Self { holder }
    }

    pub fn holder(&self) -> &Arc<dyn KeyHolder> {
        &self.holder
    }

    /// Digest for `transaction` on `chain_id` (no context-free data)
    pub fn digest(chain_id: &Bytes32, transaction: &Transaction) -> YxResult<Bytes32> {
        let packed = transaction.to_packed()?;
        Ok(Bytes32(signing_digest(chain_id, &packed, &[])))
    }

    /// Sign `transaction` with every key in `required_keys`, in order
    pub async fn sign(
        &self,
        chain_id: &Bytes32,
        transaction: &Transaction,
        required_keys: &[PublicKey],
    ) -> YxResult<PackedTransaction> {
        let digest = Self::digest(chain_id, transaction)?;
        log_debug!("signer", "signing digest", digest = digest, keys = required_keys.len());

        let mut signatures = Vec::with_capacity(required_keys.len());
        for key in required_keys {
            let signature = self
                .holder
                .sign_digest(&digest, key)
                .await
                .map_err(|e| as_signing_error(e, key))?;

            if !signature.verify(digest.as_bytes(), key) {
                log_warn!("signer", "signature does not recover to requested key", public_key = key);
                return Err(YxError::signing_failed(format!(
                    "Signature from key holder does not match {}",
                    key
                )));
            }
            signatures.push(signature);
        }

        Ok(PackedTransaction::new(transaction, signatures)?)
    }
}

/// Key-holder failures surface as negotiation errors
fn as_signing_error(err: YxError, key: &PublicKey) -> YxError {
    if err.kind() == ErrorKind::Negotiation {
        return err;
    }
    let details = format!("{:?}: {}", err.code, err.message);
    YxError::signing_failed(format!("Signing with {} failed", key)).with_details(details)
}
