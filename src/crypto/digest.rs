//! Signing digest
//!
//! `digest = sha256(chain_id ‖ packed_trx ‖ cf_hash)` where `cf_hash` is
//! the sha256 of the packed context-free data, or 32 zero bytes when
//! there is none.

use sha2::{Digest, Sha256};

use crate::serde_bytes::Bytes32;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash of the context-free data section
pub fn context_free_hash(cf_data: &[u8]) -> [u8; 32] {
    if cf_data.is_empty() {
        [0u8; 32]
    } else {
        sha256(cf_data)
    }
}

/// Digest signed by every required key
pub fn signing_digest(chain_id: &Bytes32, packed_trx: &[u8], cf_data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(packed_trx);
    hasher.update(context_free_hash(cf_data));
    hasher.finalize().into()
}
