//! Keys, signatures and the transaction signing digest

pub mod digest;
pub mod keys;

pub use digest::{context_free_hash, sha256, signing_digest};
pub use keys::{KeyError, KeyResult, PrivateKey, PublicKey, Signature};
