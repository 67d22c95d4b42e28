//! YX Client Library
//!
//! Client-side plumbing for a delegated-proof-of-stake chain node.
//!
//! # Architecture
//!
//! This crate provides:
//! - **codec**: Account names, binary writer and the transaction wire format
//! - **crypto**: K1 keys, canonical signatures and the signing digest
//! - **api**: Chain node and key daemon REST clients
//! - **tx**: Assembly, required-key negotiation, signing and submission
//! - **event**: Irreversibility notifications over WebSocket
//!
//! # Example
//!
//! ```rust,ignore
//! use yx_client::{ClientConfig, Name, TransactionParameters, TransactionPipeline};
//!
//! let pipeline = TransactionPipeline::from_config(ClientConfig::default())?;
//! let params = TransactionParameters::for_actor(Name::new("alice")?);
//! let receipt = pipeline
//!     .push_action("yx.ntoken", "transfer", &args, &params)
//!     .await?;
//! println!("{}", receipt.transaction_id);
//! ```

pub mod utils;

pub mod api;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod event;
pub mod serde_bytes;
pub mod tx;

pub use config::ClientConfig;
pub use error::{ErrorCode, ErrorKind, YxError, YxResult};
pub use serde_bytes::Bytes32;

pub use codec::{Action, Name, PackedTransaction, PermissionLevel, Transaction};
pub use crypto::{PrivateKey, PublicKey, Signature};

pub use api::{ChainApi, HttpChainApi, WalletApi};
pub use event::{ChannelState, EventNotificationChannel};
pub use tx::{
    DigestSigner, KeyHolder, LocalKeyHolder, RequiredKeysResolver, SubmitReceipt, SubmitState,
    TransactionAssembler, TransactionParameters, TransactionPipeline, TransactionSubmitter,
};
