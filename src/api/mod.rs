//! REST collaborators
//!
//! Chain node (`/v1/chain`) and key daemon (`/v1/wallet`) clients.

pub mod client;
mod http;
pub mod types;
pub mod wallet;

pub use client::{ChainApi, HttpChainApi};
pub use types::{BlockInfo, ChainInfo, NodeErrorBody, PushTransactionResponse, TransactionReceipt};
pub use wallet::WalletApi;
