//! Binary ABI codec
//!
//! Deterministic encoding of names, assets, authorities, actions and
//! transactions into the byte layout the chain expects.

pub mod action;
pub mod asset;
pub mod authority;
pub mod name;
pub mod pack;
pub mod transaction;
pub mod writer;

pub use action::Action;
pub use asset::{Asset, Symbol};
pub use authority::{
    Authority, KeyWeight, PermissionLevel, PermissionLevelWeight, WaitWeight, ACTIVE_PERMISSION,
    OWNER_PERMISSION,
};
pub use name::{name_to_string, string_to_name, validate_name, Name};
pub use pack::{Packable, VarUint32};
pub use transaction::{
    Compression, PackedTransaction, Transaction, TransactionExtension, TransactionHeader,
    TRANSACTION_VOTE_ACCOUNT,
};
pub use writer::{decode_varint, encode_varint, ByteReader, ByteWriter, CodecError, CodecResult};
