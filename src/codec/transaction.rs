//! Transaction and packed (signed) transaction
//!
//! Wire layout of a transaction:
//!
//! | Field                    | Encoding                  |
//! |--------------------------|---------------------------|
//! | expiration               | u32, seconds since epoch  |
//! | ref_block_num            | u16                       |
//! | ref_block_prefix         | u32                       |
//! | max_net_usage_words      | varuint32                 |
//! | max_cpu_usage_ms         | u8                        |
//! | delay_sec                | varuint32                 |
//! | context_free_actions     | vec<action>               |
//! | actions                  | vec<action>               |
//! | transaction_extensions   | vec<(u16, bytes)>         |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::action::Action;
use super::name::Name;
use super::pack::{Packable, VarUint32};
use super::writer::{ByteWriter, CodecError, CodecResult};
use crate::crypto::{digest, Signature};
use crate::serde_bytes::{hex_vec, Bytes32};

/// Extension tag carrying the transaction vote target account
pub const TRANSACTION_VOTE_ACCOUNT: u16 = 1001;

const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// =============================================================================
// Header
// =============================================================================

/// TAPoS and resource-limit fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionHeader {
    /// Seconds since the Unix epoch
    pub expiration: u32,
    /// Low 16 bits of the reference block height
    pub ref_block_num: u16,
    /// Little-endian u32 at bytes 8..12 of the reference block id
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
}

impl TransactionHeader {
    /// Bind to a reference block. Fails when the block id is too short
    /// to carry a prefix.
    pub fn with_reference_block(
        expiration: u32,
        block_num: u64,
        block_id: &[u8],
    ) -> CodecResult<Self> {
        Ok(Self {
            expiration,
            ref_block_num: (block_num & 0xffff) as u16,
            ref_block_prefix: ref_block_prefix(block_id)?,
            ..Default::default()
        })
    }

    pub fn expiration_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expiration as i64, 0).unwrap_or_default()
    }
}

impl Packable for TransactionHeader {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u32(self.expiration);
        writer.put_u16(self.ref_block_num);
        writer.put_u32(self.ref_block_prefix);
        VarUint32(self.max_net_usage_words).pack(writer)?;
        writer.put_u8(self.max_cpu_usage_ms);
        VarUint32(self.delay_sec).pack(writer)
    }
}

/// Little-endian u32 at bytes 8..12 of a block id
pub fn ref_block_prefix(block_id: &[u8]) -> CodecResult<u32> {
    let slice = block_id.get(8..12).ok_or(CodecError::UnexpectedEof {
        needed: 12,
        remaining: block_id.len(),
    })?;
    let mut arr = [0u8; 4];
    arr.copy_from_slice(slice);
    Ok(u32::from_le_bytes(arr))
}

// =============================================================================
// Extensions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionExtension {
    pub tag: u16,
    pub data: Vec<u8>,
}

impl TransactionExtension {
    pub fn vote_target(account: &Name) -> Self {
        Self {
            tag: TRANSACTION_VOTE_ACCOUNT,
            data: account.value().to_le_bytes().to_vec(),
        }
    }
}

impl Packable for TransactionExtension {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u16(self.tag);
        writer.put_bytes(&self.data)
    }
}

/// JSON form is a `[tag, "hex"]` pair
impl Serialize for TransactionExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.tag, hex::encode(&self.data)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TransactionExtension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, data): (u16, String) = Deserialize::deserialize(deserializer)?;
        let data = hex::decode(data).map_err(serde::de::Error::custom)?;
        Ok(Self { tag, data })
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Unsigned transaction. Action order is exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    header: TransactionHeader,
    context_free_actions: Vec<Action>,
    actions: Vec<Action>,
    extensions: Vec<TransactionExtension>,
}

impl Transaction {
    pub fn new(
        header: TransactionHeader,
        context_free_actions: Vec<Action>,
        actions: Vec<Action>,
        extensions: Vec<TransactionExtension>,
    ) -> Self {
        Self {
            header,
            context_free_actions,
            actions,
            extensions,
        }
    }

    pub fn header(&self) -> &TransactionHeader {
        &self.header
    }

    pub fn context_free_actions(&self) -> &[Action] {
        &self.context_free_actions
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn extensions(&self) -> &[TransactionExtension] {
        &self.extensions
    }

    /// sha256 of the packed transaction
    pub fn id(&self) -> CodecResult<Bytes32> {
        Ok(Bytes32(digest::sha256(&self.to_packed()?)))
    }
}

impl Packable for Transaction {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.header.pack(writer)?;
        self.context_free_actions.pack(writer)?;
        self.actions.pack(writer)?;
        self.extensions.pack(writer)
    }
}

#[derive(Serialize, Deserialize)]
struct TransactionJson {
    expiration: String,
    ref_block_num: u16,
    ref_block_prefix: u32,
    #[serde(default)]
    max_net_usage_words: u32,
    #[serde(default)]
    max_cpu_usage_ms: u8,
    #[serde(default)]
    delay_sec: u32,
    #[serde(default)]
    context_free_actions: Vec<Action>,
    actions: Vec<Action>,
    #[serde(default)]
    transaction_extensions: Vec<TransactionExtension>,
}

/// Node JSON form, used by `get_required_keys` and wallet signing
impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TransactionJson {
            expiration: self
                .header
                .expiration_time()
                .format(EXPIRATION_FORMAT)
                .to_string(),
            ref_block_num: self.header.ref_block_num,
            ref_block_prefix: self.header.ref_block_prefix,
            max_net_usage_words: self.header.max_net_usage_words,
            max_cpu_usage_ms: self.header.max_cpu_usage_ms,
            delay_sec: self.header.delay_sec,
            context_free_actions: self.context_free_actions.clone(),
            actions: self.actions.clone(),
            transaction_extensions: self.extensions.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = TransactionJson::deserialize(deserializer)?;
        let expiration = parse_expiration(&json.expiration).map_err(serde::de::Error::custom)?;
        Ok(Transaction {
            header: TransactionHeader {
                expiration,
                ref_block_num: json.ref_block_num,
                ref_block_prefix: json.ref_block_prefix,
                max_net_usage_words: json.max_net_usage_words,
                max_cpu_usage_ms: json.max_cpu_usage_ms,
                delay_sec: json.delay_sec,
            },
            context_free_actions: json.context_free_actions,
            actions: json.actions,
            extensions: json.transaction_extensions,
        })
    }
}

/// Parse a node timestamp (`2018-06-01T12:00:00` with optional fraction)
/// into epoch seconds
pub fn parse_expiration(s: &str) -> Result<u32, String> {
    let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))?;
    u32::try_from(parsed.and_utc().timestamp())
        .map_err(|_| format!("timestamp '{}' out of range", s))
}

// =============================================================================
// Packed Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

/// Signed transaction ready for `push_transaction`.
///
/// Signatures keep the order in which their keys were resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedTransaction {
    pub signatures: Vec<Signature>,
    pub compression: Compression,
    #[serde(with = "hex_vec")]
    pub packed_context_free_data: Vec<u8>,
    #[serde(with = "hex_vec")]
    pub packed_trx: Vec<u8>,
}

impl PackedTransaction {
    pub fn new(transaction: &Transaction, signatures: Vec<Signature>) -> CodecResult<Self> {
        Ok(Self {
            signatures,
            compression: Compression::None,
            packed_context_free_data: Vec::new(),
            packed_trx: transaction.to_packed()?,
        })
    }

    pub fn id(&self) -> Bytes32 {
        Bytes32(digest::sha256(&self.packed_trx))
    }
}
