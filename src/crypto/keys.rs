//! K1 (secp256k1) keys and signatures
//!
//! Text formats:
//! - public key: legacy `EOS…`/`YOS…` or `PUB_K1_…`
//! - private key: WIF (optionally `YPV_`-prefixed) or `PVT_K1_…`
//! - signature: `SIG_K1_…`
//!
//! Legacy forms use `ripemd160(data)[0..4]` (public keys) or
//! `sha256d(0x80 ‖ key)[0..4]` (WIF) as checksum; `*_K1_` forms use
//! `ripemd160(data ‖ "K1")[0..4]`.

use ripemd::Ripemd160;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{ByteWriter, CodecResult, Packable};
use crate::error::{ErrorCode, YxError};

pub const PUBLIC_KEY_LEN: usize = 33;
pub const SIGNATURE_LEN: usize = 65;

const K1_SUFFIX: &[u8] = b"K1";
const LEGACY_PUBLIC_PREFIXES: [&str; 2] = ["EOS", "YOS"];
const PRIVATE_KEY_PREFIX: &str = "YPV_";
const WIF_VERSION: u8 = 0x80;
const KEY_TYPE_K1: u64 = 0;

/// Attempts at finding a canonical signature before giving up
const MAX_CANONICAL_ATTEMPTS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid base58: {0}")]
    Base58(String),

    #[error("Unsupported key format: {0}")]
    UnsupportedFormat(String),

    #[error("Expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Checksum mismatch")]
    Checksum,

    #[error("Invalid curve point or scalar: {0}")]
    Curve(String),

    #[error("Could not produce a canonical signature")]
    NonCanonical,
}

impl From<KeyError> for YxError {
    fn from(e: KeyError) -> Self {
        let code = match e {
            KeyError::NonCanonical => ErrorCode::SigningFailed,
            _ => ErrorCode::InvalidKey,
        };
        YxError::new(code, e.to_string())
    }
}

pub type KeyResult<T> = Result<T, KeyError>;

// =============================================================================
// Checksums
// =============================================================================

fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn k1_checksum(data: &[u8]) -> [u8; 4] {
    let mut buf = Vec::with_capacity(data.len() + K1_SUFFIX.len());
    buf.extend_from_slice(data);
    buf.extend_from_slice(K1_SUFFIX);
    let hash = ripemd160(&buf);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn sha256d_checksum(data: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    [second[0], second[1], second[2], second[3]]
}

fn decode_checked(encoded: &str, expected_len: usize) -> KeyResult<(Vec<u8>, [u8; 4])> {
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| KeyError::Base58(e.to_string()))?;
    if raw.len() != expected_len + 4 {
        return Err(KeyError::Length {
            expected: expected_len + 4,
            actual: raw.len(),
        });
    }
    let (data, check) = raw.split_at(expected_len);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(check);
    Ok((data.to_vec(), checksum))
}

fn encode_with_checksum(data: &[u8], checksum: [u8; 4]) -> String {
    let mut buf = data.to_vec();
    buf.extend_from_slice(&checksum);
    bs58::encode(buf).into_string()
}

// =============================================================================
// Public Key
// =============================================================================

/// Compressed secp256k1 public key
#[derive(Clone)]
pub struct PublicKey {
    data: [u8; PUBLIC_KEY_LEN],
    legacy_prefix: Option<&'static str>,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> KeyResult<Self> {
        let pk = secp256k1::PublicKey::from_slice(bytes)
            .map_err(|e| KeyError::Curve(e.to_string()))?;
        Ok(Self {
            data: pk.serialize(),
            legacy_prefix: None,
        })
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.data
    }

    /// `PUB_K1_…` form regardless of how the key was parsed
    pub fn to_k1_string(&self) -> String {
        format!("PUB_K1_{}", encode_with_checksum(&self.data, k1_checksum(&self.data)))
    }

    /// Legacy form with the given prefix, e.g. `EOS…`
    pub fn to_legacy_string(&self, prefix: &str) -> String {
        let hash = ripemd160(&self.data);
        format!(
            "{}{}",
            prefix,
            encode_with_checksum(&self.data, [hash[0], hash[1], hash[2], hash[3]])
        )
    }

    /// Keep the legacy `EOS` prefix when displayed
    pub fn with_legacy_prefix(mut self) -> Self {
        self.legacy_prefix = Some(LEGACY_PUBLIC_PREFIXES[0]);
        self
    }

    pub(crate) fn to_secp(&self) -> KeyResult<secp256k1::PublicKey> {
        secp256k1::PublicKey::from_slice(&self.data).map_err(|e| KeyError::Curve(e.to_string()))
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("PUB_K1_") {
            let (data, checksum) = decode_checked(rest, PUBLIC_KEY_LEN)?;
            if k1_checksum(&data) != checksum {
                return Err(KeyError::Checksum);
            }
            return PublicKey::from_bytes(&data);
        }

        for prefix in LEGACY_PUBLIC_PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                let (data, checksum) = decode_checked(rest, PUBLIC_KEY_LEN)?;
                if ripemd160(&data)[..4] != checksum {
                    return Err(KeyError::Checksum);
                }
                let mut key = PublicKey::from_bytes(&data)?;
                key.legacy_prefix = Some(prefix);
                return Ok(key);
            }
        }

        Err(KeyError::UnsupportedFormat(s.chars().take(8).collect()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.legacy_prefix {
            Some(prefix) => f.write_str(&self.to_legacy_string(prefix)),
            None => f.write_str(&self.to_k1_string()),
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by packed bytes; all keys share the K1 type tag
impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.data.cmp(&other.data)
    }
}

impl Packable for PublicKey {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_varint(KEY_TYPE_K1);
        writer.put_raw(&self.data);
        Ok(())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Private Key
// =============================================================================

/// secp256k1 secret scalar, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; 32],
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> KeyResult<Self> {
        SecretKey::from_slice(bytes).map_err(|e| KeyError::Curve(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Fresh random key
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut rand::thread_rng());
        Self {
            bytes: secret.secret_bytes(),
        }
    }

    /// WIF: Base58(0x80 ‖ key ‖ sha256d[0..4])
    pub fn to_wif(&self) -> String {
        let mut data = Vec::with_capacity(33);
        data.push(WIF_VERSION);
        data.extend_from_slice(&self.bytes);
        let encoded = encode_with_checksum(&data, sha256d_checksum(&data));
        data.zeroize();
        encoded
    }

    pub fn to_k1_string(&self) -> String {
        format!(
            "PVT_K1_{}",
            encode_with_checksum(&self.bytes, k1_checksum(&self.bytes))
        )
    }

    fn secret(&self) -> KeyResult<SecretKey> {
        SecretKey::from_slice(&self.bytes).map_err(|e| KeyError::Curve(e.to_string()))
    }

    pub fn public_key(&self) -> KeyResult<PublicKey> {
        let secp = Secp256k1::signing_only();
        let pk = secp256k1::PublicKey::from_secret_key(&secp, &self.secret()?);
        Ok(PublicKey {
            data: pk.serialize(),
            legacy_prefix: None,
        })
    }

    /// Canonical recoverable signature over a 32-byte digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> KeyResult<Signature> {
        let secp = Secp256k1::signing_only();
        let secret = self.secret()?;
        let msg = Message::from_digest(*digest);

        for attempt in 0..MAX_CANONICAL_ATTEMPTS {
            let sig = if attempt == 0 {
                secp.sign_ecdsa_recoverable(&msg, &secret)
            } else {
                let mut nonce_input = digest.to_vec();
                nonce_input.extend_from_slice(&attempt.to_le_bytes());
                let noncedata: [u8; 32] = Sha256::digest(&nonce_input).into();
                secp.sign_ecdsa_recoverable_with_noncedata(&msg, &secret, &noncedata)
            };

            let (recovery_id, compact) = sig.serialize_compact();
            let mut data = [0u8; SIGNATURE_LEN];
            // 27 + 4 marks a compressed-key recovery
            data[0] = 27 + 4 + recovery_id.to_i32() as u8;
            data[1..].copy_from_slice(&compact);

            let signature = Signature { data };
            if signature.is_canonical() {
                return Ok(signature);
            }
        }

        Err(KeyError::NonCanonical)
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("PVT_K1_") {
            let (data, checksum) = decode_checked(rest, 32)?;
            if k1_checksum(&data) != checksum {
                return Err(KeyError::Checksum);
            }
            return PrivateKey::from_bytes(&data);
        }

        let wif = s.strip_prefix(PRIVATE_KEY_PREFIX).unwrap_or(s);
        let (mut data, checksum) = decode_checked(wif, 33)?;
        let result = if sha256d_checksum(&data) != checksum {
            Err(KeyError::Checksum)
        } else if data[0] != WIF_VERSION {
            Err(KeyError::UnsupportedFormat(format!("WIF version 0x{:02x}", data[0])))
        } else {
            PrivateKey::from_bytes(&data[1..])
        };
        data.zeroize();
        result
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

// =============================================================================
// Signature
// =============================================================================

/// Compact recoverable signature: `i ‖ r ‖ s`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    data: [u8; SIGNATURE_LEN],
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> KeyResult<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(KeyError::Length {
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        let mut data = [0u8; SIGNATURE_LEN];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.data
    }

    /// Low-order `r`/`s` encoding required by the chain
    pub fn is_canonical(&self) -> bool {
        let c = &self.data;
        (c[1] & 0x80) == 0
            && !(c[1] == 0 && (c[2] & 0x80) == 0)
            && (c[33] & 0x80) == 0
            && !(c[33] == 0 && (c[34] & 0x80) == 0)
    }

    /// Recover the public key that produced this signature over `digest`
    pub fn recover(&self, digest: &[u8; 32]) -> KeyResult<PublicKey> {
        let recid = (self.data[0] as i32 - 27) & 0x03;
        let recovery_id =
            RecoveryId::from_i32(recid).map_err(|e| KeyError::Curve(e.to_string()))?;
        let sig = RecoverableSignature::from_compact(&self.data[1..], recovery_id)
            .map_err(|e| KeyError::Curve(e.to_string()))?;
        let secp = Secp256k1::verification_only();
        let pk = secp
            .recover_ecdsa(&Message::from_digest(*digest), &sig)
            .map_err(|e| KeyError::Curve(e.to_string()))?;
        Ok(PublicKey {
            data: pk.serialize(),
            legacy_prefix: None,
        })
    }

    /// Check the signature against a specific key
    pub fn verify(&self, digest: &[u8; 32], key: &PublicKey) -> bool {
        match (self.recover(digest), key.to_secp()) {
            (Ok(recovered), Ok(_)) => &recovered == key,
            _ => false,
        }
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("SIG_K1_")
            .ok_or_else(|| KeyError::UnsupportedFormat(s.chars().take(8).collect()))?;
        let (data, checksum) = decode_checked(rest, SIGNATURE_LEN)?;
        if k1_checksum(&data) != checksum {
            return Err(KeyError::Checksum);
        }
        Signature::from_bytes(&data)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SIG_K1_{}",
            encode_with_checksum(&self.data, k1_checksum(&self.data))
        )
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl Packable for Signature {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_varint(KEY_TYPE_K1);
        writer.put_raw(&self.data);
        Ok(())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
