//! Permission levels and authorities
//!
//! The chain checks authority satisfaction by walking `keys` and `accounts`
//! in their canonical order, so an [`Authority`] sorts both lists when it
//! is built and offers no way to change them afterwards.

use serde::{Deserialize, Serialize};

use super::name::Name;
use super::pack::Packable;
use super::writer::{ByteWriter, CodecResult};
use crate::crypto::PublicKey;

/// Conventional permission names
pub const ACTIVE_PERMISSION: &str = "active";
pub const OWNER_PERMISSION: &str = "owner";

/// `actor@permission`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }

    /// `actor@active`
    pub fn active(actor: Name) -> Self {
        Self {
            actor,
            permission: Name::from_value(super::name::string_to_name(ACTIVE_PERMISSION)),
        }
    }

    /// Parse `"alice@active"`; a bare actor gets the `active` permission
    pub fn parse(s: &str) -> CodecResult<Self> {
        match s.split_once('@') {
            Some((actor, permission)) => Ok(Self::new(Name::new(actor)?, Name::new(permission)?)),
            None => Ok(Self::active(Name::new(s)?)),
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

impl Packable for PermissionLevel {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.actor.pack(writer)?;
        self.permission.pack(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

impl Packable for KeyWeight {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.key.pack(writer)?;
        writer.put_u16(self.weight);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

impl Packable for PermissionLevelWeight {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.permission.pack(writer)?;
        writer.put_u16(self.weight);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitWeight {
    pub wait_sec: u32,
    pub weight: u16,
}

impl Packable for WaitWeight {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u32(self.wait_sec);
        writer.put_u16(self.weight);
        Ok(())
    }
}

/// Weighted threshold authority. Built once, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authority {
    threshold: u32,
    keys: Vec<KeyWeight>,
    accounts: Vec<PermissionLevelWeight>,
    waits: Vec<WaitWeight>,
}

impl Authority {
    pub fn new(
        threshold: u32,
        mut keys: Vec<KeyWeight>,
        mut accounts: Vec<PermissionLevelWeight>,
        mut waits: Vec<WaitWeight>,
    ) -> Self {
        // PublicKey orders by its packed bytes
        keys.sort_by(|a, b| a.key.cmp(&b.key));
        accounts.sort_by(|a, b| a.permission.cmp(&b.permission));
        waits.sort_by_key(|w| w.wait_sec);
        Self {
            threshold,
            keys,
            accounts,
            waits,
        }
    }

    /// Threshold 1, one key of weight 1
    pub fn single_key(key: PublicKey) -> Self {
        Self::new(1, vec![KeyWeight { key, weight: 1 }], Vec::new(), Vec::new())
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn keys(&self) -> &[KeyWeight] {
        &self.keys
    }

    pub fn accounts(&self) -> &[PermissionLevelWeight] {
        &self.accounts
    }

    pub fn waits(&self) -> &[WaitWeight] {
        &self.waits
    }
}

impl<'de> Deserialize<'de> for Authority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            threshold: u32,
            #[serde(default)]
            keys: Vec<KeyWeight>,
            #[serde(default)]
            accounts: Vec<PermissionLevelWeight>,
            #[serde(default)]
            waits: Vec<WaitWeight>,
        }

        // Node responses are re-sorted so the canonical order always holds
        let raw = Raw::deserialize(deserializer)?;
        Ok(Authority::new(raw.threshold, raw.keys, raw.accounts, raw.waits))
    }
}

impl Packable for Authority {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u32(self.threshold);
        self.keys.pack(writer)?;
        self.accounts.pack(writer)?;
        self.waits.pack(writer)
    }
}
