//! Contract action

use serde::{Deserialize, Serialize};

use super::authority::PermissionLevel;
use super::name::Name;
use super::pack::Packable;
use super::writer::{ByteWriter, CodecResult};
use crate::serde_bytes::hex_vec;

/// One contract call. `data` is the packed argument struct, usually
/// produced by `abi_json_to_bin` or by packing a typed value directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    #[serde(with = "hex_vec")]
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(
        account: Name,
        name: Name,
        authorization: Vec<PermissionLevel>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            account,
            name,
            authorization,
            data,
        }
    }

    /// Build with arguments packed from a typed value
    pub fn from_packable<T: Packable + ?Sized>(
        account: Name,
        name: Name,
        authorization: Vec<PermissionLevel>,
        args: &T,
    ) -> CodecResult<Self> {
        Ok(Self::new(account, name, authorization, args.to_packed()?))
    }

    /// Returns a copy with `level` appended if not already present
    pub fn with_authorization(&self, level: PermissionLevel) -> Self {
        let mut next = self.clone();
        if !next.authorization.contains(&level) {
            next.authorization.push(level);
        }
        next
    }
}

impl Packable for Action {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.account.pack(writer)?;
        self.name.pack(writer)?;
        self.authorization.pack(writer)?;
        writer.put_bytes(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::asset::Asset;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn transfer() -> Action {
        let args = (
            (name("alice"), name("bob")),
            ("1.00 DKRW".parse::<Asset>().unwrap(), "memo".to_string()),
        );
        Action::from_packable(
            name("yx.ntoken"),
            name("transfer"),
            vec![PermissionLevel::active(name("alice"))],
            &args,
        )
        .unwrap()
    }

    #[test]
    fn test_action_layout() {
        let action = transfer();
        let packed = action.to_packed().unwrap();

        assert_eq!(&packed[..8], &17816588473672925184u64.to_le_bytes());
        assert_eq!(&packed[8..16], &14829575313431724032u64.to_le_bytes());
        assert_eq!(packed[16], 1);
        assert_eq!(&packed[17..25], &3773036822876127232u64.to_le_bytes());
        assert_eq!(&packed[25..33], &3617214756542218240u64.to_le_bytes());
        // 8 + 8 + 16 asset + 5 memo
        assert_eq!(packed[33] as usize, action.data.len());
        assert_eq!(action.data.len(), 37);
        assert_eq!(&packed[34..], action.data.as_slice());
    }

    #[test]
    fn test_json_uses_hex_data() {
        let action = transfer();
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["account"], "yx.ntoken");
        assert_eq!(json["authorization"][0]["actor"], "alice");
        assert_eq!(json["data"], hex::encode(&action.data));

        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_with_authorization_deduplicates() {
        let action = transfer();
        let same = action.with_authorization(PermissionLevel::active(name("alice")));
        assert_eq!(same.authorization.len(), 1);
        let extra = action.with_authorization(PermissionLevel::active(name("payer")));
        assert_eq!(extra.authorization.len(), 2);
        assert_eq!(action.authorization.len(), 1);
    }
}
