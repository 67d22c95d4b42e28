//! Account / action / table names
//!
//! A name is up to 13 characters from `.12345abcdefghijklmnopqrstuvwxyz`
//! packed into a `u64`: 5 bits per character for the first 12 slots and
//! 4 bits for the 13th.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use super::pack::Packable;
use super::writer::{ByteWriter, CodecError, CodecResult};

const CHAR_MAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_IDX: usize = 12;
pub const MAX_NAME_LEN: usize = MAX_NAME_IDX + 1;

fn char_to_symbol(c: u8) -> u64 {
    match c {
        b'a'..=b'z' => (c - b'a') as u64 + 6,
        b'1'..=b'5' => (c - b'1') as u64 + 1,
        _ => 0,
    }
}

/// Pack a string into its 64-bit form. Total: invalid characters encode as
/// `'.'` and characters past the 13th are ignored.
pub fn string_to_name(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut value: u64 = 0;

    for i in 0..=MAX_NAME_IDX {
        let mut c = bytes.get(i).map(|&b| char_to_symbol(b)).unwrap_or(0);
        if i < MAX_NAME_IDX {
            c &= 0x1f;
            c <<= 64 - 5 * (i + 1);
        } else {
            c &= 0x0f;
        }
        value |= c;
    }

    value
}

/// Unpack a 64-bit name, stripping trailing `'.'` padding
pub fn name_to_string(value: u64) -> String {
    let mut tmp = value;
    let mut out = [b'.'; MAX_NAME_LEN];

    for i in 0..=MAX_NAME_IDX {
        let mask = if i == 0 { 0x0f } else { 0x1f };
        out[MAX_NAME_IDX - i] = CHAR_MAP[(tmp & mask) as usize];
        tmp >>= if i == 0 { 4 } else { 5 };
    }

    let end = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
    // CHAR_MAP is ASCII
    out[..end].iter().map(|&c| c as char).collect()
}

/// Check a string is a name the codec round-trips without loss
pub fn validate_name(s: &str) -> CodecResult<()> {
    if s.len() > MAX_NAME_LEN {
        return Err(CodecError::InvalidName(format!(
            "'{}' is longer than {} characters",
            s, MAX_NAME_LEN
        )));
    }
    for (i, c) in s.bytes().enumerate() {
        let ok = if i == MAX_NAME_IDX {
            matches!(c, b'.' | b'1'..=b'5' | b'a'..=b'j')
        } else {
            matches!(c, b'.' | b'1'..=b'5' | b'a'..=b'z')
        };
        if !ok {
            return Err(CodecError::InvalidName(format!(
                "'{}' has invalid character '{}' at position {}",
                s, c as char, i
            )));
        }
    }
    Ok(())
}

/// Packed name with a lazily cached string form
pub struct Name {
    value: u64,
    form: OnceLock<String>,
}

impl Name {
    pub const fn from_value(value: u64) -> Self {
        Self {
            value,
            form: OnceLock::new(),
        }
    }

    /// Strict constructor used for caller-supplied names
    pub fn new(s: &str) -> CodecResult<Self> {
        validate_name(s)?;
        let value = string_to_name(s);
        let form = OnceLock::new();
        // Keep the caller's spelling only when it is canonical (no trailing dots)
        if name_to_string(value) == s {
            let _ = form.set(s.to_string());
        }
        Ok(Self { value, form })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    pub fn as_str(&self) -> &str {
        self.form.get_or_init(|| name_to_string(self.value))
    }
}

impl Clone for Name {
    fn clone(&self) -> Self {
        let form = OnceLock::new();
        if let Some(s) = self.form.get() {
            let _ = form.set(s.clone());
        }
        Self {
            value: self.value,
            form,
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.as_str())
    }
}

impl FromStr for Name {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl From<u64> for Name {
    fn from(value: u64) -> Self {
        Name::from_value(value)
    }
}

impl Packable for Name {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u64(self.value);
        Ok(())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Name::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(string_to_name("eosio"), 6138663577826885632);
        assert_eq!(string_to_name("eosio.token"), 6138663591592764928);
        assert_eq!(string_to_name("yosemite"), 17667807409747263488);
        assert_eq!(string_to_name("active"), 3617214756542218240);
        assert_eq!(string_to_name("alice"), 3773036822876127232);
    }

    #[test]
    fn test_decode_strips_trailing_dots() {
        assert_eq!(name_to_string(6138663577826885632), "eosio");
        assert_eq!(name_to_string(0), "");
        assert_eq!(name_to_string(u64::MAX), "zzzzzzzzzzzzj");
    }

    #[test]
    fn test_invalid_characters_encode_as_dot() {
        assert_eq!(string_to_name("Eosio"), string_to_name(".osio"));
        assert_eq!(string_to_name("a6"), string_to_name("a"));
    }

    #[test]
    fn test_strict_constructor_rejects_long_names() {
        assert!(Name::new("abcdefghijklmn").is_err());
        assert!(Name::new("abcdefghijklz").is_err());
        assert!(Name::new("abcdefghijklj").is_ok());
        assert!(Name::new("Alice").is_err());
    }

    #[test]
    fn test_cached_form_matches_value() {
        let name = Name::new("yx.ntoken").unwrap();
        assert_eq!(name.as_str(), "yx.ntoken");
        let decoded = Name::from_value(name.value());
        assert_eq!(decoded.as_str(), "yx.ntoken");
        assert_eq!(decoded, name);
    }

    #[test]
    fn test_trailing_dots_normalised() {
        let name = Name::new("alice..").unwrap();
        assert_eq!(name, Name::new("alice").unwrap());
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn test_packs_little_endian() {
        let mut w = ByteWriter::new();
        Name::new("eosio").unwrap().pack(&mut w).unwrap();
        assert_eq!(w.as_bytes(), &6138663577826885632u64.to_le_bytes());
    }

    #[test]
    fn test_serde_as_string() {
        let name = Name::new("producer.a").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"producer.a\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
