//! Symbol and Asset
//!
//! A symbol packs its precision into the low byte and up to seven
//! upper-case code characters into the remaining bytes of a `u64`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::pack::Packable;
use super::writer::{ByteWriter, CodecError, CodecResult};

pub const MAX_SYMBOL_CODE_LEN: usize = 7;
pub const MAX_PRECISION: u8 = 18;

/// Native token symbol used by the original SDK samples
pub const DEFAULT_SYMBOL_CODE: &str = "DKRW";
pub const DEFAULT_SYMBOL_PRECISION: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    precision: u8,
    code: String,
}

impl Symbol {
    pub fn new(precision: u8, code: &str) -> CodecResult<Self> {
        if precision > MAX_PRECISION {
            return Err(CodecError::InvalidSymbol(format!(
                "precision {} exceeds {}",
                precision, MAX_PRECISION
            )));
        }
        if code.is_empty() || code.len() > MAX_SYMBOL_CODE_LEN {
            return Err(CodecError::InvalidSymbol(format!(
                "code '{}' must be 1..={} characters",
                code, MAX_SYMBOL_CODE_LEN
            )));
        }
        if !code.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(CodecError::InvalidSymbol(format!(
                "code '{}' must be upper-case A-Z",
                code
            )));
        }
        Ok(Self {
            precision,
            code: code.to_string(),
        })
    }

    pub fn default_native() -> Self {
        Self {
            precision: DEFAULT_SYMBOL_PRECISION,
            code: DEFAULT_SYMBOL_CODE.to_string(),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Packed 8-byte value: precision, then code characters
    pub fn value(&self) -> u64 {
        let mut value = self.precision as u64;
        for (i, c) in self.code.bytes().enumerate() {
            value |= (c as u64) << (8 * (i + 1));
        }
        value
    }

    pub fn from_value(value: u64) -> CodecResult<Self> {
        let precision = (value & 0xff) as u8;
        let mut code = String::new();
        let mut rest = value >> 8;
        while rest != 0 {
            code.push((rest & 0xff) as u8 as char);
            rest >>= 8;
        }
        Symbol::new(precision, &code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl Packable for Symbol {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u64(self.value());
        Ok(())
    }
}

/// Fixed-point quantity of a symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.symbol.precision as u32;
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        if precision == 0 {
            return write!(f, "{}{} {}", sign, abs, self.symbol.code);
        }
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / scale,
            abs % scale,
            self.symbol.code,
            width = precision as usize
        )
    }
}

impl FromStr for Asset {
    type Err = CodecError;

    /// Parses `"12.34 DKRW"`; the precision is the number of fraction digits
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| CodecError::InvalidAsset(format!("'{}': {}", s, msg));

        let (amount_str, code) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| invalid("expected '<amount> <SYMBOL>'"))?;
        let code = code.trim();

        let (negative, digits) = match amount_str.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount_str),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|c| c.is_ascii_digit())
            || !frac_part.bytes().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("amount must be decimal digits"));
        }
        if frac_part.len() > MAX_PRECISION as usize {
            return Err(invalid("too many fraction digits"));
        }

        let symbol = Symbol::new(frac_part.len() as u8, code)?;
        let combined = format!("{}{}", int_part, frac_part);
        let magnitude: i64 = combined
            .parse()
            .map_err(|_| invalid("amount out of range"))?;

        Ok(Asset {
            amount: if negative { -magnitude } else { magnitude },
            symbol,
        })
    }
}

impl Packable for Asset {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_i64(self.amount);
        self.symbol.pack(writer)
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
