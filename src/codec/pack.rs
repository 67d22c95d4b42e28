//! Packable capability
//!
//! Structured values serialize themselves field by field, in declaration
//! order, with no padding. The field order is part of the wire contract.

use super::writer::{ByteWriter, CodecResult};

pub trait Packable {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()>;

    /// Pack into a fresh buffer
    fn to_packed(&self) -> CodecResult<Vec<u8>> {
        let mut writer = ByteWriter::new();
        self.pack(&mut writer)?;
        Ok(writer.into_bytes())
    }
}

/// `varuint32` on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarUint32(pub u32);

impl Packable for VarUint32 {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_varint(self.0 as u64);
        Ok(())
    }
}

macro_rules! impl_packable_int {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Packable for $ty {
                fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
                    writer.$method(*self);
                    Ok(())
                }
            }
        )*
    };
}

impl_packable_int! {
    u8 => put_u8,
    u16 => put_u16,
    u32 => put_u32,
    u64 => put_u64,
    i8 => put_i8,
    i16 => put_i16,
    i32 => put_i32,
    i64 => put_i64,
}

impl Packable for bool {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_u8(u8::from(*self));
        Ok(())
    }
}

impl Packable for String {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_string(self)
    }
}

impl Packable for str {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_string(self)
    }
}

/// Vectors are a varuint32 count followed by each element. For `Vec<u8>`
/// this is byte-identical to a length-prefixed byte string.
impl<T: Packable> Packable for Vec<T> {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_varuint32(self.len() as u64)?;
        for item in self {
            item.pack(writer)?;
        }
        Ok(())
    }
}

impl<T: Packable> Packable for [T] {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        writer.put_varuint32(self.len() as u64)?;
        for item in self {
            item.pack(writer)?;
        }
        Ok(())
    }
}

impl<A: Packable, B: Packable> Packable for (A, B) {
    fn pack(&self, writer: &mut ByteWriter) -> CodecResult<()> {
        self.0.pack(writer)?;
        self.1.pack(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_vector_matches_length_prefixed_bytes() {
        let data = vec![1u8, 2, 3];
        let mut direct = ByteWriter::new();
        direct.put_bytes(&data).unwrap();
        assert_eq!(data.to_packed().unwrap(), direct.into_bytes());
    }

    #[test]
    fn test_vector_of_u16() {
        let packed = vec![1u16, 0x0203].to_packed().unwrap();
        assert_eq!(packed, vec![0x02, 0x01, 0x00, 0x03, 0x02]);
    }

    #[test]
    fn test_tuple_packs_in_order() {
        let packed = (1001u16, vec![0xaau8]).to_packed().unwrap();
        assert_eq!(packed, vec![0xe9, 0x03, 0x01, 0xaa]);
    }
}
