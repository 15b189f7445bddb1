//! Fixed-width binary encoding for index keys and values.

use oxbow_common::types::{PageId, Rid};

/// A type with a fixed-width binary encoding.
///
/// Index pages store keys and values as packed byte ranges; the slot
/// layout depends only on [`ENCODED_SIZE`](Self::ENCODED_SIZE), never on
/// the type's in-memory representation. Integers encode little-endian.
pub trait FixedCodec: Copy + Default + PartialEq {
    /// Number of bytes the encoded form occupies.
    const ENCODED_SIZE: usize;

    /// Encodes `self` into `buf`, which is exactly `ENCODED_SIZE` bytes.
    fn encode_into(&self, buf: &mut [u8]);

    /// Decodes a value from `buf`, which is exactly `ENCODED_SIZE` bytes.
    fn decode_from(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_codec_for_int {
    ($($ty:ty),*) => {
        $(
            impl FixedCodec for $ty {
                const ENCODED_SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn encode_into(&self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode_from(buf: &[u8]) -> Self {
                    <$ty>::from_le_bytes(buf.try_into().expect("buffer of ENCODED_SIZE bytes"))
                }
            }
        )*
    };
}

impl_fixed_codec_for_int!(i32, i64, u32, u64);

impl FixedCodec for Rid {
    const ENCODED_SIZE: usize = 12;

    #[inline]
    fn encode_into(&self, buf: &mut [u8]) {
        buf[0..8].copy_from_slice(&self.page_id().to_le_bytes());
        buf[8..12].copy_from_slice(&self.slot().to_le_bytes());
    }

    #[inline]
    fn decode_from(buf: &[u8]) -> Self {
        let page_id = PageId::from_le_bytes(buf[0..8].try_into().expect("8-byte page id"));
        let slot = u32::from_le_bytes(buf[8..12].try_into().expect("4-byte slot"));
        Self::new(page_id, slot)
    }
}
