//! Page layouts for the hash index.
//!
//! These are views over raw page bytes - a page owns no memory of its
//! own; it interprets the buffer of a pinned frame. Every field is read
//! and written at an explicit byte offset in little-endian order, so the
//! on-disk format is independent of in-memory struct layout.

mod codec;
mod hash_block;
mod hash_header;

pub use codec::FixedCodec;
pub use hash_block::{block_slot_count, HashBlockPage, HashBlockPageMut};
pub use hash_header::{HashHeaderPage, HashHeaderPageMut};
