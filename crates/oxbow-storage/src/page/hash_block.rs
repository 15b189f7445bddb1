//! Hash index block page.
//!
//! A block page holds a fixed array of key-value slots plus two bitmaps
//! tracking slot state:
//!
//! | Occupied | Readable | Meaning                         |
//! |----------|----------|---------------------------------|
//! |    0     |    0     | Free (open for insertion)       |
//! |    1     |    1     | Live entry                      |
//! |    1     |    0     | Tombstone (deleted entry)       |
//!
//! Once a slot's `occupied` bit is raised it is never cleared again:
//! linear probing terminates on the first non-occupied slot, so a
//! tombstone must keep holding its place in the probe chain.
//!
//! # Page Layout
//!
//! ```text
//! [ occupied bitmap (ceil(S/8) bytes) | readable bitmap (ceil(S/8) bytes) | S pairs ]
//! ```
//!
//! `S` is the largest slot count whose bitmaps and pairs fit one page
//! for the concrete key/value encodings; see [`block_slot_count`].

use std::marker::PhantomData;

use oxbow_common::constants::PAGE_SIZE;

use super::codec::FixedCodec;

/// Returns the slot count for a block page storing pairs of `pair_size`
/// bytes.
///
/// Chosen as the largest `S` with `2 * ceil(S/8) + S * pair_size <=
/// PAGE_SIZE`.
pub fn block_slot_count(pair_size: usize) -> usize {
    let mut slots = (4 * PAGE_SIZE) / (4 * pair_size + 1);
    while 2 * slots.div_ceil(8) + slots * pair_size > PAGE_SIZE {
        slots -= 1;
    }
    slots
}

#[inline]
fn bitmap_len(slot_count: usize) -> usize {
    slot_count.div_ceil(8)
}

#[inline]
fn bit_is_set(bitmap: &[u8], slot: usize) -> bool {
    bitmap[slot / 8] & (1 << (slot % 8)) != 0
}

/// Read-only view of a hash block page.
pub struct HashBlockPage<'a, K, V> {
    data: &'a [u8],
    slot_count: usize,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: FixedCodec, V: FixedCodec> HashBlockPage<'a, K, V> {
    /// Creates a view into the given page buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            slot_count: block_slot_count(K::ENCODED_SIZE + V::ENCODED_SIZE),
            _marker: PhantomData,
        }
    }

    /// Returns the number of slots in this block.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Returns true if `slot` has ever held an entry.
    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        bit_is_set(&self.data[..bitmap_len(self.slot_count)], slot)
    }

    /// Returns true if `slot` holds a live entry.
    #[inline]
    pub fn is_readable(&self, slot: usize) -> bool {
        let len = bitmap_len(self.slot_count);
        bit_is_set(&self.data[len..2 * len], slot)
    }

    /// Decodes the key at `slot`.
    #[inline]
    pub fn key_at(&self, slot: usize) -> K {
        let offset = self.pair_offset(slot);
        K::decode_from(&self.data[offset..offset + K::ENCODED_SIZE])
    }

    /// Decodes the value at `slot`.
    #[inline]
    pub fn value_at(&self, slot: usize) -> V {
        let offset = self.pair_offset(slot) + K::ENCODED_SIZE;
        V::decode_from(&self.data[offset..offset + V::ENCODED_SIZE])
    }

    #[inline]
    fn pair_offset(&self, slot: usize) -> usize {
        debug_assert!(slot < self.slot_count);
        2 * bitmap_len(self.slot_count) + slot * (K::ENCODED_SIZE + V::ENCODED_SIZE)
    }
}

/// Mutable view of a hash block page.
pub struct HashBlockPageMut<'a, K, V> {
    data: &'a mut [u8],
    slot_count: usize,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: FixedCodec, V: FixedCodec> HashBlockPageMut<'a, K, V> {
    /// Creates a mutable view into the given page buffer.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            slot_count: block_slot_count(K::ENCODED_SIZE + V::ENCODED_SIZE),
            data,
            _marker: PhantomData,
        }
    }

    /// Returns a read-only view of the same bytes.
    pub fn as_view(&self) -> HashBlockPage<'_, K, V> {
        HashBlockPage::new(self.data)
    }

    /// Writes `(key, value)` into `slot` and marks it live.
    ///
    /// Refuses occupied slots (live or tombstone) and returns `false`;
    /// the caller probes on.
    pub fn insert(&mut self, slot: usize, key: &K, value: &V) -> bool {
        let view = self.as_view();
        if view.is_occupied(slot) {
            return false;
        }
        let offset = view.pair_offset(slot);

        key.encode_into(&mut self.data[offset..offset + K::ENCODED_SIZE]);
        value.encode_into(
            &mut self.data[offset + K::ENCODED_SIZE..offset + K::ENCODED_SIZE + V::ENCODED_SIZE],
        );
        self.set_bit(0, slot);
        self.set_bit(bitmap_len(self.slot_count), slot);
        true
    }

    /// Clears `slot`'s readable bit, leaving its occupied bit as a
    /// tombstone.
    pub fn remove(&mut self, slot: usize) {
        debug_assert!(slot < self.slot_count);
        let len = bitmap_len(self.slot_count);
        self.data[len + slot / 8] &= !(1 << (slot % 8));
    }

    #[inline]
    fn set_bit(&mut self, bitmap_offset: usize, slot: usize) {
        self.data[bitmap_offset + slot / 8] |= 1 << (slot % 8);
    }
}
