//! Hash index header page.
//!
//! The header page anchors a linear-probe hash table: it records the
//! table size (number of buckets) and the ordered list of block page
//! ids, one per bucket group, grown on demand during insertion.
//!
//! # Page Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       8   page_id (i64, the header's own page id)
//!   8       8   size (u64, number of buckets, fixed at construction)
//!  16       8   num_blocks (u64, block ids currently registered)
//!  24       8n  block_page_ids (i64 each)
//! ```

use oxbow_common::constants::{HASH_HEADER_MAX_BLOCKS, HASH_HEADER_PREFIX_SIZE};
use oxbow_common::types::PageId;

const SIZE_OFFSET: usize = 8;
const NUM_BLOCKS_OFFSET: usize = 16;

/// Read-only view of a hash header page.
pub struct HashHeaderPage<'a> {
    data: &'a [u8],
}

impl<'a> HashHeaderPage<'a> {
    /// Creates a view into the given page buffer.
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= HASH_HEADER_PREFIX_SIZE);
        Self { data }
    }

    /// Returns the header's own page id.
    #[inline]
    pub fn page_id(&self) -> PageId {
        let bytes: [u8; 8] = self.data[0..8].try_into().expect("8-byte page id");
        PageId::from_le_bytes(bytes)
    }

    /// Returns the number of buckets the table hashes into.
    #[inline]
    pub fn size(&self) -> usize {
        let bytes: [u8; 8] = self.data[SIZE_OFFSET..SIZE_OFFSET + 8]
            .try_into()
            .expect("8-byte size");
        u64::from_le_bytes(bytes) as usize
    }

    /// Returns the number of block page ids currently registered.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        let bytes: [u8; 8] = self.data[NUM_BLOCKS_OFFSET..NUM_BLOCKS_OFFSET + 8]
            .try_into()
            .expect("8-byte block count");
        u64::from_le_bytes(bytes) as usize
    }

    /// Returns the block page id at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= num_blocks()`.
    #[inline]
    pub fn block_page_id(&self, index: usize) -> PageId {
        assert!(index < self.num_blocks(), "block index out of range");
        let offset = HASH_HEADER_PREFIX_SIZE + index * 8;
        let bytes: [u8; 8] = self.data[offset..offset + 8]
            .try_into()
            .expect("8-byte block page id");
        PageId::from_le_bytes(bytes)
    }

    /// Maximum number of block ids this header can register.
    #[inline]
    pub fn capacity() -> usize {
        HASH_HEADER_MAX_BLOCKS
    }
}

/// Mutable view of a hash header page.
pub struct HashHeaderPageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HashHeaderPageMut<'a> {
    /// Creates a mutable view into the given page buffer.
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= HASH_HEADER_PREFIX_SIZE);
        Self { data }
    }

    /// Returns a read-only view of the same bytes.
    pub fn as_view(&self) -> HashHeaderPage<'_> {
        HashHeaderPage::new(self.data)
    }

    /// Initializes a fresh header: own page id, bucket count, no blocks.
    pub fn init(&mut self, page_id: PageId, num_buckets: usize) {
        self.data[0..8].copy_from_slice(&page_id.to_le_bytes());
        self.data[SIZE_OFFSET..SIZE_OFFSET + 8]
            .copy_from_slice(&(num_buckets as u64).to_le_bytes());
        self.data[NUM_BLOCKS_OFFSET..NUM_BLOCKS_OFFSET + 8].copy_from_slice(&0u64.to_le_bytes());
    }

    /// Appends a block page id, returning `false` when the header is full.
    pub fn add_block_page_id(&mut self, block_page_id: PageId) -> bool {
        let num_blocks = self.as_view().num_blocks();
        if num_blocks >= HASH_HEADER_MAX_BLOCKS {
            return false;
        }
        let offset = HASH_HEADER_PREFIX_SIZE + num_blocks * 8;
        self.data[offset..offset + 8].copy_from_slice(&block_page_id.to_le_bytes());
        self.data[NUM_BLOCKS_OFFSET..NUM_BLOCKS_OFFSET + 8]
            .copy_from_slice(&((num_blocks + 1) as u64).to_le_bytes());
        true
    }
}
