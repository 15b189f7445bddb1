//! Linear-probe hash table implementation.
//!
//! A static-size open-addressed hash table whose "table" is a sequence of
//! block pages registered in a header page. A key hashes twice: once to a
//! bucket group (`hash % num_buckets`) selecting the block page, and once
//! to a probe start within that block (`hash % slot_count`). Probing runs
//! from the start offset to the end of the block; the base design does
//! not probe across blocks, so a full probe region rejects the insert.
//!
//! Deletion tombstones a slot (clears `readable`, keeps `occupied`), so
//! probe chains stay intact for later lookups.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use oxbow_common::types::PageId;
use parking_lot::RwLock;
use siphasher::sip::SipHasher13;

use crate::buffer::{BufferError, BufferFrame, BufferPool, BufferResult};
use crate::page::{
    block_slot_count, FixedCodec, HashBlockPage, HashBlockPageMut, HashHeaderPage,
    HashHeaderPageMut,
};
use crate::txn::Transaction;

// Fixed SipHash keys: the table is disk-resident, so key placement must
// be stable across processes.
const HASH_KEY_0: u64 = 0x7c4a_2d8f_0e61_93b5;
const HASH_KEY_1: u64 = 0x1f83_d9ab_fb41_bd6b;

fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
    key.hash(&mut hasher);
    hasher.finish()
}

/// A disk-resident linear-probing hash table.
///
/// Generic over key and value types with fixed-width binary encodings;
/// keys additionally hash. Supports non-unique keys, but rejects exact
/// duplicate `(key, value)` pairs.
///
/// All page access is brokered through the buffer pool. A reader/writer
/// table latch guards structure: insert, lookup, and removal take it
/// shared (slot mutation happens inside a pinned page and is opaque to
/// the index); growing the block list takes it exclusive.
pub struct LinearProbeHashTable<K, V> {
    /// Buffer pool brokering all page access.
    bpm: Arc<BufferPool>,
    /// Page id of the header page.
    header_page_id: PageId,
    /// Table latch guarding structural state.
    table_latch: RwLock<()>,
    _marker: PhantomData<fn(K, V)>,
}

impl<K, V> LinearProbeHashTable<K, V>
where
    K: FixedCodec + Hash,
    V: FixedCodec,
{
    /// Creates a new hash table with `num_buckets` bucket groups.
    ///
    /// Allocates the header page; block pages are created lazily during
    /// insertion. `num_buckets` is fixed for the table's lifetime and
    /// must fit the header's block-id capacity.
    pub fn new(bpm: Arc<BufferPool>, num_buckets: usize) -> BufferResult<Self> {
        if num_buckets == 0 {
            return Err(BufferError::config("num_buckets must be positive"));
        }
        if num_buckets > HashHeaderPage::capacity() {
            return Err(BufferError::config(
                "num_buckets exceeds header block-id capacity",
            ));
        }

        let (header_page_id, frame) = bpm.new_page()?;
        {
            let mut data = frame.write_data();
            HashHeaderPageMut::new(&mut data).init(header_page_id, num_buckets);
        }
        bpm.unpin_page(header_page_id, true);

        Ok(Self {
            bpm,
            header_page_id,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    /// Reattaches to a table whose header page already exists on disk.
    pub fn open(bpm: Arc<BufferPool>, header_page_id: PageId) -> Self {
        Self {
            bpm,
            header_page_id,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        }
    }

    /// Returns the page id of the header page.
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Inserts `(key, value)`.
    ///
    /// Returns `Ok(false)` when the identical pair is already present,
    /// or when the probe region from the key's offset to the end of its
    /// block has no free slot.
    pub fn insert(&self, _txn: &Transaction, key: &K, value: &V) -> BufferResult<bool> {
        let header_frame = self.bpm.fetch_page(self.header_page_id)?;
        let num_buckets = {
            let data = header_frame.read_data();
            HashHeaderPage::new(&data).size()
        };

        let hash = hash_key(key);
        let slots = block_slot_count(K::ENCODED_SIZE + V::ENCODED_SIZE);
        let bucket = (hash % num_buckets as u64) as usize;
        let offset = (hash % slots as u64) as usize;

        if let Err(e) = self.ensure_bucket_block(&header_frame, bucket) {
            self.bpm.unpin_page(self.header_page_id, true);
            return Err(e);
        }

        let block_page_id = {
            let data = header_frame.read_data();
            HashHeaderPage::new(&data).block_page_id(bucket)
        };

        let latch = self.table_latch.read();
        let block_frame = match self.bpm.fetch_page(block_page_id) {
            Ok(frame) => frame,
            Err(e) => {
                drop(latch);
                self.bpm.unpin_page(self.header_page_id, true);
                return Err(e);
            }
        };

        let mut inserted = false;
        {
            let mut data = block_frame.write_data();
            let mut block = HashBlockPageMut::<K, V>::new(&mut data);
            let mut slot = offset;
            while slot < slots {
                let view = block.as_view();
                if view.is_readable(slot) && view.key_at(slot) == *key && view.value_at(slot) == *value
                {
                    // Exact duplicate pair: fail before writing anything.
                    break;
                }
                if !view.is_occupied(slot) {
                    inserted = block.insert(slot, key, value);
                    break;
                }
                slot += 1;
            }
        }
        drop(latch);

        self.bpm.unpin_page(block_page_id, inserted);
        self.bpm.unpin_page(self.header_page_id, true);
        Ok(inserted)
    }

    /// Collects the values of every live entry matching `key`.
    pub fn get_value(&self, _txn: &Transaction, key: &K) -> BufferResult<Vec<V>> {
        let header_frame = self.bpm.fetch_page(self.header_page_id)?;
        let (num_buckets, num_blocks) = {
            let data = header_frame.read_data();
            let header = HashHeaderPage::new(&data);
            (header.size(), header.num_blocks())
        };

        let hash = hash_key(key);
        let slots = block_slot_count(K::ENCODED_SIZE + V::ENCODED_SIZE);
        let bucket = (hash % num_buckets as u64) as usize;
        let offset = (hash % slots as u64) as usize;

        let mut result = Vec::new();

        // A bucket group that was never materialized holds nothing.
        if bucket < num_blocks {
            let block_page_id = {
                let data = header_frame.read_data();
                HashHeaderPage::new(&data).block_page_id(bucket)
            };

            let latch = self.table_latch.read();
            let block_frame = match self.bpm.fetch_page(block_page_id) {
                Ok(frame) => frame,
                Err(e) => {
                    drop(latch);
                    self.bpm.unpin_page(self.header_page_id, false);
                    return Err(e);
                }
            };

            {
                let data = block_frame.read_data();
                let block = HashBlockPage::<K, V>::new(&data);
                for slot in offset..slots {
                    if block.is_readable(slot) && block.key_at(slot) == *key {
                        result.push(block.value_at(slot));
                    }
                }
            }
            drop(latch);
            self.bpm.unpin_page(block_page_id, false);
        }

        self.bpm.unpin_page(self.header_page_id, false);
        Ok(result)
    }

    /// Removes the first live entry matching both `key` and `value`,
    /// leaving a tombstone.
    ///
    /// Returns `Ok(false)` when no such entry exists in the key's probe
    /// region.
    pub fn remove(&self, _txn: &Transaction, key: &K, value: &V) -> BufferResult<bool> {
        let header_frame = self.bpm.fetch_page(self.header_page_id)?;
        let (num_buckets, num_blocks) = {
            let data = header_frame.read_data();
            let header = HashHeaderPage::new(&data);
            (header.size(), header.num_blocks())
        };

        let hash = hash_key(key);
        let slots = block_slot_count(K::ENCODED_SIZE + V::ENCODED_SIZE);
        let bucket = (hash % num_buckets as u64) as usize;
        let offset = (hash % slots as u64) as usize;

        // No block page for this bucket group: nothing to remove, and
        // nothing was fetched that would need unpinning.
        if bucket >= num_blocks {
            self.bpm.unpin_page(self.header_page_id, false);
            return Ok(false);
        }

        let block_page_id = {
            let data = header_frame.read_data();
            HashHeaderPage::new(&data).block_page_id(bucket)
        };

        let latch = self.table_latch.read();
        let block_frame = match self.bpm.fetch_page(block_page_id) {
            Ok(frame) => frame,
            Err(e) => {
                drop(latch);
                self.bpm.unpin_page(self.header_page_id, false);
                return Err(e);
            }
        };

        let mut removed = false;
        {
            let mut data = block_frame.write_data();
            let mut block = HashBlockPageMut::<K, V>::new(&mut data);
            for slot in offset..slots {
                let view = block.as_view();
                if view.is_readable(slot) && view.key_at(slot) == *key && view.value_at(slot) == *value
                {
                    block.remove(slot);
                    removed = true;
                    break;
                }
            }
        }
        drop(latch);

        self.bpm.unpin_page(block_page_id, removed);
        self.bpm.unpin_page(self.header_page_id, false);
        Ok(removed)
    }

    /// Returns the number of block pages registered in the header.
    ///
    /// This counts pages, not live entries.
    pub fn num_blocks(&self, _txn: &Transaction) -> BufferResult<usize> {
        let header_frame = self.bpm.fetch_page(self.header_page_id)?;
        let num_blocks = {
            let data = header_frame.read_data();
            HashHeaderPage::new(&data).num_blocks()
        };
        self.bpm.unpin_page(self.header_page_id, false);
        Ok(num_blocks)
    }

    /// Resizes the table to `initial_size` buckets.
    ///
    /// Reserved: the base design has a fixed bucket count and this is a
    /// no-op. A real implementation would take the table latch
    /// exclusively and rebuild every block page.
    pub fn resize(&self, initial_size: usize) {
        tracing::debug!(initial_size, "resize is reserved and does nothing");
    }

    /// Materializes block pages until bucket group `bucket` has one.
    ///
    /// Growth is structural, so it runs under the exclusive table latch;
    /// the count is re-read after acquisition in case another insert got
    /// there first.
    fn ensure_bucket_block(&self, header_frame: &BufferFrame, bucket: usize) -> BufferResult<()> {
        let num_blocks = {
            let data = header_frame.read_data();
            HashHeaderPage::new(&data).num_blocks()
        };
        if num_blocks > bucket {
            return Ok(());
        }

        let _latch = self.table_latch.write();
        loop {
            let num_blocks = {
                let data = header_frame.read_data();
                HashHeaderPage::new(&data).num_blocks()
            };
            if num_blocks > bucket {
                return Ok(());
            }

            let (block_page_id, _block_frame) = self.bpm.new_page()?;
            let added = {
                let mut data = header_frame.write_data();
                HashHeaderPageMut::new(&mut data).add_block_page_id(block_page_id)
            };
            self.bpm.unpin_page(block_page_id, true);
            if !added {
                self.bpm.delete_page(block_page_id);
                return Err(BufferError::config("hash header block-id capacity exhausted"));
            }
        }
    }
}

impl<K, V> std::fmt::Debug for LinearProbeHashTable<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearProbeHashTable")
            .field("header_page_id", &self.header_page_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolConfig;
    use crate::disk::DiskManager;
    use oxbow_common::types::TxnId;
    use tempfile::tempdir;

    fn create_table(
        dir: &tempfile::TempDir,
        pool_size: usize,
        num_buckets: usize,
    ) -> (Arc<BufferPool>, LinearProbeHashTable<i64, i64>) {
        let disk = Arc::new(DiskManager::open(dir.path().join("test.db")).unwrap());
        let bpm = Arc::new(BufferPool::new(BufferPoolConfig::new(pool_size), disk, None).unwrap());
        let table = LinearProbeHashTable::new(Arc::clone(&bpm), num_buckets).unwrap();
        (bpm, table)
    }

    fn txn() -> Transaction {
        Transaction::new(TxnId::new(1))
    }

    #[test]
    fn test_rejects_bad_bucket_counts() {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(dir.path().join("test.db")).unwrap());
        let bpm = Arc::new(BufferPool::new(BufferPoolConfig::new(8), disk, None).unwrap());

        assert!(LinearProbeHashTable::<i64, i64>::new(Arc::clone(&bpm), 0).is_err());
        assert!(LinearProbeHashTable::<i64, i64>::new(bpm, 1 << 20).is_err());
    }

    #[test]
    fn test_insert_get_remove() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 2);
        let txn = txn();

        assert!(table.insert(&txn, &5, &50).unwrap());
        assert!(table.insert(&txn, &9, &90).unwrap());
        assert!(table.insert(&txn, &14, &140).unwrap());

        assert_eq!(table.get_value(&txn, &5).unwrap(), vec![50]);
        assert_eq!(table.get_value(&txn, &9).unwrap(), vec![90]);

        assert!(table.remove(&txn, &5, &50).unwrap());
        assert!(table.get_value(&txn, &5).unwrap().is_empty());

        // Entries past the tombstone stay reachable.
        assert_eq!(table.get_value(&txn, &9).unwrap(), vec![90]);
        assert_eq!(table.get_value(&txn, &14).unwrap(), vec![140]);
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 2);
        let txn = txn();

        assert!(table.insert(&txn, &7, &70).unwrap());
        assert!(!table.insert(&txn, &7, &70).unwrap());
        assert_eq!(table.get_value(&txn, &7).unwrap(), vec![70]);
    }

    #[test]
    fn test_non_unique_keys() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 2);
        let txn = txn();

        // Both entries for the key need probe room past its offset.
        let slots = block_slot_count(2 * std::mem::size_of::<i64>()) as u64;
        let key = (0..100i64)
            .find(|k| hash_key(k) % slots < slots - 8)
            .unwrap();

        assert!(table.insert(&txn, &key, &70).unwrap());
        assert!(table.insert(&txn, &key, &71).unwrap());

        let mut values = table.get_value(&txn, &key).unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![70, 71]);

        // Removal matches on the exact pair.
        assert!(!table.remove(&txn, &key, &99).unwrap());
        assert!(table.remove(&txn, &key, &70).unwrap());
        assert_eq!(table.get_value(&txn, &key).unwrap(), vec![71]);
    }

    #[test]
    fn test_empty_table_lookups() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 4);
        let txn = txn();

        // No block pages exist yet; lookups and removals come back empty
        // without touching any block.
        assert!(table.get_value(&txn, &3).unwrap().is_empty());
        assert!(!table.remove(&txn, &3, &30).unwrap());
        assert_eq!(table.num_blocks(&txn).unwrap(), 0);
    }

    #[test]
    fn test_blocks_grow_lazily() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 4);
        let txn = txn();

        assert_eq!(table.num_blocks(&txn).unwrap(), 0);
        for key in 0..32i64 {
            table.insert(&txn, &key, &(key * 10)).unwrap();
        }
        let blocks = table.num_blocks(&txn).unwrap();
        assert!(blocks >= 1);
        assert!(blocks <= 4);
    }

    #[test]
    fn test_remove_then_reinsert() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 16, 2);
        let txn = txn();

        // Pick a key whose probe start leaves room past the tombstone.
        let slots = block_slot_count(2 * std::mem::size_of::<i64>()) as u64;
        let key = (0..100i64)
            .find(|k| hash_key(k) % slots < slots - 8)
            .unwrap();

        assert!(table.insert(&txn, &key, &1).unwrap());
        assert!(table.remove(&txn, &key, &1).unwrap());
        // The tombstoned slot is not reused, but the pair inserts again
        // further along the probe chain.
        assert!(table.insert(&txn, &key, &1).unwrap());
        assert_eq!(table.get_value(&txn, &key).unwrap(), vec![1]);
    }

    #[test]
    fn test_probe_chain_survives_removals() {
        let dir = tempdir().unwrap();
        let (_bpm, table) = create_table(&dir, 32, 1);
        let txn = txn();

        // A probe start near the end of the block may legitimately find
        // its region full; track which keys actually went in.
        let mut inserted = Vec::new();
        for key in 0..64i64 {
            if table.insert(&txn, &key, &key).unwrap() {
                inserted.push(key);
            }
        }
        assert!(inserted.len() >= 56);

        for key in inserted.iter().filter(|k| *k % 2 == 0) {
            assert!(table.remove(&txn, key, key).unwrap());
        }
        for key in inserted.iter().filter(|k| *k % 2 == 1) {
            assert_eq!(table.get_value(&txn, key).unwrap(), vec![*key]);
        }
        for key in inserted.iter().filter(|k| *k % 2 == 0) {
            assert!(table.get_value(&txn, key).unwrap().is_empty());
        }
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let txn = txn();
        let header_page_id;
        let mut inserted_keys = Vec::new();

        {
            let disk = Arc::new(DiskManager::open(&path).unwrap());
            let bpm =
                Arc::new(BufferPool::new(BufferPoolConfig::new(16), disk, None).unwrap());
            let table =
                LinearProbeHashTable::<i64, i64>::new(Arc::clone(&bpm), 4).unwrap();
            header_page_id = table.header_page_id();

            for key in 0..20i64 {
                let inserted = table.insert(&txn, &key, &(key + 100)).unwrap();
                if inserted {
                    inserted_keys.push(key);
                }
            }
            bpm.flush_all_pages();
        }
        assert!(inserted_keys.len() >= 16);

        let disk = Arc::new(DiskManager::open(&path).unwrap());
        let bpm = Arc::new(BufferPool::new(BufferPoolConfig::new(16), disk, None).unwrap());
        let table = LinearProbeHashTable::<i64, i64>::open(bpm, header_page_id);

        for key in inserted_keys {
            assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key + 100]);
        }
    }

    #[test]
    fn test_operations_release_all_pins() {
        let dir = tempdir().unwrap();
        let (bpm, table) = create_table(&dir, 16, 2);
        let txn = txn();

        assert!(table.insert(&txn, &1, &10).unwrap());
        let _ = table.get_value(&txn, &1).unwrap();
        assert!(table.remove(&txn, &1, &10).unwrap());
        assert!(!table.remove(&txn, &2, &20).unwrap());
        let _ = table.num_blocks(&txn).unwrap();
        table.resize(8);

        assert_eq!(bpm.stats().pinned_frames, 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let dir = tempdir().unwrap();
        let (bpm, table) = create_table(&dir, 32, 16);
        let table = Arc::new(table);

        let mut handles = Vec::new();
        for t in 0..4i64 {
            let table = Arc::clone(&table);
            handles.push(std::thread::spawn(move || {
                let txn = Transaction::new(TxnId::new(t as u64 + 1));
                let mut inserted = Vec::new();
                for i in 0..25i64 {
                    let key = t * 100 + i;
                    if table.insert(&txn, &key, &key).unwrap() {
                        inserted.push(key);
                    }
                }
                inserted
            }));
        }

        let mut inserted = Vec::new();
        for handle in handles {
            inserted.extend(handle.join().unwrap());
        }
        assert!(inserted.len() >= 90);

        let txn = txn();
        for key in inserted {
            assert_eq!(table.get_value(&txn, &key).unwrap(), vec![key]);
        }
        assert_eq!(bpm.stats().pinned_frames, 0);
    }
}
