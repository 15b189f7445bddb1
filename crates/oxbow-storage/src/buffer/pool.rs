//! Buffer pool implementation.
//!
//! The buffer pool owns a fixed array of page frames and the mapping from
//! logical page id to frame. Fetches are satisfied from the page table,
//! from the free list, or by evicting a clock-replacer victim, writing it
//! back first if dirty.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oxbow_common::types::{FrameId, PageId};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::BufferFrame;
use super::replacer::ClockReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

type PageTable = HashMap<PageId, FrameId>;

/// The buffer pool mediates all access to the paged database file.
///
/// Callers fetch or create pages and receive a pinned frame; they must
/// hand the pin back through [`unpin_page`](Self::unpin_page) on every
/// path, passing whether they dirtied the page. A frame with a positive
/// pin count is never an eviction candidate.
pub struct BufferPool {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames, fixed for the pool's lifetime.
    frames: Vec<Arc<BufferFrame>>,
    /// Page table: maps resident page ids to frames.
    page_table: RwLock<PageTable>,
    /// Frames holding no page, recycled FIFO.
    free_list: Mutex<VecDeque<FrameId>>,
    /// Clock replacer for eviction.
    replacer: ClockReplacer,
    /// Disk manager for physical I/O.
    disk: Arc<DiskManager>,
    /// Log manager handle; stored, never consulted by the core.
    log: Option<Arc<LogManager>>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Flush counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPool {
    /// Creates a new buffer pool over `disk`.
    ///
    /// The log manager handle is optional and is only stored.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<DiskManager>,
        log: Option<Arc<LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let frames: Vec<Arc<BufferFrame>> = (0..config.pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), config.page_size)))
            .collect();

        // Initially every frame is in the free list.
        let free_list = (0..config.pool_size).map(FrameId::new).collect();

        Ok(Self {
            replacer: ClockReplacer::new(config.pool_size),
            config,
            frames,
            page_table: RwLock::new(PageTable::new()),
            free_list: Mutex::new(free_list),
            disk,
            log,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Fetches the frame holding `page_id`, pinned.
    ///
    /// A page-table hit pins the resident frame. On a miss a frame is
    /// taken from the free list, or evicted from the replacer (written
    /// back first if dirty), and the page is read in from disk. Fails
    /// with [`BufferError::PoolExhausted`] when every frame is pinned;
    /// never blocks waiting for capacity.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        if !page_id.is_valid() {
            return Err(crate::disk::DiskError::invalid_page_id(page_id).into());
        }
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        {
            let table = self.page_table.read();
            if let Some(frame) = self.pin_resident(&table, page_id) {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Ok(frame);
            }
        }

        let mut table = self.page_table.write();
        // Another thread may have brought the page in while we upgraded.
        if let Some(frame) = self.pin_resident(&table, page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(frame);
        }
        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.acquire_frame(&mut table)?;
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                drop(data);
                frame.reset();
                self.free_list.lock().push_back(frame_id);
                return Err(e.into());
            }
        }
        frame.pin();
        self.replacer.pin(frame_id);
        table.insert(page_id, frame_id);

        Ok(frame)
    }

    /// Allocates a fresh on-disk page and returns it as a pinned,
    /// zero-initialized frame.
    ///
    /// Frame selection is identical to [`fetch_page`](Self::fetch_page):
    /// free list first, then a (possibly flushed) replacer victim.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<BufferFrame>)> {
        let mut table = self.page_table.write();
        let frame_id = self.acquire_frame(&mut table)?;
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        let page_id = self.disk.allocate_page();
        frame.zero_data();
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        self.replacer.pin(frame_id);
        table.insert(page_id, frame_id);

        Ok((page_id, frame))
    }

    /// Releases one pin on `page_id`, recording whether the caller
    /// dirtied the page.
    ///
    /// An id that is not resident is a no-op returning `true` (some
    /// callers double-unpin after a delete). Unpinning a page whose pin
    /// count is already zero is a caller bug: it returns `false` and
    /// logs. When the last pin is released the frame becomes an eviction
    /// candidate.
    pub fn unpin_page(&self, page_id: PageId, dirty: bool) -> bool {
        // Write-held: a pin-to-zero transition must not interleave with a
        // concurrent fetch hit re-pinning the same frame, or the frame
        // could enter the replacer while pinned.
        let table = self.page_table.write();
        let Some(&frame_id) = table.get(&page_id) else {
            return true;
        };
        let frame = &self.frames[frame_id.index()];

        match frame.unpin() {
            None => {
                tracing::error!(page_id = %page_id, "unpin of page with zero pin count");
                false
            }
            Some(remaining) => {
                if dirty {
                    frame.set_dirty(true);
                }
                if remaining == 0 {
                    self.replacer.unpin(frame_id);
                }
                true
            }
        }
    }

    /// Writes `page_id` back to disk if it is resident and dirty.
    ///
    /// Returns `true` for a resident page (clean or flushed), `false`
    /// for one that is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let table = self.page_table.read();
        let Some(&frame_id) = table.get(&page_id) else {
            tracing::debug!(page_id = %page_id, "flush of page not resident");
            return false;
        };
        let frame = &self.frames[frame_id.index()];

        if !frame.is_dirty() {
            return true;
        }

        let data = frame.read_data();
        match self.disk.write_page(page_id, &data) {
            Ok(()) => {
                frame.set_dirty(false);
                self.flush_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::error!(page_id = %page_id, error = %e, "flush failed");
                false
            }
        }
    }

    /// Deletes `page_id` from the pool and deallocates it on disk.
    ///
    /// An absent or invalid id succeeds trivially. A pinned page cannot
    /// be deleted: the caller must unpin and retry. On success the frame
    /// is reset, removed from the replacer, and returned to the back of
    /// the free list.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        if !page_id.is_valid() {
            return true;
        }

        let mut table = self.page_table.write();
        let Some(&frame_id) = table.get(&page_id) else {
            return true;
        };
        let frame = &self.frames[frame_id.index()];

        if frame.is_pinned() {
            tracing::error!(page_id = %page_id, pin_count = frame.pin_count(), "delete of pinned page");
            return false;
        }

        self.disk.deallocate_page(page_id);
        table.remove(&page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        self.free_list.lock().push_back(frame_id);

        true
    }

    /// Writes back every resident dirty page.
    pub fn flush_all_pages(&self) {
        for frame in &self.frames {
            let page_id = frame.page_id();
            if !page_id.is_valid() || !frame.is_dirty() {
                continue;
            }
            let data = frame.read_data();
            match self.disk.write_page(page_id, &data) {
                Ok(()) => {
                    frame.set_dirty(false);
                    self.flush_count.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::error!(page_id = %page_id, error = %e, "flush failed");
                }
            }
        }
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns true if `page_id` is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.read().contains_key(&page_id)
    }

    /// Returns the log manager handle, if one was supplied.
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log.as_ref()
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Pins `page_id`'s frame if it is resident.
    ///
    /// Runs entirely under a page-table lock, so the frame cannot be
    /// evicted between the lookup and the pin.
    fn pin_resident(&self, table: &PageTable, page_id: PageId) -> Option<Arc<BufferFrame>> {
        let &frame_id = table.get(&page_id)?;
        let frame = &self.frames[frame_id.index()];
        frame.pin();
        self.replacer.pin(frame_id);
        Some(Arc::clone(frame))
    }

    /// Obtains a reset frame: free list front, else a replacer victim.
    ///
    /// A dirty victim is written back before its frame is reused; its old
    /// mapping is removed from the page table. Requires the page-table
    /// write lock so victim selection cannot race a concurrent pin.
    fn acquire_frame(
        &self,
        table: &mut RwLockWriteGuard<'_, PageTable>,
    ) -> BufferResult<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::PoolExhausted)?;
        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            let data = frame.read_data();
            if let Err(e) = self.disk.write_page(old_page_id, &data) {
                drop(data);
                // The victim stays resident; make it a candidate again.
                self.replacer.unpin(frame_id);
                return Err(e.into());
            }
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        if old_page_id.is_valid() {
            table.remove(&old_page_id);
        }
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);

        Ok(frame_id)
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("resident", &self.page_table.read().len())
            .finish()
    }
}
