//! Disk manager implementation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use oxbow_common::constants::PAGE_SIZE;
use oxbow_common::types::PageId;
use parking_lot::Mutex;

use super::error::{DiskError, DiskResult};

/// The disk manager performs page-granular I/O on the database file.
///
/// Page `n` occupies bytes `[n * PAGE_SIZE, (n + 1) * PAGE_SIZE)` of the
/// file. Page ids are allocated from a monotonic counter seeded from the
/// file length, so reopening an existing database resumes allocation
/// where the previous process stopped.
pub struct DiskManager {
    /// The database file, shared behind a mutex.
    file: Mutex<File>,
    /// Path of the database file.
    path: PathBuf,
    /// Next page id to hand out.
    next_page_id: AtomicI64,
    /// Number of pages deallocated over the manager's lifetime.
    deallocated_count: AtomicU64,
}

impl DiskManager {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::open(&path, e))?;

        let len = file.metadata()?.len();
        let next_page_id = (len as usize).div_ceil(PAGE_SIZE) as i64;

        Ok(Self {
            file: Mutex::new(file),
            path,
            next_page_id: AtomicI64::new(next_page_id),
            deallocated_count: AtomicU64::new(0),
        })
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads page `page_id` into `buf`.
    ///
    /// A page that was allocated but never written back reads as zeroes:
    /// short reads past the end of the file zero-fill the remainder.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        let offset = Self::page_offset(page_id)?;
        Self::check_buf(buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut read = 0;
        while read < buf.len() {
            let n = file.read(&mut buf[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        buf[read..].fill(0);

        Ok(())
    }

    /// Writes `buf` as page `page_id`, extending the file if necessary.
    pub fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        let offset = Self::page_offset(page_id)?;
        Self::check_buf(buf.len())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;

        Ok(())
    }

    /// Allocates a fresh page id.
    ///
    /// Ids are handed out monotonically and never reused, even after
    /// [`deallocate_page`](Self::deallocate_page).
    pub fn allocate_page(&self) -> PageId {
        PageId::new(self.next_page_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Deallocates a page id.
    ///
    /// The base design reclaims no space; the call is recorded so the
    /// buffer pool's delete path stays honest about ownership.
    pub fn deallocate_page(&self, page_id: PageId) {
        self.deallocated_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(page_id = %page_id, "deallocated page");
    }

    /// Number of page ids handed out so far.
    pub fn num_allocated(&self) -> i64 {
        self.next_page_id.load(Ordering::SeqCst)
    }

    /// Number of pages deallocated over the manager's lifetime.
    pub fn num_deallocated(&self) -> u64 {
        self.deallocated_count.load(Ordering::Relaxed)
    }

    fn page_offset(page_id: PageId) -> DiskResult<u64> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page_id(page_id));
        }
        Ok(page_id.as_i64() as u64 * PAGE_SIZE as u64)
    }

    fn check_buf(len: usize) -> DiskResult<()> {
        if len != PAGE_SIZE {
            return Err(DiskError::BufferSize {
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("path", &self.path)
            .field("num_allocated", &self.num_allocated())
            .finish()
    }
}
