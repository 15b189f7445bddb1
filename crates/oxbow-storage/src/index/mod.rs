//! Disk-resident hash index for OxbowDB.
//!
//! The linear-probe hash table is the index structure exposed to higher
//! query layers. Its header and block pages are ordinary buffer pool
//! pages: every operation fetches them through the pool, mutates slots
//! under pin, and unpins on every path.

mod linear_probe;

pub use linear_probe::LinearProbeHashTable;
