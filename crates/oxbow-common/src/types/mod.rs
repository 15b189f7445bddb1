//! Core type definitions for OxbowDB.

mod ids;
mod rid;

pub use ids::{FrameId, Lsn, PageId, TxnId};
pub use rid::Rid;
