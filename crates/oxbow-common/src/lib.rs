//! # oxbow-common
//!
//! Common types and constants for OxbowDB.
//!
//! This crate provides the foundational pieces shared by every OxbowDB
//! component:
//!
//! - **Types**: Core identifiers (`PageId`, `FrameId`, `TxnId`, `Lsn`)
//! - **Constants**: Page geometry and buffer pool sizing
//!
//! ## Example
//!
//! ```rust
//! use oxbow_common::types::{PageId, FrameId};
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(!PageId::INVALID.is_valid());
//!
//! let frame_id = FrameId::new(0);
//! assert_eq!(frame_id.index(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{FrameId, Lsn, PageId, Rid, TxnId};
