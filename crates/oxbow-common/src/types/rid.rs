//! Record identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::PageId;

/// A record identifier: the page holding a tuple plus its slot number.
///
/// This is the value type indexes typically map keys to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    page_id: PageId,
    slot: u32,
}

impl Rid {
    /// Creates a record id from a page id and slot number.
    #[inline]
    #[must_use]
    pub const fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    /// Returns the page id.
    #[inline]
    #[must_use]
    pub const fn page_id(self) -> PageId {
        self.page_id
    }

    /// Returns the slot number.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }
}

impl Default for Rid {
    fn default() -> Self {
        Self::new(PageId::INVALID, 0)
    }
}

impl fmt::Debug for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_id, self.slot)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rid() {
        let rid = Rid::new(PageId::new(3), 9);
        assert_eq!(rid.page_id(), PageId::new(3));
        assert_eq!(rid.slot(), 9);
        assert_eq!(Rid::default().page_id(), PageId::INVALID);
    }
}
