//! Parent linking for classified rows.
//!
//! A row's parent is the most recently emitted category exactly one level
//! shallower. Keeping the last category seen at each level gives the same
//! answer as scanning the emitted list backwards, without the rescan.
//! Shallower rows do not clear deeper slots: a level-2 row after an
//! intervening level-0 row still attaches to the earlier level-1 row.

use crate::classify::MAX_LEVEL;

/// Identity of an already-emitted category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub category_id: String,
    pub account_name: String,
}

/// Rows must be fed strictly in input order.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    last_seen: [Option<ParentLink>; MAX_LEVEL as usize + 1],
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the parent for a row at `level`, then record the row itself.
    pub fn link(
        &mut self,
        level: u8,
        category_id: &str,
        account_name: &str,
    ) -> Option<ParentLink> {
        let level = level.min(MAX_LEVEL);
        let parent = self.parent_of(level).cloned();
        self.last_seen[level as usize] = Some(ParentLink {
            category_id: category_id.to_string(),
            account_name: account_name.to_string(),
        });
        parent
    }

    pub fn parent_of(&self, level: u8) -> Option<&ParentLink> {
        match level {
            0 => None,
            l => self.last_seen.get(l as usize - 1)?.as_ref(),
        }
    }
}
