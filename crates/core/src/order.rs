use tracing::debug;

use crate::state::TabState;
use crate::tab::TabId;

impl TabState {
    /// 移動頂層標籤。 / Moves the top-level tab at `from` to index `to`.
    ///
    /// Both indices address the current tab order; equal or out of range indices are a no-op.
    pub fn reorder_tab(&mut self, from: usize, to: usize) -> bool {
        let len = self.tab_order.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let moved = self.tab_order.remove(from);
        self.tab_order.insert(to, moved);
        true
    }

    /// 關閉頂層標籤；比較標籤會釋放其子標籤。 / Closes a top-level tab; comparisons release their children.
    pub fn close_tab(&mut self, id: &TabId) -> bool {
        if self.comparison_tabs.contains_key(id) {
            self.detach_all_children(id)
        } else {
            self.remove_single_tab(id)
        }
    }

    /// 關閉其他頂層標籤並啟動保留的標籤。 / Closes every other top-level tab and activates `keep`.
    pub fn close_other_tabs(&mut self, keep: &TabId) -> bool {
        if self.position_of(keep).is_none() {
            return false;
        }
        let others: Vec<TabId> = self
            .tab_order
            .iter()
            .filter(|id| *id != keep)
            .cloned()
            .collect();
        let mut changed = false;
        for id in &others {
            changed |= self.close_tab(id);
        }
        changed |= self.set_active_tab(keep);
        debug!(keep = %keep, closed = others.len(), "closed other tabs");
        changed
    }
}
