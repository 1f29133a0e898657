use std::collections::VecDeque;

use tracing::debug;

use crate::state::TabState;
use crate::tab::PanOffset;

/// 預設的復原深度。 / Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 標籤結構的復原／重做記錄。 / Undo and redo stacks over structural tab snapshots.
///
/// Snapshots ignore zoom, pan, reload tokens and the active tab, so view changes never
/// create undo steps. The active tab is re-derived when a snapshot is restored.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<TabState>,
    future: Vec<TabState>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 調整深度並捨棄最舊的記錄。 / Changes the depth, dropping the oldest entries when needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        while self.past.len() > limit {
            self.past.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// 在變更前後記錄一個步驟。 / Records `previous` as an undo step when the structure changed.
    ///
    /// Returns `false` when both states project to the same snapshot.
    pub fn record(&mut self, previous: &TabState, next: &TabState) -> bool {
        let snapshot = project(previous);
        if snapshot == project(next) {
            return false;
        }
        if self.limit == 0 {
            return false;
        }
        self.past.push_back(snapshot);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
        true
    }

    /// 對狀態副本執行變更並記錄。 / Runs a mutation on a copy of `state` and records it.
    pub fn apply<R>(
        &mut self,
        state: &TabState,
        mutation: impl FnOnce(&mut TabState) -> R,
    ) -> (TabState, R) {
        let mut next = state.clone();
        let result = mutation(&mut next);
        self.record(state, &next);
        (next, result)
    }

    /// 復原上一個步驟。 / Steps back, returning the state to adopt.
    pub fn undo(&mut self, current: &TabState) -> Option<TabState> {
        let snapshot = self.past.pop_back()?;
        self.future.push(project(current));
        debug!(remaining = self.past.len(), "undo");
        Some(restore(snapshot, current))
    }

    /// 重做下一個步驟。 / Steps forward again after an undo.
    pub fn redo(&mut self, current: &TabState) -> Option<TabState> {
        let snapshot = self.future.pop()?;
        self.past.push_back(project(current));
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        debug!(remaining = self.future.len(), "redo");
        Some(restore(snapshot, current))
    }
}

fn project(state: &TabState) -> TabState {
    let mut snapshot = state.clone();
    for tab in snapshot.single_tabs.values_mut() {
        tab.zoom = 1.0;
        tab.pan_offset = PanOffset::ZERO;
        tab.reload_trigger = 0;
    }
    snapshot.active_tab_id = None;
    snapshot
}

/// 以現況的檢視狀態補回快照。 / Re-applies live view state onto a snapshot.
fn restore(mut snapshot: TabState, live: &TabState) -> TabState {
    for tab in snapshot.single_tabs.values_mut() {
        if let Some(current) = live.single_tabs.get(&tab.id) {
            tab.zoom = current.zoom;
            tab.pan_offset = current.pan_offset;
            tab.reload_trigger = current.reload_trigger;
        }
    }
    let keep_active = live
        .active_tab_id
        .as_ref()
        .filter(|id| snapshot.tab_order.contains(id))
        .cloned();
    snapshot.active_tab_id = keep_active.or_else(|| snapshot.tab_order.first().cloned());
    snapshot.limits = live.limits;
    snapshot
}
