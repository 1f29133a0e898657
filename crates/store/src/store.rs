use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustic_viewer_core::{
    DetachPlacement, DirectoryLister, History, PanOffset, PathError, SingleTabPatch, TabId,
    TabLimits, TabState,
};
use rustic_viewer_session::{SaveScheduler, SessionPersistence};
use rustic_viewer_settings::ViewerPreferences;
use thiserror::Error;
use tracing::{debug, info};

/// 標籤存放區錯誤。 / Errors surfaced by store workflows.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Listing(#[from] PathError),
    #[error("unknown tab {0}")]
    UnknownTab(TabId),
}

/// 訂閱識別碼。 / Handle returned by [`TabStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&Arc<TabState>) + Send + Sync>;

/// 對外的標籤狀態容器。 / The externally observed tab state container.
///
/// 每次變更都產生新的不可變快照，記錄復原步驟，通知訂閱者並排程寫入。 /
/// Each applied mutation publishes a new immutable snapshot, records an undo step,
/// notifies subscribers and schedules a debounced session write.
pub struct TabStore {
    state: Arc<TabState>,
    history: History,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    lister: Arc<dyn DirectoryLister>,
    persistence: Option<SessionPersistence>,
    writer: Option<SaveScheduler>,
    persist_delay: Duration,
}

impl fmt::Debug for TabStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStore")
            .field("tabs", &self.state.len())
            .field("undo_depth", &self.history.undo_depth())
            .field("listeners", &self.listeners.len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

impl TabStore {
    /// 建立不具持久化的存放區。 / Creates an in-memory store configured from preferences.
    pub fn new(lister: Arc<dyn DirectoryLister>, preferences: &ViewerPreferences) -> Self {
        let mut preferences = preferences.clone();
        preferences.sanitize();
        Self {
            state: Arc::new(TabState::new(preferences.tab_limits())),
            history: History::new(preferences.tabs.history_limit),
            listeners: Vec::new(),
            next_subscription: 0,
            lister,
            persistence: None,
            writer: None,
            persist_delay: preferences.persist_delay(),
        }
    }

    /// 啟用工作階段持久化；需在 Tokio 執行環境中呼叫。 /
    /// Enables session persistence. Must be called inside a Tokio runtime.
    pub fn with_persistence(mut self, persistence: SessionPersistence) -> Self {
        let persistence = persistence.with_limits(self.state.limits());
        self.writer = Some(SaveScheduler::spawn(persistence.clone(), self.persist_delay));
        self.persistence = Some(persistence);
        self
    }

    /// 目前的狀態快照。 / Current immutable snapshot.
    pub fn snapshot(&self) -> Arc<TabState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &TabState {
        &self.state
    }

    pub fn limits(&self) -> TabLimits {
        self.state.limits()
    }

    pub(crate) fn lister(&self) -> &dyn DirectoryLister {
        self.lister.as_ref()
    }

    /// 註冊狀態變更監聽器。 / Registers a listener called with every new snapshot.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<TabState>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(candidate, _)| *candidate != id);
        before != self.listeners.len()
    }

    /// 還原上次的工作階段；沒有可用紀錄時保持空白。 /
    /// Restores the persisted session. Returns `false` and keeps the current state when
    /// there is nothing usable to restore.
    pub async fn restore_session(&mut self) -> bool {
        let persistence = match &self.persistence {
            Some(persistence) => persistence,
            None => return false,
        };
        match persistence.load_state().await {
            Some(state) => {
                info!(tabs = state.len(), "restored tab session");
                self.history.clear();
                self.state = Arc::new(state);
                self.notify();
                true
            }
            None => false,
        }
    }

    /// 立即寫入待處理的工作階段。 / Writes any pending session state immediately.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// 關閉前強制寫入最終狀態。 / Forces a final session write and stops the writer.
    pub async fn shutdown(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown(Some(self.snapshot())).await;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.state) {
            Some(previous) => {
                self.commit(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.state) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// 以副本套用變更；結果不同時才發布。 / Applies a mutation to a copy and publishes it when it changed anything.
    pub(crate) fn dispatch<R>(&mut self, mutation: impl FnOnce(&mut TabState) -> R) -> R {
        let mut next = TabState::clone(&self.state);
        let result = mutation(&mut next);
        if next != *self.state {
            self.history.record(&self.state, &next);
            self.commit(next);
        }
        result
    }

    fn commit(&mut self, next: TabState) {
        self.state = Arc::new(next);
        self.notify();
        if let Some(writer) = &self.writer {
            writer.schedule(self.snapshot());
        }
    }

    fn notify(&self) {
        debug!(listeners = self.listeners.len(), "publishing tab state");
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }

    pub fn add_single_tab(
        &mut self,
        image_list: Vec<String>,
        current_index: usize,
        directory: Option<String>,
    ) -> TabId {
        self.dispatch(|state| state.add_single_tab(image_list, current_index, directory))
    }

    /// 開啟空白標籤。 / Opens an empty "New Tab".
    pub fn new_tab(&mut self) -> TabId {
        self.dispatch(TabState::add_empty_tab)
    }

    pub fn clone_single_tab(&mut self, id: &TabId) -> Option<TabId> {
        self.dispatch(|state| state.clone_single_tab(id))
    }

    pub fn remove_single_tab(&mut self, id: &TabId) -> bool {
        self.dispatch(|state| state.remove_single_tab(id))
    }

    pub fn set_current_index(&mut self, id: &TabId, index: usize) -> bool {
        self.dispatch(|state| state.set_current_index(id, index))
    }

    pub fn update_single_tab(&mut self, id: &TabId, patch: SingleTabPatch) -> bool {
        self.dispatch(|state| state.update_single_tab(id, patch))
    }

    pub fn set_zoom(&mut self, id: &TabId, zoom: f64) -> bool {
        self.dispatch(|state| state.set_zoom(id, zoom))
    }

    pub fn set_pan_offset(&mut self, id: &TabId, offset: PanOffset) -> bool {
        self.dispatch(|state| state.set_pan_offset(id, offset))
    }

    pub fn reset_zoom_and_pan(&mut self, id: &TabId) -> bool {
        self.dispatch(|state| state.reset_zoom_and_pan(id))
    }

    pub fn bump_reload_trigger(&mut self, id: &TabId) -> bool {
        self.dispatch(|state| state.bump_reload_trigger(id))
    }

    pub fn set_active_tab(&mut self, id: &TabId) -> bool {
        self.dispatch(|state| state.set_active_tab(id))
    }

    pub fn set_active_slot_index(&mut self, comparison_id: &TabId, slot: usize) -> bool {
        self.dispatch(|state| state.set_active_slot_index(comparison_id, slot))
    }

    pub fn add_comparison_tab(
        &mut self,
        child_ids: &[TabId],
        active_slot_index: usize,
    ) -> Option<TabId> {
        self.dispatch(|state| state.add_comparison_tab(child_ids, active_slot_index))
    }

    pub fn create_comparison_from_single_tabs(&mut self, ids: &[TabId]) -> Option<TabId> {
        self.dispatch(|state| state.create_comparison_from_single_tabs(ids))
    }

    pub fn reorder_tab(&mut self, from: usize, to: usize) -> bool {
        self.dispatch(|state| state.reorder_tab(from, to))
    }

    pub fn reorder_comparison_children(
        &mut self,
        comparison_id: &TabId,
        from: usize,
        to: usize,
    ) -> bool {
        self.dispatch(|state| state.reorder_comparison_children(comparison_id, from, to))
    }

    pub fn move_child_up(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        self.dispatch(|state| state.move_child_up(comparison_id, child_id))
    }

    pub fn move_child_down(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        self.dispatch(|state| state.move_child_down(comparison_id, child_id))
    }

    pub fn detach_child_to_top_level(
        &mut self,
        comparison_id: &TabId,
        child_id: &TabId,
        placement: DetachPlacement,
    ) -> bool {
        self.dispatch(|state| state.detach_child_to_top_level(comparison_id, child_id, placement))
    }

    pub fn detach_slot_to_top_level(
        &mut self,
        comparison_id: &TabId,
        slot: usize,
        placement: DetachPlacement,
    ) -> Option<TabId> {
        self.dispatch(|state| state.detach_slot_to_top_level(comparison_id, slot, placement))
    }

    pub fn remove_child_from_comparison(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        self.dispatch(|state| state.remove_child_from_comparison(comparison_id, child_id))
    }

    pub fn remove_slot(&mut self, comparison_id: &TabId, slot: usize) -> Option<TabId> {
        self.dispatch(|state| state.remove_slot(comparison_id, slot))
    }

    pub fn detach_all_children(&mut self, comparison_id: &TabId) -> bool {
        self.dispatch(|state| state.detach_all_children(comparison_id))
    }

    pub fn close_tab(&mut self, id: &TabId) -> bool {
        self.dispatch(|state| state.close_tab(id))
    }

    pub fn close_other_tabs(&mut self, keep: &TabId) -> bool {
        self.dispatch(|state| state.close_other_tabs(keep))
    }
}
