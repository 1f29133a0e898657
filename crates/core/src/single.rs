use tracing::debug;

use crate::state::TabState;
use crate::tab::{clamp_index, PanOffset, SingleTab, SingleTabPatch, TabId};

impl TabState {
    /// 新增單一標籤並設為啟動標籤。 / Appends a new single tab and makes it active.
    pub fn add_single_tab(
        &mut self,
        image_list: Vec<String>,
        current_index: usize,
        directory: Option<String>,
    ) -> TabId {
        let id = TabId::generate();
        let tab = SingleTab::new(id.clone(), directory, image_list, current_index);
        self.single_tabs.insert(id.clone(), tab);
        self.tab_order.push(id.clone());
        self.active_tab_id = Some(id.clone());
        debug!(tab = %id, "added single tab");
        id
    }

    /// 新增空白標籤。 / Appends an empty "New Tab".
    pub fn add_empty_tab(&mut self) -> TabId {
        self.add_single_tab(Vec::new(), 0, None)
    }

    /// 複製單一標籤的目錄與位置到新標籤。 / Opens a copy of a single tab's directory and position.
    pub fn clone_single_tab(&mut self, id: &TabId) -> Option<TabId> {
        let source = self.single_tabs.get(id)?;
        let directory = source.directory.clone();
        let image_list = source.image_list.clone();
        let current_index = source.current_index;
        Some(self.add_single_tab(image_list, current_index, directory))
    }

    /// 移除獨立的單一標籤。 / Removes an independent single tab from the tab order.
    ///
    /// When the removed tab was active the neighbour at the same position becomes active,
    /// and an empty tab is created if nothing is left.
    pub fn remove_single_tab(&mut self, id: &TabId) -> bool {
        match self.single_tabs.get(id) {
            Some(tab) if tab.is_independent() => {}
            _ => return false,
        }
        let position = match self.position_of(id) {
            Some(position) => position,
            None => return false,
        };
        self.tab_order.remove(position);
        self.single_tabs.remove(id);

        let was_active = self.active_tab_id.as_ref() == Some(id);
        if was_active || self.tab_order.is_empty() {
            self.activate_near(position);
        }
        debug!(tab = %id, "removed single tab");
        true
    }

    /// 設定目前影像索引。 / Moves a single tab to another image of its listing.
    pub fn set_current_index(&mut self, id: &TabId, index: usize) -> bool {
        let tab = match self.single_tabs.get_mut(id) {
            Some(tab) => tab,
            None => return false,
        };
        let next = clamp_index(index, tab.image_list.len());
        if tab.current_index == next {
            return false;
        }
        tab.current_index = next;
        true
    }

    /// 設定縮放；超出範圍時夾限。 / Sets the zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, id: &TabId, zoom: f64) -> bool {
        if !zoom.is_finite() {
            debug!(tab = %id, zoom, "ignoring non-finite zoom");
            return false;
        }
        let zoom = self.limits.clamp_zoom(zoom);
        match self.single_tabs.get_mut(id) {
            Some(tab) if tab.zoom != zoom => {
                tab.zoom = zoom;
                true
            }
            _ => false,
        }
    }

    pub fn set_pan_offset(&mut self, id: &TabId, offset: PanOffset) -> bool {
        if !offset.is_finite() {
            debug!(tab = %id, "ignoring non-finite pan offset");
            return false;
        }
        match self.single_tabs.get_mut(id) {
            Some(tab) if tab.pan_offset != offset => {
                tab.pan_offset = offset;
                true
            }
            _ => false,
        }
    }

    /// 重設縮放與平移。 / Restores zoom 1 and a zero pan offset.
    pub fn reset_zoom_and_pan(&mut self, id: &TabId) -> bool {
        match self.single_tabs.get_mut(id) {
            Some(tab) if tab.zoom != 1.0 || tab.pan_offset != PanOffset::ZERO => {
                tab.zoom = 1.0;
                tab.pan_offset = PanOffset::ZERO;
                true
            }
            _ => false,
        }
    }

    /// 要求重新讀取影像。 / Signals that the tab's image must be re-read.
    pub fn bump_reload_trigger(&mut self, id: &TabId) -> bool {
        match self.single_tabs.get_mut(id) {
            Some(tab) => {
                tab.reload_trigger = tab.reload_trigger.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    /// 套用部分更新；索引依新清單夾限。 / Applies a partial update, clamping the index to the new list.
    pub fn update_single_tab(&mut self, id: &TabId, patch: SingleTabPatch) -> bool {
        let tab = match self.single_tabs.get_mut(id) {
            Some(tab) => tab,
            None => return false,
        };
        let before = tab.clone();
        if let Some(directory) = patch.directory {
            tab.directory = directory;
        }
        if let Some(image_list) = patch.image_list {
            tab.image_list = image_list;
        }
        let index = patch.current_index.unwrap_or(tab.current_index);
        tab.current_index = clamp_index(index, tab.image_list.len());
        *tab != before
    }

    /// 切換啟動標籤。 / Activates a top-level tab.
    pub fn set_active_tab(&mut self, id: &TabId) -> bool {
        if self.active_tab_id.as_ref() == Some(id) || self.position_of(id).is_none() {
            return false;
        }
        self.active_tab_id = Some(id.clone());
        true
    }
}
