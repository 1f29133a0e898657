use crate::state::TabState;
use crate::tab::{SingleTab, Tab, TabId};

/// 垂直標籤列中的一列。 / One row of the vertical tab list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabRow {
    Comparison {
        id: TabId,
        label: String,
        active: bool,
    },
    Single {
        id: TabId,
        label: String,
        active: bool,
        /// 所屬比較標籤與槽位。 / Owning comparison and slot for child rows.
        parent: Option<(TabId, usize)>,
    },
}

impl TabRow {
    pub fn id(&self) -> &TabId {
        match self {
            TabRow::Comparison { id, .. } | TabRow::Single { id, .. } => id,
        }
    }
}

/// 標籤標題。 / Label for a tab: "Compare (n)", the image file name or "New Tab".
pub fn tab_label(state: &TabState, id: &TabId) -> Option<String> {
    state.tab(id).map(|tab| tab.label())
}

/// 目前檢視中的單一標籤：啟動的單一標籤或比較標籤的作用中子標籤。 /
/// The single tab currently driving the viewer: the active single tab, or the active
/// comparison's active child.
pub fn active_single_tab(state: &TabState) -> Option<&SingleTab> {
    match state.active_tab()? {
        Tab::Single(tab) => Some(tab),
        Tab::Comparison(comparison) => state.single_tab(comparison.active_child()?),
    }
}

/// 將比較標籤展開成垂直列表。 / Flattens the tab order, listing each comparison's children under it.
pub fn vertical_tabs(state: &TabState) -> Vec<TabRow> {
    let active = state.active_tab_id();
    let mut rows = Vec::with_capacity(state.single_tabs.len() + state.comparison_tabs.len());
    for tab in state.top_level_tabs() {
        match tab {
            Tab::Single(single) => rows.push(TabRow::Single {
                id: single.id.clone(),
                label: single.label(),
                active: active == Some(&single.id),
                parent: None,
            }),
            Tab::Comparison(comparison) => {
                let comparison_active = active == Some(&comparison.id);
                rows.push(TabRow::Comparison {
                    id: comparison.id.clone(),
                    label: comparison.label(),
                    active: comparison_active,
                });
                for (slot, child) in comparison.children.iter().enumerate() {
                    if let Some(single) = state.single_tab(child) {
                        rows.push(TabRow::Single {
                            id: single.id.clone(),
                            label: single.label(),
                            active: comparison_active && slot == comparison.active_slot_index,
                            parent: Some((comparison.id.clone(), slot)),
                        });
                    }
                }
            }
        }
    }
    rows
}
