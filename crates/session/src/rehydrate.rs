use rustic_viewer_core::{
    determine_directory, get_sorted_image_files, ComparisonTabSeed, DirectoryLister,
    InvariantViolation, SingleTab, SingleTabSeed, TabId, TabLimits, TabState,
};
use tracing::warn;

use crate::schema::{
    PersistedComparisonTab, PersistedSession, ReducedSingleTab, SESSION_FORMAT_VERSION,
};

impl ReducedSingleTab {
    /// Keeps only the path of the image the tab shows.
    /// 僅保留標籤目前顯示的影像路徑。
    pub fn from_tab(tab: &SingleTab) -> Self {
        let raw_path = match (tab.directory(), tab.current_image()) {
            (Some(_), Some(path)) => path.to_string(),
            _ => String::new(),
        };
        Self {
            parent_id: tab.parent_id().cloned(),
            raw_path,
            zoom: tab.zoom(),
            pan_offset: tab.pan_offset(),
        }
    }
}

/// Reduces a live state to its persisted form. Returns `None` for a state without tabs.
/// 將狀態縮減為可儲存的形式；沒有標籤時回傳 `None`。
pub fn reduce(state: &TabState) -> Option<PersistedSession> {
    let active_tab_id = state.active_tab_id()?.clone();
    let single_tabs = state
        .single_tabs()
        .map(|tab| (tab.id().clone(), ReducedSingleTab::from_tab(tab)))
        .collect();
    let comparison_tabs = state
        .comparison_tabs()
        .map(|tab| {
            (
                tab.id().clone(),
                PersistedComparisonTab {
                    id: tab.id().clone(),
                    children: tab.children().to_vec(),
                    active_slot_index: tab.active_slot_index(),
                },
            )
        })
        .collect();

    Some(PersistedSession {
        version: SESSION_FORMAT_VERSION,
        tab_order: state.tab_order().to_vec(),
        active_tab_id,
        comparison_tabs,
        single_tabs,
    })
}

/// Rebuilds a live state, re-listing every tab's directory.
/// 重新列舉每個標籤的目錄以重建狀態。
///
/// A tab whose directory cannot be listed keeps its directory with an empty image list.
/// Structural problems in the payload are repaired and returned as violations.
pub async fn rehydrate(
    lister: &dyn DirectoryLister,
    session: PersistedSession,
    limits: TabLimits,
) -> (TabState, Vec<InvariantViolation>) {
    let mut singles = Vec::with_capacity(session.single_tabs.len());
    for (id, reduced) in session.single_tabs {
        singles.push(rehydrate_single(lister, id, reduced).await);
    }
    let comparisons = session
        .comparison_tabs
        .into_iter()
        .map(|(id, tab)| ComparisonTabSeed {
            id,
            children: tab.children,
            active_slot_index: tab.active_slot_index,
        })
        .collect();

    TabState::restore(
        limits,
        singles,
        comparisons,
        session.tab_order,
        Some(session.active_tab_id),
    )
}

async fn rehydrate_single(
    lister: &dyn DirectoryLister,
    id: TabId,
    reduced: ReducedSingleTab,
) -> SingleTabSeed {
    let directory = if reduced.raw_path.is_empty() {
        None
    } else {
        determine_directory(&reduced.raw_path).map(str::to_string)
    };

    let (image_list, current_index) = match directory.as_deref() {
        Some(dir) => match get_sorted_image_files(lister, dir).await {
            Ok(images) => {
                let index = images
                    .iter()
                    .position(|path| *path == reduced.raw_path)
                    .unwrap_or(0);
                (images, index)
            }
            Err(err) => {
                warn!(tab = %id, directory = dir, error = %err, "failed to rehydrate tab");
                (Vec::new(), 0)
            }
        },
        None => (Vec::new(), 0),
    };

    SingleTabSeed {
        id,
        parent_id: reduced.parent_id,
        directory,
        image_list,
        current_index,
        zoom: reduced.zoom,
        pan_offset: reduced.pan_offset,
    }
}
