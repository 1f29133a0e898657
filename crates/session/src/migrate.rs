use std::collections::BTreeMap;

use rustic_viewer_core::{get_sorted_image_files, DirectoryLister};
use tracing::{debug, warn};

use crate::schema::{PersistedSession, PersistedSessionV1, ReducedSingleTab, SESSION_FORMAT_VERSION};

/// Upgrades a legacy session by resolving each tab's directory and index to a path.
/// 將舊版工作階段的目錄與索引轉換為影像路徑。
///
/// Resolution is best-effort: an unreadable directory or stale index leaves that tab
/// with an empty path and never fails the migration as a whole.
pub async fn migrate_v1_to_v2(
    lister: &dyn DirectoryLister,
    legacy: PersistedSessionV1,
) -> PersistedSession {
    let mut single_tabs = BTreeMap::new();

    for (id, tab) in legacy.single_tabs {
        let mut raw_path = String::new();
        if let Some(directory) = tab.directory.as_deref().filter(|dir| !dir.is_empty()) {
            match get_sorted_image_files(lister, directory).await {
                Ok(images) => {
                    let resolved = usize::try_from(tab.current_index)
                        .ok()
                        .and_then(|index| images.get(index));
                    match resolved {
                        Some(path) => raw_path = path.clone(),
                        None => debug!(
                            tab = %id,
                            index = tab.current_index,
                            "legacy index outside directory listing"
                        ),
                    }
                }
                Err(err) => {
                    warn!(
                        tab = %id,
                        directory,
                        error = %err,
                        "failed to migrate tab: could not read directory"
                    );
                }
            }
        }

        single_tabs.insert(
            id,
            ReducedSingleTab {
                parent_id: tab.parent_id,
                raw_path,
                zoom: tab.zoom,
                pan_offset: tab.pan_offset,
            },
        );
    }

    PersistedSession {
        version: SESSION_FORMAT_VERSION,
        tab_order: legacy.tab_order,
        active_tab_id: legacy.active_tab_id,
        comparison_tabs: legacy.comparison_tabs,
        single_tabs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LegacySingleTab;
    use rustic_viewer_core::{InMemoryLister, PanOffset, TabId};

    fn legacy_tab(directory: Option<&str>, current_index: i64) -> LegacySingleTab {
        LegacySingleTab {
            parent_id: None,
            directory: directory.map(str::to_string),
            current_index,
            zoom: 2.0,
            pan_offset: PanOffset::new(1.0, 1.0),
        }
    }

    fn legacy_session(tabs: Vec<(&str, LegacySingleTab)>) -> PersistedSessionV1 {
        PersistedSessionV1 {
            version: 1,
            tab_order: tabs.iter().map(|(id, _)| TabId::from(*id)).collect(),
            active_tab_id: TabId::from(tabs[0].0),
            comparison_tabs: BTreeMap::new(),
            single_tabs: tabs
                .into_iter()
                .map(|(id, tab)| (TabId::from(id), tab))
                .collect(),
        }
    }

    #[tokio::test]
    async fn resolves_index_against_sorted_listing() {
        let lister = InMemoryLister::new().with_files("/pics", ["b.png", "a.png", "c.png"]);
        let legacy = legacy_session(vec![("t1", legacy_tab(Some("/pics"), 1))]);

        let migrated = migrate_v1_to_v2(&lister, legacy).await;
        let tab = &migrated.single_tabs[&TabId::from("t1")];
        assert_eq!(migrated.version, 2);
        assert_eq!(tab.raw_path, "/pics/b.png");
        assert_eq!(tab.zoom, 2.0);
        assert_eq!(tab.pan_offset, PanOffset::new(1.0, 1.0));
    }

    #[tokio::test]
    async fn unreadable_directory_yields_empty_path_for_that_tab_only() {
        let lister = InMemoryLister::new()
            .with_files("/ok", ["x.png"])
            .with_unreadable("/gone");
        let legacy = legacy_session(vec![
            ("t1", legacy_tab(Some("/gone"), 0)),
            ("t2", legacy_tab(Some("/ok"), 0)),
            ("t3", legacy_tab(None, 0)),
            ("t4", legacy_tab(Some("/ok"), -1)),
            ("t5", legacy_tab(Some("/ok"), 3)),
        ]);

        let migrated = migrate_v1_to_v2(&lister, legacy).await;
        let path = |id: &str| migrated.single_tabs[&TabId::from(id)].raw_path.clone();
        assert_eq!(path("t1"), "");
        assert_eq!(path("t2"), "/ok/x.png");
        assert_eq!(path("t3"), "");
        assert_eq!(path("t4"), "");
        assert_eq!(path("t5"), "");
        assert_eq!(migrated.tab_order.len(), 5);
    }
}
