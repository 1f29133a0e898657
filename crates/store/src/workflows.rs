use rustic_viewer_core::{
    active_single_tab, determine_directory, get_sorted_image_files, SingleTabPatch, Tab, TabId,
};
use tracing::{debug, info};

use crate::store::{StoreError, TabStore};

impl TabStore {
    /// 開啟影像：列出所在目錄並顯示於適當的標籤。 /
    /// Opens an image, listing its directory and showing it in the right tab.
    ///
    /// Without an active tab, or when `in_new_tab` is set, a new single tab is added.
    /// Otherwise the active single tab, or the active child of the active comparison,
    /// is retargeted. Returns the id of the tab now showing the image.
    pub async fn open_image(&mut self, path: &str, in_new_tab: bool) -> Result<TabId, StoreError> {
        let directory = determine_directory(path).unwrap_or_default().to_string();
        let images = get_sorted_image_files(self.lister(), &directory).await?;
        let index = images.iter().position(|image| image == path).unwrap_or(0);
        debug!(path, directory = %directory, index, "opening image");

        let target = if in_new_tab {
            None
        } else {
            match self.state().active_tab() {
                Some(Tab::Single(tab)) => Some(tab.id().clone()),
                Some(Tab::Comparison(tab)) => tab.active_child().cloned(),
                None => None,
            }
        };

        match target {
            Some(id) => {
                let patch = SingleTabPatch {
                    directory: Some(Some(directory)),
                    image_list: Some(images),
                    current_index: Some(index),
                };
                self.update_single_tab(&id, patch);
                Ok(id)
            }
            None => Ok(self.add_single_tab(images, index, Some(directory))),
        }
    }

    /// 重新載入目前影像。 / Asks the active image to be reloaded from disk.
    pub fn reload_active_image(&mut self) -> bool {
        let id = match active_single_tab(self.state()) {
            Some(tab) => tab.id().clone(),
            None => return false,
        };
        self.bump_reload_trigger(&id)
    }

    /// 重新列出標籤的目錄，盡量保留目前影像。 /
    /// Re-lists a tab's directory, keeping the current image when it still exists.
    pub async fn refresh_image_list(&mut self, id: &TabId) -> Result<bool, StoreError> {
        let (directory, current) = match self.state().single_tab(id) {
            Some(tab) => match tab.directory() {
                Some(directory) => (
                    directory.to_string(),
                    tab.current_image().map(str::to_string),
                ),
                None => return Ok(false),
            },
            None => return Err(StoreError::UnknownTab(id.clone())),
        };

        let images = get_sorted_image_files(self.lister(), &directory).await?;
        let index = match current
            .as_deref()
            .and_then(|current| images.iter().position(|image| image == current))
        {
            Some(index) => index,
            None => {
                info!(tab = %id, directory = %directory, "current image disappeared");
                self.state().single_tab(id).map_or(0, |tab| tab.current_index())
            }
        };
        Ok(self.update_single_tab(
            id,
            SingleTabPatch {
                directory: None,
                image_list: Some(images),
                current_index: Some(index),
            },
        ))
    }
}
