use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::paths::file_name;

/// 預設最小縮放。 / Default lower zoom bound.
pub const MIN_ZOOM: f64 = 0.1;
/// 預設最大縮放。 / Default upper zoom bound.
pub const MAX_ZOOM: f64 = 10.0;
/// 比較標籤最多可容納的子標籤數。 / Maximum number of children a comparison tab may hold.
pub const MAX_COMPARISON_CHILDREN: usize = 4;
/// 比較標籤至少需要的子標籤數。 / Minimum number of children needed to form a comparison tab.
pub const MIN_COMPARISON_CHILDREN: usize = 2;

/// 標籤識別碼。 / Opaque, unique identifier for a tab.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// 產生新的隨機識別碼。 / Generates a fresh random identifier.
    pub fn generate() -> Self {
        TabId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        TabId(value.to_string())
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        TabId(value)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 平移量。 / Pan offset in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    pub const ZERO: PanOffset = PanOffset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 標籤引擎使用的限制。 / Limits enforced by the tab engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_comparison_children: usize,
}

impl Default for TabLimits {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            max_comparison_children: MAX_COMPARISON_CHILDREN,
        }
    }
}

impl TabLimits {
    /// 將縮放值限制在範圍內。 / Clamps a zoom value into `[min_zoom, max_zoom]`.
    ///
    /// Inverted or non-finite bounds fall back to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let (min, max) = if self.has_valid_zoom_range() {
            (self.min_zoom, self.max_zoom)
        } else {
            (MIN_ZOOM, MAX_ZOOM)
        };
        zoom.max(min).min(max)
    }

    pub fn has_valid_zoom_range(&self) -> bool {
        self.min_zoom.is_finite() && self.max_zoom.is_finite() && self.min_zoom <= self.max_zoom
    }
}

/// 單一影像標籤。 / A tab viewing one image within a directory listing.
///
/// `parent_id` 為 `Some` 時代表此標籤是比較標籤的子標籤。 /
/// A `Some` parent marks the tab as a child owned by a comparison tab.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTab {
    pub(crate) id: TabId,
    pub(crate) parent_id: Option<TabId>,
    pub(crate) directory: Option<String>,
    pub(crate) image_list: Vec<String>,
    pub(crate) current_index: usize,
    pub(crate) zoom: f64,
    pub(crate) pan_offset: PanOffset,
    pub(crate) reload_trigger: u64,
}

impl SingleTab {
    pub(crate) fn new(
        id: TabId,
        directory: Option<String>,
        image_list: Vec<String>,
        current_index: usize,
    ) -> Self {
        let current_index = clamp_index(current_index, image_list.len());
        Self {
            id,
            parent_id: None,
            directory,
            image_list,
            current_index,
            zoom: 1.0,
            pan_offset: PanOffset::ZERO,
            reload_trigger: 0,
        }
    }

    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&TabId> {
        self.parent_id.as_ref()
    }

    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    pub fn image_list(&self) -> &[String] {
        &self.image_list
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan_offset(&self) -> PanOffset {
        self.pan_offset
    }

    /// 重新載入計數；每次變動都代表需重新讀取影像。 / Token that changes whenever the image must be re-read.
    pub fn reload_trigger(&self) -> u64 {
        self.reload_trigger
    }

    /// 目前顯示的影像路徑。 / Path of the image currently shown, if any.
    pub fn current_image(&self) -> Option<&str> {
        self.image_list.get(self.current_index).map(String::as_str)
    }

    /// 是否為比較標籤的子標籤。 / Whether the tab is owned by a comparison tab.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    /// 是否為獨立標籤。 / Whether the tab stands on its own in the tab order.
    pub fn is_independent(&self) -> bool {
        self.parent_id.is_none()
    }

    /// 標籤標題。 / Display label: the current image's file name or "New Tab".
    pub fn label(&self) -> String {
        match self.current_image() {
            Some(path) if !path.is_empty() => file_name(path).to_string(),
            _ => "New Tab".to_string(),
        }
    }
}

/// 比較標籤：並排顯示二至四個子標籤。 / Groups two to four single tabs shown side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTab {
    pub(crate) id: TabId,
    pub(crate) children: Vec<TabId>,
    pub(crate) active_slot_index: usize,
}

impl ComparisonTab {
    pub fn id(&self) -> &TabId {
        &self.id
    }

    /// 依槽位排序的子標籤。 / Child ids in slot order.
    pub fn children(&self) -> &[TabId] {
        &self.children
    }

    pub fn active_slot_index(&self) -> usize {
        self.active_slot_index
    }

    pub fn active_child(&self) -> Option<&TabId> {
        self.children.get(self.active_slot_index)
    }

    pub fn slot_of(&self, child: &TabId) -> Option<usize> {
        self.children.iter().position(|candidate| candidate == child)
    }

    pub fn label(&self) -> String {
        format!("Compare ({})", self.children.len())
    }
}

/// 對任一種標籤的唯讀參照。 / Borrowed view over either kind of tab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab<'a> {
    Single(&'a SingleTab),
    Comparison(&'a ComparisonTab),
}

impl<'a> Tab<'a> {
    pub fn id(&self) -> &'a TabId {
        match self {
            Tab::Single(tab) => &tab.id,
            Tab::Comparison(tab) => &tab.id,
        }
    }

    pub fn is_single_tab(&self) -> bool {
        matches!(self, Tab::Single(_))
    }

    pub fn is_comparison_tab(&self) -> bool {
        matches!(self, Tab::Comparison(_))
    }

    pub fn is_child_tab(&self) -> bool {
        matches!(self, Tab::Single(tab) if tab.is_child())
    }

    /// 可出現在標籤順序中的標籤。 / True for tabs that may appear in the tab order.
    pub fn is_independent_tab(&self) -> bool {
        match self {
            Tab::Single(tab) => tab.is_independent(),
            Tab::Comparison(_) => true,
        }
    }

    pub fn as_single(&self) -> Option<&'a SingleTab> {
        match self {
            Tab::Single(tab) => Some(tab),
            Tab::Comparison(_) => None,
        }
    }

    pub fn as_comparison(&self) -> Option<&'a ComparisonTab> {
        match self {
            Tab::Comparison(tab) => Some(tab),
            Tab::Single(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Tab::Single(tab) => tab.label(),
            Tab::Comparison(tab) => tab.label(),
        }
    }
}

/// 單一標籤的部分更新。 / Partial update applied to a single tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingleTabPatch {
    pub directory: Option<Option<String>>,
    pub image_list: Option<Vec<String>>,
    pub current_index: Option<usize>,
}

impl SingleTabPatch {
    pub fn is_empty(&self) -> bool {
        self.directory.is_none() && self.image_list.is_none() && self.current_index.is_none()
    }
}

pub(crate) fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = TabId::generate();
        let b = TabId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn clamp_zoom_tolerates_broken_bounds() {
        let inverted = TabLimits {
            min_zoom: 5.0,
            max_zoom: 2.0,
            ..TabLimits::default()
        };
        assert_eq!(inverted.clamp_zoom(3.0), 3.0);
        assert_eq!(inverted.clamp_zoom(50.0), MAX_ZOOM);

        let nan = TabLimits {
            min_zoom: f64::NAN,
            ..TabLimits::default()
        };
        assert_eq!(nan.clamp_zoom(0.01), MIN_ZOOM);
        assert_eq!(TabLimits::default().clamp_zoom(0.5), 0.5);
    }

    #[test]
    fn single_tab_clamps_initial_index() {
        let tab = SingleTab::new(
            TabId::from("t"),
            Some("/d".into()),
            vec!["/d/a.png".into(), "/d/b.png".into()],
            7,
        );
        assert_eq!(tab.current_index(), 1);
        assert_eq!(tab.current_image(), Some("/d/b.png"));
        assert_eq!(tab.label(), "b.png");
    }

    #[test]
    fn empty_tab_is_labelled_new_tab() {
        let tab = SingleTab::new(TabId::from("t"), None, Vec::new(), 3);
        assert_eq!(tab.current_index(), 0);
        assert_eq!(tab.label(), "New Tab");
        assert!(Tab::Single(&tab).is_independent_tab());
        assert!(!Tab::Single(&tab).is_child_tab());
    }

    #[test]
    fn comparison_label_counts_children() {
        let tab = ComparisonTab {
            id: TabId::from("c"),
            children: vec![TabId::from("a"), TabId::from("b"), TabId::from("x")],
            active_slot_index: 0,
        };
        assert_eq!(Tab::Comparison(&tab).label(), "Compare (3)");
        assert_eq!(tab.slot_of(&TabId::from("x")), Some(2));
    }
}
