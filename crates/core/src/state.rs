use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::tab::{
    clamp_index, ComparisonTab, PanOffset, SingleTab, Tab, TabId, TabLimits,
    MIN_COMPARISON_CHILDREN,
};

/// 結構不一致的描述。 / A structural inconsistency found in a [`TabState`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("id {0} is registered as both a single and a comparison tab")]
    DuplicateId(TabId),
    #[error("tab order lists {0} more than once")]
    DuplicateInTabOrder(TabId),
    #[error("tab order references unknown tab {0}")]
    UnknownTabInOrder(TabId),
    #[error("child tab {0} appears in the tab order")]
    ChildInTabOrder(TabId),
    #[error("top-level tab {0} is missing from the tab order")]
    MissingFromTabOrder(TabId),
    #[error("comparison {id} holds {count} children")]
    ComparisonCapacity { id: TabId, count: usize },
    #[error("comparison {comparison} lists unknown child {child}")]
    MissingChild { comparison: TabId, child: TabId },
    #[error("child {child} of comparison {comparison} points at another parent")]
    ParentMismatch { comparison: TabId, child: TabId },
    #[error("tab {child} claims parent {parent} which does not list it")]
    OrphanedChild { child: TabId, parent: TabId },
    #[error("comparison {id} has active slot {slot} out of range")]
    ActiveSlotOutOfRange { id: TabId, slot: usize },
    #[error("tab {id} has current index {index} outside its image list")]
    CurrentIndexOutOfRange { id: TabId, index: usize },
    #[error("tab {id} has zoom {zoom} outside the allowed range")]
    ZoomOutOfRange { id: TabId, zoom: f64 },
    #[error("active tab {0} is not a top-level tab")]
    DanglingActiveTab(TabId),
    #[error("tab order is not empty but no tab is active")]
    MissingActiveTab,
}

/// 還原時使用的單一標籤資料。 / Raw single tab data used to rebuild a state.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTabSeed {
    pub id: TabId,
    pub parent_id: Option<TabId>,
    pub directory: Option<String>,
    pub image_list: Vec<String>,
    pub current_index: usize,
    pub zoom: f64,
    pub pan_offset: PanOffset,
}

/// 還原時使用的比較標籤資料。 / Raw comparison tab data used to rebuild a state.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTabSeed {
    pub id: TabId,
    pub children: Vec<TabId>,
    pub active_slot_index: usize,
}

/// 標籤系統的完整狀態。 / The whole tab model: registries, tab order and active tab.
///
/// 所有變更方法回傳 `bool` 或 `Option<TabId>`；前提不成立時不做任何事。 /
/// Every mutation reports whether it applied; failed preconditions leave the state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TabState {
    pub(crate) single_tabs: BTreeMap<TabId, SingleTab>,
    pub(crate) comparison_tabs: BTreeMap<TabId, ComparisonTab>,
    pub(crate) tab_order: Vec<TabId>,
    pub(crate) active_tab_id: Option<TabId>,
    pub(crate) limits: TabLimits,
}

impl Default for TabState {
    fn default() -> Self {
        Self::new(TabLimits::default())
    }
}

impl TabState {
    /// 建立空白狀態。 / Creates an empty state with the given limits.
    pub fn new(limits: TabLimits) -> Self {
        Self {
            single_tabs: BTreeMap::new(),
            comparison_tabs: BTreeMap::new(),
            tab_order: Vec::new(),
            active_tab_id: None,
            limits,
        }
    }

    /// 由持久化資料重建狀態並修復不一致處。 / Rebuilds a state from raw parts, repairing inconsistencies.
    ///
    /// Returns the repaired state along with every violation found in the raw input.
    pub fn restore(
        limits: TabLimits,
        singles: Vec<SingleTabSeed>,
        comparisons: Vec<ComparisonTabSeed>,
        tab_order: Vec<TabId>,
        active_tab_id: Option<TabId>,
    ) -> (Self, Vec<InvariantViolation>) {
        let mut state = Self::new(limits);
        for seed in singles {
            let mut tab = SingleTab::new(seed.id, seed.directory, seed.image_list, 0);
            tab.current_index = seed.current_index;
            tab.parent_id = seed.parent_id;
            tab.zoom = seed.zoom;
            tab.pan_offset = seed.pan_offset;
            state.single_tabs.insert(tab.id.clone(), tab);
        }
        for seed in comparisons {
            let comparison = ComparisonTab {
                id: seed.id,
                children: seed.children,
                active_slot_index: seed.active_slot_index,
            };
            state.comparison_tabs.insert(comparison.id.clone(), comparison);
        }
        state.tab_order = tab_order;
        state.active_tab_id = active_tab_id;

        let violations = state.validate();
        if !violations.is_empty() {
            state.repair();
        }
        (state, violations)
    }

    pub fn limits(&self) -> TabLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: TabLimits) {
        self.limits = limits;
    }

    pub fn single_tab(&self, id: &TabId) -> Option<&SingleTab> {
        self.single_tabs.get(id)
    }

    pub fn comparison_tab(&self, id: &TabId) -> Option<&ComparisonTab> {
        self.comparison_tabs.get(id)
    }

    /// 依識別碼查詢任一種標籤。 / Resolves an id to either kind of tab.
    pub fn tab(&self, id: &TabId) -> Option<Tab<'_>> {
        if let Some(tab) = self.single_tabs.get(id) {
            Some(Tab::Single(tab))
        } else {
            self.comparison_tabs.get(id).map(Tab::Comparison)
        }
    }

    pub fn single_tabs(&self) -> impl Iterator<Item = &SingleTab> {
        self.single_tabs.values()
    }

    pub fn comparison_tabs(&self) -> impl Iterator<Item = &ComparisonTab> {
        self.comparison_tabs.values()
    }

    pub fn tab_order(&self) -> &[TabId] {
        &self.tab_order
    }

    /// 依標籤順序列出頂層標籤。 / Top-level tabs in tab order.
    pub fn top_level_tabs(&self) -> impl Iterator<Item = Tab<'_>> {
        self.tab_order.iter().filter_map(|id| self.tab(id))
    }

    pub fn position_of(&self, id: &TabId) -> Option<usize> {
        self.tab_order.iter().position(|candidate| candidate == id)
    }

    pub fn active_tab_id(&self) -> Option<&TabId> {
        self.active_tab_id.as_ref()
    }

    pub fn active_tab(&self) -> Option<Tab<'_>> {
        self.active_tab_id.as_ref().and_then(|id| self.tab(id))
    }

    /// 比較標籤的子標籤（依槽位）。 / Children of a comparison tab in slot order.
    pub fn children_of(&self, comparison_id: &TabId) -> Vec<&SingleTab> {
        match self.comparison_tabs.get(comparison_id) {
            Some(comparison) => comparison
                .children
                .iter()
                .filter_map(|child| self.single_tabs.get(child))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tab_order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tab_order.len()
    }

    /// 檢查所有結構不變量。 / Checks every structural invariant, returning the violations found.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for id in self.single_tabs.keys() {
            if self.comparison_tabs.contains_key(id) {
                violations.push(InvariantViolation::DuplicateId(id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for id in &self.tab_order {
            if !seen.insert(id) {
                violations.push(InvariantViolation::DuplicateInTabOrder(id.clone()));
                continue;
            }
            match self.tab(id) {
                None => violations.push(InvariantViolation::UnknownTabInOrder(id.clone())),
                Some(Tab::Single(tab)) if tab.is_child() => {
                    violations.push(InvariantViolation::ChildInTabOrder(id.clone()))
                }
                Some(_) => {}
            }
        }

        for comparison in self.comparison_tabs.values() {
            let count = comparison.children.len();
            if !(MIN_COMPARISON_CHILDREN..=self.limits.max_comparison_children).contains(&count) {
                violations.push(InvariantViolation::ComparisonCapacity {
                    id: comparison.id.clone(),
                    count,
                });
            }
            for child in &comparison.children {
                match self.single_tabs.get(child) {
                    None => violations.push(InvariantViolation::MissingChild {
                        comparison: comparison.id.clone(),
                        child: child.clone(),
                    }),
                    Some(tab) if tab.parent_id.as_ref() != Some(&comparison.id) => {
                        violations.push(InvariantViolation::ParentMismatch {
                            comparison: comparison.id.clone(),
                            child: child.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
            if count > 0 && comparison.active_slot_index >= count {
                violations.push(InvariantViolation::ActiveSlotOutOfRange {
                    id: comparison.id.clone(),
                    slot: comparison.active_slot_index,
                });
            }
            if !seen.contains(&comparison.id) {
                violations.push(InvariantViolation::MissingFromTabOrder(comparison.id.clone()));
            }
        }

        for tab in self.single_tabs.values() {
            match &tab.parent_id {
                Some(parent) => {
                    let listed = self
                        .comparison_tabs
                        .get(parent)
                        .map_or(false, |comparison| comparison.children.contains(&tab.id));
                    if !listed {
                        violations.push(InvariantViolation::OrphanedChild {
                            child: tab.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
                None if !seen.contains(&tab.id) => {
                    violations.push(InvariantViolation::MissingFromTabOrder(tab.id.clone()));
                }
                None => {}
            }
            if clamp_index(tab.current_index, tab.image_list.len()) != tab.current_index {
                violations.push(InvariantViolation::CurrentIndexOutOfRange {
                    id: tab.id.clone(),
                    index: tab.current_index,
                });
            }
            if !(self.limits.min_zoom..=self.limits.max_zoom).contains(&tab.zoom) {
                violations.push(InvariantViolation::ZoomOutOfRange {
                    id: tab.id.clone(),
                    zoom: tab.zoom,
                });
            }
        }

        match &self.active_tab_id {
            Some(active)
                if !seen.contains(active)
                    || !self.tab(active).map_or(false, |tab| tab.is_independent_tab()) =>
            {
                violations.push(InvariantViolation::DanglingActiveTab(active.clone()));
            }
            None if !self.tab_order.is_empty() => {
                violations.push(InvariantViolation::MissingActiveTab);
            }
            _ => {}
        }

        violations
    }

    /// 修復結構使其滿足所有不變量。 / Repairs the structure so every invariant holds again.
    ///
    /// `parent_id` is treated as the authority for membership; unclaimed children are
    /// released as independent tabs at the end of the tab order.
    pub(crate) fn repair(&mut self) {
        let colliding: Vec<TabId> = self
            .single_tabs
            .keys()
            .filter(|id| self.comparison_tabs.contains_key(*id))
            .cloned()
            .collect();
        for id in colliding {
            self.single_tabs.remove(&id);
        }

        for tab in self.single_tabs.values_mut() {
            let dangling = tab
                .parent_id
                .as_ref()
                .map_or(false, |parent| !self.comparison_tabs.contains_key(parent));
            if dangling {
                tab.parent_id = None;
            }
        }

        let max_children = self.limits.max_comparison_children;
        let mut released = Vec::new();
        for comparison in self.comparison_tabs.values_mut() {
            let owner = comparison.id.clone();
            let singles = &self.single_tabs;
            let mut seen = HashSet::new();
            comparison.children.retain(|child| {
                let owned = singles
                    .get(child)
                    .map_or(false, |tab| tab.parent_id.as_ref() == Some(&owner));
                owned && seen.insert(child.clone())
            });
            if comparison.children.len() > max_children {
                released.extend(comparison.children.split_off(max_children));
            }
        }
        for tab in self.single_tabs.values_mut() {
            let unlisted = match &tab.parent_id {
                Some(parent) => self
                    .comparison_tabs
                    .get(parent)
                    .map_or(true, |comparison| !comparison.children.contains(&tab.id)),
                None => false,
            };
            if unlisted || released.contains(&tab.id) {
                tab.parent_id = None;
            }
        }

        let mut seen = HashSet::new();
        let singles = &self.single_tabs;
        let comparisons = &self.comparison_tabs;
        self.tab_order.retain(|id| {
            let top_level = comparisons.contains_key(id)
                || singles.get(id).map_or(false, SingleTab::is_independent);
            top_level && seen.insert(id.clone())
        });
        for id in self.comparison_tabs.keys() {
            if seen.insert(id.clone()) {
                self.tab_order.push(id.clone());
            }
        }
        for tab in self.single_tabs.values() {
            if tab.is_independent() && seen.insert(tab.id.clone()) {
                self.tab_order.push(tab.id.clone());
            }
        }

        let undersized: Vec<TabId> = self
            .comparison_tabs
            .values()
            .filter(|comparison| comparison.children.len() < MIN_COMPARISON_CHILDREN)
            .map(|comparison| comparison.id.clone())
            .collect();
        for id in undersized {
            self.collapse_comparison(&id);
        }

        let limits = self.limits;
        for tab in self.single_tabs.values_mut() {
            tab.current_index = clamp_index(tab.current_index, tab.image_list.len());
            tab.zoom = if tab.zoom.is_finite() {
                limits.clamp_zoom(tab.zoom)
            } else {
                1.0
            };
            if !tab.pan_offset.is_finite() {
                tab.pan_offset = PanOffset::ZERO;
            }
        }
        for comparison in self.comparison_tabs.values_mut() {
            comparison.active_slot_index =
                clamp_index(comparison.active_slot_index, comparison.children.len());
        }

        let active_valid = self
            .active_tab_id
            .as_ref()
            .map_or(false, |active| self.tab_order.contains(active));
        if !active_valid {
            self.active_tab_id = self.tab_order.first().cloned();
        }
        debug!(tabs = self.tab_order.len(), "repaired tab state");
    }

    /// 處理子標籤不足二個的比較標籤。 / Dissolves a comparison tab left with fewer than two children.
    ///
    /// One survivor takes the comparison's place and becomes active; with none left the
    /// comparison simply disappears.
    pub(crate) fn collapse_comparison(&mut self, comparison_id: &TabId) {
        let comparison = match self.comparison_tabs.remove(comparison_id) {
            Some(comparison) => comparison,
            None => return,
        };
        let position = self.position_of(comparison_id);
        let was_active = self.active_tab_id.as_ref() == Some(comparison_id);

        match comparison.children.first() {
            Some(survivor) if comparison.children.len() == 1 => {
                if let Some(tab) = self.single_tabs.get_mut(survivor) {
                    tab.parent_id = None;
                }
                match position {
                    Some(index) => self.tab_order[index] = survivor.clone(),
                    None => self.tab_order.push(survivor.clone()),
                }
                self.active_tab_id = Some(survivor.clone());
            }
            _ => {
                for child in &comparison.children {
                    if let Some(tab) = self.single_tabs.get_mut(child) {
                        tab.parent_id = None;
                    }
                }
                let position = match position {
                    Some(index) => {
                        self.tab_order.remove(index);
                        index
                    }
                    None => self.tab_order.len(),
                };
                if was_active || self.tab_order.is_empty() {
                    self.activate_near(position);
                }
            }
        }
        debug!(comparison = %comparison_id, "collapsed comparison tab");
    }

    /// 以指定位置附近的標籤為啟動標籤；沒有標籤時建立空白標籤。 /
    /// Activates the tab at `position` (or the last one), creating an empty tab when none remain.
    pub(crate) fn activate_near(&mut self, position: usize) {
        if self.tab_order.is_empty() {
            self.add_empty_tab();
        } else {
            let index = position.min(self.tab_order.len() - 1);
            self.active_tab_id = Some(self.tab_order[index].clone());
        }
    }
}
