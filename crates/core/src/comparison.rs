use tracing::debug;

use crate::state::TabState;
use crate::tab::{ComparisonTab, SingleTab, TabId, MIN_COMPARISON_CHILDREN};

/// 分離子標籤時的插入位置。 / Where a detached child lands in the tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachPlacement {
    /// 緊接在原比較標籤之後。 / Right after its former comparison tab.
    #[default]
    AfterParent,
    /// 標籤順序的最後。 / At the end of the tab order.
    End,
}

impl TabState {
    fn is_top_level_single(&self, id: &TabId) -> bool {
        self.single_tabs
            .get(id)
            .map_or(false, SingleTab::is_independent)
            && self.position_of(id).is_some()
    }

    /// 以指定子標籤建立比較標籤。 / Groups existing independent single tabs into a comparison tab.
    ///
    /// Children keep the given order, duplicates and ineligible ids are skipped and the
    /// list is capped at the configured maximum. The comparison takes the tab order slot of
    /// the first chosen child and becomes active. Returns `None` when fewer than two
    /// eligible children remain.
    pub fn add_comparison_tab(
        &mut self,
        child_ids: &[TabId],
        active_slot_index: usize,
    ) -> Option<TabId> {
        let max_children = self.limits.max_comparison_children;
        let mut chosen: Vec<TabId> = Vec::new();
        for id in child_ids {
            if chosen.len() == max_children {
                debug!(requested = child_ids.len(), max_children, "truncating comparison children");
                break;
            }
            if !chosen.contains(id) && self.is_top_level_single(id) {
                chosen.push(id.clone());
            }
        }
        if chosen.len() < MIN_COMPARISON_CHILDREN {
            debug!(eligible = chosen.len(), "not enough tabs to form a comparison");
            return None;
        }

        let anchor = self.position_of(&chosen[0])?;
        let removed_before = self.tab_order[..anchor]
            .iter()
            .filter(|id| chosen.contains(id))
            .count();
        self.tab_order.retain(|id| !chosen.contains(id));

        let comparison_id = TabId::generate();
        for child in &chosen {
            if let Some(tab) = self.single_tabs.get_mut(child) {
                tab.parent_id = Some(comparison_id.clone());
            }
        }
        let active_slot_index = active_slot_index.min(chosen.len() - 1);
        self.comparison_tabs.insert(
            comparison_id.clone(),
            ComparisonTab {
                id: comparison_id.clone(),
                children: chosen,
                active_slot_index,
            },
        );
        self.tab_order
            .insert(anchor - removed_before, comparison_id.clone());
        self.active_tab_id = Some(comparison_id.clone());
        debug!(comparison = %comparison_id, "created comparison tab");
        Some(comparison_id)
    }

    /// 依標籤順序將選取的單一標籤組成比較標籤。 / Builds a comparison from a selection, in tab order.
    pub fn create_comparison_from_single_tabs(&mut self, ids: &[TabId]) -> Option<TabId> {
        let ordered: Vec<TabId> = self
            .tab_order
            .iter()
            .filter(|id| ids.contains(id))
            .filter(|id| self.single_tabs.get(*id).map_or(false, SingleTab::is_independent))
            .take(self.limits.max_comparison_children)
            .cloned()
            .collect();
        self.add_comparison_tab(&ordered, 0)
    }

    /// 設定作用中的槽位（夾限）。 / Selects the active slot, clamped to the children.
    pub fn set_active_slot_index(&mut self, comparison_id: &TabId, slot: usize) -> bool {
        let comparison = match self.comparison_tabs.get_mut(comparison_id) {
            Some(comparison) => comparison,
            None => return false,
        };
        let slot = slot.min(comparison.children.len().saturating_sub(1));
        if comparison.active_slot_index == slot {
            return false;
        }
        comparison.active_slot_index = slot;
        true
    }

    /// 重新排列子標籤，作用中槽位跟隨同一子標籤。 / Moves a child between slots; the active slot keeps tracking the same child.
    pub fn reorder_comparison_children(
        &mut self,
        comparison_id: &TabId,
        from: usize,
        to: usize,
    ) -> bool {
        let comparison = match self.comparison_tabs.get_mut(comparison_id) {
            Some(comparison) => comparison,
            None => return false,
        };
        let len = comparison.children.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let moved = comparison.children.remove(from);
        comparison.children.insert(to, moved);

        let active = comparison.active_slot_index;
        comparison.active_slot_index = if active == from {
            to
        } else if from < active && active <= to {
            active - 1
        } else if to <= active && active < from {
            active + 1
        } else {
            active
        };
        true
    }

    pub fn move_child_up(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        match self.slot_of(comparison_id, child_id) {
            Some(slot) if slot > 0 => self.reorder_comparison_children(comparison_id, slot, slot - 1),
            _ => false,
        }
    }

    pub fn move_child_down(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        match self.slot_of(comparison_id, child_id) {
            Some(slot) => self.reorder_comparison_children(comparison_id, slot, slot + 1),
            None => false,
        }
    }

    /// 將子標籤移出成為頂層標籤。 / Detaches a child into an independent top-level tab.
    pub fn detach_child_to_top_level(
        &mut self,
        comparison_id: &TabId,
        child_id: &TabId,
        placement: DetachPlacement,
    ) -> bool {
        let slot = match self.slot_of(comparison_id, child_id) {
            Some(slot) => slot,
            None => return false,
        };
        self.detach_slot_to_top_level(comparison_id, slot, placement)
            .is_some()
    }

    /// 依槽位分離子標籤。 / Slot-addressed variant of [`TabState::detach_child_to_top_level`].
    pub fn detach_slot_to_top_level(
        &mut self,
        comparison_id: &TabId,
        slot: usize,
        placement: DetachPlacement,
    ) -> Option<TabId> {
        let child_id = self.take_child(comparison_id, slot)?;
        if let Some(tab) = self.single_tabs.get_mut(&child_id) {
            tab.parent_id = None;
        }
        match (placement, self.position_of(comparison_id)) {
            (DetachPlacement::AfterParent, Some(position)) => {
                self.tab_order.insert(position + 1, child_id.clone())
            }
            _ => self.tab_order.push(child_id.clone()),
        }
        self.normalize_comparison(comparison_id, slot);
        debug!(comparison = %comparison_id, child = %child_id, "detached child tab");
        Some(child_id)
    }

    /// 自比較標籤移除並刪除子標籤。 / Removes a child from its comparison and deletes it.
    pub fn remove_child_from_comparison(&mut self, comparison_id: &TabId, child_id: &TabId) -> bool {
        let slot = match self.slot_of(comparison_id, child_id) {
            Some(slot) => slot,
            None => return false,
        };
        self.remove_slot(comparison_id, slot).is_some()
    }

    /// 依槽位刪除子標籤。 / Slot-addressed variant of [`TabState::remove_child_from_comparison`].
    pub fn remove_slot(&mut self, comparison_id: &TabId, slot: usize) -> Option<TabId> {
        let child_id = self.take_child(comparison_id, slot)?;
        self.single_tabs.remove(&child_id);
        self.normalize_comparison(comparison_id, slot);
        debug!(comparison = %comparison_id, child = %child_id, "removed child tab");
        Some(child_id)
    }

    /// 解散比較標籤，所有子標籤回到其位置。 / Dissolves a comparison, splicing its children into its slot.
    pub fn detach_all_children(&mut self, comparison_id: &TabId) -> bool {
        let comparison = match self.comparison_tabs.remove(comparison_id) {
            Some(comparison) => comparison,
            None => return false,
        };
        for child in &comparison.children {
            if let Some(tab) = self.single_tabs.get_mut(child) {
                tab.parent_id = None;
            }
        }
        match self.position_of(comparison_id) {
            Some(position) => {
                self.tab_order
                    .splice(position..=position, comparison.children.iter().cloned());
            }
            None => self.tab_order.extend(comparison.children.iter().cloned()),
        }
        match comparison.children.first() {
            Some(first) => self.active_tab_id = Some(first.clone()),
            None => {
                self.add_empty_tab();
            }
        }
        debug!(comparison = %comparison_id, "detached all children");
        true
    }

    fn slot_of(&self, comparison_id: &TabId, child_id: &TabId) -> Option<usize> {
        self.comparison_tabs.get(comparison_id)?.slot_of(child_id)
    }

    fn take_child(&mut self, comparison_id: &TabId, slot: usize) -> Option<TabId> {
        let comparison = self.comparison_tabs.get_mut(comparison_id)?;
        if slot >= comparison.children.len() {
            return None;
        }
        Some(comparison.children.remove(slot))
    }

    /// 移除子標籤後修正比較標籤。 / Restores comparison invariants after the child at `removed_slot` left.
    fn normalize_comparison(&mut self, comparison_id: &TabId, removed_slot: usize) {
        let remaining = match self.comparison_tabs.get_mut(comparison_id) {
            Some(comparison) => comparison.children.len(),
            None => return,
        };
        if remaining < MIN_COMPARISON_CHILDREN {
            self.collapse_comparison(comparison_id);
            return;
        }
        if let Some(comparison) = self.comparison_tabs.get_mut(comparison_id) {
            let mut active = comparison.active_slot_index;
            if removed_slot <= active {
                active = active.saturating_sub(1);
            }
            comparison.active_slot_index = active.min(remaining - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(count: usize) -> (TabState, Vec<TabId>) {
        let mut state = TabState::default();
        let ids = (0..count)
            .map(|n| state.add_single_tab(vec![format!("/d/{n}.png")], 0, Some("/d".into())))
            .collect();
        (state, ids)
    }

    #[test]
    fn comparison_takes_first_child_position() {
        let (mut state, ids) = state_with(3);
        let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
        let comparison = state.add_comparison_tab(&[a.clone(), b.clone()], 0).unwrap();

        assert_eq!(state.tab_order(), &[comparison.clone(), c.clone()]);
        assert_eq!(state.single_tab(a).unwrap().parent_id(), Some(&comparison));
        assert_eq!(state.single_tab(b).unwrap().parent_id(), Some(&comparison));
        assert_eq!(state.active_tab_id(), Some(&comparison));
        assert!(state.validate().is_empty());
    }

    #[test]
    fn comparison_anchor_accounts_for_removed_predecessors() {
        let (mut state, ids) = state_with(4);
        let comparison = state
            .add_comparison_tab(&[ids[2].clone(), ids[0].clone()], 1)
            .unwrap();
        assert_eq!(
            state.tab_order(),
            &[ids[1].clone(), comparison.clone(), ids[3].clone()]
        );
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.children(), &[ids[2].clone(), ids[0].clone()]);
        assert_eq!(tab.active_slot_index(), 1);
    }

    #[test]
    fn comparison_needs_two_eligible_children() {
        let (mut state, ids) = state_with(2);
        let before = state.clone();
        assert!(state
            .add_comparison_tab(&[ids[0].clone(), ids[0].clone()], 0)
            .is_none());
        assert!(state
            .add_comparison_tab(&[ids[0].clone(), TabId::from("ghost")], 0)
            .is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn children_of_another_comparison_are_not_eligible() {
        let (mut state, ids) = state_with(3);
        state.add_comparison_tab(&[ids[0].clone(), ids[1].clone()], 0);
        assert!(state
            .add_comparison_tab(&[ids[1].clone(), ids[2].clone()], 0)
            .is_none());
    }

    #[test]
    fn create_from_selection_uses_tab_order_and_caps_at_four() {
        let (mut state, ids) = state_with(6);
        let selection: Vec<TabId> = ids.iter().rev().cloned().collect();
        let comparison = state.create_comparison_from_single_tabs(&selection).unwrap();
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.children(), &ids[..4]);
        assert_eq!(
            state.tab_order(),
            &[comparison.clone(), ids[4].clone(), ids[5].clone()]
        );
    }

    #[test]
    fn reorder_children_keeps_active_child() {
        let (mut state, ids) = state_with(3);
        let comparison = state.add_comparison_tab(&ids, 1).unwrap();

        assert!(state.reorder_comparison_children(&comparison, 1, 0));
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.children(), &[ids[1].clone(), ids[0].clone(), ids[2].clone()]);
        assert_eq!(tab.active_slot_index(), 0);

        // active child B sits at 0; moving slot 2 to the front shifts it right
        assert!(state.reorder_comparison_children(&comparison, 2, 0));
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.active_child(), Some(&ids[1]));
        assert_eq!(tab.active_slot_index(), 1);

        assert!(state.reorder_comparison_children(&comparison, 0, 2));
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.active_child(), Some(&ids[1]));
        assert_eq!(tab.children(), &[ids[1].clone(), ids[0].clone(), ids[2].clone()]);
        assert_eq!(tab.active_slot_index(), 0);

        assert!(!state.reorder_comparison_children(&comparison, 1, 1));
        assert!(!state.reorder_comparison_children(&comparison, 0, 3));
    }

    #[test]
    fn move_child_up_and_down_stop_at_edges() {
        let (mut state, ids) = state_with(2);
        let comparison = state.add_comparison_tab(&ids, 0).unwrap();
        assert!(!state.move_child_up(&comparison, &ids[0]));
        assert!(!state.move_child_down(&comparison, &ids[1]));
        assert!(state.move_child_down(&comparison, &ids[0]));
        assert_eq!(
            state.comparison_tab(&comparison).unwrap().children(),
            &[ids[1].clone(), ids[0].clone()]
        );
    }

    #[test]
    fn detaching_from_two_children_collapses_comparison() {
        let (mut state, ids) = state_with(2);
        let (a, b) = (&ids[0], &ids[1]);
        let comparison = state.add_comparison_tab(&ids, 0).unwrap();

        assert!(state.detach_child_to_top_level(&comparison, a, DetachPlacement::AfterParent));
        assert!(state.comparison_tab(&comparison).is_none());
        assert_eq!(state.tab_order(), &[b.clone(), a.clone()]);
        assert_eq!(state.active_tab_id(), Some(b));
        assert!(state.single_tab(a).unwrap().is_independent());
        assert!(state.single_tab(b).unwrap().is_independent());
        assert!(state.validate().is_empty());
    }

    #[test]
    fn detach_to_end_of_order() {
        let (mut state, ids) = state_with(4);
        let comparison = state
            .add_comparison_tab(&ids[..3], 0)
            .unwrap();
        assert!(state.detach_child_to_top_level(&comparison, &ids[1], DetachPlacement::End));
        assert_eq!(
            state.tab_order(),
            &[comparison.clone(), ids[3].clone(), ids[1].clone()]
        );
    }

    #[test]
    fn removing_active_slot_moves_active_back() {
        let (mut state, ids) = state_with(3);
        let comparison = state.add_comparison_tab(&ids, 2).unwrap();

        assert!(state.remove_child_from_comparison(&comparison, &ids[2]));
        assert!(state.single_tab(&ids[2]).is_none());
        let tab = state.comparison_tab(&comparison).unwrap();
        assert_eq!(tab.children(), &ids[..2]);
        assert_eq!(tab.active_slot_index(), 1);

        let removed = state.remove_slot(&comparison, 0).unwrap();
        assert_eq!(removed, ids[0]);
        assert!(state.comparison_tab(&comparison).is_none());
        assert_eq!(state.tab_order(), &[ids[1].clone()]);
        assert_eq!(state.active_tab_id(), Some(&ids[1]));
    }

    #[test]
    fn removing_slot_zero_when_active_is_zero_stays_in_range() {
        let (mut state, ids) = state_with(3);
        let comparison = state.add_comparison_tab(&ids, 0).unwrap();
        assert!(state.remove_slot(&comparison, 0).is_some());
        assert_eq!(state.comparison_tab(&comparison).unwrap().active_slot_index(), 0);
    }

    #[test]
    fn detach_all_splices_children_in_place() {
        let (mut state, ids) = state_with(4);
        let comparison = state
            .add_comparison_tab(&[ids[1].clone(), ids[2].clone()], 0)
            .unwrap();
        assert_eq!(state.tab_order().len(), 3);

        assert!(state.detach_all_children(&comparison));
        assert_eq!(state.tab_order(), ids.as_slice());
        assert_eq!(state.active_tab_id(), Some(&ids[1]));
        assert!(state.comparison_tab(&comparison).is_none());
        assert!(!state.detach_all_children(&comparison));
        assert!(state.validate().is_empty());
    }

    #[test]
    fn set_active_slot_is_clamped() {
        let (mut state, ids) = state_with(3);
        let comparison = state.add_comparison_tab(&ids, 0).unwrap();
        assert!(state.set_active_slot_index(&comparison, 7));
        assert_eq!(state.comparison_tab(&comparison).unwrap().active_slot_index(), 2);
        assert!(!state.set_active_slot_index(&comparison, 2));
    }
}
