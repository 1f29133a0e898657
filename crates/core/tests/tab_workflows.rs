use rustic_viewer_core::{
    active_single_tab, vertical_tabs, DetachPlacement, History, PanOffset, TabId, TabState,
};

fn listing(dir: &str, names: &[&str]) -> Vec<String> {
    names.iter().map(|name| format!("{dir}/{name}")).collect()
}

#[test]
fn removing_a_tab_reactivates_the_remaining_one() {
    let mut state = TabState::default();
    let a = state.add_single_tab(listing("/x", &["1.png"]), 0, Some("/x".into()));
    let b = state.add_single_tab(listing("/y", &["2.png"]), 0, Some("/y".into()));

    assert!(state.remove_single_tab(&b));
    assert_eq!(state.tab_order(), &[a.clone()]);
    assert_eq!(state.active_tab_id(), Some(&a));
}

#[test]
fn comparison_round_trip_through_detach() {
    let mut state = TabState::default();
    let a = state.add_single_tab(listing("/p", &["a.png"]), 0, Some("/p".into()));
    let b = state.add_single_tab(listing("/p", &["b.png"]), 0, Some("/p".into()));
    let c = state.add_single_tab(listing("/p", &["c.png"]), 0, Some("/p".into()));

    let comparison = state.add_comparison_tab(&[a.clone(), b.clone()], 0).unwrap();
    assert_eq!(state.tab_order(), &[comparison.clone(), c.clone()]);
    assert_eq!(state.single_tab(&a).unwrap().parent_id(), Some(&comparison));
    assert_eq!(state.active_tab_id(), Some(&comparison));

    assert!(state.detach_child_to_top_level(&comparison, &a, DetachPlacement::AfterParent));
    assert_eq!(state.tab_order(), &[b.clone(), a.clone(), c.clone()]);
    assert_eq!(state.active_tab_id(), Some(&b));
    assert!(state.validate().is_empty());
}

#[test]
fn reordering_children_tracks_active_child() {
    let mut state = TabState::default();
    let ids: Vec<TabId> = ["a", "b", "c"]
        .iter()
        .map(|name| {
            let files = listing("/p", &[format!("{name}.png").as_str()]);
            state.add_single_tab(files, 0, None)
        })
        .collect();
    let comparison = state.add_comparison_tab(&ids, 1).unwrap();

    assert!(state.reorder_comparison_children(&comparison, 1, 0));
    let tab = state.comparison_tab(&comparison).unwrap();
    assert_eq!(tab.children(), &[ids[1].clone(), ids[0].clone(), ids[2].clone()]);
    assert_eq!(tab.active_slot_index(), 0);
    assert_eq!(active_single_tab(&state).map(|tab| tab.id()), Some(&ids[1]));
}

#[test]
fn undo_after_zoom_only_reverts_structure() {
    let mut state = TabState::default();
    let a = state.add_single_tab(listing("/p", &["a.png"]), 0, Some("/p".into()));
    let b = state.add_single_tab(listing("/p", &["b.png"]), 0, Some("/p".into()));
    let mut history = History::default();

    let (next, comparison) =
        history.apply(&state, |s| s.add_comparison_tab(&[a.clone(), b.clone()], 0));
    let comparison = comparison.unwrap();
    let (next, changed) = history.apply(&next, |s| s.set_zoom(&a, 3.0));
    assert!(changed);
    let (next, _) =
        history.apply(&next, |s| s.set_pan_offset(&a, PanOffset::new(10.0, 2.0)));
    assert_eq!(history.undo_depth(), 1);

    let undone = history.undo(&next).unwrap();
    assert!(undone.comparison_tab(&comparison).is_none());
    assert_eq!(undone.tab_order(), &[a.clone(), b.clone()]);
    assert_eq!(undone.single_tab(&a).unwrap().zoom(), 3.0);
}

#[test]
fn mixed_operation_sequence_preserves_invariants() {
    let mut state = TabState::default();
    let ids: Vec<TabId> = (0..6)
        .map(|n| {
            let files = listing("/seq", &[format!("{n}.png").as_str(), "z.png"]);
            state.add_single_tab(files, 1, Some("/seq".into()))
        })
        .collect();
    assert!(state.validate().is_empty());

    let first = state
        .create_comparison_from_single_tabs(&[ids[0].clone(), ids[2].clone(), ids[4].clone()])
        .unwrap();
    assert!(state.validate().is_empty(), "{:?}", state.validate());

    let second = state
        .add_comparison_tab(&[ids[5].clone(), ids[1].clone(), ids[3].clone()], 2)
        .unwrap();
    assert!(state.validate().is_empty(), "{:?}", state.validate());

    assert!(state.reorder_tab(0, 1));
    assert!(state.move_child_up(&second, &ids[3]));
    assert!(state.remove_child_from_comparison(&first, &ids[2]));
    assert!(state.validate().is_empty(), "{:?}", state.validate());

    assert!(state.detach_slot_to_top_level(&first, 0, DetachPlacement::End).is_some());
    assert!(state.comparison_tab(&first).is_none());
    assert!(state.validate().is_empty(), "{:?}", state.validate());

    assert!(state.close_tab(&second));
    assert!(state.close_other_tabs(&ids[4]));
    assert!(state.validate().is_empty(), "{:?}", state.validate());
    assert_eq!(state.tab_order(), &[ids[4].clone()]);
    assert_eq!(vertical_tabs(&state).len(), 1);
}
