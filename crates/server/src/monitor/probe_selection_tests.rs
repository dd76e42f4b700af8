// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn list_selection_intersects_with_online() {
    let selection = ProbeSelection::List { agents: vec!["a1".into(), "a2".into()] };
    let online = vec!["a2".to_owned(), "a3".to_owned()];
    assert_eq!(eligible(&selection, &online), vec!["a2".to_owned()]);
}

#[test]
fn all_selection_is_every_online_agent() {
    let online = vec!["a1".to_owned(), "a2".to_owned()];
    assert_eq!(eligible(&ProbeSelection::All, &online), online);
}

#[test]
fn fanout_select_is_deterministic_for_fixed_epoch() {
    let online = vec!["a1".to_owned(), "a2".to_owned(), "a3".to_owned(), "a4".to_owned()];
    let first = fanout_select("mon-1", 100, &online, 2);
    let second = fanout_select("mon-1", 100, &online, 2);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn fanout_select_changes_across_rotation_epochs() {
    let online: Vec<String> = (0..12).map(|i| format!("agent-{i}")).collect();
    let epoch0 = fanout_select("mon-1", 0, &online, 3);
    let epoch1 = fanout_select("mon-1", 1, &online, 3);
    assert_ne!(epoch0, epoch1, "rotation epoch should reshuffle fanout selection");
}

#[test]
fn fanout_select_caps_at_requested_n_even_with_more_eligible() {
    let online: Vec<String> = (0..10).map(|i| format!("agent-{i}")).collect();
    let selected = fanout_select("mon-1", 5, &online, 3);
    assert_eq!(selected.len(), 3);
}

#[test]
fn probe_selection_round_trips_through_json() {
    let raw = r#"{"mode":"fanout","n":3}"#;
    let parsed = ProbeSelection::parse(raw);
    assert!(matches!(parsed, ProbeSelection::Fanout { n: 3 }));
}

#[test]
fn malformed_selection_falls_back_to_all() {
    let parsed = ProbeSelection::parse("not json");
    assert!(matches!(parsed, ProbeSelection::All));
}
