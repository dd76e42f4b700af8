// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn all_is_down_if_any_participant_down() {
    let statuses = [ProbeStatus::Up, ProbeStatus::Down, ProbeStatus::Up];
    assert_eq!(consensus_all(&statuses), ProbeStatus::Down);
}

#[test]
fn all_is_up_only_if_every_participant_up() {
    let statuses = [ProbeStatus::Up, ProbeStatus::Up];
    assert_eq!(consensus_all(&statuses), ProbeStatus::Up);
}

#[test]
fn all_is_unknown_if_mixed_without_down() {
    let statuses = [ProbeStatus::Up, ProbeStatus::Unknown];
    assert_eq!(consensus_all(&statuses), ProbeStatus::Unknown);
}

#[test]
fn any_is_up_if_any_participant_up() {
    let statuses = [ProbeStatus::Down, ProbeStatus::Up];
    assert_eq!(consensus_any(&statuses), ProbeStatus::Up);
}

#[test]
fn any_is_down_only_if_every_participant_down() {
    let statuses = [ProbeStatus::Down, ProbeStatus::Down];
    assert_eq!(consensus_any(&statuses), ProbeStatus::Down);
}

#[test]
fn fanout_majority_decides() {
    let statuses = [ProbeStatus::Up, ProbeStatus::Up, ProbeStatus::Down];
    assert_eq!(consensus_fanout(&statuses, 3, ProbeStatus::Unknown), ProbeStatus::Up);
}

#[test]
fn fanout_tie_breaks_to_previous() {
    let statuses = [ProbeStatus::Up, ProbeStatus::Down];
    assert_eq!(consensus_fanout(&statuses, 2, ProbeStatus::Down), ProbeStatus::Down);
    assert_eq!(consensus_fanout(&statuses, 2, ProbeStatus::Up), ProbeStatus::Up);
}

#[test]
fn fanout_below_quorum_is_unknown() {
    let statuses = [ProbeStatus::Up];
    assert_eq!(consensus_fanout(&statuses, 5, ProbeStatus::Up), ProbeStatus::Unknown);
}
