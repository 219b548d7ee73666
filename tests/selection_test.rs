mod common;

use common::{health, keys};
use partlaunch::output::formatter::upstream_warning;
use partlaunch::partition::health::PartitionHealthIndex;
use partlaunch::partition::selection::{ReseedPolicy, SelectionState};

fn state_with(
    policy: ReseedPolicy,
    assets: Vec<partlaunch::partition::health::PartitionHealthData>,
    upstream: Vec<partlaunch::partition::health::PartitionHealthData>,
) -> SelectionState {
    let mut state = SelectionState::new(policy);
    state.observe_health(
        PartitionHealthIndex::new(assets),
        PartitionHealthIndex::new(upstream),
    );
    state
}

#[test]
fn test_first_observation_selects_most_recent() {
    let state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2", "p3"], &[])],
        vec![],
    );
    assert_eq!(state.selected(), keys(&["p3"]));
    assert_eq!(state.most_recent_key(), Some("p3"));
}

#[test]
fn test_set_all_and_most_recent() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2", "p3"], &[])],
        vec![],
    );

    state.set_all();
    assert_eq!(state.selected(), keys(&["p1", "p2", "p3"]));

    state.set_most_recent();
    assert_eq!(state.selected(), keys(&["p3"]));
}

#[test]
fn test_missing_requires_every_asset_to_be_missing() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![
            health(&["a"], &["p1", "p2", "p3"], &["p1", "p2", "p3"]),
            health(&["b"], &["p1", "p2", "p3"], &["p2"]),
        ],
        vec![],
    );

    // Asset A has everything, so nothing counts as missing.
    state.set_missing();
    assert!(state.selected().is_empty());

    let mut state = state_with(
        ReseedPolicy::Always,
        vec![
            health(&["a"], &["p1", "p2", "p3"], &[]),
            health(&["b"], &["p1", "p2", "p3"], &["p2"]),
        ],
        vec![],
    );
    state.set_missing();
    assert_eq!(state.selected(), keys(&["p1", "p3"]));
}

#[test]
fn test_missing_with_partially_materialized_pair() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["b"], &["p1", "p2", "p3"], &["p2"])],
        vec![],
    );
    state.set_missing();
    assert_eq!(state.selected(), keys(&["p1", "p3"]));
}

#[test]
fn test_reseed_discards_manual_selection_by_default() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2"], &[])],
        vec![],
    );
    state.set_selection(keys(&["p1"]));

    let reseeded = state.observe_health(
        PartitionHealthIndex::new(vec![health(&["a"], &["p1", "p2", "p3"], &[])]),
        PartitionHealthIndex::default(),
    );
    assert!(reseeded);
    assert_eq!(state.selected(), keys(&["p3"]));
}

#[test]
fn test_unchanged_tail_keeps_selection() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2"], &[])],
        vec![],
    );
    state.set_all();

    let reseeded = state.observe_health(
        PartitionHealthIndex::new(vec![health(&["a"], &["p1", "p2"], &["p1"])]),
        PartitionHealthIndex::default(),
    );
    assert!(!reseeded);
    assert_eq!(state.selected(), keys(&["p1", "p2"]));
}

#[test]
fn test_unless_explicit_policy_keeps_manual_selection() {
    let mut state = state_with(
        ReseedPolicy::UnlessExplicit,
        vec![health(&["a"], &["p1", "p2"], &[])],
        vec![],
    );
    state.set_selection(keys(&["p1"]));

    let reseeded = state.observe_health(
        PartitionHealthIndex::new(vec![health(&["a"], &["p1", "p2", "p3"], &[])]),
        PartitionHealthIndex::default(),
    );
    assert!(!reseeded);
    assert_eq!(state.selected(), keys(&["p1"]));
    assert_eq!(state.most_recent_key(), Some("p3"));

    // Choosing "most recent" again resumes following the tail.
    state.set_most_recent();
    state.observe_health(
        PartitionHealthIndex::new(vec![health(&["a"], &["p1", "p2", "p3", "p4"], &[])]),
        PartitionHealthIndex::default(),
    );
    assert_eq!(state.selected(), keys(&["p4"]));
}

#[test]
fn test_refresh_drops_keys_that_disappeared() {
    let mut state = state_with(
        ReseedPolicy::UnlessExplicit,
        vec![health(&["a"], &["p1", "p2", "p3"], &[])],
        vec![],
    );
    state.set_all();
    state.observe_health(
        PartitionHealthIndex::new(vec![health(&["a"], &["p2", "p3"], &[])]),
        PartitionHealthIndex::default(),
    );
    assert_eq!(state.selected(), keys(&["p2", "p3"]));
}

#[test]
fn test_upstream_unavailable() {
    let state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2", "p3", "p4"], &[])],
        vec![
            health(&["up1"], &["p1", "p2", "p3"], &["p1", "p3"]),
            health(&["up2"], &["p1", "p2", "p3"], &["p1", "p2", "p3"]),
        ],
    );

    assert!(!state.upstream_unavailable("p1"));
    assert!(state.upstream_unavailable("p2"));
    assert!(!state.upstream_unavailable("p3"));
    // No upstream defines p4, so nothing blocks it.
    assert!(!state.upstream_unavailable("p4"));
}

#[test]
fn test_no_upstream_assets_never_blocks() {
    let state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1"], &[])],
        vec![],
    );
    assert!(!state.upstream_unavailable("p1"));
    assert!(state.upstream_unavailable_spans().is_empty());
}

#[test]
fn test_upstream_spans_and_removal() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1", "p2", "p3", "p4", "p5"], &[])],
        vec![health(&["up"], &["p1", "p2", "p3", "p4", "p5"], &["p1", "p4"])],
    );
    state.set_all();

    let spans = state.upstream_unavailable_spans();
    let shape: Vec<(usize, usize)> = spans.iter().map(|s| (s.start_index, s.end_index)).collect();
    assert_eq!(shape, vec![(1, 2), (4, 4)]);
    assert!(spans.iter().all(|s| s.status));

    assert_eq!(
        upstream_warning(&state).unwrap(),
        "[p2...p3], p5 cannot be materialized because upstream materializations are missing. \
         Consider materializing upstream assets or remove these partitions to avoid failures."
    );

    state.remove_upstream_unavailable();
    assert_eq!(state.selected(), keys(&["p1", "p4"]));
    assert!(upstream_warning(&state).is_none());
}

#[test]
fn test_set_all_then_remove_preserves_order() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["d3", "d1", "d2", "d5", "d4"], &[])],
        vec![health(&["up"], &["d1", "d5"], &[])],
    );
    state.set_all();
    state.remove_upstream_unavailable();
    assert_eq!(state.selected(), keys(&["d3", "d2", "d4"]));
}

#[test]
fn test_empty_health_clears_selection() {
    let mut state = state_with(
        ReseedPolicy::Always,
        vec![health(&["a"], &["p1"], &[])],
        vec![],
    );
    assert!(state.observe_health(PartitionHealthIndex::default(), PartitionHealthIndex::default()));
    assert!(state.selected().is_empty());
    assert_eq!(state.most_recent_key(), None);
}
