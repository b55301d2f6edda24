//! Integration tests for the navigation pipeline.

mod common;

use common::*;
use futures::executor::LocalPool;
use std::rc::Rc;
use view_navigator::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// New navigations and history
// ============================================================================

#[test]
fn test_first_navigation_materializes_and_attaches_chain() {
    let app = app();
    go(&app.navigator, "/home");

    assert_eq!(app.navigator.current_path().as_deref(), Some("/home"));
    assert_eq!(app.navigator.history_len(), 1);
    assert_eq!(app.navigator.state(), NavigationState::Idle);
    assert!(!app.navigator.is_navigating());
    assert_eq!(app.root.shown(), Some("Shell"));
    assert_eq!(
        app.script.events(),
        strings(&[
            "create:Shell",
            "to:Shell first=true active=false child=true",
            "attach:Shell",
            "create:Home",
            "to:Home first=true active=false child=false",
            "attach:Home",
        ])
    );
}

#[test]
fn test_new_navigation_truncates_forward_history() {
    let app = app();
    go(&app.navigator, "/a");
    go(&app.navigator, "/b");
    go(&app.navigator, "/c");
    pollster::block_on(app.navigator.back()).unwrap();
    pollster::block_on(app.navigator.back()).unwrap();
    assert_eq!(app.navigator.current_path().as_deref(), Some("/a"));
    assert!(app.navigator.can_go_forward());

    go(&app.navigator, "/d");

    assert_eq!(history_paths(&app.navigator), strings(&["/a", "/d"]));
    assert_eq!(app.navigator.current_index(), Some(1));
    assert!(!app.navigator.can_go_forward());
    // Forward entries left the history, so their views are gone too.
    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:B", "dispose:C"]));
}

#[test]
fn test_back_then_forward_restores_identical_entry() {
    let app = app();
    go(&app.navigator, "/a");
    let first = app.navigator.current_entry().unwrap();
    go(&app.navigator, "/b");
    let second = app.navigator.current_entry().unwrap();

    let result = pollster::block_on(app.navigator.back()).unwrap();
    assert!(result.is_success());
    assert!(Rc::ptr_eq(&app.navigator.current_entry().unwrap(), &first));
    assert!(Rc::ptr_eq(&app.navigator.peek_forward().unwrap(), &second));

    pollster::block_on(app.navigator.forward()).unwrap();
    assert!(Rc::ptr_eq(&app.navigator.current_entry().unwrap(), &second));
    assert!(Rc::ptr_eq(&app.navigator.peek_back().unwrap(), &first));
}

#[test]
fn test_back_reuses_cached_view_model() {
    let app = app();
    go(&app.navigator, "/a");
    let a = app.navigator.current_entry().unwrap().items()[1]
        .view_model_as::<Page<A>>()
        .unwrap();
    go(&app.navigator, "/b");
    app.script.clear_events();

    pollster::block_on(app.navigator.back()).unwrap();

    let again = app.navigator.current_entry().unwrap().items()[1]
        .view_model_as::<Page<A>>()
        .unwrap();
    assert!(Rc::ptr_eq(&a, &again));
    assert_eq!(
        app.script.events(),
        strings(&[
            "away?:B",
            "left:B",
            "to:Shell first=false active=true child=true",
            "to:A first=false active=false child=false",
            "attach:A",
        ])
    );
}

#[test]
fn test_back_without_history_is_invalid() {
    let app = app();
    let err = pollster::block_on(app.navigator.back()).unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));

    go(&app.navigator, "/a");
    let err = pollster::block_on(app.navigator.forward()).unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));
}

#[test]
fn test_unknown_route_changes_nothing() {
    let app = app();
    go(&app.navigator, "/home");
    app.script.clear_events();

    let err = pollster::block_on(app.navigator.navigate("/nowhere")).unwrap_err();
    assert!(matches!(err, NavigationError::RouteNotFound { .. }));
    assert_eq!(app.navigator.current_path().as_deref(), Some("/home"));
    assert!(app.script.events().is_empty());
    assert_eq!(app.navigator.state(), NavigationState::Idle);
}

#[test]
fn test_parameters_and_anchor_reach_view_model() {
    let app = app();
    go(&app.navigator, "/items/42#comments");

    let entry = app.navigator.current_entry().unwrap();
    let detail = entry.items()[1].view_model_as::<Page<Detail>>().unwrap();
    assert_eq!(detail.params.get("id"), Some(&ParamValue::UInt(42)));

    let args = detail.last_args.borrow().clone().unwrap();
    assert_eq!(args.depth, 1);
    assert_eq!(args.anchor(), Some("comments"));
    assert_eq!(args.inherited_params.get("id"), Some(&ParamValue::UInt(42)));
    assert_eq!(args.kind, NavigationKind::New);
    assert!(args.navigator.upgrade().is_some());
}

#[test]
fn test_typed_navigation() {
    let app = app();
    let descriptor = RouteDescriptor::root::<Page<Shell>>(RouteParams::new())
        .child::<Page<Detail>>(RouteParams::new().with("id", 7_u64));

    let result = pollster::block_on(app.navigator.navigate_to(descriptor)).unwrap();
    assert_eq!(result.path(), Some("/items/7"));
    assert_eq!(page_at(&app.navigator, 1), Some("Detail"));
}

#[test]
fn test_same_route_twice_reconfirms_active_items() {
    let app = app();
    go(&app.navigator, "/home");
    app.script.clear_events();

    go(&app.navigator, "/home");

    assert_eq!(app.navigator.history_len(), 2);
    assert_eq!(
        app.script.events(),
        strings(&[
            "to:Shell first=false active=true child=true",
            "to:Home first=false active=true child=false",
        ])
    );
}

// ============================================================================
// Prefix reuse, partial navigation and refresh
// ============================================================================

#[test]
fn test_partial_navigation_reuses_prefix() {
    let app = app();
    go(&app.navigator, "/home");
    let before = app.navigator.current_entry().unwrap();

    let result = pollster::block_on(app.navigator.navigate_partial(0, "settings")).unwrap();
    assert_eq!(result.path(), Some("/settings"));

    let after = app.navigator.current_entry().unwrap();
    assert!(Rc::ptr_eq(&before.items()[0], &after.items()[0]));
    assert!(!Rc::ptr_eq(&before.items()[1], &after.items()[1]));
    assert!(!after.items()[1].is_first_navigation());
    assert_eq!(page_at(&app.navigator, 1), Some("Settings"));
    assert_eq!(app.navigator.history_len(), 2);
}

#[test]
fn test_partial_navigation_below_nested_level() {
    let app = app();
    go(&app.navigator, "/settings/general");
    app.script.clear_events();

    pollster::block_on(app.navigator.navigate_partial(1, "privacy")).unwrap();

    assert_eq!(app.navigator.current_path().as_deref(), Some("/settings/privacy"));
    assert_eq!(
        app.script.events(),
        strings(&[
            "away?:General",
            "left:General",
            "to:Shell first=false active=true child=true",
            "to:Settings first=false active=true child=true",
            "create:Privacy",
            "to:Privacy first=true active=false child=false",
            "attach:Privacy",
        ])
    );
}

#[test]
fn test_partial_navigation_out_of_range() {
    let app = app();
    let err = pollster::block_on(app.navigator.navigate_partial(0, "home")).unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));

    go(&app.navigator, "/home");
    let err = pollster::block_on(app.navigator.navigate_partial(3, "home")).unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));

    let err = pollster::block_on(app.navigator.navigate_partial(0, "nowhere")).unwrap_err();
    assert!(matches!(err, NavigationError::RouteNotFound { .. }));
}

#[test]
fn test_leaf_nested_host_is_cleared() {
    let app = app();
    go(&app.navigator, "/settings/general");
    app.script.clear_events();

    go(&app.navigator, "/settings");

    assert_eq!(app.script.events().last().map(String::as_str), Some("clear"));
}

#[test]
fn test_refresh_recreates_leaf_only() {
    let app = app();
    go(&app.navigator, "/home");
    let before = app.navigator.current_entry().unwrap();
    app.script.clear_events();

    let result = pollster::block_on(app.navigator.refresh()).unwrap();
    assert!(result.is_success());

    let after = app.navigator.current_entry().unwrap();
    assert_eq!(app.navigator.history_len(), 1);
    assert!(Rc::ptr_eq(&before.items()[0], &after.items()[0]));
    assert!(!Rc::ptr_eq(&before.items()[1], &after.items()[1]));
    assert_eq!(
        app.script.events(),
        strings(&[
            "away?:Home",
            "left:Home",
            "to:Shell first=false active=true child=true",
            "create:Home",
            "to:Home first=true active=false child=false",
            "attach:Home",
            "dispose:Home",
        ])
    );
}

// ============================================================================
// Cancellation and redirects
// ============================================================================

#[test]
fn test_deny_cancels_without_changes() {
    let app = app();
    go(&app.navigator, "/a");
    app.script.on_away("A", NavigationAction::deny("Unsaved changes"));
    app.script.clear_events();

    let result = pollster::block_on(app.navigator.navigate("/b")).unwrap();
    assert_eq!(
        result,
        NavigationResult::Cancelled {
            reason: "Unsaved changes".to_string()
        }
    );
    assert_eq!(app.navigator.current_path().as_deref(), Some("/a"));
    assert_eq!(app.navigator.history_len(), 1);
    assert_eq!(app.script.events(), strings(&["away?:A"]));
}

#[test]
fn test_redirect_while_navigating_away() {
    let app = app();
    go(&app.navigator, "/a");
    app.script.once("away:A", NavigationAction::redirect("/c"));

    let result = pollster::block_on(app.navigator.navigate("/b")).unwrap();
    assert_eq!(result.path(), Some("/c"));
    assert_eq!(app.navigator.history_len(), 2);
    assert!(app.script.events_with("create:B").is_empty());
}

#[test]
fn test_redirect_while_navigating_to_replaces_target() {
    let app = app();
    app.script.on_to("Home", NavigationAction::redirect("/login"));

    let result = pollster::block_on(app.navigator.navigate("/home")).unwrap();

    assert_eq!(result.path(), Some("/login"));
    assert_eq!(app.navigator.current_path().as_deref(), Some("/login"));
    assert_eq!(app.navigator.history_len(), 1);
    assert_eq!(
        app.script.events_with("attach:"),
        strings(&["attach:Shell", "attach:Login"])
    );
    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:Home"]));

    let login = app.navigator.current_entry().unwrap().items()[1]
        .view_model_as::<Page<Login>>()
        .unwrap();
    assert_eq!(login.last_args.borrow().as_ref().unwrap().kind, NavigationKind::Redirect);
}

#[test]
fn test_redirect_loop_is_an_error() {
    let app = app();
    app.script.on_to("Home", NavigationAction::redirect("/login"));
    app.script.on_to("Login", NavigationAction::redirect("/home"));

    let err = pollster::block_on(app.navigator.navigate("/home")).unwrap_err();
    assert!(matches!(err, NavigationError::RedirectLoop { depth: 6, .. }));
    assert_eq!(app.navigator.state(), NavigationState::Idle);
    assert!(!app.navigator.is_navigating());
}

#[test]
fn test_redirect_from_reconfirmed_parent_is_invalid() {
    let app = app();
    go(&app.navigator, "/home");
    app.script.on_to("Shell", NavigationAction::redirect("/login"));

    let err = pollster::block_on(app.navigator.navigate("/a")).unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));
}

#[test]
fn test_deny_while_navigating_to_is_ignored() {
    let app = app();
    app.script.on_to("Home", NavigationAction::deny("too late"));

    let result = pollster::block_on(app.navigator.navigate("/home")).unwrap();
    assert!(result.is_success());
    assert_eq!(page_at(&app.navigator, 1), Some("Home"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_superseded_during_navigating_to_is_rerouted() {
    let app = app();
    go(&app.navigator, "/a");
    let gate = app.script.gate("to:Settings");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let first = spawn_navigation(&spawner, &app.navigator, "/settings/general");
    pool.run_until_stalled();
    assert!(first.borrow().is_none());
    assert!(app.navigator.is_navigating());
    assert_eq!(app.navigator.state(), NavigationState::NavigatingTo);

    let second = spawn_navigation(&spawner, &app.navigator, "/c");
    pool.run_until_stalled();
    assert_eq!(finished(&second).path(), Some("/c"));

    gate.send(()).unwrap();
    pool.run_until_stalled();
    assert_eq!(finished(&first), NavigationResult::Rerouted);

    // The newer run replaced the entry the older one had committed.
    assert_eq!(history_paths(&app.navigator), strings(&["/a", "/c"]));
    assert!(app.script.events_with("create:General").is_empty());
    assert_eq!(app.navigator.state(), NavigationState::Idle);
    assert!(!app.navigator.is_navigating());
}

#[test]
fn test_superseded_while_navigating_away_is_rerouted() {
    let app = app();
    go(&app.navigator, "/a");
    let gate = app.script.gate("away:A");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let first = spawn_navigation(&spawner, &app.navigator, "/b");
    pool.run_until_stalled();
    let second = spawn_navigation(&spawner, &app.navigator, "/c");
    pool.run_until_stalled();
    assert_eq!(finished(&second).path(), Some("/c"));

    drop(gate);
    pool.run_until_stalled();
    assert_eq!(finished(&first), NavigationResult::Rerouted);
    assert!(app.script.events_with("create:B").is_empty());
    assert_eq!(app.navigator.history_len(), 2);
}

#[test]
fn test_new_navigation_superseding_back_drops_forward_history() {
    let app = app();
    for path in ["/a", "/b", "/c"] {
        go(&app.navigator, path);
    }
    let gate = app.script.gate("to:B");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let back = spawn_back(&spawner, &app.navigator);
    pool.run_until_stalled();
    assert!(back.borrow().is_none());

    let newer = spawn_navigation(&spawner, &app.navigator, "/d");
    pool.run_until_stalled();
    assert_eq!(finished(&newer).path(), Some("/d"));

    gate.send(()).unwrap();
    pool.run_until_stalled();
    assert_eq!(finished(&back), NavigationResult::Rerouted);

    assert_eq!(history_paths(&app.navigator), strings(&["/a", "/d"]));
    assert!(!app.navigator.can_go_forward());
    assert_eq!(app.script.events_with("dispose:C"), strings(&["dispose:C"]));
}

#[test]
fn test_denied_newer_navigation_does_not_supersede() {
    let app = app();
    go(&app.navigator, "/a");
    let gate = app.script.gate("to:B");

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let first = spawn_navigation(&spawner, &app.navigator, "/b");
    pool.run_until_stalled();

    app.script.once("away:B", NavigationAction::deny("busy"));
    let second = spawn_navigation(&spawner, &app.navigator, "/c");
    pool.run_until_stalled();
    assert!(finished(&second).is_cancelled());

    gate.send(()).unwrap();
    pool.run_until_stalled();
    assert_eq!(finished(&first).path(), Some("/b"));
    assert_eq!(app.navigator.current_path().as_deref(), Some("/b"));
}

#[test]
fn test_pipeline_runs_inside_busy_scope() {
    let script = Script::new();
    let root = RecordingHost::new(Rc::clone(&script));
    let mut pool = LocalPool::new();
    let runner = Rc::new(LocalTaskRunner::new(pool.spawner()));
    let navigator = builder(&script, &root)
        .task_runner(Rc::clone(&runner) as Rc<dyn TaskRunner>)
        .build()
        .unwrap();

    let gate = script.gate("to:Home");
    navigator.spawn_navigate("/home").unwrap();
    pool.run_until_stalled();
    assert!(runner.is_busy());

    gate.send(()).unwrap();
    pool.run_until_stalled();
    assert!(!runner.is_busy());
    assert_eq!(navigator.current_path().as_deref(), Some("/home"));
}

#[test]
fn test_spawn_navigate_without_executor_is_reported() {
    let app = app();
    let err = app.navigator.spawn_navigate("/home").unwrap_err();
    assert!(matches!(err, NavigationError::InvalidOperation { .. }));
    assert!(app.navigator.current_entry().is_none());
}

// ============================================================================
// Eviction
// ============================================================================

#[test]
fn test_back_cache_depth_one_disposes_oldest() {
    let app = app_with(NavigatorConfig::new().with_max_back_cache_depth(1));
    for path in ["/a", "/b", "/c", "/d"] {
        go(&app.navigator, path);
    }

    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:A"]));
    let history = app.navigator.history();
    assert!(!history[0].items()[1].is_materialized());
    for entry in &history[1..] {
        assert!(entry.items()[1].is_materialized());
    }
}

#[test]
fn test_back_keeps_entry_behind_new_current() {
    let app = app_with(NavigatorConfig::new().with_max_back_cache_depth(1));
    for path in ["/a", "/b", "/c", "/d"] {
        go(&app.navigator, path);
    }
    pollster::block_on(app.navigator.back()).unwrap();

    assert_eq!(app.navigator.current_path().as_deref(), Some("/c"));
    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:A"]));
    let history = app.navigator.history();
    assert!(history[1].items()[1].is_materialized());
    assert!(history[3].items()[1].is_materialized());

    pollster::block_on(app.navigator.back()).unwrap();
    assert_eq!(app.script.events_with("create:B").len(), 1);
}

#[test]
fn test_current_entry_never_evicted() {
    let app = app_with(
        NavigatorConfig::new()
            .with_max_back_cache_depth(0)
            .with_max_forward_cache_depth(0),
    );
    app.script.set_uncacheable("A");
    app.script.set_uncacheable("Shell");
    go(&app.navigator, "/a");
    go(&app.navigator, "/a");
    go(&app.navigator, "/b");

    let current = app.navigator.current_entry().unwrap();
    assert!(current.items().iter().all(|item| item.is_materialized()));
    assert!(app.script.events_with("dispose:Shell").is_empty());
}

#[test]
fn test_uncacheable_view_model_is_recreated() {
    let app = app();
    app.script.set_uncacheable("A");
    go(&app.navigator, "/a");
    go(&app.navigator, "/b");
    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:A"]));

    pollster::block_on(app.navigator.back()).unwrap();
    assert_eq!(app.script.events_with("create:A").len(), 2);
}

#[test]
fn test_history_is_trimmed() {
    let app = app_with(NavigatorConfig::new().with_max_history_size(3));
    for path in ["/a", "/b", "/c", "/d"] {
        go(&app.navigator, path);
    }

    assert_eq!(app.navigator.history_len(), 3);
    assert_eq!(app.navigator.current_index(), Some(2));
    assert_eq!(app.script.events_with("dispose:"), strings(&["dispose:A"]));
}

#[test]
fn test_zero_history_size_rejected_at_build() {
    let script = Script::new();
    let root = RecordingHost::new(Rc::clone(&script));
    let err = builder(&script, &root)
        .config(NavigatorConfig::new().with_max_history_size(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, NavigationError::Configuration { .. }));
}

#[cfg(feature = "cache")]
#[test]
fn test_resolution_cache_hits() {
    let app = app();
    go(&app.navigator, "/a");
    go(&app.navigator, "/b");
    go(&app.navigator, "/a");

    let stats = app.navigator.cache_stats().unwrap();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 1);
}
