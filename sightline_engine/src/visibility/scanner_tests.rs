/// Tests for VisibilityScanner
///
/// These tests validate registry population, the distance and view-volume
/// gates, the activate / fire-once / deactivate protocol, lazy agent
/// creation and the error paths of a tick.

use std::sync::{Arc, Mutex, Weak};
use glam::{Quat, Vec3};
use crate::camera::{Camera, Projection};
use crate::presentation::HeadlessPresenter;
use crate::scene::{EntityDesc, Scene};
use crate::visibility::ListenerId;
use super::*;

// ============================================================================
// Helper Functions
// ============================================================================

struct Fixture {
    scene: Arc<Mutex<Scene>>,
    presenter: Arc<Mutex<HeadlessPresenter>>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_presenter(HeadlessPresenter::new())
    }

    fn with_presenter(presenter: HeadlessPresenter) -> Self {
        Self {
            scene: Arc::new(Mutex::new(Scene::new())),
            presenter: Arc::new(Mutex::new(presenter)),
        }
    }

    fn spawn(&self, name: &str, position: Vec3) -> EntityKey {
        self.scene.lock().unwrap().spawn(EntityDesc::interactable(name, position))
    }

    fn move_to(&self, entity: EntityKey, position: Vec3) {
        self.scene.lock().unwrap().set_position(entity, position);
    }

    fn scanner(&self) -> VisibilityScanner {
        let world: Arc<Mutex<dyn World>> = self.scene.clone();
        let presenter: Arc<Mutex<dyn OverlayPresenter>> = self.presenter.clone();
        let mut scanner = VisibilityScanner::new(world, presenter, ScannerConfig::default()).unwrap();
        scanner.populate_registry().unwrap();
        scanner
    }

    fn overlay_updates(&self, scanner: &VisibilityScanner, entity: EntityKey) -> u64 {
        let agent = match scanner.agent(entity) {
            Some(agent) => agent,
            None => return 0,
        };
        self.presenter.lock().unwrap().overlay(agent.overlay()).map_or(0, |s| s.updates)
    }
}

/// Camera at the origin looking down -Z, 90 degree square frustum.
fn observer(sense_radius: f32) -> Camera {
    let projection = Projection::Perspective {
        fov_y: std::f32::consts::FRAC_PI_2,
        aspect_ratio: 1.0,
        z_near: 0.1,
        z_far: 100.0,
    };
    Camera::new(Vec3::ZERO, Quat::IDENTITY, projection, sense_radius).unwrap()
}

const IN_VIEW: Vec3 = Vec3::new(0.0, 0.0, -5.0);
const BEHIND: Vec3 = Vec3::new(0.0, 0.0, 5.0);

// ============================================================================
// Tests: Construction / Registry
// ============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let fixture = Fixture::new();
    let world: Arc<Mutex<dyn World>> = fixture.scene.clone();
    let presenter: Arc<Mutex<dyn OverlayPresenter>> = fixture.presenter.clone();
    let config = ScannerConfig {
        overlay_offset: Vec3::splat(f32::INFINITY),
        ..Default::default()
    };

    let result = VisibilityScanner::new(world, presenter, config);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn test_populate_keeps_active_interactable_roots_in_order() {
    let fixture = Fixture::new();
    let a = fixture.spawn("a", IN_VIEW);
    let b = fixture.spawn("b", IN_VIEW);
    {
        let mut scene = fixture.scene.lock().unwrap();
        scene.spawn(EntityDesc { name: "prop".to_string(), ..Default::default() });
        let sleeping = scene.spawn(EntityDesc::interactable("sleeping", IN_VIEW));
        scene.set_active(sleeping, false);
        scene.spawn_child(a, EntityDesc::interactable("child", IN_VIEW)).unwrap();
    }

    let scanner = fixture.scanner();
    assert_eq!(scanner.candidates(), &[a, b]);
    assert!(scanner.is_populated());
}

#[test]
fn test_populate_twice_is_noop() {
    let fixture = Fixture::new();
    fixture.spawn("a", IN_VIEW);
    let mut scanner = fixture.scanner();

    fixture.spawn("late", IN_VIEW);
    assert_eq!(scanner.populate_registry().unwrap(), 1);
    assert_eq!(scanner.candidate_count(), 1);
}

#[test]
fn test_scan_before_populate_is_empty_tick() {
    let fixture = Fixture::new();
    fixture.spawn("a", IN_VIEW);
    let world: Arc<Mutex<dyn World>> = fixture.scene.clone();
    let presenter: Arc<Mutex<dyn OverlayPresenter>> = fixture.presenter.clone();
    let mut scanner = VisibilityScanner::new(world, presenter, ScannerConfig::default()).unwrap();

    let stats = scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(stats.candidates, 0);
    assert_eq!(stats.listeners_notified, 0);
    assert_eq!(scanner.broadcaster().fire_count(), 1);
}

// ============================================================================
// Tests: Gates
// ============================================================================

#[test]
fn test_in_range_and_in_view_is_notified() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(stats.activated, 1);
    assert_eq!(stats.listeners_notified, 1);
    assert_eq!(scanner.broadcaster().fire_count(), 1);
    assert_eq!(fixture.overlay_updates(&scanner, e1), 1);
    assert_eq!(scanner.pending_unsubscribe_count(), 0);
    assert_eq!(scanner.broadcaster().listener_count(), 0);
}

#[test]
fn test_out_of_range_is_never_activated() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", Vec3::new(0.0, 0.0, -20.0));
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(stats.out_of_range, 1);
    assert_eq!(stats.activated, 0);
    assert_eq!(stats.listeners_notified, 0);
    assert_eq!(scanner.broadcaster().fire_count(), 1);
    assert!(scanner.agent(e1).is_none());
}

#[test]
fn test_distance_equal_to_radius_passes() {
    let fixture = Fixture::new();
    fixture.spawn("edge", Vec3::new(0.0, 0.0, -10.0));
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(stats.activated, 1);
}

#[test]
fn test_outside_view_in_range_is_not_activated() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("behind", BEHIND);
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(stats.outside_view, 1);
    assert_eq!(stats.activated, 0);
    assert!(scanner.agent(e1).is_none());
}

#[test]
fn test_distance_tested_before_view() {
    let fixture = Fixture::new();
    fixture.spawn("far_behind", Vec3::new(0.0, 0.0, 50.0));
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(stats.out_of_range, 1);
    assert_eq!(stats.outside_view, 0);
}

#[test]
fn test_partially_visible_bounds_pass() {
    let fixture = Fixture::new();
    // Center just outside the right plane (x = -z), cube corner still inside.
    fixture.spawn("edge", Vec3::new(5.3, 0.0, -5.0));
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(stats.activated, 1);
}

// ============================================================================
// Tests: Three-phase protocol
// ============================================================================

#[test]
fn test_leaving_view_unsubscribes_before_next_tick() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();
    let camera = observer(10.0);

    scanner.scan(&camera).unwrap();
    assert_eq!(fixture.overlay_updates(&scanner, e1), 1);
    assert!(!scanner.agent(e1).unwrap().is_active(scanner.broadcaster()));

    fixture.move_to(e1, BEHIND);
    let stats = scanner.scan(&camera).unwrap();

    assert_eq!(stats.activated, 0);
    assert_eq!(stats.listeners_notified, 0);
    assert_eq!(fixture.overlay_updates(&scanner, e1), 1);
}

#[test]
fn test_all_visible_activated_before_single_fire() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let e2 = fixture.spawn("e2", Vec3::new(1.0, 0.0, -4.0));
    let mut scanner = fixture.scanner();

    // Probe subscribed first records how many listeners are live when fire() runs.
    let seen = Arc::new(Mutex::new(Vec::new()));
    let weak: Weak<VisibilityBroadcaster> = Arc::downgrade(scanner.broadcaster());
    let seen_clone = Arc::clone(&seen);
    scanner.broadcaster().subscribe(ListenerId::next(), Arc::new(move || {
        if let Some(broadcaster) = weak.upgrade() {
            seen_clone.lock().unwrap().push(broadcaster.listener_count());
        }
    }));

    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![3]);
    assert_eq!(stats.activated, 2);
    assert_eq!(stats.listeners_notified, 3);
    assert_eq!(scanner.broadcaster().fire_count(), 1);
    assert_eq!(fixture.overlay_updates(&scanner, e1), 1);
    assert_eq!(fixture.overlay_updates(&scanner, e2), 1);
    assert_eq!(scanner.broadcaster().listener_count(), 1);
}

#[test]
fn test_consecutive_visible_ticks_reactivate() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();
    let camera = observer(10.0);

    for expected in 1..=4 {
        let stats = scanner.scan(&camera).unwrap();
        assert_eq!(stats.activated, 1);
        assert_eq!(stats.tick, expected);
        assert_eq!(scanner.broadcaster().listener_count(), 0);
    }
    assert_eq!(fixture.overlay_updates(&scanner, e1), 4);
}

#[test]
fn test_agent_created_once_across_visibility_windows() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", BEHIND);
    let mut scanner = fixture.scanner();
    let camera = observer(10.0);

    for tick in 1..=12 {
        let position = if matches!(tick, 3 | 7 | 12) { IN_VIEW } else { BEHIND };
        fixture.move_to(e1, position);
        scanner.scan(&camera).unwrap();
    }

    assert_eq!(scanner.agents_created(), 1);
    assert_eq!(fixture.presenter.lock().unwrap().load_count(), 1);
    assert_eq!(fixture.overlay_updates(&scanner, e1), 3);
}

#[test]
fn test_overlay_follows_entity_with_offset() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", Vec3::new(1.0, 1.0, -5.0));
    let mut scanner = fixture.scanner();

    scanner.scan(&observer(10.0)).unwrap();

    let agent = scanner.agent(e1).unwrap();
    let presenter = fixture.presenter.lock().unwrap();
    let state = presenter.overlay(agent.overlay()).unwrap();
    assert!(state.position.abs_diff_eq(Vec3::new(1.8, 1.0, -5.0), 1e-5));
    assert_eq!(state.orientation, scanner.config().overlay_rotation);
}

#[test]
fn test_last_stats_matches_returned() {
    let fixture = Fixture::new();
    fixture.spawn("e1", IN_VIEW);
    fixture.spawn("e2", BEHIND);
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(scanner.last_stats(), stats);
    assert_eq!(scanner.tick(), 1);
    assert_eq!(stats.candidates, 2);
}

// ============================================================================
// Tests: Error paths
// ============================================================================

#[test]
fn test_missing_bounds_is_skipped() {
    let fixture = Fixture::new();
    let bare = {
        let mut scene = fixture.scene.lock().unwrap();
        scene.spawn(EntityDesc {
            name: "bare".to_string(),
            position: IN_VIEW,
            capabilities: Capabilities::INTERACTABLE,
            ..Default::default()
        })
    };
    let good = fixture.spawn("good", IN_VIEW);
    let mut scanner = fixture.scanner();

    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(stats.invalid_candidates, 1);
    assert_eq!(stats.activated, 1);
    assert!(scanner.agent(bare).is_none());
    assert!(scanner.agent(good).is_some());
}

#[test]
fn test_despawned_candidate_is_skipped() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();

    fixture.scene.lock().unwrap().despawn(e1);
    let stats = scanner.scan(&observer(10.0)).unwrap();

    assert_eq!(stats.missing_entities, 1);
    assert_eq!(stats.activated, 0);
}

#[test]
fn test_failed_load_is_retried_next_visible_tick() {
    let fixture = Fixture::with_presenter(HeadlessPresenter::with_catalog(["InteractableOverlay"]));
    let e1 = fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();
    let camera = observer(10.0);

    let stats = scanner.scan(&camera).unwrap();
    assert_eq!(stats.failed_activations, 1);
    assert_eq!(stats.activated, 0);
    assert!(scanner.agent(e1).is_none());

    fixture.presenter.lock().unwrap().add_asset("SpriteOverlay");
    let stats = scanner.scan(&camera).unwrap();
    assert_eq!(stats.failed_activations, 0);
    assert_eq!(stats.activated, 1);
    assert_eq!(scanner.agents_created(), 1);
}

#[test]
fn test_poisoned_world_aborts_scan() {
    let fixture = Fixture::new();
    fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();

    let scene = Arc::clone(&fixture.scene);
    let _ = std::thread::spawn(move || {
        let _guard = scene.lock().unwrap();
        panic!("poison the world mutex");
    })
    .join();

    let result = scanner.scan(&observer(10.0));
    assert!(matches!(result, Err(Error::LockPoisoned(_))));
    assert_eq!(scanner.broadcaster().fire_count(), 0);
    assert_eq!(scanner.pending_unsubscribe_count(), 0);
}

// ============================================================================
// Tests: Re-scan
// ============================================================================

#[test]
fn test_rescan_picks_up_new_entities() {
    let fixture = Fixture::new();
    fixture.spawn("e1", IN_VIEW);
    let mut scanner = fixture.scanner();

    let late = fixture.spawn("late", IN_VIEW);
    assert_eq!(scanner.scan(&observer(10.0)).unwrap().activated, 1);

    assert_eq!(scanner.rescan_world().unwrap(), 2);
    assert_eq!(scanner.scan(&observer(10.0)).unwrap().activated, 2);
    assert!(scanner.agent(late).is_some());
}

#[test]
fn test_rescan_releases_stale_agents() {
    let fixture = Fixture::new();
    let e1 = fixture.spawn("e1", IN_VIEW);
    let e2 = fixture.spawn("e2", IN_VIEW);
    let mut scanner = fixture.scanner();
    scanner.scan(&observer(10.0)).unwrap();
    assert_eq!(scanner.agent_count(), 2);

    fixture.scene.lock().unwrap().despawn(e1);
    scanner.rescan_world().unwrap();

    assert_eq!(scanner.candidates(), &[e2]);
    assert_eq!(scanner.agent_count(), 1);
    assert!(scanner.agent(e1).is_none());
    assert_eq!(fixture.presenter.lock().unwrap().release_count(), 1);
}

#[test]
fn test_panicking_listener_still_drains_pending() {
    let fixture = Fixture::new();
    fixture.spawn("e1", IN_VIEW);
    let world: Arc<Mutex<dyn World>> = fixture.scene.clone();
    let presenter: Arc<Mutex<dyn OverlayPresenter>> = fixture.presenter.clone();
    let broadcaster = Arc::new(VisibilityBroadcaster::new());
    let host = ListenerId::next();
    broadcaster.subscribe(host, Arc::new(|| panic!("host listener failed")));

    let mut scanner = VisibilityScanner::with_broadcaster(
        world, presenter, Arc::clone(&broadcaster), ScannerConfig::default(),
    ).unwrap();
    scanner.populate_registry().unwrap();

    let camera = observer(10.0);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scanner.scan(&camera)));

    assert!(result.is_err());
    assert_eq!(scanner.pending_unsubscribe_count(), 0);
    assert_eq!(broadcaster.listener_ids(), vec![host]);

    broadcaster.unsubscribe(host);
    let stats = scanner.scan(&camera).unwrap();
    assert_eq!(stats.activated, 1);
    assert_eq!(broadcaster.listener_count(), 0);
}
