use std::f64::consts::PI;

use glam::DVec2;
use gravdrum::engine::{
    Body, Cell, CellScheduler, CollisionResolver, OrbitalQuantities, PhysicsConstants,
    ScriptedSource, SharedConstants, ShotClass, TrajectorySynthesizer, WorldBounds,
    ATTRACTOR_RADIUS,
};

/// Attractor of radius 50 whose mass is exactly 1000
fn light_attractor() -> Body {
    let density = 1000.0 / (PI * 50.0 * 50.0);
    Body::attractor(DVec2::ZERO, 50.0).with_density(density)
}

fn test_constants() -> PhysicsConstants {
    PhysicsConstants::new(6.67e-8, 0.002)
}

fn scheduler(constants: PhysicsConstants) -> CellScheduler {
    CellScheduler::new(SharedConstants::new(constants), CollisionResolver::default())
}

// ==================================================================================
// Open trajectories
// ==================================================================================

#[test]
fn hyperbolic_launch_never_comes_back() {
    let constants = test_constants();
    let mut cell = Cell::with_attractor(light_attractor());
    assert!((cell.attractor().mass() - 1000.0).abs() < 1e-9);

    let id = cell.add_body(Body::new(100.0, 0.0, 0.0, 0.0, 10.0, None));
    let synthesizer = TrajectorySynthesizer::new(constants, WorldBounds::default());
    let mut rng = ScriptedSource::new(vec![0.3, 0.7]);
    cell.launch_body(id, "hyperbole", &synthesizer, &mut rng).unwrap();

    let body = cell.body(id).unwrap();
    let q = OrbitalQuantities::measure(body, cell.attractor(), &constants, &synthesizer.bounds).unwrap();
    assert!(body.flags.free);
    assert!(body.velocity.length() >= q.escape_speed);
    assert!(body.velocity.length() >= q.launch_escape_speed());

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);

    let mut distances = Vec::with_capacity(1000);
    for _ in 0..1000 {
        scheduler.tick_physics(&mut cell);
        distances.push(cell.body(id).unwrap().distance_to(cell.attractor()));
    }

    for (tick, pair) in distances.windows(2).enumerate().skip(10) {
        assert!(pair[1] > pair[0], "distance fell at tick {}: {} -> {}", tick + 1, pair[0], pair[1]);
    }
}

#[test]
fn parabolic_launch_is_free_and_escapes() {
    let constants = PhysicsConstants::default();
    let mut cell = Cell::new();
    let id = cell.add_body(Body::new(-150.0, 120.0, 0.0, 0.0, 20.0, None));
    let synthesizer = TrajectorySynthesizer::new(constants, WorldBounds::default());
    let mut rng = ScriptedSource::new(vec![0.9, 0.4]);
    cell.launch_body(id, "parabola", &synthesizer, &mut rng).unwrap();

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);
    let start = cell.body(id).unwrap().distance_to(cell.attractor());
    for _ in 0..3000 {
        scheduler.tick_physics(&mut cell);
    }
    let end = cell.body(id).unwrap().distance_to(cell.attractor());
    assert!(end > start);
    assert!(cell.collision_events().is_empty());
}

// ==================================================================================
// Closed trajectories
// ==================================================================================

#[test]
fn circular_orbit_keeps_its_radius() {
    let constants = PhysicsConstants::default();
    let mut cell = Cell::new();
    let id = cell.add_body(Body::new(0.0, -200.0, 0.0, 0.0, 20.0, None));
    let synthesizer = TrajectorySynthesizer::new(constants, WorldBounds::default());
    let mut rng = ScriptedSource::new(vec![0.8]);
    cell.launch_body(id, ShotClass::Circular.name(), &synthesizer, &mut rng)
        .unwrap();

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);
    for _ in 0..2000 {
        scheduler.tick_physics(&mut cell);
        let r = cell.body(id).unwrap().distance_to(cell.attractor());
        assert!((r - 200.0).abs() < 10.0, "radius drifted to {r}");
    }
}

#[test]
fn elliptical_orbit_stays_bound_and_clear() {
    let constants = PhysicsConstants::default();
    let mut cell = Cell::new();
    let id = cell.add_body(Body::new(260.0, 0.0, 0.0, 0.0, 15.0, None));
    let synthesizer = TrajectorySynthesizer::new(constants, WorldBounds::default());
    let mut rng = ScriptedSource::new(vec![0.5, 0.2]);
    cell.launch_body(id, "ellipsis", &synthesizer, &mut rng).unwrap();

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);

    let clearance = ATTRACTOR_RADIUS + 15.0;
    let mut closest = f64::MAX;
    for _ in 0..3000 {
        scheduler.tick_physics(&mut cell);
        let r = cell.body(id).unwrap().distance_to(cell.attractor());
        closest = closest.min(r);
        assert!(r < 270.0, "bound orbit flew out to {r}");
    }
    assert!(closest > clearance);
    assert!(closest < 250.0);
}

#[test]
fn free_fall_drops_onto_the_attractor() {
    let constants = PhysicsConstants::default();
    let mut cell = Cell::new();
    let id = cell.add_body(Body::new(0.0, 180.0, 0.0, 0.0, 15.0, None));
    let synthesizer = TrajectorySynthesizer::new(constants, WorldBounds::default());
    let mut rng = ScriptedSource::new(vec![0.5]);
    cell.launch_body(id, "free-fall", &synthesizer, &mut rng).unwrap();
    assert_eq!(cell.body(id).unwrap().velocity, DVec2::ZERO);

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);
    let mut hit = false;
    for _ in 0..500 {
        scheduler.tick_physics(&mut cell);
        hit |= !cell.collision_events().is_empty();
    }
    assert!(hit);
}

// ==================================================================================
// Friction
// ==================================================================================

#[test]
fn damped_bodies_slow_down_every_tick() {
    let constants = PhysicsConstants::new(0.0, 0.002);
    let mut cell = Cell::new();
    let id = cell.add_body(Body::new(-300.0, 0.0, 0.0, 5.0e4, 15.0, None));

    let scheduler = scheduler(constants);
    scheduler.play(&mut cell);
    let mut last = cell.body(id).unwrap().velocity.length();
    for _ in 0..5000 {
        scheduler.tick_physics(&mut cell);
        let speed = cell.body(id).unwrap().velocity.length();
        assert!(speed < last);
        last = speed;
    }
}
