use crate::engine::physics::body::Body;
use crate::engine::physics::constants::PhysicsConstants;

/// Advance one cell by a single tick.
///
/// Order within the tick is fixed: the attractor pulls every body, then
/// damping is applied, then positions advance. Damping is a geometric decay
/// per tick, so its rate is tied to the tick cadence rather than to a time
/// delta.
pub fn step(attractor: &mut Body, bodies: &mut [Body], constants: &PhysicsConstants) {
    attractor.apply_force_to_targets(bodies, constants.g);

    advance(attractor, constants);
    let center = attractor.position;

    for body in bodies.iter_mut() {
        advance(body, constants);
        body.update_pan(center);
    }
}

fn advance(body: &mut Body, constants: &PhysicsConstants) {
    if !body.flags.free {
        let damping = body.velocity * constants.friction;
        body.velocity -= damping;
    }

    if !body.flags.fixed {
        body.position += body.velocity * constants.velocity_scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::body::ATTRACTOR_RADIUS;
    use crate::engine::sound::RecordingModule;
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn frictionless_space() -> PhysicsConstants {
        PhysicsConstants::new(0.0, 0.002)
    }

    #[test]
    fn damping_decays_speed_monotonically() {
        let constants = frictionless_space();
        let mut attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut bodies = vec![Body::new(200.0, 0.0, 3.0e4, -1.0e4, 15.0, None)];

        let mut last = bodies[0].velocity.length();
        for _ in 0..2_000 {
            step(&mut attractor, &mut bodies, &constants);
            let speed = bodies[0].velocity.length();
            assert!(speed < last, "speed went from {last} to {speed}");
            last = speed;
        }
    }

    #[test]
    fn resting_body_stays_at_rest() {
        let constants = frictionless_space();
        let mut attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut bodies = vec![Body::new(200.0, 0.0, 0.0, 0.0, 15.0, None)];
        for _ in 0..100 {
            step(&mut attractor, &mut bodies, &constants);
        }
        assert_eq!(bodies[0].velocity, DVec2::ZERO);
        assert_eq!(bodies[0].position, DVec2::new(200.0, 0.0));
    }

    #[test]
    fn free_bodies_keep_their_speed() {
        let constants = frictionless_space();
        let mut attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut body = Body::new(200.0, 0.0, 0.0, 1.0e5, 15.0, None);
        body.flags.free = true;
        let mut bodies = vec![body];

        step(&mut attractor, &mut bodies, &constants);
        assert_eq!(bodies[0].velocity, DVec2::new(0.0, 1.0e5));
        assert_relative_eq!(bodies[0].position.y, 1.0e5 * constants.velocity_scale);
    }

    #[test]
    fn gravity_is_applied_before_advancing() {
        let constants = PhysicsConstants::default();
        let mut attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut body = Body::new(150.0, 0.0, 0.0, 0.0, 15.0, None);
        body.flags.free = true;
        let mut bodies = vec![body];

        step(&mut attractor, &mut bodies, &constants);

        let pull = constants.g * attractor.mass() / (150.0 * 150.0);
        assert_relative_eq!(bodies[0].velocity.x, -pull, max_relative = 1e-12);
        assert_relative_eq!(
            bodies[0].position.x,
            150.0 - pull * constants.velocity_scale,
            max_relative = 1e-12
        );
        assert_eq!(attractor.position, DVec2::ZERO);
    }

    #[test]
    fn pan_follows_horizontal_offset() {
        let constants = frictionless_space();
        let mut attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let (module, log) = RecordingModule::new();
        let mut bodies = vec![Body::new(-100.0, 0.0, 0.0, 0.0, 15.0, None).with_sound(Box::new(module))];

        step(&mut attractor, &mut bodies, &constants);
        assert_relative_eq!(log.last_pan().unwrap(), -0.5);
    }
}
