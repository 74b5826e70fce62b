use glam::DVec2;

/// Inverse-square force between an attractor and a target.
///
/// The squared distance is divided by `g` before use, so this is
/// `g * m_attractor * m_target / d²`.
pub fn force_magnitude(attractor_mass: f64, target_mass: f64, distance_sq: f64, g: f64) -> f64 {
    let effective_sq = distance_sq / g;
    attractor_mass * target_mass / effective_sq
}

/// Per-tick velocity change of a target pulled by an attractor.
///
/// Returns zero when the two centers coincide or the result is not finite.
pub fn velocity_change(
    attractor_position: DVec2,
    attractor_mass: f64,
    target_position: DVec2,
    g: f64,
) -> DVec2 {
    let offset = attractor_position - target_position;
    let distance_sq = offset.length_squared();
    if distance_sq <= f64::EPSILON || g == 0.0 {
        log::trace!("skipping gravity at degenerate distance {distance_sq}");
        return DVec2::ZERO;
    }

    // per unit of target mass, so the target's own mass cancels out
    let acceleration = force_magnitude(attractor_mass, 1.0, distance_sq, g);
    let phi = offset.y.atan2(offset.x);
    let delta = DVec2::new(phi.cos(), phi.sin()) * acceleration;

    if delta.is_finite() {
        delta
    } else {
        DVec2::ZERO
    }
}
