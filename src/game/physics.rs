//! Guarded vector math shared by the resolver, the field and the skills.
//!
//! Every divide in the simulation goes through one of these helpers so a
//! zero distance or a zero mass can never turn into NaN.

use glam::Vec2;

/// Distance below which two points count as coincident.
pub const MIN_DISTANCE: f32 = 1e-4;

/// Mass used when a record somehow carries a non-positive mass.
pub const FALLBACK_MASS: f32 = 1.0;

/// Replace a zero (or non-finite) distance with 1.
#[inline]
pub fn guard_distance(d: f32) -> f32 {
    if d.is_finite() && d > MIN_DISTANCE {
        d
    } else {
        1.0
    }
}

/// Replace a non-positive (or non-finite) mass with 1.
#[inline]
pub fn guard_mass(m: f32) -> f32 {
    if m.is_finite() && m > 0.0 {
        m
    } else {
        FALLBACK_MASS
    }
}

/// Unit vector from `from` toward `to` plus the raw distance.
///
/// Coincident points yield `+X` so callers always get a usable direction.
#[inline]
pub fn direction(from: Vec2, to: Vec2) -> (Vec2, f32) {
    let delta = to - from;
    let dist = delta.length();
    if dist > MIN_DISTANCE && dist.is_finite() {
        (delta / dist, dist)
    } else {
        (Vec2::X, 0.0)
    }
}

/// Unit vector of `v`, or zero for a zero vector.
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let len = v.length();
    if len > MIN_DISTANCE && len.is_finite() {
        v / len
    } else {
        Vec2::ZERO
    }
}

/// Velocity change produced by pushing `mass` with `force` along `dir`.
#[inline]
pub fn knockback_impulse(dir: Vec2, force: f32, mass: f32) -> Vec2 {
    dir * (force / guard_mass(mass))
}

/// Linear falloff: 1 at the centre, 0 at `radius`.
#[inline]
pub fn linear_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

/// Inverse-square falloff normalised by radius, clamped to `[0, 1]`.
///
/// `epsilon` keeps the value bounded at the centre.
#[inline]
pub fn inverse_square_falloff(distance: f32, radius: f32, epsilon: f32) -> f32 {
    if radius <= 0.0 || distance > radius {
        return 0.0;
    }
    let n = distance / radius;
    (epsilon / (n * n + epsilon)).clamp(0.0, 1.0)
}

/// Reflect the component of `velocity` along `normal`, scaled by
/// `restitution`. Only reflects when moving into the surface.
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let n = normalize_or_zero(normal);
    let along = velocity.dot(n);
    if along >= 0.0 {
        return velocity;
    }
    let tangent = velocity - n * along;
    tangent - n * along * restitution
}

/// Rotate a vector by `angle` radians.
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_knockback_decreases_with_mass() {
        let dir = Vec2::X;
        let mut last = f32::INFINITY;
        for mass in [0.5, 1.0, 2.0, 4.0, 10.0, 100.0] {
            let magnitude = knockback_impulse(dir, 50.0, mass).length();
            assert!(magnitude < last, "mass {mass} gave {magnitude}");
            last = magnitude;
        }
    }

    #[test]
    fn test_zero_mass_falls_back() {
        let v = knockback_impulse(Vec2::Y, 10.0, 0.0);
        assert_relative_eq!(v.y, 10.0);
        assert!(v.is_finite());
    }

    #[test]
    fn test_direction_of_coincident_points_is_finite() {
        let (dir, dist) = direction(Vec2::new(3.0, 3.0), Vec2::new(3.0, 3.0));
        assert_eq!(dist, 0.0);
        assert!(dir.is_finite());
        assert_relative_eq!(dir.length(), 1.0);
    }

    #[test]
    fn test_reflect_with_restitution() {
        let v = reflect(Vec2::new(2.0, -4.0), Vec2::Y, 0.5);
        assert_relative_eq!(v.x, 2.0);
        assert_relative_eq!(v.y, 2.0);
        // Moving away from the surface: untouched
        let away = reflect(Vec2::new(0.0, 3.0), Vec2::Y, 0.5);
        assert_relative_eq!(away.y, 3.0);
    }

    #[test]
    fn test_falloffs() {
        assert_relative_eq!(linear_falloff(0.0, 10.0), 1.0);
        assert_relative_eq!(linear_falloff(5.0, 10.0), 0.5);
        assert_eq!(linear_falloff(20.0, 10.0), 0.0);
        assert_eq!(linear_falloff(1.0, 0.0), 0.0);

        let near = inverse_square_falloff(1.0, 100.0, 0.05);
        let far = inverse_square_falloff(80.0, 100.0, 0.05);
        assert!(near > far);
        assert!(near <= 1.0);
        assert_eq!(inverse_square_falloff(120.0, 100.0, 0.05), 0.0);
    }
}
