//! Core units, constants, and shared primitives for the Stellar Planner workspace.

/// Physical and numerical constants (kilometres, seconds, radians).
pub mod constants {
    /// π, re-exported so call sites read like the formulas they implement.
    pub const PI: f64 = std::f64::consts::PI;
    /// 2π.
    pub const TWO_PI: f64 = std::f64::consts::TAU;
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Gravitational parameter of the Sun (km³/s²).
    pub const SUN_MU_KM3_S2: f64 = 1.327_124_400_18e11;
    /// Gravitational parameter of the Earth (km³/s²).
    pub const EARTH_MU_KM3_S2: f64 = 398_600.441_8;
    /// Mean equatorial radius of the Earth (km).
    pub const EARTH_RADIUS_KM: f64 = 6_371.0;
    /// Threshold below which eccentricity, inclination or a node vector is treated as zero.
    pub const DEGENERATE_EPSILON: f64 = 1.0e-6;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::{PI, TWO_PI};

    /// Convert degrees to radians.
    #[inline]
    pub fn to_radian(degrees: f64) -> f64 {
        degrees * (PI / 180.0)
    }

    /// Convert radians to degrees.
    #[inline]
    pub fn to_degree(radians: f64) -> f64 {
        radians * (180.0 / PI)
    }

    /// Wrap an angle into `[0, 2π)`.
    #[inline]
    pub fn normalize_radian(theta: f64) -> f64 {
        let wrapped = theta.rem_euclid(TWO_PI);
        // rem_euclid can round up to exactly 2π for tiny negative inputs
        if wrapped >= TWO_PI { 0.0 } else { wrapped }
    }

    /// Signed smallest difference `a - b` wrapped into `(-π, π]`.
    #[inline]
    pub fn angle_difference(a: f64, b: f64) -> f64 {
        let d = normalize_radian(a - b);
        if d > PI { d - TWO_PI } else { d }
    }
}

/// Lightweight time utilities shared across crates.
pub mod time {
    use super::constants::SECONDS_PER_DAY;

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Split a duration into whole days, hours, and minutes.
    pub fn split_duration(seconds: f64) -> (i64, i64, i64) {
        let total_seconds = seconds.max(0.0);
        let days = (total_seconds / SECONDS_PER_DAY).floor() as i64;
        let remaining = total_seconds - (days as f64 * SECONDS_PER_DAY);
        let hours = (remaining / 3_600.0).floor() as i64;
        let minutes = ((remaining - hours as f64 * 3_600.0) / 60.0).floor() as i64;
        (days, hours, minutes)
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// The zero vector.
    pub const ZERO: Vector3 = [0.0, 0.0, 0.0];
    /// Unit vector along +z, the reference-plane normal.
    pub const UNIT_Z: Vector3 = [0.0, 0.0, 1.0];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Unit vector in the direction of `v`, or `None` for a zero-length vector.
    #[inline]
    pub fn normalize(v: &Vector3) -> Option<Vector3> {
        let n = norm(v);
        if n > 0.0 && n.is_finite() {
            Some(scale(v, 1.0 / n))
        } else {
            None
        }
    }

    /// Distance between two points.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }

    /// Unsigned angle between two vectors in `[0, π]`; zero when either is degenerate.
    pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
        let denom = norm(a) * norm(b);
        if denom == 0.0 {
            return 0.0;
        }
        (dot(a, b) / denom).clamp(-1.0, 1.0).acos()
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{PI, TWO_PI};
    use super::units::{angle_difference, normalize_radian, to_degree, to_radian};
    use super::vector::{angle_between, cross, normalize};

    #[test]
    fn radian_conversions_are_exact() {
        assert_eq!(to_radian(90.0), PI / 2.0);
        assert_eq!(to_radian(180.0), PI);
        assert_eq!(to_radian(360.0), PI * 2.0);
        assert_eq!(to_degree(PI), 180.0);
        assert_eq!(to_degree(PI / 2.0), 90.0);
        assert_eq!(to_degree(PI * 2.0), 360.0);
    }

    #[test]
    fn normalize_wraps_into_half_open_range() {
        assert_eq!(normalize_radian(0.0), 0.0);
        assert_eq!(normalize_radian(TWO_PI), 0.0);
        assert!((normalize_radian(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
        assert!((normalize_radian(5.0 * PI) - PI).abs() < 1e-12);
        assert!(normalize_radian(-1e-18) < TWO_PI);
        assert!((angle_difference(0.1, TWO_PI - 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn cross_product_follows_right_hand_rule() {
        assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert!(normalize(&[0.0, 0.0, 0.0]).is_none());
        assert!((angle_between(&[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0]) - PI / 2.0).abs() < 1e-15);
    }
}
