//! Cartesian state vectors, frame rotation and the state-vector → elements conversion.

use stellar_core::constants::DEGENERATE_EPSILON;
use stellar_core::units::normalize_radian;
use stellar_core::vector::{self, Vector3};

use crate::elements::{Orbit, OrbitError, PARABOLIC_EPSILON};
use crate::kepler::mean_from_true;

/// Position (km) and velocity (km/s) relative to the reference body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateVector {
    pub position: Vector3,
    pub velocity: Vector3,
}

/// Rotate a perifocal vector into the reference frame: `Rz(lan) · Rx(i) · Rz(w) · vec`.
pub fn perifocal_to_inertial(lan: f64, inclination: f64, w: f64, vec: &Vector3) -> Vector3 {
    let (sw, cw) = w.sin_cos();
    let x1 = cw * vec[0] - sw * vec[1];
    let y1 = sw * vec[0] + cw * vec[1];
    let z1 = vec[2];

    let (si, ci) = inclination.sin_cos();
    let y2 = ci * y1 - si * z1;
    let z2 = si * y1 + ci * z1;

    let (so, co) = lan.sin_cos();
    [co * x1 - so * y2, so * x1 + co * y2, z2]
}

/// Angle from `from` to `to` measured about `axis`, in `(-π, π]`.
fn angle_about(from: &Vector3, to: &Vector3, axis: &Vector3) -> f64 {
    vector::dot(&vector::cross(from, to), axis).atan2(vector::dot(from, to))
}

/// Build an orbit from a relative state vector.
///
/// Degenerate geometry is resolved deterministically: equatorial orbits get `lan = 0` and carry
/// the longitude of periapsis in `w`; circular orbits get `w = 0` and measure the anomaly from
/// the ascending node (or from +x when also equatorial).
pub fn cartesian_to_orbit(
    position: &Vector3,
    velocity: &Vector3,
    gm: f64,
    epoch: f64,
) -> Result<Orbit, OrbitError> {
    if !(gm > 0.0 && gm.is_finite()) {
        return Err(OrbitError::InvalidGravitationalParameter(gm));
    }
    let radius = vector::norm(position);
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(OrbitError::DegenerateState("position coincides with the focus"));
    }
    if !vector::norm(velocity).is_finite() {
        return Err(OrbitError::NonFinite("velocity"));
    }

    let h = vector::cross(position, velocity);
    let h_mag = vector::norm(&h);
    if h_mag <= 0.0 {
        return Err(OrbitError::DegenerateState("zero angular momentum"));
    }
    let h_hat = vector::scale(&h, 1.0 / h_mag);

    let ecc_vec = vector::sub(
        &vector::scale(&vector::cross(velocity, &h), 1.0 / gm),
        &vector::scale(position, 1.0 / radius),
    );
    let ecc = vector::norm(&ecc_vec);
    if (ecc - 1.0).abs() < PARABOLIC_EPSILON {
        return Err(OrbitError::Parabolic);
    }

    let speed_sq = vector::dot(velocity, velocity);
    let semi_major_axis = 1.0 / (2.0 / radius - speed_sq / gm);
    let inclination = (h_hat[2]).clamp(-1.0, 1.0).acos();

    let node = [-h[1], h[0], 0.0];
    let node_mag = vector::norm(&node);
    let equatorial = node_mag < DEGENERATE_EPSILON * h_mag;
    let circular = ecc < DEGENERATE_EPSILON;

    let (lan, reference) = if equatorial {
        (0.0, [1.0, 0.0, 0.0])
    } else {
        (
            normalize_radian(node[1].atan2(node[0])),
            vector::scale(&node, 1.0 / node_mag),
        )
    };

    let (w, true_anomaly) = if circular {
        (0.0, angle_about(&reference, position, &h_hat))
    } else {
        (
            normalize_radian(angle_about(&reference, &ecc_vec, &h_hat)),
            angle_about(&ecc_vec, position, &h_hat),
        )
    };

    let mut m0 = mean_from_true(ecc, true_anomaly);
    if ecc < 1.0 {
        m0 = normalize_radian(m0);
    }

    let orbit = Orbit {
        semi_major_axis,
        eccentricity: ecc,
        inclination,
        lan,
        w,
        m0,
        epoch,
        gm,
        reference_body: None,
    };
    orbit.validate()?;
    Ok(orbit)
}

impl Orbit {
    /// Orbit after an instantaneous burn at `time`.
    ///
    /// `impulse` is expressed in the local frame at the burn point: x radial-out, y prograde
    /// (transverse), z along the orbit normal.
    pub fn apply_impulse(&self, impulse: &Vector3, time: f64) -> Result<Orbit, OrbitError> {
        let v = self.true_anomaly_at(time);
        let inertial = self.local_to_inertial(v, impulse);
        self.burn_at_anomaly(v, &inertial, time)
    }

    /// Orbit after an instantaneous burn given in the reference frame.
    pub fn apply_inertial_impulse(&self, impulse: &Vector3, time: f64) -> Result<Orbit, OrbitError> {
        let v = self.true_anomaly_at(time);
        self.burn_at_anomaly(v, impulse, time)
    }

    fn burn_at_anomaly(&self, v: f64, inertial: &Vector3, time: f64) -> Result<Orbit, OrbitError> {
        let state = self.to_cartesian(v)?;
        let velocity = vector::add(&state.velocity, inertial);
        let mut orbit = cartesian_to_orbit(&state.position, &velocity, self.gm, time)?;
        orbit.reference_body = self.reference_body;
        Ok(orbit)
    }

    /// True anomaly of the direction `direction` projected onto the orbital plane.
    pub fn true_anomaly_from_vector(&self, direction: &Vector3) -> f64 {
        let periapsis = self.radial_direction(0.0);
        normalize_radian(angle_about(&periapsis, direction, &self.normal()))
    }

    /// True anomaly of the ascending node (argument of latitude zero).
    pub fn ascending_true_anomaly(&self) -> f64 {
        normalize_radian(-self.w)
    }

    /// True anomaly of the descending node.
    pub fn descending_true_anomaly(&self) -> f64 {
        normalize_radian(stellar_core::constants::PI - self.w)
    }

    /// True anomaly where this orbit crosses `other`'s plane along `n_self × n_other`.
    ///
    /// `None` when the planes coincide.
    pub fn relative_node_anomaly(&self, other: &Orbit) -> Option<f64> {
        let line = vector::cross(&self.normal(), &other.normal());
        if vector::norm(&line) < DEGENERATE_EPSILON {
            return None;
        }
        Some(self.true_anomaly_from_vector(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::{EARTH_MU_KM3_S2, PI};
    use stellar_core::units::angle_difference;

    #[test]
    fn rotation_with_zero_angles_is_identity() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(perifocal_to_inertial(0.0, 0.0, 0.0, &v), v);
        let tilted = perifocal_to_inertial(0.0, PI / 2.0, 0.0, &[0.0, 1.0, 0.0]);
        assert!(tilted[1].abs() < 1e-15 && (tilted[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn circular_equatorial_state_measures_from_x_axis() {
        let r = 7_000.0;
        let speed = (EARTH_MU_KM3_S2 / r).sqrt();
        let orbit = cartesian_to_orbit(&[0.0, r, 0.0], &[-speed, 0.0, 0.0], EARTH_MU_KM3_S2, 0.0)
            .expect("valid state");
        assert!(orbit.eccentricity < 1e-9);
        assert_eq!(orbit.lan, 0.0);
        assert_eq!(orbit.w, 0.0);
        assert!((orbit.semi_major_axis - r).abs() < 1e-6);
        assert!(angle_difference(orbit.m0, PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn retrograde_equatorial_keeps_direction_of_motion() {
        let r = 7_000.0;
        let speed = (EARTH_MU_KM3_S2 / r).sqrt();
        let orbit = cartesian_to_orbit(&[0.0, r, 0.0], &[speed, 0.0, 0.0], EARTH_MU_KM3_S2, 0.0)
            .expect("valid state");
        assert!((orbit.inclination - PI).abs() < 1e-12);
        let position = orbit.position_at(orbit.true_anomaly_at(0.0)).unwrap();
        assert!(position[0].abs() < 1e-6 && (position[1] - r).abs() < 1e-6);
    }

    #[test]
    fn degenerate_states_are_rejected() {
        assert!(matches!(
            cartesian_to_orbit(&[0.0; 3], &[1.0, 0.0, 0.0], EARTH_MU_KM3_S2, 0.0),
            Err(OrbitError::DegenerateState(_))
        ));
        assert!(matches!(
            cartesian_to_orbit(&[7_000.0, 0.0, 0.0], &[3.0, 0.0, 0.0], EARTH_MU_KM3_S2, 0.0),
            Err(OrbitError::DegenerateState(_))
        ));
    }

    #[test]
    fn prograde_impulse_raises_apoapsis() {
        let orbit = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let raised = orbit.apply_impulse(&[0.0, 0.5, 0.0], 0.0).unwrap();
        assert!((raised.periapsis() - 7_000.0).abs() < 1e-6);
        assert!(raised.apoapsis() > 8_000.0);
        assert!(raised.inclination < 1e-12);
    }

    #[test]
    fn normal_impulse_tilts_the_plane() {
        let orbit = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let tilted = orbit.apply_impulse(&[0.0, 0.0, 1.0], 0.0).unwrap();
        let expected = (1.0 / (EARTH_MU_KM3_S2 / 7_000.0).sqrt()).atan();
        assert!((tilted.inclination - expected).abs() < 1e-9);
        assert_eq!(tilted.epoch, 0.0);
    }

    #[test]
    fn node_anomalies_lie_in_the_reference_plane() {
        let orbit = Orbit::new(9_000.0, 0.1, 0.4, 1.0, 0.7, 0.0, EARTH_MU_KM3_S2).unwrap();
        let asc = orbit.position_at(orbit.ascending_true_anomaly()).unwrap();
        let desc = orbit.position_at(orbit.descending_true_anomaly()).unwrap();
        assert!(asc[2].abs() < 1e-9);
        assert!(desc[2].abs() < 1e-9);
        let node_direction = [orbit.lan.cos(), orbit.lan.sin(), 0.0];
        let v = orbit.true_anomaly_from_vector(&node_direction);
        assert!(angle_difference(v, orbit.ascending_true_anomaly()).abs() < 1e-12);
    }
}
