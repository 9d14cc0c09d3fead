//! Kepler's equation and the anomaly conversions built around it.
//!
//! Elliptic orbits use the eccentric anomaly `E` with `M = E - e sin E`; hyperbolic
//! orbits use the hyperbolic anomaly `F` with `M = e sinh F - F`.

use tracing::warn;

/// Iteration controls for the Newton–Raphson Kepler solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSettings {
    /// Stop once a Newton step is smaller than this (radians).
    pub tolerance: f64,
    /// Hard iteration budget; exceeding it yields a non-converged solution.
    pub max_iterations: u32,
}

impl Default for KeplerSettings {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-10,
            max_iterations: 50,
        }
    }
}

/// Outcome of a Kepler solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Eccentric (or hyperbolic) anomaly in radians.
    pub anomaly: f64,
    pub iterations: u32,
    /// `false` when the budget ran out; `anomaly` is then the last iterate.
    pub converged: bool,
}

/// Solve `M = E - e sin E` for `E`.
pub fn solve_kepler_elliptic(mean_anomaly: f64, ecc: f64, settings: &KeplerSettings) -> KeplerSolution {
    if ecc.abs() < 1.0e-9 {
        return KeplerSolution {
            anomaly: mean_anomaly,
            iterations: 0,
            converged: true,
        };
    }

    // Danby's starter for very eccentric orbits; plain M is fine otherwise.
    let mut ea = if ecc < 0.8 {
        mean_anomaly
    } else {
        mean_anomaly + 0.85 * ecc * mean_anomaly.sin().signum()
    };
    let mut iterations = 0;
    while iterations < settings.max_iterations {
        let step = (ea - ecc * ea.sin() - mean_anomaly) / (1.0 - ecc * ea.cos());
        ea -= step;
        iterations += 1;
        if step.abs() <= settings.tolerance {
            return KeplerSolution {
                anomaly: ea,
                iterations,
                converged: true,
            };
        }
    }

    warn!(
        mean_anomaly,
        eccentricity = ecc,
        iterations,
        "elliptic Kepler solve did not converge, using last iterate"
    );
    KeplerSolution {
        anomaly: ea,
        iterations,
        converged: false,
    }
}

/// Solve `M = e sinh F - F` for `F`.
pub fn solve_kepler_hyperbolic(mean_anomaly: f64, ecc: f64, settings: &KeplerSettings) -> KeplerSolution {
    let mut fa = if mean_anomaly == 0.0 {
        0.0
    } else {
        mean_anomaly.signum() * (2.0 * mean_anomaly.abs() / ecc + 1.8).ln()
    };
    let mut iterations = 0;
    while iterations < settings.max_iterations {
        let step = (ecc * fa.sinh() - fa - mean_anomaly) / (ecc * fa.cosh() - 1.0);
        fa -= step;
        iterations += 1;
        if step.abs() <= settings.tolerance {
            return KeplerSolution {
                anomaly: fa,
                iterations,
                converged: true,
            };
        }
    }

    warn!(
        mean_anomaly,
        eccentricity = ecc,
        iterations,
        "hyperbolic Kepler solve did not converge, using last iterate"
    );
    KeplerSolution {
        anomaly: fa,
        iterations,
        converged: false,
    }
}

/// Eccentric anomaly for a true anomaly on an ellipse, in `(-π, π]`.
pub fn eccentric_from_true(ecc: f64, v: f64) -> f64 {
    2.0 * ((1.0 - ecc).sqrt() * (v / 2.0).sin()).atan2((1.0 + ecc).sqrt() * (v / 2.0).cos())
}

/// True anomaly for an eccentric anomaly on an ellipse.
pub fn true_from_eccentric(ecc: f64, ea: f64) -> f64 {
    2.0 * ((1.0 + ecc).sqrt() * (ea / 2.0).sin()).atan2((1.0 - ecc).sqrt() * (ea / 2.0).cos())
}

/// Hyperbolic anomaly for a true anomaly inside the asymptotes.
pub fn hyperbolic_from_true(ecc: f64, v: f64) -> f64 {
    2.0 * (((ecc - 1.0) / (ecc + 1.0)).sqrt() * (v / 2.0).tan()).atanh()
}

/// True anomaly for a hyperbolic anomaly.
pub fn true_from_hyperbolic(ecc: f64, fa: f64) -> f64 {
    2.0 * (((ecc + 1.0) / (ecc - 1.0)).sqrt() * (fa / 2.0).tanh()).atan()
}

/// Mean anomaly for a true anomaly: `E - e sin E` on ellipses, `e sinh F - F` on hyperbolas.
pub fn mean_from_true(ecc: f64, v: f64) -> f64 {
    if ecc < 1.0 {
        let ea = eccentric_from_true(ecc, v);
        ea - ecc * ea.sin()
    } else {
        let fa = hyperbolic_from_true(ecc, v);
        ecc * fa.sinh() - fa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::TWO_PI;

    #[test]
    fn elliptic_solution_satisfies_keplers_equation() {
        let settings = KeplerSettings::default();
        for &ecc in &[0.0, 0.1, 0.5, 0.9, 0.99] {
            for step in 0..36 {
                let m = TWO_PI * step as f64 / 36.0;
                let sol = solve_kepler_elliptic(m, ecc, &settings);
                assert!(sol.converged, "e={ecc} M={m}");
                let residual = sol.anomaly - ecc * sol.anomaly.sin() - m;
                assert!(residual.abs() < 1e-9, "e={ecc} M={m} residual={residual}");
            }
        }
    }

    #[test]
    fn hyperbolic_solution_satisfies_keplers_equation() {
        let settings = KeplerSettings::default();
        for &ecc in &[1.1, 2.0, 5.0] {
            for &m in &[-20.0, -1.0, 0.0, 0.3, 4.0, 50.0] {
                let sol = solve_kepler_hyperbolic(m, ecc, &settings);
                assert!(sol.converged, "e={ecc} M={m}");
                let residual = ecc * sol.anomaly.sinh() - sol.anomaly - m;
                assert!(residual.abs() < 1e-8, "e={ecc} M={m} residual={residual}");
            }
        }
    }

    #[test]
    fn exhausted_budget_reports_last_iterate() {
        let settings = KeplerSettings {
            tolerance: 0.0,
            max_iterations: 1,
        };
        let sol = solve_kepler_elliptic(1.0, 0.7, &settings);
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 1);
        assert!(sol.anomaly.is_finite());
    }

    #[test]
    fn anomaly_conversions_invert_each_other() {
        for &ecc in &[0.0, 0.3, 0.8] {
            for step in -17..18 {
                let v = step as f64 * 0.17;
                let back = true_from_eccentric(ecc, eccentric_from_true(ecc, v));
                assert!((back - v).abs() < 1e-12, "e={ecc} v={v} back={back}");
            }
        }
        let ecc = 1.5;
        for &v in &[-1.5, -0.2, 0.0, 0.9, 2.0] {
            let back = true_from_hyperbolic(ecc, hyperbolic_from_true(ecc, v));
            assert!((back - v).abs() < 1e-10, "v={v} back={back}");
        }
    }
}
