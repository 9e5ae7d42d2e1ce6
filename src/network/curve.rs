use nalgebra::{Matrix3, Vector3};

use crate::network::error::NetworkError;
use crate::numerical::interpolation::interp_clamped;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveType {
    Head,
    Volume,
    Efficiency,
    Headloss,
}

impl CurveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveType::Head => "HEAD",
            CurveType::Volume => "VOLUME",
            CurveType::Efficiency => "EFFICIENCY",
            CurveType::Headloss => "HEADLOSS",
        }
    }

    pub fn from_str(s: &str) -> Option<CurveType> {
        match s.to_ascii_uppercase().as_str() {
            "HEAD" => Some(CurveType::Head),
            "VOLUME" => Some(CurveType::Volume),
            "EFFICIENCY" => Some(CurveType::Efficiency),
            "HEADLOSS" => Some(CurveType::Headloss),
            _ => None,
        }
    }
}

/*
A named curve: an ordered list of (x, y) points. Head curves relate pump
flow (m3/s) to added head (m), volume curves relate tank level (m) to
stored volume (m3).
 */
#[derive(Clone, Debug)]
pub struct Curve {
    pub name: String,
    pub curve_type: CurveType,
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(name: &str, curve_type: CurveType, points: Vec<(f64, f64)>) -> Curve {
        Curve {
            name: name.to_string(),
            curve_type,
            points,
        }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Piecewise-linear lookup of y at x, clamped to the curve's range.
    pub fn interpolate(&self, x: f64) -> f64 {
        interp_clamped(&self.points, x)
    }
}

/// Derive the (A, B, C) coefficients of the pump head relation
/// `h_gain = A - B*Q^C` from a 1- or 3-point head curve.
///
/// For a single point (Q1, H1) the standard synthetic curve is used:
/// `A = 4/3*H1`, `B = 1/3*H1/Q1^2`, `C = 2`. A three-point curve whose
/// first point sits at zero flow has the closed-form solution; otherwise
/// the 3x3 nonlinear system is solved with Newton's method. Curves with
/// any other point count are rejected.
pub fn pump_coefficients(curve: &Curve) -> Result<(f64, f64, f64), NetworkError> {
    match curve.num_points() {
        1 => {
            let (q1, h1) = curve.points[0];
            if q1 <= 0.0 {
                return Err(NetworkError::InvalidCurve(format!(
                    "Pump curve '{}' has a non-positive design flow",
                    curve.name
                )));
            }
            let a = (4.0 / 3.0) * h1;
            let b = (1.0 / 3.0) * (h1 / (q1 * q1));
            Ok((a, b, 2.0))
        }
        3 => {
            let (q1, h1) = curve.points[0];
            let (q2, h2) = curve.points[1];
            let (q3, h3) = curve.points[2];

            if q1 == 0.0 {
                // First point at shutoff: closed form
                if h1 <= h2 || h1 <= h3 || q2 <= 0.0 || q3 <= 0.0 || q2 == q3 {
                    return Err(NetworkError::InvalidCurve(format!(
                        "Pump curve '{}' is not strictly decreasing",
                        curve.name
                    )));
                }
                let a = h1;
                let c = libm::log((h1 - h2) / (h1 - h3)) / libm::log(q2 / q3);
                let b = (h1 - h2) / libm::pow(q2, c);
                Ok((a, b, c))
            } else {
                fit_three_point(curve, [q1, q2, q3], [h1, h2, h3])
            }
        }
        n => Err(NetworkError::InvalidCurve(format!(
            "Pump curve '{}' has {} points; only 1- and 3-point head curves are supported",
            curve.name, n
        ))),
    }
}

/*
Damped Newton iteration on the system H_i = A - B*Q_i^C for a 3-point
curve whose first point is away from zero flow. The raw Newton step is
badly scaled in the exponent direction from the standard initial guess,
so the step is capped to |dC| <= 0.5 and a halving line search keeps
the residual norm decreasing.
 */
fn fit_three_point(
    curve: &Curve,
    q: [f64; 3],
    h: [f64; 3],
) -> Result<(f64, f64, f64), NetworkError> {
    const MAX_ITER: usize = 200;
    const MAX_HALVINGS: usize = 40;
    const MAX_EXPONENT_STEP: f64 = 0.5;
    const TOL: f64 = 1e-10;

    if q.iter().any(|&qi| qi <= 0.0) {
        return Err(NetworkError::InvalidCurve(format!(
            "Pump curve '{}' has a non-positive flow in a 3-point fit",
            curve.name
        )));
    }

    let residual_at = |x: &Vector3<f64>| -> Vector3<f64> {
        Vector3::new(
            h[0] - x[0] + x[1] * libm::pow(q[0], x[2]),
            h[1] - x[0] + x[1] * libm::pow(q[1], x[2]),
            h[2] - x[0] + x[1] * libm::pow(q[2], x[2]),
        )
    };

    let mut x = Vector3::new(200.0, 1e-3, 1.5);
    let mut residual = residual_at(&x);
    let mut r_norm = residual.amax();

    for _ in 0..MAX_ITER {
        if r_norm < TOL {
            return Ok((x[0], x[1], x[2]));
        }

        let mut jac = Matrix3::zeros();
        for i in 0..3 {
            let qc = libm::pow(q[i], x[2]);
            jac[(i, 0)] = -1.0;
            jac[(i, 1)] = qc;
            jac[(i, 2)] = x[1] * qc * libm::log(q[i]);
        }
        let step = match jac.lu().solve(&residual) {
            Some(s) => s,
            None => {
                return Err(NetworkError::InvalidCurve(format!(
                    "Pump curve '{}': singular system in 3-point fit",
                    curve.name
                )))
            }
        };

        let mut alpha = 1.0;
        if step[2].abs() > MAX_EXPONENT_STEP {
            alpha = MAX_EXPONENT_STEP / step[2].abs();
        }
        let mut halvings = 0;
        loop {
            let x_trial = x - step * alpha;
            let r_trial = residual_at(&x_trial);
            let trial_norm = r_trial.amax();
            if (trial_norm.is_finite() && trial_norm < r_norm) || halvings >= MAX_HALVINGS {
                x = x_trial;
                residual = r_trial;
                r_norm = trial_norm;
                break;
            }
            alpha *= 0.5;
            halvings += 1;
        }
        if !r_norm.is_finite() {
            break;
        }
    }

    Err(NetworkError::InvalidCurve(format!(
        "Pump curve '{}': 3-point fit did not converge",
        curve.name
    )))
}
