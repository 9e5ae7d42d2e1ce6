/// Hazen-Williams resistance constant in SI units (m, m3/s).
pub const HW_K: f64 = 10.67;

/// Exponent of the Hazen-Williams flow term.
pub const HW_EXP: f64 = 1.852;

// Flow thresholds (m3/s) bounding the transitional regime. Below Q1 the
// loss is linear in Q; above Q2 it is the physical power law; between
// them a cubic keeps the function and its slope continuous. The pure
// power law has a vertical tangent at Q=0 which would make the Jacobian
// singular whenever a link stagnates.
pub const Q1: f64 = 0.00349347323944;
pub const Q2: f64 = 0.00549347323944;

/// Slope of the linear regime.
const LINEAR_SLOPE: f64 = 0.01;

// Cubic transition coefficients: P(x) = C0 + C1*x + C2*x^2 + C3*x^3,
// matching the linear branch at Q1 and the power law at Q2 in both
// value and slope.
const C0: f64 = 2.45944613543e-06;
const C1: f64 = 0.0138413824671;
const C2: f64 = -2.80374270811;
const C3: f64 = 430.125623753;

/// Pipe resistance coefficient for the Hazen-Williams relation:
/// `hl = resistance * Q * |Q|^0.852`.
pub fn pipe_resistance(roughness: f64, diameter: f64, length: f64) -> f64 {
    HW_K * roughness.powf(-HW_EXP) * diameter.powf(-4.871) * length
}

/// Regularized unit head-loss term: `Q*|Q|^0.852` away from zero flow,
/// smoothly flattened below Q2. The sign follows the sign of Q.
pub fn unit_headloss(q: f64) -> f64 {
    let abs_q = q.abs();
    let value = if abs_q < Q1 {
        LINEAR_SLOPE * abs_q
    } else if abs_q > Q2 {
        abs_q.powf(HW_EXP)
    } else {
        C0 + C1 * abs_q + C2 * abs_q * abs_q + C3 * abs_q * abs_q * abs_q
    };
    if q < 0.0 {
        -value
    } else {
        value
    }
}

/// Derivative of `unit_headloss` with respect to Q. The function is odd
/// in Q, so the derivative is even and can be evaluated on |Q|.
pub fn unit_headloss_deriv(abs_q: f64) -> f64 {
    if abs_q < Q1 {
        LINEAR_SLOPE
    } else if abs_q > Q2 {
        HW_EXP * abs_q.powf(HW_EXP - 1.0)
    } else {
        C1 + 2.0 * C2 * abs_q + 3.0 * C3 * abs_q * abs_q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuity_at_thresholds() {
        let eps = 1e-9;
        for q in [Q1, Q2] {
            let below = unit_headloss(q - eps);
            let above = unit_headloss(q + eps);
            assert!(
                (below - above).abs() < 1e-6,
                "value jump at {}: {} vs {}",
                q,
                below,
                above
            );

            let d_below = unit_headloss_deriv(q - eps);
            let d_above = unit_headloss_deriv(q + eps);
            assert!(
                (d_below - d_above).abs() < 1e-6,
                "slope jump at {}: {} vs {}",
                q,
                d_below,
                d_above
            );
        }
    }

    #[test]
    fn test_sign_follows_flow() {
        for q in [1e-4, 4e-3, 0.1, 3.0] {
            assert!(unit_headloss(q) > 0.0);
            assert_eq!(unit_headloss(-q), -unit_headloss(q));
        }
        assert_eq!(unit_headloss(0.0), 0.0);
    }

    #[test]
    fn test_physical_regime_matches_power_law() {
        let q = 0.25;
        assert!((unit_headloss(q) - q.powf(HW_EXP)).abs() < 1e-12);
        assert!((unit_headloss_deriv(q) - HW_EXP * q.powf(HW_EXP - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_positive_everywhere() {
        // A non-positive slope anywhere would re-introduce the singular
        // Jacobian the regularization exists to avoid.
        let mut q = 0.0;
        while q < 0.02 {
            assert!(unit_headloss_deriv(q) > 0.0, "non-positive slope at {}", q);
            q += 1e-5;
        }
    }
}
