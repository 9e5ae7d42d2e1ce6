use crate::network::curve::{pump_coefficients, Curve, CurveType};

/*
The fitted (A, B, C) must reproduce the curve's own points through
h = A - B*Q^C.
 */
fn assert_fit(curve: &Curve, a: f64, b: f64, c: f64) {
    for &(q, h) in &curve.points {
        let fitted = a - b * q.powf(c);
        assert!(
            (fitted - h).abs() < 1e-6,
            "point ({}, {}) reproduced as {}",
            q,
            h,
            fitted
        );
    }
}

#[test]
fn test_single_point_curve() {
    let curve = Curve::new("one", CurveType::Head, vec![(0.05, 30.0)]);
    let (a, b, c) = pump_coefficients(&curve).unwrap();
    assert!((a - 40.0).abs() < 1e-12);
    assert!((b - 4000.0).abs() < 1e-9);
    assert_eq!(c, 2.0);
    assert_fit(&curve, a, b, c);
}

#[test]
fn test_three_point_curve_with_shutoff_point() {
    // First point at zero flow: the closed-form branch
    let curve = Curve::new(
        "shutoff",
        CurveType::Head,
        vec![(0.0, 50.0), (0.05, 40.0), (0.1, 20.0)],
    );
    let (a, b, c) = pump_coefficients(&curve).unwrap();
    assert!((a - 50.0).abs() < 1e-12);
    assert_fit(&curve, a, b, c);
}

#[test]
fn test_three_point_curve_newton_fit() {
    // Generate consistent points from known coefficients and check the
    // Newton branch recovers them
    let (a_true, b_true, c_true) = (60.0, 900.0, 1.8);
    let points: Vec<(f64, f64)> = [0.02, 0.05, 0.09]
        .iter()
        .map(|&q| (q, a_true - b_true * f64::powf(q, c_true)))
        .collect();
    let curve = Curve::new("fit", CurveType::Head, points);
    let (a, b, c) = pump_coefficients(&curve).unwrap();
    assert!((a - a_true).abs() < 1e-5, "A = {}", a);
    assert!((b - b_true).abs() < 1e-2, "B = {}", b);
    assert!((c - c_true).abs() < 1e-5, "C = {}", c);
    assert_fit(&curve, a, b, c);
}

#[test]
fn test_multi_point_curve_rejected() {
    let curve = Curve::new(
        "multi",
        CurveType::Head,
        vec![(0.0, 50.0), (0.02, 45.0), (0.05, 40.0), (0.1, 20.0)],
    );
    assert!(pump_coefficients(&curve).is_err());
}

#[test]
fn test_non_decreasing_shutoff_curve_rejected() {
    let curve = Curve::new(
        "rising",
        CurveType::Head,
        vec![(0.0, 30.0), (0.05, 40.0), (0.1, 20.0)],
    );
    assert!(pump_coefficients(&curve).is_err());
}
