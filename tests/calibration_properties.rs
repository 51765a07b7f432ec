//! Property-based tests for calibration fitting.

use proptest::prelude::*;
use temp_daq::{CalibrationModel, DaqError, ExpressionKind, FitMethod, Sample};

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds samples from integer centivolts and decidegrees, so every value is
/// already exact at three decimals.
fn samples_from(points: &std::collections::BTreeMap<i32, i32>) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|(&cv, &dd)| (f64::from(cv) / 100.0, f64::from(dd) / 10.0))
        .collect()
}

fn model_with(method: FitMethod, points: &[(f64, f64)]) -> CalibrationModel {
    let mut model = CalibrationModel::linear(method);
    for &(v, t) in points {
        model.add_raw_sample(v, t).unwrap();
    }
    model
}

fn sse(points: &[(f64, f64)], predict: impl Fn(f64) -> f64) -> f64 {
    points.iter().map(|&(v, t)| (predict(v) - t).powi(2)).sum()
}

/// Worst-case error a stored prediction carries from 3-decimal rounding of
/// the coefficients and of the result.
fn rounding_slack(voltage: f64) -> f64 {
    0.0005 * (voltage.abs() + 2.0)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// No other line has a smaller sum of squared errors than the fitted one
    #[test]
    fn test_least_squares_line_is_optimal(
        points in prop::collection::btree_map(-500i32..500, -1000i32..1000, 2..12),
        other_slope in -200.0f64..200.0,
        other_intercept in -200.0f64..200.0,
    ) {
        let points = samples_from(&points);
        let mut model = model_with(FitMethod::LeastSquares, &points);
        model.fit().unwrap();

        let fitted = sse(&points, |v| model.calculate_temperature(v).unwrap());
        let candidate = sse(&points, |v| other_slope * v + other_intercept);

        // Allow for the rounding of the stored coefficients and predictions.
        let slack: f64 = points
            .iter()
            .map(|&(v, t)| {
                let d = rounding_slack(v);
                let r = (model.calculate_temperature(v).unwrap() - t).abs();
                2.0 * (r + d) * d + d * d
            })
            .sum();
        prop_assert!(
            fitted <= candidate + slack,
            "fitted sse {} > candidate sse {} (+{})", fitted, candidate, slack
        );
    }

    /// A two-point interpolation passes through both anchors
    #[test]
    fn test_interpolation_reproduces_anchors(
        points in prop::collection::btree_map(-500i32..500, -1000i32..1000, 2..=2),
    ) {
        let points = samples_from(&points);
        let mut model = model_with(FitMethod::LinearInterpolation, &points);
        let a = model.sample_at(0).unwrap();
        let b = model.sample_at(1).unwrap();
        model.set_interpolation_anchors(a, b).unwrap();
        model.fit().unwrap();

        for anchor in [a, b] {
            let predicted = model.calculate_temperature(anchor.voltage).unwrap();
            prop_assert!(
                (predicted - anchor.temperature).abs() <= rounding_slack(anchor.voltage) + 1e-9,
                "{} V: predicted {}, anchor {}", anchor.voltage, predicted, anchor.temperature
            );
        }
    }

    /// Refitting an unchanged sample set gives the same coefficients
    #[test]
    fn test_fit_is_idempotent(
        points in prop::collection::btree_map(-500i32..500, -1000i32..1000, 3..12),
    ) {
        let points = samples_from(&points);
        let mut model = CalibrationModel::non_linear();
        for &(v, t) in &points {
            model.add_raw_sample(v, t).unwrap();
        }
        model.fit().unwrap();
        let first = model.coefficients();
        model.fit().unwrap();
        prop_assert_eq!(first, model.coefficients());
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_non_linear_needs_three_samples() {
    let mut model = CalibrationModel::non_linear();
    model.add_raw_sample(1.0, 20.0).unwrap();
    model.add_raw_sample(2.0, 25.0).unwrap();
    assert!(matches!(
        model.fit(),
        Err(DaqError::InsufficientData {
            required: 3,
            available: 2
        })
    ));

    model.add_raw_sample(3.0, 32.0).unwrap();
    model.fit().unwrap();
    // Three points determine the parabola exactly: t = v² + 2v + 17
    assert_eq!(model.coefficients(), Some(vec![1.0, 2.0, 17.0]));
    assert_eq!(
        model.textual_form().as_deref(),
        Some("y = 1.000x² + 2.000x + 17.000")
    );
}

#[test]
fn test_textual_form_uses_minus_for_negative_terms() {
    let model =
        CalibrationModel::with_coefficients(ExpressionKind::NonLinear, &[-0.5, -2.0, 3.25])
            .unwrap();
    assert_eq!(
        model.textual_form().as_deref(),
        Some("y = -0.500x² - 2.000x + 3.250")
    );
}

#[test]
fn test_conversion_round_trip_keeps_samples() {
    let mut model = CalibrationModel::linear(FitMethod::LeastSquares);
    for (v, t) in [(0.5, 10.0), (1.0, 20.5), (1.5, 29.75)] {
        model.add_raw_sample(v, t).unwrap();
    }
    let original: Vec<Sample> = model.samples().to_vec();

    let converted = model
        .convert_to(ExpressionKind::NonLinear, &[0.1, 19.0, 0.5])
        .unwrap();
    let back = converted
        .convert_to(ExpressionKind::Linear, &[19.75, 0.2])
        .unwrap();

    assert_eq!(model.samples(), original.as_slice());
    assert_eq!(converted.samples(), original.as_slice());
    assert_eq!(back.samples(), original.as_slice());
    assert_eq!(back.kind(), ExpressionKind::Linear);
}

#[test]
fn test_removing_an_anchor_clears_both() {
    let mut model = CalibrationModel::linear(FitMethod::LinearInterpolation);
    let a = model.add_raw_sample(1.0, 10.0).unwrap();
    model.add_raw_sample(2.0, 15.0).unwrap();
    let c = model.add_raw_sample(3.0, 30.0).unwrap();
    model.set_interpolation_anchors(a, c).unwrap();

    model.remove_sample(2).unwrap();
    assert_eq!(model.interpolation_anchors(), None);
}
