//! Fitting routines for the two supported expression families.
//!
//! All routines return unrounded coefficients; the model rounds them when it
//! stores them.
//!
//! The quadratic is linear in its parameters, so the least-squares problem is
//! solved directly from the normal equations with an SVD. This is the point a
//! Gauss-Newton iteration converges to after its first step. Voltages are centred on their
//! mean before building the normal matrix to keep it well conditioned, and the
//! coefficients are expanded back afterwards.

use nalgebra::{Matrix3, Vector3};

use crate::calibration::Sample;
use crate::error::{AppResult, DaqError};

/// Singular values below this fraction of the largest count as zero.
const RANK_EPSILON: f64 = 1e-12;

/// Ordinary least-squares line `(slope, intercept)` through `points`.
pub fn least_squares_line(points: &[Sample]) -> AppResult<(f64, f64)> {
    if points.len() < 2 {
        return Err(DaqError::InsufficientData {
            required: 2,
            available: points.len(),
        });
    }
    let n = points.len() as f64;
    let mean_v = points.iter().map(|p| p.voltage).sum::<f64>() / n;
    let mean_t = points.iter().map(|p| p.temperature).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dv = p.voltage - mean_v;
        (sxx + dv * dv, sxy + dv * (p.temperature - mean_t))
    });
    if sxx == 0.0 {
        return Err(DaqError::Processing(
            "cannot fit a line: all voltages are equal".into(),
        ));
    }

    let slope = sxy / sxx;
    Ok((slope, mean_t - slope * mean_v))
}

/// Exact line `(slope, intercept)` through two points.
pub fn line_through(a: Sample, b: Sample) -> AppResult<(f64, f64)> {
    let dv = b.voltage - a.voltage;
    if dv == 0.0 {
        return Err(DaqError::Processing(format!(
            "cannot interpolate between two points at {:.3} V",
            a.voltage
        )));
    }
    let slope = (b.temperature - a.temperature) / dv;
    Ok((slope, a.temperature - slope * a.voltage))
}

/// Least-squares quadratic `(quad, linear, intercept)` through `points`.
pub fn least_squares_quadratic(points: &[Sample]) -> AppResult<(f64, f64, f64)> {
    if points.len() < 3 {
        return Err(DaqError::InsufficientData {
            required: 3,
            available: points.len(),
        });
    }
    let n = points.len() as f64;
    let mean_v = points.iter().map(|p| p.voltage).sum::<f64>() / n;

    // Normal equations in the centred voltage u, unknowns [alpha, beta, gamma]
    // for alpha*u^2 + beta*u + gamma.
    let mut normal = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for p in points {
        let u = p.voltage - mean_v;
        let row = Vector3::new(u * u, u, 1.0);
        normal += row * row.transpose();
        rhs += row * p.temperature;
    }

    let svd = normal.svd(true, true);
    let tolerance = svd.singular_values.max() * RANK_EPSILON;
    if svd.rank(tolerance) < 3 {
        return Err(DaqError::Processing(
            "normal equations are singular; voltages are not distinct enough".into(),
        ));
    }
    let solution = svd
        .solve(&rhs, tolerance)
        .map_err(|e| DaqError::Processing(format!("quadratic fit failed: {e}")))?;
    let (alpha, beta, gamma) = (solution[0], solution[1], solution[2]);

    let quad = alpha;
    let linear = beta - 2.0 * alpha * mean_v;
    let intercept = alpha * mean_v * mean_v - beta * mean_v + gamma;
    Ok((quad, linear, intercept))
}
