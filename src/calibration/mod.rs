//! Calibration model: a fitted voltage to temperature mapping.
//!
//! A [`CalibrationModel`] owns an ordered list of [`Sample`]s and an
//! [`Expression`], the tagged union carrying the coefficient set of one of the
//! two supported families:
//!
//! ```text
//! Linear     T = slope * V + intercept
//! NonLinear  T = quad * V^2 + linear * V + intercept
//! ```
//!
//! Coefficients are `Option<f64>`: an unset coefficient is distinct from zero,
//! and a model with any unset coefficient refuses to predict temperatures.
//!
//! # Lifecycle
//!
//! ```text
//! Empty -> Collecting -> Fittable -> Fit
//! ```
//!
//! Sample edits made after a fit do not move the model back to `Collecting`.
//! The stored coefficients keep describing the old sample set until `fit()`
//! runs again.
//!
//! The textual form (`"y = 2.000x + 1.000"`) doubles as the key under which
//! an [`AcquisitionSession`](crate::session::AcquisitionSession) stores the
//! calibration in its history.

pub mod fit;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppResult, DaqError};
use crate::numeric::{finite_rounded, round_n};

/// One (voltage, temperature) calibration point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sensor voltage in volts.
    pub voltage: f64,
    /// Reference temperature in ºC.
    pub temperature: f64,
}

impl Sample {
    /// Builds a validated sample with both values rounded to 3 decimals.
    pub fn new(voltage: f64, temperature: f64) -> AppResult<Self> {
        Ok(Self {
            voltage: finite_rounded("voltage", voltage)?,
            temperature: finite_rounded("temperature", temperature)?,
        })
    }
}

/// Expression family of a calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionKind {
    /// First-degree polynomial.
    Linear,
    /// Second-degree polynomial.
    NonLinear,
}

impl ExpressionKind {
    /// Number of coefficients the family carries.
    pub fn coefficient_count(self) -> usize {
        match self {
            Self::Linear => 2,
            Self::NonLinear => 3,
        }
    }

    /// Fewest samples from which the family can be fitted.
    pub fn min_samples(self) -> usize {
        self.coefficient_count()
    }
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::NonLinear => write!(f, "non-linear"),
        }
    }
}

/// How a linear calibration derives its coefficients from samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    /// Ordinary least squares over every sample.
    #[default]
    LeastSquares,
    /// Exact line through two anchor samples.
    LinearInterpolation,
}

/// Kind-specific coefficient set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    /// `slope * v + intercept`
    Linear {
        /// Degree-one coefficient.
        slope: Option<f64>,
        /// Constant term.
        intercept: Option<f64>,
        /// Fitting method used by [`CalibrationModel::fit`].
        method: FitMethod,
    },
    /// `quad * v^2 + linear * v + intercept`
    NonLinear {
        /// Degree-two coefficient.
        quad: Option<f64>,
        /// Degree-one coefficient.
        linear: Option<f64>,
        /// Constant term.
        intercept: Option<f64>,
    },
}

impl Expression {
    fn unset(kind: ExpressionKind) -> Self {
        match kind {
            ExpressionKind::Linear => Expression::Linear {
                slope: None,
                intercept: None,
                method: FitMethod::default(),
            },
            ExpressionKind::NonLinear => Expression::NonLinear {
                quad: None,
                linear: None,
                intercept: None,
            },
        }
    }

    /// Family of this expression.
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Linear { .. } => ExpressionKind::Linear,
            Expression::NonLinear { .. } => ExpressionKind::NonLinear,
        }
    }

    /// Coefficients from highest degree to the constant term, or `None` if any is unset.
    pub fn coefficients(&self) -> Option<Vec<f64>> {
        match *self {
            Expression::Linear {
                slope, intercept, ..
            } => Some(vec![slope?, intercept?]),
            Expression::NonLinear {
                quad,
                linear,
                intercept,
            } => Some(vec![quad?, linear?, intercept?]),
        }
    }

    /// Evaluates the polynomial, `None` if any coefficient is unset.
    pub fn evaluate(&self, voltage: f64) -> Option<f64> {
        match *self {
            Expression::Linear {
                slope, intercept, ..
            } => Some(slope? * voltage + intercept?),
            Expression::NonLinear {
                quad,
                linear,
                intercept,
            } => Some((quad? * voltage + linear?) * voltage + intercept?),
        }
    }
}

/// Position of a model in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationState {
    /// No samples, no coefficients.
    Empty,
    /// Some samples, fewer than the family needs, no coefficients.
    Collecting,
    /// Enough samples to fit, no coefficients yet.
    Fittable,
    /// Coefficients are set, by a fit or by direct entry.
    Fit,
}

/// A voltage to temperature calibration under construction or in use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    expression: Expression,
    samples: Vec<Sample>,
    anchors: Option<[Sample; 2]>,
}

impl CalibrationModel {
    /// Creates an empty model of the given family.
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            expression: Expression::unset(kind),
            samples: Vec::new(),
            anchors: None,
        }
    }

    /// Creates an empty linear model with the given fitting method.
    pub fn linear(method: FitMethod) -> Self {
        let mut model = Self::new(ExpressionKind::Linear);
        model.expression = Expression::Linear {
            slope: None,
            intercept: None,
            method,
        };
        model
    }

    /// Creates an empty non-linear model.
    pub fn non_linear() -> Self {
        Self::new(ExpressionKind::NonLinear)
    }

    /// Creates a model whose coefficients are entered directly.
    pub fn with_coefficients(kind: ExpressionKind, values: &[f64]) -> AppResult<Self> {
        let mut model = Self::new(kind);
        model.set_coefficients(values)?;
        Ok(model)
    }

    /// Family of the expression.
    pub fn kind(&self) -> ExpressionKind {
        self.expression.kind()
    }

    /// Current expression, coefficients included.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Fitting method for linear models, `None` for non-linear ones.
    pub fn fit_method(&self) -> Option<FitMethod> {
        match self.expression {
            Expression::Linear { method, .. } => Some(method),
            Expression::NonLinear { .. } => None,
        }
    }

    /// Switches the fitting method of a linear model.
    pub fn set_fit_method(&mut self, new_method: FitMethod) -> AppResult<()> {
        match &mut self.expression {
            Expression::Linear { method, .. } => {
                *method = new_method;
                Ok(())
            }
            Expression::NonLinear { .. } => Err(DaqError::InvalidInput(
                "a non-linear calibration has no fitting method".into(),
            )),
        }
    }

    /// Coefficients from highest degree down, or `None` while any is unset.
    pub fn coefficients(&self) -> Option<Vec<f64>> {
        self.expression.coefficients()
    }

    /// True once every coefficient is set.
    pub fn has_coefficients(&self) -> bool {
        self.coefficients().is_some()
    }

    /// Validates, rounds and stores a full coefficient set, highest degree first.
    ///
    /// Nothing is stored unless every value is valid.
    pub fn set_coefficients(&mut self, values: &[f64]) -> AppResult<()> {
        let expected = self.kind().coefficient_count();
        if values.len() != expected {
            return Err(DaqError::InvalidInput(format!(
                "a {} calibration takes {expected} coefficients, got {}",
                self.kind(),
                values.len()
            )));
        }
        let rounded = values
            .iter()
            .map(|&v| finite_rounded("coefficient", v))
            .collect::<AppResult<Vec<_>>>()?;

        match &mut self.expression {
            Expression::Linear {
                slope, intercept, ..
            } => {
                *slope = Some(rounded[0]);
                *intercept = Some(rounded[1]);
            }
            Expression::NonLinear {
                quad,
                linear,
                intercept,
            } => {
                *quad = Some(rounded[0]);
                *linear = Some(rounded[1]);
                *intercept = Some(rounded[2]);
            }
        }
        Ok(())
    }

    /// Temperature predicted for `voltage`, rounded to 3 decimals.
    pub fn calculate_temperature(&self, voltage: f64) -> AppResult<f64> {
        let voltage = crate::numeric::ensure_finite("voltage", voltage)?;
        self.expression
            .evaluate(voltage)
            .map(round_n)
            .ok_or(DaqError::NotFitted)
    }

    // -------------------------------------------------------------------------
    // Samples
    // -------------------------------------------------------------------------

    /// Stored samples in insertion order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of stored samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Sample at `index`, if any.
    pub fn sample_at(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).copied()
    }

    /// True if a sample with exactly this (rounded) voltage is stored.
    pub fn contains_voltage(&self, voltage: f64) -> bool {
        let voltage = round_n(voltage);
        self.samples.iter().any(|s| s.voltage == voltage)
    }

    /// Derives the temperature of `voltage` from the current coefficients and stores the pair.
    pub fn add_sample(&mut self, voltage: f64) -> AppResult<Sample> {
        let voltage = finite_rounded("voltage", voltage)?;
        let temperature = self.calculate_temperature(voltage)?;
        self.push_unique(Sample {
            voltage,
            temperature,
        })
    }

    /// Stores a measured (voltage, temperature) pair.
    pub fn add_raw_sample(&mut self, voltage: f64, temperature: f64) -> AppResult<Sample> {
        let sample = Sample::new(voltage, temperature)?;
        self.push_unique(sample)
    }

    fn push_unique(&mut self, sample: Sample) -> AppResult<Sample> {
        if self.contains_voltage(sample.voltage) {
            return Err(DaqError::DuplicateSample {
                voltage: sample.voltage,
            });
        }
        self.samples.push(sample);
        Ok(sample)
    }

    /// Replaces the sample at `index`.
    pub fn set_sample(
        &mut self,
        index: usize,
        voltage: f64,
        temperature: f64,
    ) -> AppResult<Sample> {
        let sample = Sample::new(voltage, temperature)?;
        let old = self.sample_at(index).ok_or_else(|| self.out_of_range(index))?;
        let collides = self
            .samples
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.voltage == sample.voltage);
        if collides {
            return Err(DaqError::DuplicateSample {
                voltage: sample.voltage,
            });
        }
        self.samples[index] = sample;
        self.drop_anchors_for(old);
        Ok(sample)
    }

    /// Removes and returns the sample at `index`.
    ///
    /// Removing either interpolation anchor clears both.
    pub fn remove_sample(&mut self, index: usize) -> AppResult<Sample> {
        if index >= self.samples.len() {
            return Err(self.out_of_range(index));
        }
        let removed = self.samples.remove(index);
        self.drop_anchors_for(removed);
        Ok(removed)
    }

    /// Removes every sample and, with them, the interpolation anchors.
    pub fn clear_samples(&mut self) {
        self.samples.clear();
        self.anchors = None;
    }

    /// Re-derives each stored temperature from the current coefficients.
    pub fn recompute_temperatures(&mut self) -> AppResult<()> {
        let updated = self
            .samples
            .iter()
            .map(|s| {
                self.calculate_temperature(s.voltage)
                    .map(|temperature| Sample {
                        voltage: s.voltage,
                        temperature,
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;
        self.samples = updated;
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> DaqError {
        DaqError::InvalidInput(format!(
            "sample index {index} is out of range ({} samples)",
            self.samples.len()
        ))
    }

    fn drop_anchors_for(&mut self, sample: Sample) {
        if self.anchors.is_some_and(|pair| pair.contains(&sample)) {
            debug!(
                voltage = sample.voltage,
                "Anchor sample removed, clearing interpolation anchors"
            );
            self.anchors = None;
        }
    }

    /// Samples sorted by voltage.
    pub fn sorted_samples(&self) -> Vec<Sample> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.voltage.total_cmp(&b.voltage));
        sorted
    }

    /// Sample voltages in ascending order.
    pub fn sorted_voltages(&self) -> Vec<f64> {
        self.sorted_samples().iter().map(|s| s.voltage).collect()
    }

    /// Sample temperatures, ordered by voltage.
    pub fn sorted_temperatures(&self) -> Vec<f64> {
        self.sorted_samples().iter().map(|s| s.temperature).collect()
    }

    /// Samples needed before [`fit`](Self::fit) can run.
    pub fn min_samples(&self) -> usize {
        self.kind().min_samples()
    }

    /// True when a fit has enough samples.
    pub fn has_enough_points(&self) -> bool {
        self.samples.len() >= self.min_samples()
    }

    // -------------------------------------------------------------------------
    // Interpolation anchors
    // -------------------------------------------------------------------------

    /// Samples the next interpolation fit passes through.
    pub fn interpolation_anchors(&self) -> Option<[Sample; 2]> {
        self.anchors
    }

    /// Chooses the two samples a linear interpolation passes through.
    pub fn set_interpolation_anchors(&mut self, first: Sample, second: Sample) -> AppResult<()> {
        if !self.samples.contains(&first) || !self.samples.contains(&second) {
            return Err(DaqError::InvalidInput(
                "interpolation anchors must be stored samples".into(),
            ));
        }
        if first.voltage == second.voltage {
            return Err(DaqError::InvalidInput(
                "interpolation anchors must have different voltages".into(),
            ));
        }
        self.anchors = Some([first, second]);
        Ok(())
    }

    /// Forgets the interpolation anchors.
    pub fn clear_interpolation_anchors(&mut self) {
        self.anchors = None;
    }

    /// True when a stored anchor no longer appears in the samples.
    pub fn anchors_stale(&self) -> bool {
        self.anchors
            .is_some_and(|pair| pair.iter().any(|a| !self.samples.contains(a)))
    }

    // -------------------------------------------------------------------------
    // Fitting and conversion
    // -------------------------------------------------------------------------

    /// Fits the coefficients to the stored samples, overwriting any previous values.
    pub fn fit(&mut self) -> AppResult<()> {
        let required = self.min_samples();
        if self.samples.len() < required {
            return Err(DaqError::InsufficientData {
                required,
                available: self.samples.len(),
            });
        }

        let sorted = self.sorted_samples();
        let values = match self.expression {
            Expression::Linear {
                method: FitMethod::LeastSquares,
                ..
            } => {
                let (m, n) = fit::least_squares_line(&sorted)?;
                vec![m, n]
            }
            Expression::Linear {
                method: FitMethod::LinearInterpolation,
                ..
            } => {
                let [a, b] = match self.anchors {
                    Some(pair) if !self.anchors_stale() => pair,
                    _ => [sorted[0], sorted[sorted.len() - 1]],
                };
                let (m, n) = fit::line_through(a, b)?;
                vec![m, n]
            }
            Expression::NonLinear { .. } => {
                let (a, b, c) = fit::least_squares_quadratic(&sorted)?;
                vec![a, b, c]
            }
        };
        self.set_coefficients(&values)?;
        debug!(
            kind = %self.kind(),
            samples = self.samples.len(),
            expression = %self,
            "Calibration fitted"
        );
        Ok(())
    }

    /// Returns a new model of `kind` with a copy of these samples and the given coefficients.
    ///
    /// `self` is left untouched.
    pub fn convert_to(&self, kind: ExpressionKind, coefficients: &[f64]) -> AppResult<Self> {
        if kind == self.kind() {
            return Err(DaqError::InvalidConversion(kind));
        }
        let mut converted = Self::new(kind);
        converted.set_coefficients(coefficients)?;
        converted.samples = self.samples.clone();
        Ok(converted)
    }

    /// Lifecycle position derived from samples and coefficients.
    pub fn state(&self) -> CalibrationState {
        if self.has_coefficients() {
            CalibrationState::Fit
        } else if self.samples.is_empty() {
            CalibrationState::Empty
        } else if self.has_enough_points() {
            CalibrationState::Fittable
        } else {
            CalibrationState::Collecting
        }
    }

    /// Renders `"y = ax² + bx + c"` style text, or `None` while unfitted.
    ///
    /// This string is the identity of the calibration in a session history.
    pub fn textual_form(&self) -> Option<String> {
        let coefficients = self.coefficients()?;
        let mut text = format!("y = {:.3}", coefficients[0]);
        let powers: &[&str] = match self.kind() {
            ExpressionKind::Linear => &["x", ""],
            ExpressionKind::NonLinear => &["x²", "x", ""],
        };
        text.push_str(powers[0]);
        for (value, power) in coefficients.iter().zip(powers).skip(1) {
            let sign = if *value < 0.0 { '-' } else { '+' };
            text.push_str(&format!(" {sign} {:.3}{power}", value.abs()));
        }
        Some(text)
    }
}

impl fmt::Display for CalibrationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.textual_form() {
            Some(text) => f.write_str(&text),
            None => write!(f, "unfitted {} calibration", self.kind()),
        }
    }
}
