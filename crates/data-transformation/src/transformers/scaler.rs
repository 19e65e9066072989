//! Per-feature scaling applied at the end of feature engineering.

use crate::config::ScalingStrategy;
use crate::error::{Result, TransformationError};
use serde::{Deserialize, Serialize};

/// Affine parameters for one feature: `x' = (x - offset) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub offset: f64,
    pub scale: f64,
}

impl ScalerParams {
    const IDENTITY: ScalerParams = ScalerParams {
        offset: 0.0,
        scale: 1.0,
    };

    fn min_max(values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() {
            return Self::IDENTITY;
        }
        Self {
            offset: min,
            scale: non_zero(max - min),
        }
    }

    fn standard(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::IDENTITY;
        }
        if finite.iter().all(|v| *v == finite[0]) {
            return Self {
                offset: finite[0],
                scale: 1.0,
            };
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            offset: mean,
            scale: non_zero(variance.sqrt()),
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    fn is_finite(&self) -> bool {
        self.offset.is_finite() && self.scale.is_finite()
    }
}

/// A zero spread leaves the centered values at 0.0 instead of dividing by zero.
fn non_zero(spread: f64) -> f64 {
    if spread == 0.0 { 1.0 } else { spread }
}

/// Scaling parameters learned for each output feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    strategy: ScalingStrategy,
    params: Vec<ScalerParams>,
}

impl FittedScaler {
    /// Learn one set of parameters per column.
    ///
    /// Fails with [`TransformationError::NotNumeric`] when a feature's range
    /// overflows, since such parameters could not be persisted or applied.
    pub fn fit(strategy: ScalingStrategy, names: &[String], columns: &[Vec<f64>]) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(TransformationError::SchemaMismatch(format!(
                "{} feature names for {} columns",
                names.len(),
                columns.len()
            )));
        }

        let mut params = Vec::with_capacity(columns.len());
        for (name, values) in names.iter().zip(columns) {
            let fitted = match strategy {
                ScalingStrategy::MinMax => ScalerParams::min_max(values),
                ScalingStrategy::Standard => ScalerParams::standard(values),
                ScalingStrategy::None => ScalerParams::IDENTITY,
            };
            if !fitted.is_finite() {
                return Err(TransformationError::NotNumeric {
                    column: name.clone(),
                    reason: format!(
                        "scaling parameters are not finite (offset {}, scale {})",
                        fitted.offset, fitted.scale
                    ),
                });
            }
            params.push(fitted);
        }
        Ok(Self { strategy, params })
    }

    pub fn strategy(&self) -> ScalingStrategy {
        self.strategy
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    /// Scale every column in place.
    pub fn transform(&self, columns: &mut [Vec<f64>]) -> Result<()> {
        if columns.len() != self.params.len() {
            return Err(TransformationError::SchemaMismatch(format!(
                "scaler was fitted on {} features, got {}",
                self.params.len(),
                columns.len()
            )));
        }
        if self.strategy == ScalingStrategy::None {
            return Ok(());
        }
        for (values, params) in columns.iter_mut().zip(&self.params) {
            for value in values.iter_mut() {
                *value = params.apply(*value);
            }
        }
        Ok(())
    }
}
