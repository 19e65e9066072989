//! Fit/transform building blocks.
//!
//! Two traits split every transformer into its configurable, unfitted form
//! and the fitted form that holds learned parameters:
//!
//! - [`Transformer`]: hyper-parameters only; [`Transformer::fit`] learns from
//!   training data and returns the fitted counterpart.
//! - [`FittedTransformer`]: learned parameters; [`FittedTransformer::transform`]
//!   takes `&self`, so applying a fitted transformer to new data can never
//!   change what it learned.
//!
//! Fitted transformers are serde types, which is how the preprocessor is
//! persisted after fitting.

mod column_transformer;
mod feature_engineering;
mod imputer;
mod pipeline;
mod scaler;

pub use column_transformer::{ColumnTransformer, FittedColumnTransformer};
pub use feature_engineering::{FeatureEngineering, FittedFeatureEngineering};
pub use imputer::{FillValue, FittedNullImputer, NullImputer};
pub use pipeline::{FittedPipeline, FittedPipelineStep, Pipeline, PipelineStep};
pub use scaler::{FittedScaler, ScalerParams};

use crate::error::Result;
use polars::prelude::DataFrame;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An unfitted transformer.
pub trait Transformer {
    /// The fitted counterpart produced by [`fit`](Self::fit).
    type Fitted: FittedTransformer;

    /// Learn parameters from training data.
    fn fit(&self, df: &DataFrame) -> Result<Self::Fitted>;

    /// Fit on `df` and return both the fitted transformer and `df` transformed by it.
    fn fit_transform(&self, df: &DataFrame) -> Result<(Self::Fitted, DataFrame)> {
        let fitted = self.fit(df)?;
        let transformed = fitted.transform(df)?;
        Ok((fitted, transformed))
    }
}

/// A transformer holding learned parameters.
pub trait FittedTransformer: Clone + Serialize + DeserializeOwned {
    /// Apply the learned transformation.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    /// Names of the columns [`transform`](Self::transform) produces, in order.
    fn feature_names_out(&self) -> Vec<String>;
}
