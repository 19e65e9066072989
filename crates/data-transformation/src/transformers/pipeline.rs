//! Sequential pipeline of named transformer steps.

use crate::error::{Result, ResultExt, TransformationError};
use crate::transformers::feature_engineering::{FeatureEngineering, FittedFeatureEngineering};
use crate::transformers::imputer::{FittedNullImputer, NullImputer};
use crate::transformers::{FittedTransformer, Transformer};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A step that can be placed in a [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    Imputer(NullImputer),
    FeatureEngineering(FeatureEngineering),
}

impl From<NullImputer> for PipelineStep {
    fn from(step: NullImputer) -> Self {
        PipelineStep::Imputer(step)
    }
}

impl From<FeatureEngineering> for PipelineStep {
    fn from(step: FeatureEngineering) -> Self {
        PipelineStep::FeatureEngineering(step)
    }
}

impl PipelineStep {
    fn fit_transform(&self, df: &DataFrame) -> Result<(FittedPipelineStep, DataFrame)> {
        match self {
            PipelineStep::Imputer(t) => t
                .fit_transform(df)
                .map(|(f, out)| (FittedPipelineStep::Imputer(f), out)),
            PipelineStep::FeatureEngineering(t) => t
                .fit_transform(df)
                .map(|(f, out)| (FittedPipelineStep::FeatureEngineering(f), out)),
        }
    }
}

/// A fitted pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum FittedPipelineStep {
    Imputer(FittedNullImputer),
    FeatureEngineering(FittedFeatureEngineering),
}

impl FittedPipelineStep {
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        match self {
            FittedPipelineStep::Imputer(t) => t.transform(df),
            FittedPipelineStep::FeatureEngineering(t) => t.transform(df),
        }
    }

    fn feature_names_out(&self) -> Vec<String> {
        match self {
            FittedPipelineStep::Imputer(t) => t.feature_names_out(),
            FittedPipelineStep::FeatureEngineering(t) => t.feature_names_out(),
        }
    }

    /// Step type name, for logging.
    pub fn step_name(&self) -> &'static str {
        match self {
            FittedPipelineStep::Imputer(_) => "NullImputer",
            FittedPipelineStep::FeatureEngineering(_) => "FeatureEngineering",
        }
    }
}

/// Ordered, uniquely named transformer steps.
///
/// Each step is fitted on the output of the previous fitted step.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::new(vec![
///     ("imputer", NullImputer::default().into()),
///     ("feat_engineering", FeatureEngineering::default().into()),
/// ])?;
/// let (fitted, features) = pipeline.fit_transform(&train_df)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    steps: Vec<(String, PipelineStep)>,
}

impl Pipeline {
    /// Create a pipeline, rejecting an empty step list or duplicate names.
    pub fn new<S: Into<String>>(steps: Vec<(S, PipelineStep)>) -> Result<Self> {
        let steps: Vec<(String, PipelineStep)> = steps
            .into_iter()
            .map(|(name, step)| (name.into(), step))
            .collect();

        if steps.is_empty() {
            return Err(TransformationError::InvalidConfig(
                "pipeline needs at least one step".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (name, _) in &steps {
            if !seen.insert(name.as_str()) {
                return Err(TransformationError::InvalidConfig(format!(
                    "duplicate pipeline step name '{}'",
                    name
                )));
            }
        }

        Ok(Self { steps })
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// A named fitted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFittedStep {
    pub name: String,
    pub step: FittedPipelineStep,
}

/// A pipeline whose steps have all been fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    steps: Vec<NamedFittedStep>,
}

impl FittedPipeline {
    pub fn steps(&self) -> &[NamedFittedStep] {
        &self.steps
    }

    /// Look up a fitted step by name.
    pub fn named_step(&self, name: &str) -> Option<&FittedPipelineStep> {
        self.steps
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.step)
    }
}

impl Transformer for Pipeline {
    type Fitted = FittedPipeline;

    fn fit(&self, df: &DataFrame) -> Result<FittedPipeline> {
        self.fit_transform(df).map(|(fitted, _)| fitted)
    }

    fn fit_transform(&self, df: &DataFrame) -> Result<(FittedPipeline, DataFrame)> {
        let mut fitted_steps = Vec::with_capacity(self.steps.len());
        let mut current = df.clone();

        for (name, step) in &self.steps {
            let (fitted, out) = step
                .fit_transform(&current)
                .context(format!("Fitting pipeline step '{}'", name))?;
            debug!(
                "Pipeline step '{}' ({}) fitted, {} columns out",
                name,
                fitted.step_name(),
                out.width()
            );
            fitted_steps.push(NamedFittedStep {
                name: name.clone(),
                step: fitted,
            });
            current = out;
        }

        Ok((
            FittedPipeline {
                steps: fitted_steps,
            },
            current,
        ))
    }
}

impl FittedTransformer for FittedPipeline {
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut current = df.clone();
        for named in &self.steps {
            current = named
                .step
                .transform(&current)
                .context(format!("Applying pipeline step '{}'", named.name))?;
        }
        Ok(current)
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.steps
            .last()
            .map(|named| named.step.feature_names_out())
            .unwrap_or_default()
    }
}
