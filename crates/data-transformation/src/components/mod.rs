//! Workflow components.

pub mod data_transformation;

pub use data_transformation::{DataTransformation, TransformationOutput};
