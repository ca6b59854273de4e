//! Demand classifiers.
//!
//! Both families sit behind the `Classifier` trait so the pipeline, the
//! evaluation reporter and the inference service never branch on the model.

pub mod knn;
pub mod model;
pub mod naive_bayes;

pub use knn::*;
pub use model::*;
pub use naive_bayes::*;
