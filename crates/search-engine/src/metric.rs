// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accuracy metrics and the optimisation direction.
//!
//! A metric comes in one of three calling shapes:
//!
//! | Shape | Called as | Needs |
//! |---|---|---|
//! | [`MetricSignature::PredictionTarget`] | `f(prediction, target)` per batch, averaged | validation batches with targets |
//! | [`MetricSignature::ModelWithLoader`] | `f(model, loader)` | validation data |
//! | [`MetricSignature::ModelOnly`] | `f(model)` | nothing |

use crate::{MetricError, SearchError};
use model_core::{DataLoader, InferenceModel, Tensor};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Whether larger or smaller metric values are better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Min,
    #[default]
    Max,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Min => "min",
            Direction::Max => "max",
        }
    }

    /// Accuracy lost going from `reference` to `candidate`, positive when
    /// `candidate` is worse.
    pub fn drop_from(&self, reference: f64, candidate: f64) -> f64 {
        match self {
            Direction::Max => reference - candidate,
            Direction::Min => candidate - reference,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "min" => Ok(Direction::Min),
            "max" => Ok(Direction::Max),
            other => Err(SearchError::InputValidation(format!(
                "direction must be 'min' or 'max', got '{other}'"
            ))),
        }
    }
}

/// The calling shape of a [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MetricSignature {
    PredictionTarget,
    ModelWithLoader,
    ModelOnly,
}

impl fmt::Display for MetricSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricSignature::PredictionTarget => "metric(prediction, target)",
            MetricSignature::ModelWithLoader => "metric(model, loader)",
            MetricSignature::ModelOnly => "metric(model)",
        };
        f.write_str(s)
    }
}

type PredictionTargetFn = dyn Fn(&Tensor, &Tensor) -> Result<f64, MetricError> + Send + Sync;
type ModelWithLoaderFn =
    dyn Fn(&dyn InferenceModel, &DataLoader) -> Result<f64, MetricError> + Send + Sync;
type ModelOnlyFn = dyn Fn(&dyn InferenceModel) -> Result<f64, MetricError> + Send + Sync;

/// A user-supplied accuracy metric.
#[derive(Clone)]
pub enum Metric {
    PredictionTarget(Arc<PredictionTargetFn>),
    ModelWithLoader(Arc<ModelWithLoaderFn>),
    ModelOnly(Arc<ModelOnlyFn>),
}

impl Metric {
    pub fn prediction_target(
        f: impl Fn(&Tensor, &Tensor) -> Result<f64, MetricError> + Send + Sync + 'static,
    ) -> Self {
        Metric::PredictionTarget(Arc::new(f))
    }

    pub fn model_with_loader(
        f: impl Fn(&dyn InferenceModel, &DataLoader) -> Result<f64, MetricError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Metric::ModelWithLoader(Arc::new(f))
    }

    pub fn model_only(
        f: impl Fn(&dyn InferenceModel) -> Result<f64, MetricError> + Send + Sync + 'static,
    ) -> Self {
        Metric::ModelOnly(Arc::new(f))
    }

    /// Top-1 accuracy: the fraction of rows whose argmax equals the target
    /// class id.
    pub fn top1_accuracy() -> Self {
        Self::prediction_target(|pred, target| {
            let predicted = pred.argmax_rows();
            if predicted.len() != target.num_elements() {
                return Err(MetricError::Evaluation(format!(
                    "{} predictions for {} targets",
                    predicted.len(),
                    target.num_elements()
                )));
            }
            if predicted.is_empty() {
                return Ok(0.0);
            }
            let hits = predicted
                .iter()
                .zip(target.as_slice())
                .filter(|&(&p, &t)| p as f32 == t)
                .count();
            Ok(hits as f64 / predicted.len() as f64)
        })
    }

    /// Mean squared error between prediction and target.
    pub fn mean_squared_error() -> Self {
        Self::prediction_target(|pred, target| {
            if pred.num_elements() != target.num_elements() {
                return Err(MetricError::Evaluation(format!(
                    "prediction {pred} and target {target} differ in size"
                )));
            }
            let n = pred.num_elements().max(1) as f64;
            let sum: f64 = pred
                .as_slice()
                .iter()
                .zip(target.as_slice())
                .map(|(&p, &t)| ((p - t) as f64).powi(2))
                .sum();
            Ok(sum / n)
        })
    }

    pub fn signature(&self) -> MetricSignature {
        match self {
            Metric::PredictionTarget(_) => MetricSignature::PredictionTarget,
            Metric::ModelWithLoader(_) => MetricSignature::ModelWithLoader,
            Metric::ModelOnly(_) => MetricSignature::ModelOnly,
        }
    }

    /// Evaluates the metric on `model`, dispatching on its shape.
    pub fn evaluate(
        &self,
        model: &dyn InferenceModel,
        data: Option<&DataLoader>,
    ) -> Result<f64, MetricError> {
        let signature = self.signature();
        match self {
            Metric::PredictionTarget(f) => {
                let n = model.num_inputs();
                let loader = data.ok_or_else(|| MetricError::Protocol {
                    signature,
                    detail: "no validation data".to_string(),
                })?;
                if !loader.has_targets(n) {
                    return Err(MetricError::Protocol {
                        signature,
                        detail: format!(
                            "validation batches carry no target after {n} input(s)"
                        ),
                    });
                }
                let mut total = 0.0;
                for batch in loader {
                    let pred = model.forward(batch.inputs(n))?;
                    // `has_targets` guarantees the target is present.
                    if let Some(target) = batch.target(n) {
                        total += f(&pred, target)?;
                    }
                }
                Ok(total / loader.len() as f64)
            }
            Metric::ModelWithLoader(f) => {
                let loader = data.ok_or_else(|| MetricError::Protocol {
                    signature,
                    detail: "no validation data".to_string(),
                })?;
                f(model, loader)
            }
            Metric::ModelOnly(f) => f(model),
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Metric").field(&self.signature()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_core::{Batch, FnModel};

    /// Echoes its single input.
    fn identity() -> FnModel {
        FnModel::new("id", 1, |xs| Ok(xs[0].clone()))
    }

    fn labelled(rows: Vec<Vec<f32>>, labels: Vec<f32>) -> DataLoader {
        let cols = rows[0].len();
        let x = Tensor::new(
            vec![rows.len(), cols],
            rows.into_iter().flatten().collect(),
        )
        .unwrap();
        let y = Tensor::new(vec![labels.len()], labels).unwrap();
        DataLoader::new(vec![Batch::with_target(vec![x], y)])
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("min".parse::<Direction>().unwrap(), Direction::Min);
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(SearchError::InputValidation(_))
        ));
    }

    #[test]
    fn test_drop_from() {
        assert!((Direction::Max.drop_from(0.9, 0.8) - 0.1).abs() < 1e-9);
        assert!((Direction::Min.drop_from(0.1, 0.3) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_top1_accuracy() {
        let data = labelled(vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.6, 0.4]], vec![0.0, 1.0, 1.0]);
        let acc = Metric::top1_accuracy()
            .evaluate(&identity(), Some(&data))
            .unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_target_needs_targets() {
        let x = Tensor::zeros(vec![1, 2]);
        let data = DataLoader::new(vec![Batch::new(vec![x])]);
        let err = Metric::top1_accuracy()
            .evaluate(&identity(), Some(&data))
            .unwrap_err();
        assert!(matches!(
            err,
            MetricError::Protocol {
                signature: MetricSignature::PredictionTarget,
                ..
            }
        ));
    }

    #[test]
    fn test_model_with_loader_needs_data() {
        let m = Metric::model_with_loader(|_, loader| Ok(loader.len() as f64));
        assert_eq!(m.signature(), MetricSignature::ModelWithLoader);
        assert!(matches!(
            m.evaluate(&identity(), None),
            Err(MetricError::Protocol { .. })
        ));
        let data = labelled(vec![vec![1.0]], vec![0.0]);
        assert_eq!(m.evaluate(&identity(), Some(&data)).unwrap(), 1.0);
    }

    #[test]
    fn test_model_only() {
        let m = Metric::model_only(|model| Ok(model.num_inputs() as f64));
        assert_eq!(m.evaluate(&identity(), None).unwrap(), 1.0);
    }

    #[test]
    fn test_mse() {
        let data = labelled(vec![vec![1.0], vec![3.0]], vec![0.0, 1.0]);
        // identity predicts [[1],[3]] vs targets [0,1] → (1 + 4) / 2
        let v = Metric::mean_squared_error()
            .evaluate(&identity(), Some(&data))
            .unwrap();
        assert!((v - 2.5).abs() < 1e-9);
    }
}
