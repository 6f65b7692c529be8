/// Scoring model loading, inference and training
///
/// The artifact is a JSON-serialized logistic regression:
/// `{ "coefficients": [..], "intercept": .. }`. Its input width is the number
/// of coefficients.
use crate::error::{PredictionError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Binary classifier returning the positive-class probability
pub trait ScoringModel: Send + Sync {
    /// Number of features a request must carry
    fn expected_width(&self) -> usize;

    /// Probability in [0, 1] for one feature vector
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Gradient descent settings for `LogisticModel::fit`
#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 2000,
            learning_rate: 0.5,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(PredictionError::ModelArtifact(
                "model has no coefficients".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictionError::ModelArtifact(
                "model parameters must be finite".to_string(),
            ));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    /// Load and validate an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PredictionError::ModelArtifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let parsed: LogisticModel = serde_json::from_str(&raw).map_err(|e| {
            PredictionError::ModelArtifact(format!("cannot parse {}: {}", path.display(), e))
        })?;

        let model = Self::new(parsed.coefficients, parsed.intercept)?;
        debug!(
            width = model.expected_width(),
            "Loaded logistic model from {}",
            path.display()
        );
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| PredictionError::ModelArtifact(e.to_string()))?;
        std::fs::write(path, body).map_err(|e| {
            PredictionError::ModelArtifact(format!("cannot write {}: {}", path.display(), e))
        })
    }

    /// Fit by batch gradient descent on log-loss.
    ///
    /// `samples` is rows × features, `labels` holds 0.0 / 1.0 per row.
    pub fn fit(samples: &Array2<f64>, labels: &Array1<f64>, params: TrainingParams) -> Result<Self> {
        let (rows, width) = samples.dim();
        if rows == 0 || width == 0 {
            return Err(PredictionError::ModelArtifact(
                "training set is empty".to_string(),
            ));
        }
        if labels.len() != rows {
            return Err(PredictionError::ModelArtifact(format!(
                "{} labels for {} rows",
                labels.len(),
                rows
            )));
        }

        let mut weights = Array1::<f64>::zeros(width);
        let mut bias = 0.0;
        let n = rows as f64;

        for _ in 0..params.epochs {
            let predictions = (samples.dot(&weights) + bias).mapv(sigmoid);
            let residuals = &predictions - labels;

            let grad_w = samples.t().dot(&residuals) / n;
            let grad_b = residuals.sum() / n;

            weights = weights - grad_w * params.learning_rate;
            bias -= grad_b * params.learning_rate;
        }

        Self::new(weights.to_vec(), bias)
    }

    /// Fraction of rows whose thresholded prediction matches the label
    pub fn accuracy(&self, samples: &Array2<f64>, labels: &Array1<f64>) -> f64 {
        let hits = samples
            .rows()
            .into_iter()
            .zip(labels.iter())
            .filter(|(row, label)| {
                let predicted = if self.score_row(*row) >= 0.5 { 1.0 } else { 0.0 };
                predicted == **label
            })
            .count();
        hits as f64 / labels.len().max(1) as f64
    }

    fn score_row(&self, row: ArrayView1<f64>) -> f64 {
        let weights = ArrayView1::from(&self.coefficients[..]);
        sigmoid(weights.dot(&row) + self.intercept)
    }
}

impl ScoringModel for LogisticModel {
    fn expected_width(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.expected_width() {
            return Err(PredictionError::FeatureCountMismatch {
                expected: self.expected_width(),
                actual: features.len(),
            });
        }

        let score = self.score_row(ArrayView1::from(features));
        if !score.is_finite() {
            return Err(PredictionError::PredictionFailed(format!(
                "non-finite score for input {:?}",
                features
            )));
        }
        Ok(score)
    }
}

/// Uniform [0,1) features; label is 1 when the row sum exceeds `width / 2`.
pub fn synthetic_dataset<R: Rng>(rows: usize, width: usize, rng: &mut R) -> (Array2<f64>, Array1<f64>) {
    let samples = Array2::from_shape_fn((rows, width), |_| rng.gen::<f64>());
    let threshold = width as f64 / 2.0;
    let labels = samples
        .rows()
        .into_iter()
        .map(|row| if row.sum() > threshold { 1.0 } else { 0.0 })
        .collect::<Array1<f64>>();
    (samples, labels)
}
