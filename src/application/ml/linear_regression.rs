use super::features::FeatureRow;
use crate::domain::ml::{FEATURE_COUNT, FeatureVector, ModelMetrics};
use tracing::debug;

/// Fixed number of full-batch updates.
pub const ITERATIONS: usize = 3000;
pub const LEARNING_RATE: f64 = 0.01;

/// Ordinary least-squares linear model: `y = w·x + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub weights: FeatureVector,
    pub bias: f64,
}

impl LinearModel {
    pub fn new(weights: FeatureVector, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        features
            .iter()
            .zip(self.weights.iter())
            .fold(self.bias, |acc, (x, w)| acc + x * w)
    }

    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(&row.features)).collect()
    }
}

/// Batch gradient descent on mean squared error, starting from all zeros.
///
/// Each iteration computes the closed-form gradient over the full batch:
/// `w_j -= lr * 2 * mean(err * x_j)` and `b -= lr * 2 * mean(err)` with
/// `err = prediction - target`. Always runs `ITERATIONS` steps.
pub fn fit_gradient_descent(rows: &[FeatureRow]) -> LinearModel {
    let mut model = LinearModel::new([0.0; FEATURE_COUNT], 0.0);
    if rows.is_empty() {
        return model;
    }
    let n = rows.len() as f64;

    for iteration in 0..ITERATIONS {
        let mut weight_grads = [0.0; FEATURE_COUNT];
        let mut bias_grad = 0.0;

        for row in rows {
            let error = model.predict(&row.features) - row.target;
            bias_grad += error;
            for (grad, x) in weight_grads.iter_mut().zip(row.features.iter()) {
                *grad += error * x;
            }
        }

        for (w, grad) in model.weights.iter_mut().zip(weight_grads.iter()) {
            *w -= LEARNING_RATE * 2.0 * grad / n;
        }
        model.bias -= LEARNING_RATE * 2.0 * bias_grad / n;

        if iteration % 1000 == 0 {
            debug!("GD iteration {}: mse={:.8e}", iteration, mse(&model, rows));
        }
    }

    model
}

fn mse(model: &LinearModel, rows: &[FeatureRow]) -> f64 {
    rows.iter()
        .map(|row| (model.predict(&row.features) - row.target).powi(2))
        .sum::<f64>()
        / rows.len() as f64
}

/// Sign as -1, 0 or 1, so an exact zero only matches another zero.
fn direction(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// MAE, RMSE and directional accuracy of `predicted` against `actual`.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> ModelMetrics {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return ModelMetrics {
            mae: 0.0,
            rmse: 0.0,
            directional_accuracy: 0.0,
        };
    }

    let pairs = || actual.iter().zip(predicted.iter()).take(n);
    let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / n as f64;
    let mse = pairs().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n as f64;
    let rmse = mse.sqrt();
    let hits = pairs()
        .filter(|(a, p)| direction(**a) == direction(**p))
        .count();

    ModelMetrics {
        mae,
        rmse,
        directional_accuracy: hits as f64 / n as f64,
    }
}
