// Loss Functions
//
// MSE (Mean Squared Error): mean((pred - target)²)
//
// The loss is returned as a one-element tensor of shape [1]. It has no
// backward of its own: to train, seed the model output gradient with
//   d(loss)/d(pred[i]) = 2 * (pred[i] - target[i]) / n
// and call `Model::backward`.

use wren_core::error::{Error, Result};
use wren_core::tensor::Tensor;

/// Mean Squared Error loss: mean((prediction - target)²)
///
/// Shapes may differ as long as both hold the same number of elements.
pub fn mse_loss(prediction: &Tensor, target: &Tensor) -> Result<Tensor> {
    let n = prediction.data.len();
    if n != target.data.len() {
        return Err(Error::ElementCountMismatch {
            op: "mse_loss",
            expected: n,
            got: target.data.len(),
        });
    }
    if n == 0 {
        return Err(Error::InvalidShape {
            shape: prediction.shape.clone(),
        });
    }

    let sum: f32 = prediction
        .data
        .iter()
        .zip(&target.data)
        .map(|(p, t)| (p - t) * (p - t))
        .sum();
    Tensor::from_vec(vec![sum / n as f32], 1)
}
