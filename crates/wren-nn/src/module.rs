// Module trait: The interface every layer implements
//
// A layer is a single differentiable transformation with two passes:
//
//   forward(input, output)   compute output.data from input.data
//   backward(output, input)  read output.grad (and output.data if the
//                            local derivative needs it), write input.grad,
//                            accumulate into the layer's parameter grads
//
// Layers never own the tensors flowing through them. The caller (usually
// `Model`) owns them and lends them to each pass, which is why both passes
// take `&mut self`: layers may cache forward state for the backward pass.
//
// Input gradients are overwritten, parameter gradients are accumulated.
// Zeroing parameter gradients between steps is the caller's job.

use wren_core::error::Result;
use wren_core::tensor::Tensor;

/// The fundamental trait for all layers.
///
/// Every layer in wren implements this trait, providing:
/// - `forward()` / `backward()`: the two passes
/// - `describe()`: a human-readable identity such as `Linear(in_features=3, out_features=2)`
/// - `parameters()` / `parameters_mut()`: trainable tensors, for optimizers
pub trait Module {
    /// Compute `output` from `input`, setting the output's shape and data.
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()>;

    /// Propagate `output.grad` back into `input.grad`, accumulating
    /// parameter gradients along the way.
    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()>;

    /// Human-readable identity of this layer.
    fn describe(&self) -> String;

    /// All trainable parameters, empty for activation-only layers.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Mutable access to the trainable parameters, in `parameters()` order.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Trainable parameters with human-readable names.
    ///
    /// The default uses positional indices (`param_0`, `param_1`, …).
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.parameters()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (format!("param_{i}"), p))
            .collect()
    }

    /// Total number of scalar parameters in this layer.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.data.len()).sum()
    }

    /// Zero every parameter gradient.
    fn zero_grad(&mut self) {
        for p in self.parameters_mut() {
            p.zero_grad();
        }
    }
}
