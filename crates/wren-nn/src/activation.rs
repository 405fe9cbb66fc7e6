// Activation layers: stateless pointwise transformations
//
// Each activation maps every element independently and has no parameters.
// The local derivative of all three can be written in terms of the OUTPUT
// value, so backward reads `output.data` instead of recomputing from input:
//
//   ReLU:     y = max(0, x)        dy/dx = 1 if y > 0 else 0
//   Sigmoid:  s = 1 / (1 + e^-x)   ds/dx = s * (1 - s)
//   Tanh:     t = tanh(x)          dt/dx = 1 - t²
//
// Example:
//   let mut model = Model::new();
//   model.add_layer(Linear::new(3, 2, &mut rng)?);
//   model.add_layer(ReLU);

use wren_core::error::{Error, Result};
use wren_core::tensor::Tensor;

use crate::module::Module;

/// Apply `f` elementwise; the output takes the input's shape.
fn map_forward(
    op: &'static str,
    input: &Tensor,
    output: &mut Tensor,
    f: impl Fn(f32) -> f32,
) -> Result<()> {
    let expected = input.size()?;
    if input.data.len() != expected {
        return Err(Error::ElementCountMismatch {
            op,
            expected,
            got: input.data.len(),
        });
    }

    output.shape = input.shape.clone();
    output.data.clear();
    output.data.extend(input.data.iter().map(|&x| f(x)));
    Ok(())
}

/// `input.grad = output.grad * local(output.data)`, elementwise.
fn map_backward(
    op: &'static str,
    output: &Tensor,
    input: &mut Tensor,
    local: impl Fn(f32) -> f32,
) -> Result<()> {
    if output.grad.is_empty() {
        return Err(Error::MissingGrad { op });
    }
    if output.grad.len() != output.data.len() {
        return Err(Error::ElementCountMismatch {
            op,
            expected: output.data.len(),
            got: output.grad.len(),
        });
    }

    input.resize_grad()?;
    if input.grad.len() != output.data.len() {
        return Err(Error::ElementCountMismatch {
            op,
            expected: output.data.len(),
            got: input.grad.len(),
        });
    }

    for ((g, &y), &dy) in input.grad.iter_mut().zip(&output.data).zip(&output.grad) {
        *g = dy * local(y);
    }
    Ok(())
}

/// ReLU activation: max(0, x)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl Module for ReLU {
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        map_forward("ReLU", input, output, |x| x.max(0.0))
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        map_backward("ReLU", output, input, |y| if y > 0.0 { 1.0 } else { 0.0 })
    }

    fn describe(&self) -> String {
        "ReLU()".to_string()
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }
}

/// Sigmoid activation: 1 / (1 + e^(-x))
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Module for Sigmoid {
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        map_forward("Sigmoid", input, output, |x| 1.0 / (1.0 + (-x).exp()))
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        map_backward("Sigmoid", output, input, |s| s * (1.0 - s))
    }

    fn describe(&self) -> String {
        "Sigmoid()".to_string()
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }
}

/// Tanh activation
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Module for Tanh {
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        map_forward("Tanh", input, output, f32::tanh)
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        map_backward("Tanh", output, input, |t| 1.0 - t * t)
    }

    fn describe(&self) -> String {
        "Tanh()".to_string()
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }
}
