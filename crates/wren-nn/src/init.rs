// nn::init: Parameter Initialization Utilities
//
// Standalone functions for creating initialized parameter tensors.
//
//   uniform(shape, low, high, rng)  U(low, high)
//   constant(shape, val)            all elements = val
//   zeros(shape)                    all zeros
//
// All functions return tensors whose gradient buffer is already sized and
// zeroed, making them ready for gradient accumulation. Random initializers
// take the generator explicitly so a seeded `StdRng` reproduces the same
// parameters.

use rand::Rng;
use wren_core::error::Result;
use wren_core::shape::Shape;
use wren_core::tensor::Tensor;

/// Initialize a tensor from a uniform distribution U(low, high).
///
/// A degenerate range (`low >= high`) fills the tensor with `low`.
pub fn uniform<R: Rng + ?Sized>(
    shape: impl Into<Shape>,
    low: f32,
    high: f32,
    rng: &mut R,
) -> Result<Tensor> {
    let mut t = Tensor::new(shape)?;
    if low < high {
        for v in t.data.iter_mut() {
            *v = rng.gen_range(low..high);
        }
    } else {
        t.data.fill(low);
    }
    t.resize_grad()?;
    Ok(t)
}

/// Initialize a tensor with a constant value.
pub fn constant(shape: impl Into<Shape>, val: f32) -> Result<Tensor> {
    let mut t = Tensor::full(shape, val)?;
    t.resize_grad()?;
    Ok(t)
}

/// Initialize a tensor with all zeros.
pub fn zeros(shape: impl Into<Shape>) -> Result<Tensor> {
    constant(shape, 0.0)
}
