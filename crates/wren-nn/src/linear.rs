// Linear: Fully-connected (dense) layer
//
// The most fundamental layer: y = xW + b
//
// PARAMETER SHAPES:
//
//   weight: [in_features, out_features]  x @ weight needs no transpose
//   bias:   [out_features]               broadcast across the batch
//
// COMPUTATION:
//
//   forward:   y[b,j]       = bias[j] + Σ_k x[b,k] * W[k,j]
//   backward:  dx[b,k]      = Σ_j dy[b,j] * W[k,j]
//              dW[k,j]     += Σ_b dy[b,j] * x[b,k]
//              db[j]       += Σ_b dy[b,j]
//
// Backward needs the forward input, which the caller passes back in as the
// `input` tensor; the layer itself caches nothing.
//
// WEIGHT INITIALIZATION:
//
// Weight and bias are drawn from U(-0.1, 0.1) using the generator handed to
// the constructor.

use rand::Rng;
use wren_core::error::{Error, Result};
use wren_core::shape::Shape;
use wren_core::tensor::Tensor;

use crate::init;
use crate::module::Module;

/// Half-width of the uniform range used to initialize weight and bias.
pub const LINEAR_INIT_BOUND: f32 = 0.1;

/// A fully-connected (dense) layer: y = xW + b.
///
/// # Examples
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use wren_core::Tensor;
/// use wren_nn::{Linear, Module};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let mut linear = Linear::new(4, 2, &mut rng).unwrap();
/// let x = Tensor::full((3, 4), 1.0).unwrap();
/// let mut y = Tensor::default();
/// linear.forward(&x, &mut y).unwrap();
/// assert_eq!(y.dims(), &[3, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Linear {
    /// Weight matrix: [in_features, out_features]
    weight: Tensor,
    /// Bias vector: [out_features]
    bias: Tensor,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new Linear layer with weight and bias drawn from U(-0.1, 0.1).
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let weight = init::uniform(
            (in_features, out_features),
            -LINEAR_INIT_BOUND,
            LINEAR_INIT_BOUND,
            rng,
        )?;
        let bias = init::uniform(out_features, -LINEAR_INIT_BOUND, LINEAR_INIT_BOUND, rng)?;

        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    /// Create a Linear layer from existing weight `[in, out]` and bias `[out]`.
    /// Useful for loading reference parameters.
    pub fn from_tensors(mut weight: Tensor, mut bias: Tensor) -> Result<Self> {
        if weight.rank() != 2 {
            return Err(Error::RankMismatch {
                op: "Linear",
                expected: 2,
                got: weight.rank(),
            });
        }
        let (in_features, out_features) = (weight.dims()[0], weight.dims()[1]);

        if bias.rank() != 1 || bias.dims()[0] != out_features {
            return Err(Error::FeatureMismatch {
                op: "Linear",
                expected: out_features,
                got: bias.dims().iter().product(),
            });
        }
        for t in [&weight, &bias] {
            let expected = t.size()?;
            if t.data.len() != expected {
                return Err(Error::ElementCountMismatch {
                    op: "Linear",
                    expected,
                    got: t.data.len(),
                });
            }
        }

        weight.resize_grad()?;
        bias.resize_grad()?;
        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    /// The input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// The output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn weight_mut(&mut self) -> &mut Tensor {
        &mut self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    pub fn bias_mut(&mut self) -> &mut Tensor {
        &mut self.bias
    }

    /// Validate a `[batch, in_features]` input and return the batch size.
    fn check_input(&self, input: &Tensor) -> Result<usize> {
        if input.rank() != 2 {
            return Err(Error::RankMismatch {
                op: "Linear",
                expected: 2,
                got: input.rank(),
            });
        }
        let dims = input.dims();
        if dims[1] != self.in_features {
            return Err(Error::FeatureMismatch {
                op: "Linear",
                expected: self.in_features,
                got: dims[1],
            });
        }
        let expected = input.size()?;
        if input.data.len() != expected {
            return Err(Error::ElementCountMismatch {
                op: "Linear",
                expected,
                got: input.data.len(),
            });
        }
        Ok(dims[0])
    }

    /// Validate a `[batch, out_features]` upstream gradient.
    fn check_grad_output(&self, output: &Tensor, batch: usize) -> Result<()> {
        if output.rank() != 2 {
            return Err(Error::RankMismatch {
                op: "Linear",
                expected: 2,
                got: output.rank(),
            });
        }
        let dims = output.dims();
        if dims[1] != self.out_features {
            return Err(Error::FeatureMismatch {
                op: "Linear",
                expected: self.out_features,
                got: dims[1],
            });
        }
        if dims[0] != batch {
            return Err(Error::ElementCountMismatch {
                op: "Linear",
                expected: batch,
                got: dims[0],
            });
        }
        if output.grad.is_empty() {
            return Err(Error::MissingGrad { op: "Linear" });
        }
        if output.grad.len() != batch * self.out_features {
            return Err(Error::ElementCountMismatch {
                op: "Linear",
                expected: batch * self.out_features,
                got: output.grad.len(),
            });
        }
        Ok(())
    }
}

impl Module for Linear {
    /// Forward pass: y = x @ W + b
    ///
    /// Input shape:  [batch, in_features]
    /// Output shape: [batch, out_features]
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        let batch = self.check_input(input)?;
        let (n_in, n_out) = (self.in_features, self.out_features);

        output.shape = Shape::from((batch, n_out));
        output.resize()?;

        for b in 0..batch {
            let x = &input.data[b * n_in..(b + 1) * n_in];
            let y = &mut output.data[b * n_out..(b + 1) * n_out];
            y.copy_from_slice(&self.bias.data);
            for (k, &xk) in x.iter().enumerate() {
                let w_row = &self.weight.data[k * n_out..(k + 1) * n_out];
                for (yj, &wkj) in y.iter_mut().zip(w_row) {
                    *yj += xk * wkj;
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        let batch = self.check_input(input)?;
        self.check_grad_output(output, batch)?;
        let (n_in, n_out) = (self.in_features, self.out_features);

        input.resize_grad()?;
        self.weight.resize_grad()?;
        self.bias.resize_grad()?;

        for b in 0..batch {
            let dy = &output.grad[b * n_out..(b + 1) * n_out];
            for k in 0..n_in {
                let xk = input.data[b * n_in + k];
                let w_row = &self.weight.data[k * n_out..(k + 1) * n_out];
                let wg_row = &mut self.weight.grad[k * n_out..(k + 1) * n_out];

                let mut dx = 0.0;
                for ((&dyj, &wkj), wg) in dy.iter().zip(w_row).zip(wg_row.iter_mut()) {
                    dx += dyj * wkj;
                    *wg += dyj * xk;
                }
                input.grad[b * n_in + k] = dx;
            }
            for (bg, &dyj) in self.bias.grad.iter_mut().zip(dy) {
                *bg += dyj;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "Linear(in_features={}, out_features={})",
            self.in_features, self.out_features
        )
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![
            ("weight".to_string(), &self.weight),
            ("bias".to_string(), &self.bias),
        ]
    }
}
