//! # Wren
//!
//! A small reverse-mode differentiation engine for feed-forward pipelines.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use wren::prelude::*;
//!
//! # fn main() -> wren::Result<()> {
//! let mut rng = StdRng::seed_from_u64(0);
//! let mut model = Model::new();
//! model.add_layer(Linear::new(3, 2, &mut rng)?);
//! model.add_layer(ReLU);
//! model.add_layer(Linear::new(2, 1, &mut rng)?);
//!
//! let mut x = Tensor::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], (2, 3))?;
//! let mut y = Tensor::default();
//! model.forward(&x, &mut y)?;
//!
//! let target = Tensor::from_vec(vec![1.0, 0.0], (2, 1))?;
//! let loss = mse_loss(&y, &target)?;
//! assert_eq!(loss.dims(), &[1]);
//!
//! y.grad = y
//!     .data
//!     .iter()
//!     .zip(&target.data)
//!     .map(|(p, t)| 2.0 * (p - t) / 2.0)
//!     .collect();
//! model.backward(&y, &mut x)?;
//! assert_eq!(x.grad.len(), 6);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `wren-core` | Tensor, Shape, Error |
//! | `wren-nn` | Layers (Linear, activations, BatchNorm), Model, mse_loss |

/// Re-export core types.
pub use wren_core::{Error, ErrorKind, Result, Shape, Tensor};

/// Re-export layers, the model and the loss.
pub mod nn {
    pub use wren_nn::*;
}

pub mod prelude {
    pub use crate::nn::{
        mse_loss, BatchNorm1d, BatchNorm2d, BatchNorm3d, BatchNormConfig, Layer, Linear, Model,
        Module, ReLU, Sigmoid, Tanh,
    };
    pub use crate::{Error, ErrorKind, Result, Shape, Tensor};
}
