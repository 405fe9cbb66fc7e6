//! # wren-nn
//!
//! Layers, the sequential [`Model`] and the loss function for wren.
//!
//! Every layer implements the [`Module`] trait, which pairs an explicit
//! forward pass with a hand-written backward pass:
//!
//! 1. **Linear**: fully connected, `y = xW + b`
//! 2. **Activations**: ReLU, Sigmoid, Tanh
//! 3. **BatchNorm1d / 2d / 3d**: per-channel batch normalization
//! 4. **Model**: an ordered chain of [`Layer`]s with its own activation cache
//! 5. **mse_loss**: mean squared error
//!
//! Layers that draw random initial parameters take the generator as an
//! argument, so a seeded `StdRng` reproduces a network exactly.

pub mod activation;
pub mod batchnorm;
pub mod init;
pub mod layer;
pub mod linear;
pub mod loss;
pub mod model;
pub mod module;

pub use activation::{ReLU, Sigmoid, Tanh};
pub use batchnorm::{BatchNorm, BatchNorm1d, BatchNorm2d, BatchNorm3d, BatchNormConfig};
pub use layer::Layer;
pub use linear::{Linear, LINEAR_INIT_BOUND};
pub use loss::mse_loss;
pub use model::Model;
pub use module::Module;
