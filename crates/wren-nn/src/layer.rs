// Layer: the closed set of layers a Model can hold
//
// Every concrete layer implements `Module` on its own; `Layer` wraps them in
// one enum so a `Model` can store them by value in a `Vec<Layer>` and drop
// them with itself. Dispatch is a plain `match`.
//
//   model.add_layer(Linear::new(3, 2, &mut rng)?);   // From<Linear>
//   model.add_layer(ReLU);                           // From<ReLU>

use std::fmt;

use wren_core::error::Result;
use wren_core::tensor::Tensor;

use crate::activation::{ReLU, Sigmoid, Tanh};
use crate::batchnorm::{BatchNorm1d, BatchNorm2d, BatchNorm3d};
use crate::linear::Linear;
use crate::module::Module;

/// Any layer that can be placed in a [`Model`](crate::Model).
#[derive(Debug, Clone)]
pub enum Layer {
    Linear(Linear),
    ReLU(ReLU),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    BatchNorm1d(BatchNorm1d),
    BatchNorm2d(BatchNorm2d),
    BatchNorm3d(BatchNorm3d),
}

/// Forward a method call to whichever variant is active.
macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            Layer::Linear($layer) => $body,
            Layer::ReLU($layer) => $body,
            Layer::Sigmoid($layer) => $body,
            Layer::Tanh($layer) => $body,
            Layer::BatchNorm1d($layer) => $body,
            Layer::BatchNorm2d($layer) => $body,
            Layer::BatchNorm3d($layer) => $body,
        }
    };
}

impl Module for Layer {
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        dispatch!(self, l => l.forward(input, output))
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        dispatch!(self, l => l.backward(output, input))
    }

    fn describe(&self) -> String {
        dispatch!(self, l => l.describe())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        dispatch!(self, l => l.parameters())
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        dispatch!(self, l => l.parameters_mut())
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        dispatch!(self, l => l.named_parameters())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

macro_rules! layer_conversions {
    ($($variant:ident($ty:ty), $as_ref:ident, $as_mut:ident;)*) => {
        $(
            impl From<$ty> for Layer {
                fn from(layer: $ty) -> Self {
                    Layer::$variant(layer)
                }
            }
        )*

        impl Layer {
            $(
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Layer::$variant(l) => Some(l),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Layer::$variant(l) => Some(l),
                        _ => None,
                    }
                }
            )*
        }
    };
}

layer_conversions! {
    Linear(Linear), as_linear, as_linear_mut;
    ReLU(ReLU), as_relu, as_relu_mut;
    Sigmoid(Sigmoid), as_sigmoid, as_sigmoid_mut;
    Tanh(Tanh), as_tanh, as_tanh_mut;
    BatchNorm1d(BatchNorm1d), as_batch_norm1d, as_batch_norm1d_mut;
    BatchNorm2d(BatchNorm2d), as_batch_norm2d, as_batch_norm2d_mut;
    BatchNorm3d(BatchNorm3d), as_batch_norm3d, as_batch_norm3d_mut;
}
