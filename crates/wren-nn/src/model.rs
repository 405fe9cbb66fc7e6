// Model: A chain of layers applied one after another
//
// Model is a list of layers applied in order. The output of each layer
// becomes the input to the next.
//
// Example:
//   let mut model = Model::new();
//   model.add_layer(Linear::new(3, 2, &mut rng)?);
//   model.add_layer(ReLU);
//   model.add_layer(Linear::new(2, 1, &mut rng)?);
//
//   model.forward(&input, &mut output)?;
//   output.grad = seed;
//   model.backward(&output, &mut input)?;
//
// ACTIVATION CACHE:
//
// A model of L layers keeps L-1 intermediate tensors. Layer i reads
// activations[i-1] (or the caller's input for i = 0) and writes activations[i]
// (or the caller's output for the last layer). Backward walks the same slots
// in reverse, so it needs the cache left behind by forward: it fails with a
// state error unless the cache holds exactly L-1 tensors.
//
// A failed forward clears the cache.

use std::fmt;

use wren_core::error::{Error, Result};
use wren_core::tensor::Tensor;

use crate::layer::Layer;
use crate::module::Module;

/// An ordered container of layers with its own forward and backward pass.
#[derive(Debug, Clone, Default)]
pub struct Model {
    layers: Vec<Layer>,
    /// Outputs of every layer but the last, from the most recent forward.
    activations: Vec<Tensor>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer to the end of the chain.
    pub fn add_layer(&mut self, layer: impl Into<Layer>) {
        self.layers.push(layer.into());
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the model has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Run every layer in order, writing the final result into `output`.
    pub fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        let n = self.layers.len();
        if n == 0 {
            return Err(Error::EmptyModel);
        }
        log::debug!("model forward through {n} layers");

        self.activations.resize_with(n - 1, Tensor::default);
        let result = self.forward_layers(input, output);
        if result.is_err() {
            self.activations.clear();
        }
        result
    }

    fn forward_layers(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        let n = self.layers.len();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            log::trace!("forward layer {i}: {layer}");
            let (done, rest) = self.activations.split_at_mut(i);
            let current = if i == 0 { input } else { &done[i - 1] };
            let next = if i + 1 == n { &mut *output } else { &mut rest[0] };
            layer.forward(current, next)?;
        }
        Ok(())
    }

    /// Propagate `output.grad` back through every layer, last to first,
    /// leaving the gradient w.r.t. the model input in `input.grad`.
    pub fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        let n = self.layers.len();
        if n == 0 {
            return Err(Error::EmptyModel);
        }
        if self.activations.len() != n - 1 {
            return Err(Error::StaleCache {
                op: "Model",
                expected: n - 1,
                got: self.activations.len(),
            });
        }
        log::debug!("model backward through {n} layers");

        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            log::trace!("backward layer {i}: {layer}");
            let (before, after) = self.activations.split_at_mut(i);
            let current = if i + 1 == n { output } else { &after[0] };
            let prev = match before.last_mut() {
                Some(t) => t,
                None => &mut *input,
            };
            layer.backward(current, prev)?;
        }
        Ok(())
    }

    /// Every layer's parameters, in layer order.
    pub fn parameters(&self) -> Vec<&Tensor> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parameters_mut())
            .collect()
    }

    /// Parameters named `layers.{i}.{name}`.
    pub fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut named = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            for (k, v) in layer.named_parameters() {
                named.push((format!("layers.{i}.{k}"), v));
            }
        }
        named
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters()).sum()
    }

    /// Zero every parameter gradient in every layer.
    pub fn zero_grad(&mut self) {
        for layer in &mut self.layers {
            layer.zero_grad();
        }
    }

    /// One line per layer, each terminated by a newline.
    pub fn describe(&self) -> String {
        let mut s = String::new();
        for layer in &self.layers {
            s.push_str(&layer.describe());
            s.push('\n');
        }
        s
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
