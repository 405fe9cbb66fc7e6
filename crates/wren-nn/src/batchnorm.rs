// BatchNorm{1d,2d,3d}: Batch Normalization
//
// Batch Normalization normalizes activations ACROSS the batch for each
// channel, stabilizing and accelerating training.
//
// FORMULA:
//   x_hat = (x - mean_batch) / sqrt(var_batch + ε)
//   y = γ * x_hat + β            (or just x_hat when affine = false)
//
// SHAPES (channel axis is always axis 1):
//   BatchNorm1d: [B, C]            statistics over B
//   BatchNorm2d: [N, C, H, W]      statistics over N, H, W
//   BatchNorm3d: [N, C, D, H, W]   statistics over N, D, H, W
//
// All three share one layout: element (n, c, s) of a flattened spatial
// extent S lives at (n*C + c)*S + s, with S = 1 for the 1d case. So a single
// generic implementation serves every rank.
//
// VARIANCE is biased (divide by count, not count - 1).
//
// RUNNING STATISTICS:
//   The first forward SETS running_mean / running_var to the batch stats.
//   Every later forward blends them:
//     running = (1 - momentum) * running + momentum * batch
//   There is no eval mode; forward always normalizes with batch stats.
//
// BACKWARD:
//   Forward keeps a copy of the raw input; backward recomputes mean, var and
//   x_hat from it. Per channel, with count = N * S:
//     sum_dy      = Σ dy
//     sum_dy_xhat = Σ dy * x_hat
//     dx = inv_std * γ * (dy - sum_dy / count - x_hat * sum_dy_xhat / count)
//     dβ += sum_dy,  dγ += sum_dy_xhat

use rand::Rng;
use wren_core::error::{Error, Result};
use wren_core::tensor::Tensor;

use crate::init;
use crate::module::Module;

/// Range the scale (γ) is drawn from at construction.
const GAMMA_INIT_RANGE: (f32, f32) = (0.9, 1.1);

/// Hyperparameters shared by every BatchNorm variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchNormConfig {
    /// Added to the variance before the square root (default: 1e-5).
    pub eps: f32,
    /// Blend factor for running statistics (default: 0.1).
    pub momentum: f32,
    /// Whether to learn a per-channel scale and shift (default: true).
    pub affine: bool,
    /// Whether to maintain running mean / variance (default: true).
    pub track_running_stats: bool,
}

impl Default for BatchNormConfig {
    fn default() -> Self {
        Self {
            eps: 1e-5,
            momentum: 0.1,
            affine: true,
            track_running_stats: true,
        }
    }
}

impl BatchNormConfig {
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_affine(mut self, affine: bool) -> Self {
        self.affine = affine;
        self
    }

    pub fn with_track_running_stats(mut self, track: bool) -> Self {
        self.track_running_stats = track;
        self
    }
}

/// Learnable per-channel scale and shift.
#[derive(Debug, Clone)]
struct Affine {
    gamma: Tensor,
    beta: Tensor,
}

/// Running estimates of the per-channel mean and variance.
#[derive(Debug, Clone)]
struct RunningStats {
    mean: Tensor,
    var: Tensor,
    initialized: bool,
}

/// Flattened view of an input: `outer` samples × `channels` × `inner` positions.
#[derive(Debug, Clone, Copy)]
struct ChannelLayout {
    outer: usize,
    channels: usize,
    inner: usize,
}

impl ChannelLayout {
    fn count(&self) -> usize {
        self.outer * self.inner
    }

    fn len(&self) -> usize {
        self.outer * self.channels * self.inner
    }

    /// Flat indices of every element in channel `c`, in (n, s) order.
    fn indices(&self, c: usize) -> impl Iterator<Item = usize> {
        let ChannelLayout {
            outer,
            channels,
            inner,
        } = *self;
        (0..outer).flat_map(move |n| {
            let base = (n * channels + c) * inner;
            base..base + inner
        })
    }

    /// Biased mean and variance of channel `c` in `data`.
    fn stats(&self, data: &[f32], c: usize) -> (f32, f32) {
        let count = self.count() as f32;
        let mean = self.indices(c).map(|i| data[i]).sum::<f32>() / count;
        let var = self
            .indices(c)
            .map(|i| {
                let d = data[i] - mean;
                d * d
            })
            .sum::<f32>()
            / count;
        (mean, var)
    }
}

/// Batch Normalization over `N` spatial dimensions (1, 2 or 3).
///
/// Use the [`BatchNorm1d`], [`BatchNorm2d`] and [`BatchNorm3d`] aliases.
///
/// # Examples
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use wren_core::Tensor;
/// use wren_nn::{BatchNorm2d, Module};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let mut bn = BatchNorm2d::new(2, &mut rng).unwrap();
/// let x = Tensor::full((2, 2, 3, 3), 1.0).unwrap();
/// let mut y = Tensor::default();
/// bn.forward(&x, &mut y).unwrap();
/// assert!(y.data.iter().all(|v| v.abs() < 1e-4));
/// ```
#[derive(Debug, Clone)]
pub struct BatchNorm<const N: usize> {
    num_features: usize,
    config: BatchNormConfig,
    affine: Option<Affine>,
    running: Option<RunningStats>,
    /// Raw input of the last forward pass, empty until forward runs.
    input_cache: Vec<f32>,
}

/// Batch Normalization over `[B, C]` inputs.
pub type BatchNorm1d = BatchNorm<1>;
/// Batch Normalization over `[N, C, H, W]` inputs.
pub type BatchNorm2d = BatchNorm<2>;
/// Batch Normalization over `[N, C, D, H, W]` inputs.
pub type BatchNorm3d = BatchNorm<3>;

impl<const N: usize> BatchNorm<N> {
    /// Rank of the tensors this layer accepts.
    pub const RANK: usize = if N == 1 { 2 } else { N + 2 };

    const NAME: &'static str = match N {
        1 => "BatchNorm1d",
        2 => "BatchNorm2d",
        3 => "BatchNorm3d",
        _ => "BatchNorm",
    };

    /// Create a layer with the default configuration
    /// (eps 1e-5, momentum 0.1, affine, tracking running stats).
    pub fn new<R: Rng + ?Sized>(num_features: usize, rng: &mut R) -> Result<Self> {
        Self::with_config(num_features, BatchNormConfig::default(), rng)
    }

    /// Create a layer with explicit hyperparameters.
    ///
    /// γ is drawn from U(0.9, 1.1), β starts at zero, and running statistics
    /// start at zero until the first forward pass sets them.
    pub fn with_config<R: Rng + ?Sized>(
        num_features: usize,
        config: BatchNormConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let affine = if config.affine {
            let (low, high) = GAMMA_INIT_RANGE;
            Some(Affine {
                gamma: init::uniform(num_features, low, high, rng)?,
                beta: init::zeros(num_features)?,
            })
        } else {
            None
        };

        let running = if config.track_running_stats {
            Some(RunningStats {
                mean: Tensor::new(num_features)?,
                var: Tensor::new(num_features)?,
                initialized: false,
            })
        } else {
            None
        };

        Ok(BatchNorm {
            num_features,
            config,
            affine,
            running,
            input_cache: Vec::new(),
        })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn config(&self) -> &BatchNormConfig {
        &self.config
    }

    /// Learnable scale, when affine.
    pub fn gamma(&self) -> Option<&Tensor> {
        self.affine.as_ref().map(|a| &a.gamma)
    }

    /// Learnable shift, when affine.
    pub fn beta(&self) -> Option<&Tensor> {
        self.affine.as_ref().map(|a| &a.beta)
    }

    /// Running mean, when tracking running statistics.
    pub fn running_mean(&self) -> Option<&Tensor> {
        self.running.as_ref().map(|r| &r.mean)
    }

    /// Running variance, when tracking running statistics.
    pub fn running_var(&self) -> Option<&Tensor> {
        self.running.as_ref().map(|r| &r.var)
    }

    /// Check rank and channel count, and derive the flattened layout.
    fn layout_of(&self, t: &Tensor) -> Result<ChannelLayout> {
        if t.rank() != Self::RANK {
            return Err(Error::RankMismatch {
                op: Self::NAME,
                expected: Self::RANK,
                got: t.rank(),
            });
        }
        let dims = t.dims();
        if dims[1] != self.num_features {
            return Err(Error::FeatureMismatch {
                op: Self::NAME,
                expected: self.num_features,
                got: dims[1],
            });
        }
        // Validates against zero dimensions too.
        t.size()?;
        Ok(ChannelLayout {
            outer: dims[0],
            channels: dims[1],
            inner: dims[2..].iter().product(),
        })
    }

    fn gamma_at(&self, c: usize) -> f32 {
        self.affine.as_ref().map_or(1.0, |a| a.gamma.data[c])
    }

    fn update_running(&mut self, c: usize, mean: f32, var: f32) {
        let momentum = self.config.momentum;
        if let Some(running) = self.running.as_mut() {
            if running.initialized {
                running.mean.data[c] = (1.0 - momentum) * running.mean.data[c] + momentum * mean;
                running.var.data[c] = (1.0 - momentum) * running.var.data[c] + momentum * var;
            } else {
                running.mean.data[c] = mean;
                running.var.data[c] = var;
            }
        }
    }
}

impl<const N: usize> Module for BatchNorm<N> {
    fn forward(&mut self, input: &Tensor, output: &mut Tensor) -> Result<()> {
        let layout = self.layout_of(input)?;
        if input.data.len() != layout.len() {
            return Err(Error::ElementCountMismatch {
                op: Self::NAME,
                expected: layout.len(),
                got: input.data.len(),
            });
        }

        output.shape = input.shape.clone();
        output.resize()?;
        self.input_cache.clone_from(&input.data);

        for c in 0..layout.channels {
            let (mean, var) = layout.stats(&input.data, c);
            self.update_running(c, mean, var);

            let inv_std = 1.0 / (var + self.config.eps).sqrt();
            let (gamma, beta) = match &self.affine {
                Some(a) => (a.gamma.data[c], a.beta.data[c]),
                None => (1.0, 0.0),
            };
            for i in layout.indices(c) {
                let x_hat = (input.data[i] - mean) * inv_std;
                output.data[i] = gamma * x_hat + beta;
            }
        }

        if let Some(running) = self.running.as_mut() {
            if !running.initialized {
                log::debug!(
                    "{}({}): running statistics seeded from first batch",
                    Self::NAME,
                    self.num_features
                );
                running.initialized = true;
            }
        }
        Ok(())
    }

    fn backward(&mut self, output: &Tensor, input: &mut Tensor) -> Result<()> {
        if self.input_cache.is_empty() {
            return Err(Error::BackwardBeforeForward { op: Self::NAME });
        }
        let layout = self.layout_of(output)?;
        if output.grad.is_empty() {
            return Err(Error::MissingGrad { op: Self::NAME });
        }
        if output.grad.len() != layout.len() {
            return Err(Error::ElementCountMismatch {
                op: Self::NAME,
                expected: layout.len(),
                got: output.grad.len(),
            });
        }
        if self.input_cache.len() != layout.len() {
            return Err(Error::StaleCache {
                op: Self::NAME,
                expected: layout.len(),
                got: self.input_cache.len(),
            });
        }

        input.shape = output.shape.clone();
        input.resize()?;
        input.resize_grad()?;
        if let Some(a) = self.affine.as_mut() {
            a.gamma.resize_grad()?;
            a.beta.resize_grad()?;
        }

        let count = layout.count() as f32;
        let dy = &output.grad;
        for c in 0..layout.channels {
            let (mean, var) = layout.stats(&self.input_cache, c);
            let inv_std = 1.0 / (var + self.config.eps).sqrt();
            let gamma = self.gamma_at(c);

            let x_hat: Vec<f32> = layout
                .indices(c)
                .map(|i| (self.input_cache[i] - mean) * inv_std)
                .collect();

            let (mut sum_dy, mut sum_dy_xhat) = (0.0f32, 0.0f32);
            for (i, &xh) in layout.indices(c).zip(&x_hat) {
                sum_dy += dy[i];
                sum_dy_xhat += dy[i] * xh;
            }

            for (i, &xh) in layout.indices(c).zip(&x_hat) {
                input.grad[i] =
                    inv_std * gamma * (dy[i] - sum_dy / count - xh * sum_dy_xhat / count);
            }

            if let Some(a) = self.affine.as_mut() {
                a.beta.grad[c] += sum_dy;
                a.gamma.grad[c] += sum_dy_xhat;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}({})", Self::NAME, self.num_features)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match &self.affine {
            Some(a) => vec![&a.gamma, &a.beta],
            None => vec![],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.affine {
            Some(a) => vec![&mut a.gamma, &mut a.beta],
            None => vec![],
        }
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        match &self.affine {
            Some(a) => vec![
                ("weight".to_string(), &a.gamma),
                ("bias".to_string(), &a.beta),
            ],
            None => vec![],
        }
    }
}
