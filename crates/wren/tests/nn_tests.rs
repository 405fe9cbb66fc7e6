// Integration tests for wren-nn
//
// These tests drive layers and models end to end through the facade crate and
// check them against hand-computed reference values.

use rand::rngs::StdRng;
use rand::SeedableRng;
use wren::prelude::*;

fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

fn assert_vec_approx(got: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(
        got.len(),
        expected.len(),
        "length mismatch: {} vs {}",
        got.len(),
        expected.len()
    );
    for (i, (g, e)) in got.iter().zip(expected.iter()).enumerate() {
        assert!(
            approx_eq(*g, *e, tol),
            "index {}: got {} expected {} (tol {})",
            i,
            g,
            e,
            tol
        );
    }
}

fn reference_input() -> wren::Result<Tensor> {
    Tensor::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], (2, 3))
}

fn reference_linear() -> wren::Result<Linear> {
    Linear::from_tensors(
        Tensor::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], (3, 2))?,
        Tensor::from_vec(vec![0.1, 0.2], 2)?,
    )
}

// Linear

#[test]
fn test_linear_reference() -> wren::Result<()> {
    let mut linear = reference_linear()?;
    let mut x = reference_input()?;
    let mut y = Tensor::default();

    linear.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[2, 2]);
    assert_vec_approx(&y.data, &[0.32, 0.48, 0.59, 0.84], 1e-5);

    y.grad = vec![1.0; 4];
    linear.backward(&y, &mut x)?;
    assert_vec_approx(&x.grad, &[0.3, 0.7, 1.1, 0.3, 0.7, 1.1], 1e-5);
    assert_vec_approx(&linear.weight().grad, &[0.5, 0.5, 0.7, 0.7, 0.9, 0.9], 1e-5);
    assert_vec_approx(&linear.bias().grad, &[2.0, 2.0], 1e-5);
    Ok(())
}

#[test]
fn test_linear_seeded_init_is_reproducible() -> wren::Result<()> {
    let a = Linear::new(5, 3, &mut StdRng::seed_from_u64(9))?;
    let b = Linear::new(5, 3, &mut StdRng::seed_from_u64(9))?;
    assert_eq!(a.weight().data, b.weight().data);
    assert_eq!(a.bias().data, b.bias().data);
    Ok(())
}

// Model

fn reference_model() -> wren::Result<Model> {
    let mut model = Model::new();
    model.add_layer(reference_linear()?);
    model.add_layer(ReLU);
    model.add_layer(Linear::from_tensors(
        Tensor::from_vec(vec![0.7, 0.8], (2, 1))?,
        Tensor::from_vec(vec![0.3], 1)?,
    )?);
    Ok(model)
}

#[test]
fn test_model_reference_forward_backward() -> wren::Result<()> {
    let mut model = reference_model()?;
    let mut x = reference_input()?;
    let mut y = Tensor::default();

    model.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[2, 1]);
    assert_vec_approx(&y.data, &[0.908, 1.385], 1e-5);

    y.grad = vec![1.0; 2];
    model.backward(&y, &mut x)?;
    assert_vec_approx(&x.grad, &[0.23, 0.53, 0.83, 0.23, 0.53, 0.83], 1e-5);

    let first = model.layer(0).and_then(Layer::as_linear).expect("linear");
    assert_vec_approx(
        &first.weight().grad,
        &[0.35, 0.4, 0.49, 0.56, 0.63, 0.72],
        1e-5,
    );
    assert_vec_approx(&first.bias().grad, &[1.4, 1.6], 1e-5);

    let last = model.layer(2).and_then(Layer::as_linear).expect("linear");
    assert_vec_approx(&last.weight().grad, &[0.91, 1.32], 1e-5);
    assert_vec_approx(&last.bias().grad, &[2.0], 1e-5);
    Ok(())
}

#[test]
fn test_model_gradients_accumulate_until_zeroed() -> wren::Result<()> {
    let mut model = reference_model()?;
    let mut x = reference_input()?;
    let mut y = Tensor::default();

    model.forward(&x, &mut y)?;
    y.grad = vec![1.0; 2];
    model.backward(&y, &mut x)?;
    model.backward(&y, &mut x)?;

    // Input gradient is overwritten, parameter gradients add up.
    assert_vec_approx(&x.grad, &[0.23, 0.53, 0.83, 0.23, 0.53, 0.83], 1e-5);
    let last = model.layer(2).and_then(Layer::as_linear).expect("linear");
    assert_vec_approx(&last.bias().grad, &[4.0], 1e-5);

    model.zero_grad();
    for p in model.parameters() {
        assert!(p.grad.iter().all(|&g| g == 0.0));
    }
    Ok(())
}

#[test]
fn test_model_backward_without_forward() -> wren::Result<()> {
    let mut model = reference_model()?;
    let mut x = reference_input()?;
    let mut y = Tensor::new((2, 1))?;
    y.grad = vec![1.0; 2];

    let err = model.backward(&y, &mut x).unwrap_err();
    assert!(err.is_state_error());
    assert_eq!(err.kind(), ErrorKind::State);
    Ok(())
}

#[test]
fn test_model_parameters_in_layer_order() -> wren::Result<()> {
    let model = reference_model()?;
    let params = model.parameters();
    assert_eq!(params.len(), 4);
    assert_eq!(params[0].dims(), &[3, 2]);
    assert_eq!(params[1].dims(), &[2]);
    assert_eq!(params[2].dims(), &[2, 1]);
    assert_eq!(params[3].dims(), &[1]);
    assert_eq!(model.num_parameters(), 11);
    Ok(())
}

#[test]
fn test_model_describe() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut model = Model::new();
    model.add_layer(Linear::new(3, 2, &mut rng)?);
    model.add_layer(BatchNorm1d::new(2, &mut rng)?);
    model.add_layer(Sigmoid);
    model.add_layer(Tanh);
    assert_eq!(
        model.describe(),
        "Linear(in_features=3, out_features=2)\nBatchNorm1d(2)\nSigmoid()\nTanh()\n"
    );
    Ok(())
}

#[test]
fn test_model_training_step_reduces_loss() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(21);
    let mut model = Model::new();
    model.add_layer(Linear::new(3, 4, &mut rng)?);
    model.add_layer(Tanh);
    model.add_layer(Linear::new(4, 1, &mut rng)?);

    let mut x = reference_input()?;
    let target = Tensor::from_vec(vec![1.0, -1.0], (2, 1))?;
    let mut y = Tensor::default();

    model.forward(&x, &mut y)?;
    let before = mse_loss(&y, &target)?.data[0];

    let n = y.data.len() as f32;
    y.grad = y
        .data
        .iter()
        .zip(&target.data)
        .map(|(p, t)| 2.0 * (p - t) / n)
        .collect();
    model.backward(&y, &mut x)?;
    for p in model.parameters_mut() {
        for (v, g) in p.data.iter_mut().zip(&p.grad) {
            *v -= 0.1 * g;
        }
    }

    model.forward(&x, &mut y)?;
    let after = mse_loss(&y, &target)?.data[0];
    assert!(after < before, "loss went from {before} to {after}");
    Ok(())
}

// BatchNorm

#[test]
fn test_batchnorm_describe() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(BatchNorm1d::new(64, &mut rng)?.describe(), "BatchNorm1d(64)");
    assert_eq!(BatchNorm2d::new(32, &mut rng)?.describe(), "BatchNorm2d(32)");
    assert_eq!(BatchNorm3d::new(16, &mut rng)?.describe(), "BatchNorm3d(16)");
    Ok(())
}

#[test]
fn test_batchnorm2d_constant_channels() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(1);
    let mut bn = BatchNorm2d::new(2, &mut rng)?;
    let x = Tensor::full((2, 2, 3, 3), 1.0)?;
    let mut y = Tensor::default();
    bn.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[2, 2, 3, 3]);
    assert_vec_approx(&y.data, &[0.0; 36], 1e-4);
    Ok(())
}

#[test]
fn test_batchnorm2d_normalizes_each_channel() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(1);
    let config = BatchNormConfig::default().with_affine(false);
    let mut bn = BatchNorm2d::with_config(2, config, &mut rng)?;

    // [N=2, C=2, H=2, W=2]; channel 1 is channel 0 scaled by 10.
    let data: Vec<f32> = (0..16)
        .map(|i| {
            let c = (i / 4) % 2;
            let v = (i % 4 + 4 * (i / 8)) as f32;
            if c == 1 {
                10.0 * v
            } else {
                v
            }
        })
        .collect();
    let x = Tensor::from_vec(data, (2, 2, 2, 2))?;
    let mut y = Tensor::default();
    bn.forward(&x, &mut y)?;

    for c in 0..2 {
        let vals: Vec<f32> = (0..2)
            .flat_map(|n| {
                let base = (n * 2 + c) * 4;
                y.data[base..base + 4].to_vec()
            })
            .collect();
        let mean = vals.iter().sum::<f32>() / 8.0;
        let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 8.0;
        assert!(mean.abs() < 1e-5, "channel {c} mean {mean}");
        assert!((var - 1.0).abs() < 1e-3, "channel {c} var {var}");
    }

    // Both channels hold the same pattern up to scale, so they normalize alike.
    assert_vec_approx(&y.data[0..4], &y.data[4..8], 1e-4);
    Ok(())
}

#[test]
fn test_batchnorm3d_shapes_and_running_stats() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(2);
    let mut bn = BatchNorm3d::new(3, &mut rng)?;
    let data: Vec<f32> = (0..48).map(|i| (i / 8) as f32).collect();
    let x = Tensor::from_vec(data, (2, 3, 2, 2, 2))?;
    let mut y = Tensor::default();
    bn.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[2, 3, 2, 2, 2]);

    // Sample n, channel c is constant (n*3 + c), so batch mean is c + 1.5.
    let mean = bn.running_mean().expect("tracking running stats");
    assert_vec_approx(&mean.data, &[1.5, 2.5, 3.5], 1e-5);
    let var = bn.running_var().expect("tracking running stats");
    assert_vec_approx(&var.data, &[2.25, 2.25, 2.25], 1e-5);

    y.grad = vec![1.0; 48];
    let mut dx = Tensor::default();
    bn.backward(&y, &mut dx)?;
    assert_eq!(dx.dims(), &[2, 3, 2, 2, 2]);
    assert_vec_approx(&dx.grad, &[0.0; 48], 1e-4);
    Ok(())
}

#[test]
fn test_batchnorm_errors() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut bn = BatchNorm2d::new(3, &mut rng)?;
    let mut y = Tensor::default();

    let wrong_rank = Tensor::new((2, 3))?;
    assert!(bn.forward(&wrong_rank, &mut y).unwrap_err().is_shape_error());

    let wrong_channels = Tensor::new((2, 4, 2, 2))?;
    assert!(bn
        .forward(&wrong_channels, &mut y)
        .unwrap_err()
        .is_shape_error());

    let mut grad = Tensor::new((2, 3, 2, 2))?;
    grad.grad = vec![1.0; 24];
    let mut dx = Tensor::default();
    assert!(bn.backward(&grad, &mut dx).unwrap_err().is_state_error());
    Ok(())
}

/// Compare `layer`'s input gradient with central finite differences of
/// Loss = Σ w_i * y_i, whose output gradient is `w`.
fn check_input_grad<M: Module>(layer: &mut M, x: &Tensor, tol: f32) -> wren::Result<()> {
    let w: Vec<f32> = (0..x.data.len())
        .map(|i| ((i * 7 % 11) as f32 - 5.0) / 5.0)
        .collect();

    let mut loss_at = |input: &Tensor| -> wren::Result<f32> {
        let mut out = Tensor::default();
        layer.forward(input, &mut out)?;
        Ok(out.data.iter().zip(&w).map(|(y, w)| y * w).sum())
    };

    let h = 1e-2;
    let mut numeric = Vec::with_capacity(x.data.len());
    for i in 0..x.data.len() {
        let mut plus = x.clone();
        plus.data[i] += h;
        let mut minus = x.clone();
        minus.data[i] -= h;
        numeric.push((loss_at(&plus)? - loss_at(&minus)?) / (2.0 * h));
    }

    let mut y = Tensor::default();
    layer.forward(x, &mut y)?;
    y.grad = w;
    let mut dx = Tensor::default();
    layer.backward(&y, &mut dx)?;

    assert_vec_approx(&dx.grad, &numeric, tol);
    Ok(())
}

/// Distinct, unordered values in [-2, 2).
fn scrambled(shape: impl Into<Shape>) -> wren::Result<Tensor> {
    let mut t = Tensor::new(shape)?;
    for (i, v) in t.data.iter_mut().enumerate() {
        *v = (i * 13 % 17) as f32 / 4.0 - 2.0;
    }
    Ok(t)
}

#[test]
fn test_batchnorm1d_backward_matches_finite_differences() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(4);
    let mut bn = BatchNorm1d::new(2, &mut rng)?;
    let x = Tensor::from_vec(vec![0.5, -1.0, 1.5, 2.0, -0.3, 0.7, 2.2, -0.4], (4, 2))?;
    check_input_grad(&mut bn, &x, 2e-2)
}

#[test]
fn test_batchnorm2d_backward_matches_finite_differences() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(6);
    let mut bn = BatchNorm2d::new(2, &mut rng)?;
    check_input_grad(&mut bn, &scrambled((2, 2, 2, 2))?, 2e-2)
}

#[test]
fn test_batchnorm3d_backward_matches_finite_differences() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut bn = BatchNorm3d::new(2, &mut rng)?;
    check_input_grad(&mut bn, &scrambled((2, 2, 2, 1, 2))?, 2e-2)
}

#[test]
fn test_batchnorm1d_constant_channels() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(8);
    let mut bn = BatchNorm1d::new(3, &mut rng)?;
    // Column c holds 2.5 * c - 1 in every row.
    let data: Vec<f32> = (0..12).map(|i| 2.5 * (i % 3) as f32 - 1.0).collect();
    let x = Tensor::from_vec(data, (4, 3))?;
    let mut y = Tensor::default();
    bn.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[4, 3]);
    assert_vec_approx(&y.data, &[0.0; 12], 1e-4);
    Ok(())
}

#[test]
fn test_batchnorm3d_constant_channels() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(9);
    let mut bn = BatchNorm3d::new(3, &mut rng)?;
    // [N=2, C=3, D=2, H=2, W=2]: channel c holds c + 0.5 everywhere.
    let data: Vec<f32> = (0..48).map(|i| ((i / 8) % 3) as f32 + 0.5).collect();
    let x = Tensor::from_vec(data, (2, 3, 2, 2, 2))?;
    let mut y = Tensor::default();
    bn.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[2, 3, 2, 2, 2]);
    assert_vec_approx(&y.data, &[0.0; 48], 1e-4);
    Ok(())
}

#[test]
fn test_batchnorm_in_model() -> wren::Result<()> {
    let mut rng = StdRng::seed_from_u64(5);
    let mut model = Model::new();
    model.add_layer(Linear::new(3, 4, &mut rng)?);
    model.add_layer(BatchNorm1d::new(4, &mut rng)?);
    model.add_layer(ReLU);
    model.add_layer(Linear::new(4, 1, &mut rng)?);

    let mut x = Tensor::from_vec(
        vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, -0.1, 0.9, 0.2, 0.7, -0.5, 0.3],
        (4, 3),
    )?;
    let mut y = Tensor::default();
    model.forward(&x, &mut y)?;
    assert_eq!(y.dims(), &[4, 1]);

    y.grad = vec![1.0; 4];
    model.backward(&y, &mut x)?;
    assert_eq!(x.grad.len(), 12);

    let bn = model
        .layer_mut(1)
        .and_then(Layer::as_batch_norm1d_mut)
        .expect("batch norm");
    assert_eq!(bn.num_features(), 4);
    assert!(bn.beta().expect("affine").grad.iter().any(|&g| g != 0.0));
    Ok(())
}

// Loss

#[test]
fn test_mse_loss() -> wren::Result<()> {
    let pred = Tensor::from_vec(vec![0.908, 1.385], (2, 1))?;
    let target = Tensor::from_vec(vec![1.0, 1.0], (2, 1))?;
    let loss = mse_loss(&pred, &target)?;
    assert_eq!(loss.dims(), &[1]);
    // ((-0.092)² + 0.385²) / 2
    assert_vec_approx(&loss.data, &[(0.092 * 0.092 + 0.385 * 0.385) / 2.0], 1e-6);

    let short = Tensor::new(1)?;
    assert!(mse_loss(&pred, &short).unwrap_err().is_shape_error());
    Ok(())
}

// Tensor

#[test]
fn test_tensor_lifecycle() -> wren::Result<()> {
    let mut t = Tensor::default();
    assert!(!t.validate_shape());
    assert!(t.size().unwrap_err().is_shape_error());

    t.shape = Shape::from((2, 3));
    t.resize()?;
    t.resize_grad()?;
    assert_eq!(t.data.len(), 6);
    assert_eq!(t.grad.len(), 6);

    t.grad.fill(3.0);
    t.zero_grad();
    assert!(t.grad.iter().all(|&g| g == 0.0));
    Ok(())
}
