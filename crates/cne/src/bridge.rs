//! Conversions between plain `Vec<f32>` latents/logits and burn tensors.
//!
//! Encoders outside this crate hand over latent vectors as `Vec<f32>`;
//! kernels need `Tensor<B, 2>` and divergences need `Tensor<B, 1>`.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::types::CneError;

/// Stack latent vectors into a `(batch, dim)` tensor.
///
/// Fails on an empty batch or when the vectors differ in length.
pub fn latents_to_tensor<B: Backend>(
    latents: &[Vec<f32>],
    device: &B::Device,
) -> Result<Tensor<B, 2>, CneError> {
    let first = latents.first().ok_or(CneError::EmptyBatch)?;
    let dim = first.len();
    if dim == 0 {
        return Err(CneError::EmptyBatch);
    }
    if let Some(bad) = latents.iter().find(|v| v.len() != dim) {
        return Err(CneError::ShapeMismatch {
            lhs: vec![dim],
            rhs: vec![bad.len()],
        });
    }

    let batch = latents.len();
    let flat: Vec<f32> = latents.iter().flat_map(|v| v.iter().copied()).collect();
    Ok(Tensor::from_data(TensorData::new(flat, [batch, dim]), device))
}

/// Wrap a slice of logits as a 1D tensor.
pub fn logits_to_tensor<B: Backend>(logits: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(logits.to_vec(), [logits.len()]), device)
}

/// Extract f64 values from a 1D tensor.
pub fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 1>) -> Vec<f64> {
    let data = tensor.into_data();
    data.iter::<f64>().collect()
}

/// Extract the value of a single-element tensor.
///
/// # Panics
/// Panics if the tensor does not contain exactly one element.
pub fn tensor_to_f64<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    tensor.into_scalar().elem()
}
