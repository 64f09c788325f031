//! Numerically stabilised tensor primitives shared by divergences and kernels.
//!
//! All functions are generic over `B: Backend` and differentiable when `B`
//! is an autodiff backend.

use burn::prelude::*;

use crate::types::CneError;

/// Floor for vector norms in [`l2_normalize_last`].
pub const NORM_EPS: f64 = 1e-12;

/// Flatten a tensor of any rank into a 1D batch.
pub fn flatten<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, 1> {
    let n = x.shape().num_elements();
    x.reshape([n])
}

/// `log(mean(exp(x)))` over every element, shape `(1,)`.
///
/// The max shift is detached: it cancels analytically, so the gradient
/// is the softmax of `x` either way. All `-inf` input gives `-inf`, and any
/// `+inf` entry gives `+inf`.
pub fn logmeanexp<B: Backend>(x: Tensor<B, 1>) -> Tensor<B, 1> {
    let m = finite_shift(x.clone().max());
    (x - m.clone()).exp().mean().log() + m
}

/// `log(sum(exp(x)))` over the last axis, squeezed to rank `O = D - 1`.
pub fn logsumexp_last<B: Backend, const D: usize, const O: usize>(
    x: Tensor<B, D>,
) -> Tensor<B, O> {
    let m = finite_shift(x.clone().max_dim(D - 1));
    let lse = (x - m.clone()).exp().sum_dim(D - 1).log() + m;
    lse.squeeze::<O>(D - 1)
}

/// Detached max shift with infinite entries replaced by 0.
fn finite_shift<B: Backend, const D: usize>(m: Tensor<B, D>) -> Tensor<B, D> {
    let m = m.detach();
    let infinite = m.clone().abs().equal_elem(f64::INFINITY);
    m.mask_fill(infinite, 0.0)
}

/// `exp(x) - 1` without cancellation near zero.
///
/// Uses `exp(x) - 1 = tanh(x / 2) * (exp(x) + 1)`, which has no
/// subtraction of nearly equal quantities. Once `exp(x)` overflows the
/// float type the value is `+inf` but the gradient is NaN (`0 * inf`).
pub fn expm1<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone().div_scalar(2.0).tanh() * x.exp().add_scalar(1.0)
}

/// Divide each vector along the last axis by its L2 norm, floored at
/// [`NORM_EPS`]. Shape is unchanged.
pub fn l2_normalize_last<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let norm = x
        .clone()
        .powf_scalar(2.0)
        .sum_dim(D - 1)
        .sqrt()
        .clamp_min(NORM_EPS);
    x / norm
}

/// Sum over the last axis, squeezed to rank `O = D - 1`.
pub fn sum_last<B: Backend, const D: usize, const O: usize>(x: Tensor<B, D>) -> Tensor<B, O> {
    x.sum_dim(D - 1).squeeze::<O>(D - 1)
}

/// Broadcast two shapes of equal rank: each axis must match or be 1.
pub fn broadcast_shape<const D: usize>(
    lhs: [usize; D],
    rhs: [usize; D],
) -> Result<[usize; D], CneError> {
    let mut out = [0; D];
    for axis in 0..D {
        out[axis] = match (lhs[axis], rhs[axis]) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(CneError::ShapeMismatch {
                    lhs: lhs.to_vec(),
                    rhs: rhs.to_vec(),
                })
            }
        };
    }
    Ok(out)
}

/// Expand `a` and `b` to their common broadcast shape.
pub fn broadcast_pair<B: Backend, const D: usize>(
    a: Tensor<B, D>,
    b: Tensor<B, D>,
) -> Result<(Tensor<B, D>, Tensor<B, D>), CneError> {
    let shape = broadcast_shape(a.dims(), b.dims())?;
    Ok((a.expand(Shape::new(shape)), b.expand(Shape::new(shape))))
}
