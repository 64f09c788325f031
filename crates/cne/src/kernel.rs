//! Similarity kernels: log-densities of probability families evaluated
//! between pairs of latent vectors.
//!
//! A kernel is bound to a location (and for the location-scale families,
//! a scale) at construction. `log_prob(value)` scores `value` against the
//! location and reduces over the last (feature) axis, so a rank-`D` batch
//! `(..., features)` gives rank-`O = D - 1` logits `(...)`. Leading axes
//! broadcast by the usual size-1 rule: a location of shape `(N, 1, F)`
//! against a value of shape `(1, M, F)` gives all-pairs logits `(N, M)`.
//! The output rank is a const parameter, usually inferred from the binding.
//!
//! | key | family | geometry |
//! |-----|--------|----------|
//! | `normal`, `studentt` | Gaussian, Cauchy-like | Euclidean (squared) |
//! | `laplace`, `laplacet` | Laplace, heavy-tailed Laplace | Euclidean (L1) |
//! | `vonmises`, `sphericalt` | von Mises-Fisher | hypersphere |
//! | `categorical`, `bhattacharyya`, `joint_product` | categorical | simplex |
//! | `inner_product` | unnormalised | dot product |

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax, softplus};

use crate::ops::{broadcast_pair, l2_normalize_last, logsumexp_last, sum_last};
use crate::types::CneError;

/// Registry keys accepted by [`kernel_type`], in registration order.
pub const KERNEL_NAMES: [&str; 10] = [
    "normal",
    "studentt",
    "categorical",
    "laplace",
    "vonmises",
    "sphericalt",
    "laplacet",
    "inner_product",
    "bhattacharyya",
    "joint_product",
];

/// Location and scale broadcast to a common shape.
#[derive(Debug, Clone)]
struct LocScale<B: Backend, const D: usize> {
    loc: Tensor<B, D>,
    scale: Tensor<B, D>,
}

impl<B: Backend, const D: usize> LocScale<B, D> {
    fn new(loc: Tensor<B, D>, scale: Tensor<B, D>) -> Result<Self, CneError> {
        let (loc, scale) = broadcast_pair(loc, scale)?;
        Ok(Self { loc, scale })
    }

    fn standard(loc: Tensor<B, D>) -> Self {
        let scale = loc.ones_like();
        Self { loc, scale }
    }

    /// `(value - loc) / scale`
    fn standardize(&self, value: Tensor<B, D>) -> Tensor<B, D> {
        (value - self.loc.clone()) / self.scale.clone()
    }
}

/// Laplace: `-sum(|y|)`.
#[derive(Debug, Clone)]
pub struct Laplace<B: Backend, const D: usize> {
    params: LocScale<B, D>,
}

impl<B: Backend, const D: usize> Laplace<B, D> {
    pub fn new(loc: Tensor<B, D>, scale: Tensor<B, D>) -> Result<Self, CneError> {
        Ok(Self {
            params: LocScale::new(loc, scale)?,
        })
    }

    pub fn standard(loc: Tensor<B, D>) -> Self {
        Self {
            params: LocScale::standard(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.params.standardize(value).abs()).neg()
    }
}

/// Heavy-tailed Laplace: `-log1p(sum(|y|))`.
#[derive(Debug, Clone)]
pub struct LaplaceT<B: Backend, const D: usize> {
    params: LocScale<B, D>,
}

impl<B: Backend, const D: usize> LaplaceT<B, D> {
    pub fn new(loc: Tensor<B, D>, scale: Tensor<B, D>) -> Result<Self, CneError> {
        Ok(Self {
            params: LocScale::new(loc, scale)?,
        })
    }

    pub fn standard(loc: Tensor<B, D>) -> Self {
        Self {
            params: LocScale::standard(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.params.standardize(value).abs()).log1p().neg()
    }
}

/// Student-t with one degree of freedom: `-log1p(sum(y^2))`.
#[derive(Debug, Clone)]
pub struct StudentT<B: Backend, const D: usize> {
    params: LocScale<B, D>,
}

impl<B: Backend, const D: usize> StudentT<B, D> {
    pub fn new(loc: Tensor<B, D>, scale: Tensor<B, D>) -> Result<Self, CneError> {
        Ok(Self {
            params: LocScale::new(loc, scale)?,
        })
    }

    pub fn standard(loc: Tensor<B, D>) -> Self {
        Self {
            params: LocScale::standard(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.params.standardize(value).powf_scalar(2.0))
            .log1p()
            .neg()
    }
}

/// Gaussian without normalising constant: `-sum(y^2) / 2`.
#[derive(Debug, Clone)]
pub struct Normal<B: Backend, const D: usize> {
    params: LocScale<B, D>,
}

impl<B: Backend, const D: usize> Normal<B, D> {
    pub fn new(loc: Tensor<B, D>, scale: Tensor<B, D>) -> Result<Self, CneError> {
        Ok(Self {
            params: LocScale::new(loc, scale)?,
        })
    }

    pub fn standard(loc: Tensor<B, D>) -> Self {
        Self {
            params: LocScale::standard(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.params.standardize(value).powf_scalar(2.0).div_scalar(2.0)).neg()
    }
}

/// von Mises-Fisher: cosine similarity between `loc` and `value`.
///
/// `loc` is normalised once at construction, `value` on every call.
#[derive(Debug, Clone)]
pub struct VonMises<B: Backend, const D: usize> {
    loc: Tensor<B, D>,
}

impl<B: Backend, const D: usize> VonMises<B, D> {
    pub fn new(loc: Tensor<B, D>) -> Self {
        Self {
            loc: l2_normalize_last(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.loc.clone() * l2_normalize_last(value))
    }
}

/// Spherical t: `softplus` of the cosine similarity.
#[derive(Debug, Clone)]
pub struct SphericalT<B: Backend, const D: usize> {
    loc: Tensor<B, D>,
}

impl<B: Backend, const D: usize> SphericalT<B, D> {
    pub fn new(loc: Tensor<B, D>) -> Self {
        Self {
            loc: l2_normalize_last(loc),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        softplus(sum_last(self.loc.clone() * l2_normalize_last(value)), 1.0)
    }
}

/// Categorical: cross-entropy between `softmax(value)` and `softmax(logits)`,
/// negated.
#[derive(Debug, Clone)]
pub struct Categorical<B: Backend, const D: usize> {
    log_probs: Tensor<B, D>,
}

impl<B: Backend, const D: usize> Categorical<B, D> {
    pub fn new(logits: Tensor<B, D>) -> Self {
        Self {
            log_probs: log_softmax(logits, D - 1),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.log_probs.clone() * softmax(value, D - 1))
    }
}

/// Raw dot product.
#[derive(Debug, Clone)]
pub struct InnerProduct<B: Backend, const D: usize> {
    loc: Tensor<B, D>,
}

impl<B: Backend, const D: usize> InnerProduct<B, D> {
    pub fn new(loc: Tensor<B, D>) -> Self {
        Self { loc }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        sum_last(self.loc.clone() * value)
    }
}

/// Log Bhattacharyya coefficient between two categorical distributions.
#[derive(Debug, Clone)]
pub struct Bhattacharyya<B: Backend, const D: usize> {
    log_probs: Tensor<B, D>,
}

impl<B: Backend, const D: usize> Bhattacharyya<B, D> {
    pub fn new(logits: Tensor<B, D>) -> Self {
        Self {
            log_probs: log_softmax(logits, D - 1),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        logsumexp_last((self.log_probs.clone() + log_softmax(value, D - 1)).mul_scalar(0.5))
    }
}

/// Log probability that two categorical draws agree.
#[derive(Debug, Clone)]
pub struct JointProduct<B: Backend, const D: usize> {
    log_probs: Tensor<B, D>,
}

impl<B: Backend, const D: usize> JointProduct<B, D> {
    pub fn new(logits: Tensor<B, D>) -> Self {
        Self {
            log_probs: log_softmax(logits, D - 1),
        }
    }

    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        logsumexp_last(self.log_probs.clone() + log_softmax(value, D - 1))
    }
}

/// A constructed kernel of any family.
#[derive(Debug, Clone)]
pub enum Kernel<B: Backend, const D: usize> {
    Normal(Normal<B, D>),
    StudentT(StudentT<B, D>),
    Categorical(Categorical<B, D>),
    Laplace(Laplace<B, D>),
    VonMises(VonMises<B, D>),
    SphericalT(SphericalT<B, D>),
    LaplaceT(LaplaceT<B, D>),
    InnerProduct(InnerProduct<B, D>),
    Bhattacharyya(Bhattacharyya<B, D>),
    JointProduct(JointProduct<B, D>),
}

impl<B: Backend, const D: usize> Kernel<B, D> {
    /// Score `value` of shape `(..., features)` against the bound location.
    ///
    /// # Panics
    /// Panics if `value` cannot be broadcast against the location, or if
    /// `O != D - 1`.
    pub fn log_prob<const O: usize>(&self, value: Tensor<B, D>) -> Tensor<B, O> {
        match self {
            Self::Normal(k) => k.log_prob(value),
            Self::StudentT(k) => k.log_prob(value),
            Self::Categorical(k) => k.log_prob(value),
            Self::Laplace(k) => k.log_prob(value),
            Self::VonMises(k) => k.log_prob(value),
            Self::SphericalT(k) => k.log_prob(value),
            Self::LaplaceT(k) => k.log_prob(value),
            Self::InnerProduct(k) => k.log_prob(value),
            Self::Bhattacharyya(k) => k.log_prob(value),
            Self::JointProduct(k) => k.log_prob(value),
        }
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            Self::Normal(_) => KernelType::Normal,
            Self::StudentT(_) => KernelType::StudentT,
            Self::Categorical(_) => KernelType::Categorical,
            Self::Laplace(_) => KernelType::Laplace,
            Self::VonMises(_) => KernelType::VonMises,
            Self::SphericalT(_) => KernelType::SphericalT,
            Self::LaplaceT(_) => KernelType::LaplaceT,
            Self::InnerProduct(_) => KernelType::InnerProduct,
            Self::Bhattacharyya(_) => KernelType::Bhattacharyya,
            Self::JointProduct(_) => KernelType::JointProduct,
        }
    }
}

/// Kernel family, resolvable from its registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelType {
    Normal,
    StudentT,
    Categorical,
    Laplace,
    VonMises,
    SphericalT,
    LaplaceT,
    InnerProduct,
    Bhattacharyya,
    JointProduct,
}

impl KernelType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::StudentT => "studentt",
            Self::Categorical => "categorical",
            Self::Laplace => "laplace",
            Self::VonMises => "vonmises",
            Self::SphericalT => "sphericalt",
            Self::LaplaceT => "laplacet",
            Self::InnerProduct => "inner_product",
            Self::Bhattacharyya => "bhattacharyya",
            Self::JointProduct => "joint_product",
        }
    }

    /// Whether the family takes a `scale` parameter.
    pub fn has_scale(self) -> bool {
        matches!(
            self,
            Self::Normal | Self::StudentT | Self::Laplace | Self::LaplaceT
        )
    }

    /// Build a kernel at `loc`.
    ///
    /// `scale` defaults to 1 for the location-scale families and must be
    /// `None` for the others.
    pub fn init<B: Backend, const D: usize>(
        self,
        loc: Tensor<B, D>,
        scale: Option<Tensor<B, D>>,
    ) -> Result<Kernel<B, D>, CneError> {
        if scale.is_some() && !self.has_scale() {
            return Err(CneError::UnexpectedScale(self.name().to_string()));
        }
        let kernel = match (self, scale) {
            (Self::Normal, Some(s)) => Kernel::Normal(Normal::new(loc, s)?),
            (Self::Normal, None) => Kernel::Normal(Normal::standard(loc)),
            (Self::StudentT, Some(s)) => Kernel::StudentT(StudentT::new(loc, s)?),
            (Self::StudentT, None) => Kernel::StudentT(StudentT::standard(loc)),
            (Self::Laplace, Some(s)) => Kernel::Laplace(Laplace::new(loc, s)?),
            (Self::Laplace, None) => Kernel::Laplace(Laplace::standard(loc)),
            (Self::LaplaceT, Some(s)) => Kernel::LaplaceT(LaplaceT::new(loc, s)?),
            (Self::LaplaceT, None) => Kernel::LaplaceT(LaplaceT::standard(loc)),
            (Self::Categorical, _) => Kernel::Categorical(Categorical::new(loc)),
            (Self::VonMises, _) => Kernel::VonMises(VonMises::new(loc)),
            (Self::SphericalT, _) => Kernel::SphericalT(SphericalT::new(loc)),
            (Self::InnerProduct, _) => Kernel::InnerProduct(InnerProduct::new(loc)),
            (Self::Bhattacharyya, _) => Kernel::Bhattacharyya(Bhattacharyya::new(loc)),
            (Self::JointProduct, _) => Kernel::JointProduct(JointProduct::new(loc)),
        };
        Ok(kernel)
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = CneError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        kernel_type(name)
    }
}

/// Look up a kernel family by registry key.
pub fn kernel_type(name: &str) -> Result<KernelType, CneError> {
    let kind = match name {
        "normal" => KernelType::Normal,
        "studentt" => KernelType::StudentT,
        "categorical" => KernelType::Categorical,
        "laplace" => KernelType::Laplace,
        "vonmises" => KernelType::VonMises,
        "sphericalt" => KernelType::SphericalT,
        "laplacet" => KernelType::LaplaceT,
        "inner_product" => KernelType::InnerProduct,
        "bhattacharyya" => KernelType::Bhattacharyya,
        "joint_product" => KernelType::JointProduct,
        _ => return Err(CneError::UnknownKernel(name.to_string())),
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    const TOL: f32 = 1e-5;

    fn mat<const N: usize, const F: usize>(rows: [[f32; F]; N]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::from(rows), &Default::default())
    }

    fn values(t: Tensor<TestBackend, 1>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_normal_known_values() {
        let k = Normal::standard(mat([[0.0, 0.0]]));
        let out = values(k.log_prob(mat([[0.0, 0.0], [1.0, 0.0]])));
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < TOL, "expected 0, got {}", out[0]);
        assert!((out[1] + 0.5).abs() < TOL, "expected -0.5, got {}", out[1]);
    }

    #[test]
    fn test_normal_scale() {
        let k = Normal::new(mat([[0.0, 0.0]]), mat([[2.0, 2.0]])).unwrap();
        let out = values(k.log_prob(mat([[2.0, 0.0]])));
        assert!((out[0] + 0.5).abs() < TOL, "got {}", out[0]);
    }

    #[test]
    fn test_scale_broadcasts_to_loc() {
        // Scalar-like scale of shape (1, 1) broadcasts over (2, 3)
        let loc = mat([[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let k = Laplace::new(loc, mat([[0.5]])).unwrap();
        let out = values(k.log_prob(mat([[1.0, 0.0, 0.0], [1.0, 1.0, 1.0]])));
        assert!((out[0] + 2.0).abs() < TOL, "got {}", out[0]);
        assert!(out[1].abs() < TOL, "got {}", out[1]);
    }

    #[test]
    fn test_scale_shape_mismatch() {
        let loc = mat([[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let scale = mat([[1.0, 1.0], [1.0, 1.0]]);
        assert!(matches!(
            StudentT::new(loc, scale),
            Err(CneError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_student_t() {
        let k = StudentT::standard(mat([[0.0, 0.0]]));
        let out = values(k.log_prob(mat([[1.0, 1.0]])));
        assert!((out[0] + 3.0_f32.ln()).abs() < TOL, "got {}", out[0]);
    }

    #[test]
    fn test_laplace_and_laplace_t() {
        let loc = mat([[1.0, -1.0]]);
        let value = mat([[2.0, 1.0]]);
        let l = values(Laplace::standard(loc.clone()).log_prob(value.clone()));
        let lt = values(LaplaceT::standard(loc).log_prob(value));
        assert!((l[0] + 3.0).abs() < TOL, "got {}", l[0]);
        assert!((lt[0] + 4.0_f32.ln()).abs() < TOL, "got {}", lt[0]);
    }

    #[test]
    fn test_von_mises_scale_invariant() {
        let device = Default::default();
        let loc = Tensor::<TestBackend, 2>::random([4, 8], Distribution::Normal(0.0, 1.0), &device);
        let value =
            Tensor::<TestBackend, 2>::random([4, 8], Distribution::Normal(0.0, 1.0), &device);
        let k = VonMises::new(loc);
        let a = values(k.log_prob(value.clone()));
        let b = values(k.log_prob(value.mul_scalar(5.0)));
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < TOL, "rescaling changed score: {x} vs {y}");
        }
    }

    #[test]
    fn test_von_mises_cosine() {
        let k = VonMises::new(mat([[2.0, 0.0]]));
        let out = values(k.log_prob(mat([[3.0, 0.0], [0.0, 1.0], [-1.0, 0.0]])));
        assert!((out[0] - 1.0).abs() < TOL);
        assert!(out[1].abs() < TOL);
        assert!((out[2] + 1.0).abs() < TOL);
    }

    #[test]
    fn test_spherical_t() {
        let k = SphericalT::new(mat([[0.0, 4.0]]));
        let out = values(k.log_prob(mat([[0.0, 0.5]])));
        let expected = (1.0 + 1.0_f32.exp()).ln();
        assert!((out[0] - expected).abs() < TOL, "expected {expected}, got {}", out[0]);
    }

    #[test]
    fn test_categorical_uniform() {
        let k = Categorical::new(mat([[0.0, 0.0]]));
        let out = values(k.log_prob(mat([[0.0, 0.0]])));
        assert!((out[0] + 2.0_f32.ln()).abs() < TOL, "got {}", out[0]);
    }

    #[test]
    fn test_inner_product() {
        let k = InnerProduct::new(mat([[1.0, 2.0, 3.0]]));
        let out = values(k.log_prob(mat([[1.0, 1.0, 1.0], [0.0, -1.0, 0.0]])));
        assert!((out[0] - 6.0).abs() < TOL);
        assert!((out[1] + 2.0).abs() < TOL);
    }

    #[test]
    fn test_bhattacharyya_identical_distributions() {
        // sum(sqrt(p * p)) = 1
        let k = Bhattacharyya::new(mat([[0.3, -1.0, 2.0]]));
        let out = values(k.log_prob(mat([[0.3, -1.0, 2.0]])));
        assert!(out[0].abs() < TOL, "got {}", out[0]);
    }

    #[test]
    fn test_joint_product_uniform() {
        // sum(p * q) = 2 * 0.25
        let k = JointProduct::new(mat([[0.0, 0.0]]));
        let out = values(k.log_prob(mat([[5.0, 5.0]])));
        assert!((out[0] + 2.0_f32.ln()).abs() < TOL, "got {}", out[0]);
    }

    #[test]
    fn test_batch_axis_broadcasts() {
        let k = Normal::standard(mat([[0.0, 0.0]]));
        let out: Tensor<TestBackend, 1> = k.log_prob(mat([[1.0, 0.0], [0.0, 2.0], [0.0, 0.0]]));
        assert_eq!(out.dims(), [3]);
        let out = values(out);
        assert!((out[1] + 2.0).abs() < TOL);
    }

    #[test]
    fn test_all_pairs_logits_from_broadcast_axes() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::random([3, 4], Distribution::Normal(0.0, 1.0), &device);
        let y = Tensor::<TestBackend, 2>::random([5, 4], Distribution::Normal(0.0, 1.0), &device);

        for name in KERNEL_NAMES {
            let kind = kernel_type(name).unwrap();
            // (3, 1, 4) against (1, 5, 4)
            let kernel = kind.init(x.clone().unsqueeze_dim::<3>(1), None).unwrap();
            let pairs: Tensor<TestBackend, 2> = kernel.log_prob(y.clone().unsqueeze_dim::<3>(0));
            assert_eq!(pairs.dims(), [3, 5], "{name} all-pairs shape");
            let pairs = values(pairs.reshape([15]));

            // Entry (i, j) must equal scoring row j of y against row i of x alone
            for i in 0..3 {
                let row = x.clone().slice([i..i + 1, 0..4]);
                let single = kind.init(row, None).unwrap();
                let expected = values(single.log_prob(y.clone()));
                for j in 0..5 {
                    let got = pairs[i * 5 + j];
                    assert!(
                        (got - expected[j]).abs() < 1e-4,
                        "{name} ({i}, {j}): expected {}, got {got}",
                        expected[j]
                    );
                }
            }
        }
    }

    #[test]
    fn test_rank3_scale_broadcasts() {
        let device = Default::default();
        let loc = Tensor::<TestBackend, 3>::zeros([2, 1, 3], &device);
        let scale = Tensor::<TestBackend, 3>::full([1, 1, 1], 2.0, &device);
        let k = Normal::new(loc, scale).unwrap();
        let value = Tensor::<TestBackend, 3>::full([1, 4, 3], 2.0, &device);
        let out: Tensor<TestBackend, 2> = k.log_prob(value);
        assert_eq!(out.dims(), [2, 4]);
        // y = 1 on each of 3 features: -3 / 2
        assert!(values(out.reshape([8])).iter().all(|v| (v + 1.5).abs() < TOL));
    }

    #[test]
    fn test_rank3_scale_shape_mismatch() {
        let device = Default::default();
        let loc = Tensor::<TestBackend, 3>::zeros([2, 1, 3], &device);
        let scale = Tensor::<TestBackend, 3>::ones([3, 1, 3], &device);
        assert!(matches!(
            Laplace::new(loc, scale),
            Err(CneError::ShapeMismatch { ref lhs, .. }) if lhs == &[2, 1, 3]
        ));
    }

    #[test]
    #[should_panic]
    fn test_value_batch_mismatch_panics() {
        let k = Normal::standard(mat([[0.0, 0.0], [1.0, 1.0]]));
        let _: Tensor<TestBackend, 1> = k.log_prob(mat([[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]));
    }

    #[test]
    #[should_panic]
    fn test_value_feature_mismatch_panics() {
        let k = InnerProduct::new(mat([[1.0, 2.0, 3.0]]));
        let _: Tensor<TestBackend, 1> = k.log_prob(mat([[1.0, 1.0]]));
    }

    #[test]
    fn test_registry_resolves_every_key() {
        let device = Default::default();
        let loc = Tensor::<TestBackend, 2>::random([3, 4], Distribution::Normal(0.0, 1.0), &device);
        let value =
            Tensor::<TestBackend, 2>::random([3, 4], Distribution::Normal(0.0, 1.0), &device);
        for name in KERNEL_NAMES {
            let kind = kernel_type(name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(kind.name(), name);
            assert_eq!(kind.to_string(), name);
            let kernel = kind.init(loc.clone(), None).unwrap();
            assert_eq!(kernel.kernel_type(), kind);
            let out: Tensor<TestBackend, 1> = kernel.log_prob(value.clone());
            assert_eq!(out.dims(), [3], "{name} output shape");
        }
    }

    #[test]
    fn test_registry_scale_handling() {
        let loc = mat([[0.0, 0.0]]);
        let scale = mat([[1.0, 1.0]]);
        for name in KERNEL_NAMES {
            let kind: KernelType = name.parse().unwrap();
            let result = kind.init(loc.clone(), Some(scale.clone()));
            if kind.has_scale() {
                assert!(result.is_ok(), "{name} should accept a scale");
            } else {
                assert!(
                    matches!(result, Err(CneError::UnexpectedScale(ref n)) if n == name),
                    "{name} should reject a scale"
                );
            }
        }
    }

    #[test]
    fn test_registry_unknown_key() {
        assert!(matches!(
            kernel_type("Normal"),
            Err(CneError::UnknownKernel(ref name)) if name == "Normal"
        ));
        assert!("gaussian".parse::<KernelType>().is_err());
    }

    #[test]
    fn test_gradient_flows_to_loc_and_value() {
        let device = Default::default();
        let loc = Tensor::<TestAutodiffBackend, 2>::from_data(
            TensorData::from([[1.0_f32, 0.5], [0.0, -1.0]]),
            &device,
        )
        .require_grad();
        let value = Tensor::<TestAutodiffBackend, 2>::from_data(
            TensorData::from([[0.0_f32, 1.0], [2.0, 0.5]]),
            &device,
        )
        .require_grad();

        for name in KERNEL_NAMES {
            let kernel = kernel_type(name).unwrap().init(loc.clone(), None).unwrap();
            let grads = kernel.log_prob::<1>(value.clone()).sum().backward();

            let loc_grad: f32 = loc.grad(&grads).unwrap().abs().sum().into_scalar().elem();
            let value_grad: f32 = value.grad(&grads).unwrap().abs().sum().into_scalar().elem();
            assert!(loc_grad > 0.0, "{name}: no gradient reached loc");
            assert!(value_grad > 0.0, "{name}: no gradient reached value");
        }
    }
}
