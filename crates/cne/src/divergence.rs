//! f-divergence variational bounds estimated from positive and negative logits.
//!
//! Every function takes `(pos_logits, neg_logits)` of any rank and shape
//! (the two batches may differ in size), reduces over all elements, and
//! returns [`DivergenceTerms`].
//!
//! The closed forms must keep their exact algebraic shape (`expm1`,
//! `logmeanexp`, `log_sigmoid`), including the additive constants.

use std::f64::consts::LN_2;
use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use burn::tensor::activation::log_sigmoid;

use crate::ops::{expm1, flatten, logmeanexp};
use crate::types::{CneError, DivergenceTerms};

/// `log(4)`.
const LN_4: f64 = 2.0 * LN_2;

/// Registry keys accepted by [`divergence`], in registration order.
pub const DIVERGENCE_NAMES: [&str; 12] = [
    "dr",
    "binary",
    "bce",
    "jsd",
    "rkld",
    "kld",
    "pearson",
    "hellinger",
    "jeffreys",
    "le_cam",
    "neymann",
    "soft_rkld",
];

/// Density ratio: attraction `-mean(pos)`, repulsion identically zero.
pub fn density_ratio<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    _neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = flatten(pos_logits).mean().neg();
    let repulsion = attraction.zeros_like();
    DivergenceTerms::new(attraction, repulsion)
}

/// Binary cross-entropy (noise-contrastive estimation).
pub fn binary_cross_entropy<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = log_sigmoid(flatten(pos_logits)).mean().neg();
    let repulsion = log_sigmoid(flatten(neg_logits).neg()).mean().neg();
    DivergenceTerms::new(attraction, repulsion)
}

/// Jensen-Shannon: `2 * bce - log(4)` on each term.
pub fn jensen_shannon_divergence<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let bce = binary_cross_entropy(pos_logits, neg_logits);
    DivergenceTerms::new(
        bce.attraction.mul_scalar(2.0).sub_scalar(LN_4),
        bce.repulsion.mul_scalar(2.0).sub_scalar(LN_4),
    )
}

/// Kullback-Leibler (NWJ-style bound).
pub fn kullback_leibler_divergence<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = flatten(pos_logits).mean().neg();
    let repulsion = expm1(logmeanexp(flatten(neg_logits)));
    DivergenceTerms::new(attraction, repulsion)
}

/// Reverse Kullback-Leibler.
pub fn reverse_kullback_leibler_divergence<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = expm1(logmeanexp(flatten(pos_logits).neg()));
    let repulsion = flatten(neg_logits).mean();
    DivergenceTerms::new(attraction, repulsion)
}

/// Squared Hellinger distance.
pub fn squared_hellinger<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = expm1(logmeanexp(flatten(pos_logits).neg().mul_scalar(0.5))).mul_scalar(2.0);
    let repulsion = expm1(logmeanexp(flatten(neg_logits).mul_scalar(0.5))).mul_scalar(2.0);
    DivergenceTerms::new(attraction, repulsion)
}

/// Pearson chi-squared.
pub fn pearson_chi_sq<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = expm1(logmeanexp(flatten(pos_logits))).neg();
    let repulsion = expm1(logmeanexp(flatten(neg_logits).mul_scalar(2.0))).div_scalar(2.0);
    DivergenceTerms::new(attraction, repulsion)
}

/// Squared Le Cam distance.
pub fn squared_le_cam_distance<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = expm1(
        logmeanexp(log_sigmoid(flatten(pos_logits).neg()).mul_scalar(2.0)).add_scalar(LN_4),
    );
    let repulsion =
        expm1(logmeanexp(log_sigmoid(flatten(neg_logits)).mul_scalar(2.0)).add_scalar(LN_4));
    DivergenceTerms::new(attraction, repulsion)
}

/// Neyman chi-squared.
pub fn neymann_divergence<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let attraction = logmeanexp(flatten(pos_logits).mul_scalar(-2.0))
        .sub_scalar(LN_2)
        .exp()
        .sub_scalar(0.5);
    let repulsion = logmeanexp(flatten(neg_logits).neg()).exp().neg().add_scalar(1.0);
    DivergenceTerms::new(attraction, repulsion)
}

/// Softened reverse Kullback-Leibler.
///
/// The additive constants (`2`, `log(4)`) belong to the bound and are kept as is.
pub fn softened_reverse_kullback_leibler_divergence<B: Backend, const D: usize>(
    pos_logits: Tensor<B, D>,
    neg_logits: Tensor<B, D>,
) -> DivergenceTerms<B> {
    let pos_logits = flatten(pos_logits);
    let attraction = logmeanexp(pos_logits.clone().neg()).add_scalar(LN_2).exp()
        + log_sigmoid(pos_logits).mean().mul_scalar(2.0).add_scalar(2.0).add_scalar(LN_4);
    let repulsion = log_sigmoid(flatten(neg_logits))
        .mean()
        .mul_scalar(2.0)
        .add_scalar(LN_4);
    DivergenceTerms::new(attraction, repulsion)
}

/// Anything that maps positive and negative logits to divergence terms.
///
/// Implemented by [`Divergence`] and [`InterpolateDivergences`]; implement
/// it on your own type to interpolate with a divergence outside the registry.
pub trait DivergenceFn {
    fn forward<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> DivergenceTerms<B>;
}

/// Linear interpolation between two divergences: `a + alpha * (b - a)`,
/// applied to attraction and repulsion separately.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolateDivergences<A = Divergence, C = Divergence> {
    pub a: Box<A>,
    pub b: Box<C>,
    pub alpha: f64,
}

impl<A, C> InterpolateDivergences<A, C> {
    pub fn new(a: A, b: C, alpha: f64) -> Self {
        Self {
            a: Box::new(a),
            b: Box::new(b),
            alpha,
        }
    }
}

impl InterpolateDivergences {
    /// Jeffreys divergence: the midpoint of KL and reverse KL.
    pub fn jeffreys() -> Self {
        Self::new(
            Divergence::KullbackLeibler,
            Divergence::ReverseKullbackLeibler,
            0.5,
        )
    }
}

impl<A: DivergenceFn, C: DivergenceFn> InterpolateDivergences<A, C> {
    pub fn forward<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> DivergenceTerms<B> {
        let a = self.a.forward(pos_logits.clone(), neg_logits.clone());
        let b = self.b.forward(pos_logits, neg_logits);
        DivergenceTerms::new(
            lerp(a.attraction, b.attraction, self.alpha),
            lerp(a.repulsion, b.repulsion, self.alpha),
        )
    }
}

impl<A: DivergenceFn, C: DivergenceFn> DivergenceFn for InterpolateDivergences<A, C> {
    fn forward<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> DivergenceTerms<B> {
        Self::forward(self, pos_logits, neg_logits)
    }
}

fn lerp<B: Backend>(start: Tensor<B, 1>, end: Tensor<B, 1>, weight: f64) -> Tensor<B, 1> {
    start.clone() + (end - start).mul_scalar(weight)
}

/// A selectable divergence, resolvable from its registry key.
#[derive(Debug, Clone, PartialEq)]
pub enum Divergence {
    DensityRatio,
    BinaryCrossEntropy,
    JensenShannon,
    KullbackLeibler,
    ReverseKullbackLeibler,
    PearsonChiSq,
    SquaredHellinger,
    SquaredLeCam,
    Neymann,
    SoftenedReverseKullbackLeibler,
    Interpolate(InterpolateDivergences),
}

impl Divergence {
    /// Evaluate on a batch of positive and negative logits.
    pub fn forward<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> DivergenceTerms<B> {
        match self {
            Self::DensityRatio => density_ratio(pos_logits, neg_logits),
            Self::BinaryCrossEntropy => binary_cross_entropy(pos_logits, neg_logits),
            Self::JensenShannon => jensen_shannon_divergence(pos_logits, neg_logits),
            Self::KullbackLeibler => kullback_leibler_divergence(pos_logits, neg_logits),
            Self::ReverseKullbackLeibler => {
                reverse_kullback_leibler_divergence(pos_logits, neg_logits)
            }
            Self::PearsonChiSq => pearson_chi_sq(pos_logits, neg_logits),
            Self::SquaredHellinger => squared_hellinger(pos_logits, neg_logits),
            Self::SquaredLeCam => squared_le_cam_distance(pos_logits, neg_logits),
            Self::Neymann => neymann_divergence(pos_logits, neg_logits),
            Self::SoftenedReverseKullbackLeibler => {
                softened_reverse_kullback_leibler_divergence(pos_logits, neg_logits)
            }
            Self::Interpolate(interp) => interp.forward(pos_logits, neg_logits),
        }
    }

    /// Canonical registry key. `bce` is an alias of `binary` and never returned.
    ///
    /// Interpolations other than Jeffreys have no key and report `"interpolate"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DensityRatio => "dr",
            Self::BinaryCrossEntropy => "binary",
            Self::JensenShannon => "jsd",
            Self::KullbackLeibler => "kld",
            Self::ReverseKullbackLeibler => "rkld",
            Self::PearsonChiSq => "pearson",
            Self::SquaredHellinger => "hellinger",
            Self::SquaredLeCam => "le_cam",
            Self::Neymann => "neymann",
            Self::SoftenedReverseKullbackLeibler => "soft_rkld",
            Self::Interpolate(interp) if *interp == InterpolateDivergences::jeffreys() => {
                "jeffreys"
            }
            Self::Interpolate(_) => "interpolate",
        }
    }
}

impl DivergenceFn for Divergence {
    fn forward<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> DivergenceTerms<B> {
        Divergence::forward(self, pos_logits, neg_logits)
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interpolate(interp) if self.name() == "interpolate" => {
                write!(f, "interpolate({}, {}, {})", interp.a, interp.b, interp.alpha)
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Divergence {
    type Err = CneError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        divergence(name)
    }
}

/// Look up a divergence by registry key.
pub fn divergence(name: &str) -> Result<Divergence, CneError> {
    let div = match name {
        "dr" => Divergence::DensityRatio,
        "binary" | "bce" => Divergence::BinaryCrossEntropy,
        "jsd" => Divergence::JensenShannon,
        "rkld" => Divergence::ReverseKullbackLeibler,
        "kld" => Divergence::KullbackLeibler,
        "pearson" => Divergence::PearsonChiSq,
        "hellinger" => Divergence::SquaredHellinger,
        "jeffreys" => Divergence::Interpolate(InterpolateDivergences::jeffreys()),
        "le_cam" => Divergence::SquaredLeCam,
        "neymann" => Divergence::Neymann,
        "soft_rkld" => Divergence::SoftenedReverseKullbackLeibler,
        _ => return Err(CneError::UnknownDivergence(name.to_string())),
    };
    Ok(div)
}
