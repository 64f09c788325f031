use burn::prelude::*;

/// Errors raised by registry lookups, shape checks, and configuration.
///
/// Numerical edge cases (NaN/Inf logits) are not errors: they propagate
/// through the stabilised formulas and reach the caller as non-finite terms.
#[derive(Debug, thiserror::Error)]
pub enum CneError {
    /// No divergence is registered under this key.
    #[error("Unknown divergence: {0:?}")]
    UnknownDivergence(String),

    /// No kernel is registered under this key.
    #[error("Unknown kernel: {0:?}")]
    UnknownKernel(String),

    /// A scale was supplied to a kernel that has no scale parameter.
    #[error("Kernel {0:?} does not take a scale parameter")]
    UnexpectedScale(String),

    /// Two shapes cannot be broadcast against each other.
    #[error("Shape mismatch: {lhs:?} and {rhs:?} cannot be broadcast")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// A batch with no rows was passed where at least one is required.
    #[error("Empty batch")]
    EmptyBatch,

    /// The loss configuration could not be parsed.
    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] toml::de::Error),
}

/// Output of a divergence: the two halves of a contrastive loss.
///
/// Both terms have shape `(1,)` and stay on the autodiff graph.
/// `attraction` pulls positive pairs together, `repulsion` pushes
/// negative pairs apart.
#[derive(Debug, Clone)]
pub struct DivergenceTerms<B: Backend> {
    pub attraction: Tensor<B, 1>,
    pub repulsion: Tensor<B, 1>,
}

impl<B: Backend> DivergenceTerms<B> {
    pub fn new(attraction: Tensor<B, 1>, repulsion: Tensor<B, 1>) -> Self {
        Self {
            attraction,
            repulsion,
        }
    }

    /// `attraction + repulsion`.
    pub fn total(&self) -> Tensor<B, 1> {
        self.attraction.clone() + self.repulsion.clone()
    }

    /// `attraction_weight * attraction + repulsion_weight * repulsion`.
    pub fn weighted(&self, attraction_weight: f64, repulsion_weight: f64) -> Tensor<B, 1> {
        self.attraction.clone().mul_scalar(attraction_weight)
            + self.repulsion.clone().mul_scalar(repulsion_weight)
    }
}
