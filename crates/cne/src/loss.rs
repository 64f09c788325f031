//! Kernel + divergence composition into a weighted contrastive loss.
//!
//! Generic over `B: Backend`; gradients flow back into every latent input
//! when `B` is an autodiff backend.

use burn::prelude::*;

use crate::divergence::Divergence;
use crate::kernel::{Kernel, KernelType};
use crate::ops::flatten;
use crate::types::{CneError, DivergenceTerms};

/// Loss and its two components, each of shape `(1,)`.
#[derive(Debug, Clone)]
pub struct LossTerms<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub attraction: Tensor<B, 1>,
    pub repulsion: Tensor<B, 1>,
}

/// A kernel family paired with a divergence.
///
/// Positive logits score `positives` against `anchors`; negative logits
/// score `negatives` against the same anchors. The divergence turns both
/// into attraction and repulsion, which are weighted and summed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastiveLoss {
    kernel: KernelType,
    divergence: Divergence,
    kernel_scale: f64,
    attraction_weight: f64,
    repulsion_weight: f64,
}

impl ContrastiveLoss {
    pub fn new(kernel: KernelType, divergence: Divergence) -> Self {
        Self {
            kernel,
            divergence,
            kernel_scale: 1.0,
            attraction_weight: 1.0,
            repulsion_weight: 1.0,
        }
    }

    pub fn with_kernel_scale(mut self, kernel_scale: f64) -> Self {
        self.kernel_scale = kernel_scale;
        self
    }

    pub fn with_weights(mut self, attraction_weight: f64, repulsion_weight: f64) -> Self {
        self.attraction_weight = attraction_weight;
        self.repulsion_weight = repulsion_weight;
        self
    }

    pub fn kernel(&self) -> KernelType {
        self.kernel
    }

    pub fn divergence(&self) -> &Divergence {
        &self.divergence
    }

    /// Bind the kernel at `loc`, passing the configured scale only to the
    /// location-scale families.
    pub fn kernel_at<B: Backend, const D: usize>(
        &self,
        loc: Tensor<B, D>,
    ) -> Result<Kernel<B, D>, CneError> {
        let scale = self
            .kernel
            .has_scale()
            .then(|| Tensor::full([1usize; D], self.kernel_scale, &loc.device()));
        self.kernel.init(loc, scale)
    }

    /// Score positive and negative pairs.
    ///
    /// # Arguments
    /// - `anchors`: shape `(batch, dim)`, the kernel location
    /// - `positives`: shape `(batch, dim)`, paired row-wise with `anchors`
    /// - `negatives`: shape `(batch, dim)` or `(1, dim)`, paired the same way
    ///
    /// # Returns
    /// `(pos_logits, neg_logits)`, each of shape `(batch,)`.
    pub fn logits<B: Backend>(
        &self,
        anchors: Tensor<B, 2>,
        positives: Tensor<B, 2>,
        negatives: Tensor<B, 2>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 1>), CneError> {
        let kernel = self.kernel_at(anchors)?;
        Ok((kernel.log_prob(positives), kernel.log_prob(negatives)))
    }

    /// Score one positive and `K` negatives per anchor.
    ///
    /// # Arguments
    /// - `anchors`: shape `(batch, dim)`
    /// - `positives`: shape `(batch, dim)`
    /// - `negatives`: shape `(batch, K, dim)`; a batch axis of 1 is shared
    ///   by every anchor
    ///
    /// # Returns
    /// `(pos_logits, neg_logits)` of shapes `(batch,)` and `(batch, K)`.
    pub fn multi_negative_logits<B: Backend>(
        &self,
        anchors: Tensor<B, 2>,
        positives: Tensor<B, 2>,
        negatives: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 1>, Tensor<B, 2>), CneError> {
        let kernel = self.kernel_at(anchors.unsqueeze_dim::<3>(1))?;
        let pos_logits: Tensor<B, 2> = kernel.log_prob(positives.unsqueeze_dim::<3>(1));
        Ok((flatten(pos_logits), kernel.log_prob(negatives)))
    }

    /// All-pairs logits: entry `(i, j)` scores `values[j]` against `locs[i]`.
    ///
    /// `locs` has shape `(N, dim)`, `values` has shape `(M, dim)`, and the
    /// result has shape `(N, M)`.
    pub fn pairwise_logits<B: Backend>(
        &self,
        locs: Tensor<B, 2>,
        values: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, CneError> {
        let kernel = self.kernel_at(locs.unsqueeze_dim::<3>(1))?;
        Ok(kernel.log_prob(values.unsqueeze_dim::<3>(0)))
    }

    /// Full loss from latent vectors.
    pub fn forward<B: Backend>(
        &self,
        anchors: Tensor<B, 2>,
        positives: Tensor<B, 2>,
        negatives: Tensor<B, 2>,
    ) -> Result<LossTerms<B>, CneError> {
        let (pos_logits, neg_logits) = self.logits(anchors, positives, negatives)?;
        Ok(self.forward_logits(pos_logits, neg_logits))
    }

    /// Full loss with `K` negatives per anchor; see [`Self::multi_negative_logits`].
    pub fn forward_multi_negative<B: Backend>(
        &self,
        anchors: Tensor<B, 2>,
        positives: Tensor<B, 2>,
        negatives: Tensor<B, 3>,
    ) -> Result<LossTerms<B>, CneError> {
        let (pos_logits, neg_logits) =
            self.multi_negative_logits(anchors, positives, negatives)?;
        Ok(self.forward_logits(pos_logits, flatten(neg_logits)))
    }

    /// Loss from precomputed logits, skipping the kernel.
    pub fn forward_logits<B: Backend, const D: usize>(
        &self,
        pos_logits: Tensor<B, D>,
        neg_logits: Tensor<B, D>,
    ) -> LossTerms<B> {
        let terms: DivergenceTerms<B> = self.divergence.forward(pos_logits, neg_logits);
        LossTerms {
            loss: terms.weighted(self.attraction_weight, self.repulsion_weight),
            attraction: terms.attraction,
            repulsion: terms.repulsion,
        }
    }
}
