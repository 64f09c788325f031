//! Scalar loss diagnostics with health checks.

use burn::prelude::*;

use crate::bridge::tensor_to_f64;
use crate::loss::LossTerms;

/// Plain-value snapshot of one loss evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceMetrics {
    pub loss: f64,
    pub attraction: f64,
    pub repulsion: f64,
    pub pos_logit_mean: f64,
    pub neg_logit_mean: f64,
    /// `pos_logit_mean - neg_logit_mean`; positive when pairs are separated.
    pub logit_gap: f64,
}

impl DivergenceMetrics {
    /// Read back loss terms and logit means. Detached: no gradients are kept.
    pub fn compute<B: Backend>(
        terms: &LossTerms<B>,
        pos_logits: &Tensor<B, 1>,
        neg_logits: &Tensor<B, 1>,
    ) -> Self {
        let pos_logit_mean = tensor_to_f64(pos_logits.clone().detach().mean());
        let neg_logit_mean = tensor_to_f64(neg_logits.clone().detach().mean());
        Self {
            loss: tensor_to_f64(terms.loss.clone().detach()),
            attraction: tensor_to_f64(terms.attraction.clone().detach()),
            repulsion: tensor_to_f64(terms.repulsion.clone().detach()),
            pos_logit_mean,
            neg_logit_mean,
            logit_gap: pos_logit_mean - neg_logit_mean,
        }
    }

    /// Human-readable warnings; empty when everything looks healthy.
    pub fn health_check(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, value) in [
            ("loss", self.loss),
            ("attraction", self.attraction),
            ("repulsion", self.repulsion),
        ] {
            if !value.is_finite() {
                warnings.push(format!("{name} is non-finite ({value})"));
            }
        }
        if self.logit_gap < 0.0 {
            warnings.push(format!(
                "negative pairs score above positive pairs (gap={:.4})",
                self.logit_gap
            ));
        }
        warnings
    }

    /// Emit one structured log line, plus a warning if the health check fails.
    pub fn log(&self, step: usize) {
        tracing::info!(
            step,
            loss = self.loss,
            attraction = self.attraction,
            repulsion = self.repulsion,
            gap = self.logit_gap,
            "loss={:.4} attr={:.4} rep={:.4} gap={:.3}",
            self.loss,
            self.attraction,
            self.repulsion,
            self.logit_gap
        );
        let warnings = self.health_check();
        if !warnings.is_empty() {
            tracing::warn!(step, "Health check warnings: {:?}", warnings);
        }
    }
}

/// Append-only history of `(step, metrics)`.
#[derive(Debug, Clone, Default)]
pub struct MetricsHistory {
    entries: Vec<(usize, DivergenceMetrics)>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, metrics: DivergenceMetrics) {
        self.entries.push((step, metrics));
    }

    pub fn last(&self) -> Option<&(usize, DivergenceMetrics)> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, DivergenceMetrics)> {
        self.entries.iter()
    }
}
