//! Contrastive noise embedding (CNE) loss building blocks.
//!
//! Two independent libraries on burn tensors:
//!
//! - [`divergence`] — f-divergence variational bounds mapping positive and
//!   negative logits to `(attraction, repulsion)` terms.
//! - [`kernel`] — similarity kernels mapping pairs of latent vectors to
//!   log-probability scores.
//!
//! Both are selected by string key through their registries
//! ([`divergence::divergence`], [`kernel::kernel_type`]) and composed into a
//! weighted loss by [`ContrastiveLoss`], usually built from a TOML
//! [`ContrastiveLossConfig`].
//!
//! # Key types
//!
//! - [`Divergence`] / [`InterpolateDivergences`] / [`DivergenceFn`] — selectable divergences
//! - [`KernelType`] / [`Kernel`] — kernel families and bound instances
//! - [`DivergenceTerms`] / [`LossTerms`] — loss outputs on the autodiff graph
//! - [`DivergenceMetrics`] — detached diagnostics with health checks
//! - [`CneError`] — registry, shape, and configuration errors

pub mod bridge;
pub mod config;
pub mod divergence;
pub mod kernel;
pub mod loss;
pub mod metrics;
pub mod ops;
pub mod types;

pub use config::ContrastiveLossConfig;
pub use divergence::{
    divergence, Divergence, DivergenceFn, InterpolateDivergences, DIVERGENCE_NAMES,
};
pub use kernel::{kernel_type, Kernel, KernelType, KERNEL_NAMES};
pub use loss::{ContrastiveLoss, LossTerms};
pub use metrics::{DivergenceMetrics, MetricsHistory};
pub use types::{CneError, DivergenceTerms};
