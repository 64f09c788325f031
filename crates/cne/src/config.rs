use crate::divergence::{divergence, Divergence, InterpolateDivergences};
use crate::kernel::kernel_type;
use crate::loss::ContrastiveLoss;
use crate::types::CneError;

/// Contrastive loss configuration loaded from TOML.
///
/// Kernels and divergences are selected by registry key; unknown keys are
/// rejected by [`ContrastiveLossConfig::init`]. Unknown fields are rejected
/// at parse time.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContrastiveLossConfig {
    /// Divergence registry key (e.g. `"kld"`, `"bce"`).
    #[serde(default = "default_divergence")]
    pub divergence: String,

    /// Kernel registry key (e.g. `"studentt"`, `"vonmises"`).
    #[serde(default = "default_kernel")]
    pub kernel: String,

    /// Scale for location-scale kernels. Ignored by the others.
    #[serde(default = "default_kernel_scale")]
    pub kernel_scale: f64,

    /// Weight on the attraction term.
    #[serde(default = "default_weight")]
    pub attraction_weight: f64,

    /// Weight on the repulsion term.
    #[serde(default = "default_weight")]
    pub repulsion_weight: f64,

    /// Second divergence to interpolate towards, if any.
    #[serde(default)]
    pub interpolate_with: Option<String>,

    /// Blend factor towards `interpolate_with`.
    #[serde(default = "default_interpolate_alpha")]
    pub interpolate_alpha: f64,
}

fn default_divergence() -> String {
    "binary".to_string()
}
fn default_kernel() -> String {
    "studentt".to_string()
}
fn default_kernel_scale() -> f64 {
    1.0
}
fn default_weight() -> f64 {
    1.0
}
fn default_interpolate_alpha() -> f64 {
    0.5
}

impl ContrastiveLossConfig {
    /// Parse a config from a TOML string; missing fields take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, CneError> {
        Ok(toml::from_str(s)?)
    }

    /// Log a warning for each suspicious but usable setting.
    pub fn validate(&self) {
        if !(self.kernel_scale.is_finite() && self.kernel_scale > 0.0) {
            tracing::warn!(
                kernel_scale = self.kernel_scale,
                "kernel_scale should be positive and finite"
            );
        }
        for (name, weight) in [
            ("attraction_weight", self.attraction_weight),
            ("repulsion_weight", self.repulsion_weight),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                tracing::warn!(weight, "{name} = {weight} is negative or non-finite");
            }
        }
        if self.interpolate_with.is_some() && !(0.0..=1.0).contains(&self.interpolate_alpha) {
            tracing::warn!(
                alpha = self.interpolate_alpha,
                "interpolate_alpha outside [0, 1] extrapolates between divergences"
            );
        }
    }

    /// Resolve the configured divergence, including any interpolation.
    pub fn resolve_divergence(&self) -> Result<Divergence, CneError> {
        let base = divergence(&self.divergence)?;
        match &self.interpolate_with {
            Some(other) => Ok(Divergence::Interpolate(InterpolateDivergences::new(
                base,
                divergence(other)?,
                self.interpolate_alpha,
            ))),
            None => Ok(base),
        }
    }

    /// Build the loss, resolving both registry keys.
    pub fn init(&self) -> Result<ContrastiveLoss, CneError> {
        self.validate();
        let kernel = kernel_type(&self.kernel)?;
        let divergence = self.resolve_divergence()?;

        tracing::info!(
            kernel = %kernel,
            divergence = %divergence,
            attraction_weight = self.attraction_weight,
            repulsion_weight = self.repulsion_weight,
            "Contrastive loss initialized"
        );

        Ok(ContrastiveLoss::new(kernel, divergence)
            .with_kernel_scale(self.kernel_scale)
            .with_weights(self.attraction_weight, self.repulsion_weight))
    }
}

impl Default for ContrastiveLossConfig {
    fn default() -> Self {
        Self {
            divergence: default_divergence(),
            kernel: default_kernel(),
            kernel_scale: default_kernel_scale(),
            attraction_weight: default_weight(),
            repulsion_weight: default_weight(),
            interpolate_with: None,
            interpolate_alpha: default_interpolate_alpha(),
        }
    }
}
