//! Silent OT configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default number of DPF partitions.
pub const DEFAULT_PARTITIONS: usize = 8;
/// Default ratio between the noisy vector length and the padded output length.
pub const DEFAULT_SCALER: usize = 4;
/// Largest supported number of partitions.
pub const MAX_PARTITIONS: usize = 1024;
/// Largest supported scaler.
pub const MAX_SCALER: usize = 64;

/// The linear code used to compress the noisy vector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultType {
    /// Multiplication by a dense random matrix. Quadratic, for cross-checking only.
    Naive,
    /// Multiplication by a quasi-cyclic matrix via polynomial arithmetic.
    #[default]
    QuasiCyclic,
}

/// Silent OT configuration.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SilentConfig {
    /// Number of DPF partitions, i.e. the number of noisy positions. Must be in `[1, 1024]`.
    #[builder(default = "DEFAULT_PARTITIONS")]
    partitions: usize,
    /// Noise amplification factor. Must be in `[1, 64]`.
    #[builder(default = "DEFAULT_SCALER")]
    scaler: usize,
    /// The compression strategy.
    #[builder(default)]
    mult_type: MultType,
}

impl SilentConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(partitions) = self.partitions {
            if partitions == 0 || partitions > MAX_PARTITIONS {
                return Err(format!(
                    "partitions must be in [1, {MAX_PARTITIONS}], got {partitions}"
                ));
            }
        }

        if let Some(scaler) = self.scaler {
            if scaler == 0 || scaler > MAX_SCALER {
                return Err(format!("scaler must be in [1, {MAX_SCALER}], got {scaler}"));
            }
        }

        Ok(())
    }
}

impl SilentConfig {
    /// Creates a new builder.
    pub fn builder() -> SilentConfigBuilder {
        SilentConfigBuilder::default()
    }

    /// Returns the number of partitions.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Returns the scaler.
    pub fn scaler(&self) -> usize {
        self.scaler
    }

    /// Returns the compression strategy.
    pub fn mult_type(&self) -> MultType {
        self.mult_type
    }
}

impl Default for SilentConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS,
            scaler: DEFAULT_SCALER,
            mult_type: MultType::default(),
        }
    }
}
