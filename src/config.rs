//! Options for attribute requests

use crate::attribute::AttributeKind;
use crate::error::{Result, SliceError};
use crate::metadata::VolumeMetadata;
use serde::{Deserialize, Serialize};

/// Default number of cells per partition
pub const DEFAULT_PARTITION_SIZE: usize = 4096;

/// Options for computing attributes over a surface-bounded subvolume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeOptions {
    /// Attributes to compute, one output buffer each
    pub attributes: Vec<AttributeKind>,

    /// Vertical distance between resampled samples. Defaults to the sample
    /// stepsize of the volume.
    pub stepsize: Option<f64>,

    /// Cells per partition for concurrent fetching and parallel computation
    pub partition_size: usize,
}

impl Default for AttributeOptions {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            stepsize: None,
            partition_size: DEFAULT_PARTITION_SIZE,
        }
    }
}

impl AttributeOptions {
    /// Options requesting `attributes` with everything else defaulted
    pub fn new(attributes: impl IntoIterator<Item = AttributeKind>) -> Self {
        Self::default().with_attributes(attributes)
    }

    /// Load options from a JSON request body
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeKind>) -> Self {
        self.attributes = attributes.into_iter().collect();
        self
    }

    pub fn with_stepsize(mut self, stepsize: f64) -> Self {
        self.stepsize = Some(stepsize);
        self
    }

    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.attributes.is_empty() {
            return Err(SliceError::BadRequest(
                "No attributes requested".to_string(),
            ));
        }
        if let Some(kind) = self.attributes.iter().find(|kind| !kind.is_implemented()) {
            return Err(SliceError::BadRequest(format!(
                "Attribute not implemented: {}",
                kind
            )));
        }
        if let Some(stepsize) = self.stepsize {
            if !(stepsize.is_finite() && stepsize > 0.0) {
                return Err(SliceError::BadRequest(format!(
                    "Stepsize must be a positive number, got {}",
                    stepsize
                )));
            }
        }
        if self.partition_size == 0 {
            return Err(SliceError::BadRequest(
                "Partition size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resampling stepsize for a volume
    pub fn stepsize_for(&self, metadata: &VolumeMetadata) -> f64 {
        self.stepsize.unwrap_or_else(|| metadata.sample().stepsize())
    }
}
