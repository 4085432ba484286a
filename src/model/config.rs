//! External model construction interface.

pub use super::*;

use serde::{Deserialize, Serialize};

/// Variant of the `microbotnet` architecture.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ModelMode {
    /// The compact variant.
    #[default]
    Small,
    /// The wide variant.
    Large,
}

/// The construction arguments for the external model implementation.
///
/// The model constructor consumes them unchanged and returns an instance
/// with an enumerable stage list and named parameters, from which
/// a [`ParamTable`] is built. The partitioner never consults these values.
#[derive(Config, Copy, Debug)]
pub struct ModelConfig {
    /// Number of target classes.
    #[config(default = 10)]
    pub classes_num: usize,

    /// Input image side length.
    #[config(default = 32)]
    pub input_size: usize,

    /// Channel width scale of every stage.
    #[config(default = 0.32)]
    pub width_multiplier: f64,

    /// Architecture variant.
    #[config(default = "ModelMode::Small")]
    pub mode: ModelMode,
}
