//! Training setup assembly.
//!
//! The control flow is one-shot: construct the model externally, load a
//! checkpoint with [`Checkpoint::load_into`](crate::checkpoint::Checkpoint),
//! then call [`TrainingSetupConfig::init`] to freeze the first layer,
//! partition the parameters into optimizer groups, and obtain the ready
//! setup of optimizer configuration, loss criterion, and device placement.

pub mod group;
pub mod partition;
pub mod report;

pub use crate::{error::Error, model::ParamTable};
pub use burn::config::Config;
pub use group::*;
pub use partition::*;
pub use report::*;

use crate::model::ModelConfig;
use serde::{Deserialize, Serialize};

/// Weight decay applied to the classifier projection weight.
pub const OUTPUT_WEIGHT_DECAY: f64 = 1e-4;

/// Where the model and loss are placed before training.
///
/// Recorded as part of the setup; the transfer itself is the runtime's
/// one-shot step after building, before the first optimizer use.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DevicePlacement {
    /// Host memory.
    #[default]
    Cpu,
    /// The CUDA device at the given index.
    Cuda(usize),
}

/// The training criterion attached to the setup.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LossFunction {
    /// Cross-entropy over the classifier logits.
    #[default]
    CrossEntropy,
}

/// The configuration for one quantization-aware training run.
#[derive(Config, Copy, Debug)]
pub struct TrainingSetupConfig {
    /// Global learning rate.
    #[config(default = 1e-3)]
    pub learning_rate: f64,

    /// Forwarded unchanged to the model constructor.
    /// It never affects partitioning beyond changing which parameters exist.
    #[config(default = 0.32)]
    pub width_multiplier: f64,

    /// Element count a candidate must strictly exceed to be quantized.
    #[config(default = 1000)]
    pub min_size_quantize: usize,

    /// Restrict quantization eligibility to convolution kernels.
    #[config(default = false)]
    pub only_conv: bool,
}

/// A ready-to-train assembly over one live parameter table.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSetup {
    /// The optimizer configuration, consumed by the external optimizer.
    pub optimizer: OptimizerConfig,
    /// The loss criterion.
    pub loss: LossFunction,
    /// The device the runtime places the model and loss on.
    pub device: DevicePlacement,
}

impl TrainingSetupConfig {
    /// Reject non-positive or non-finite numeric options.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfiguration(
                "learning_rate".into(),
                "finite and positive".into(),
            ));
        }
        if !(self.width_multiplier.is_finite() && self.width_multiplier > 0.0) {
            return Err(Error::InvalidConfiguration(
                "width_multiplier".into(),
                "finite and positive".into(),
            ));
        }
        Ok(())
    }

    /// The construction arguments for the external model implementation.
    #[inline]
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new().with_width_multiplier(self.width_multiplier)
    }

    /// Build the training setup over the given parameter table.
    ///
    /// Freezes the first layer, partitions the remaining parameters into the
    /// five optimizer groups, and attaches the loss criterion and device
    /// placement. Parameters matching no group rule stay out of the
    /// optimizer: their values never update during the run even though
    /// their trainability flag is left untouched.
    pub fn init(
        &self,
        params: &mut ParamTable,
        device: DevicePlacement,
    ) -> Result<TrainingSetup, Error> {
        self.validate()?;

        params.freeze_first_layer();

        let optimizer = OptimizerConfig {
            learning_rate: self.learning_rate,
            groups: partition(params, self),
        };

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "microbotnet::qat::setup",
            "init > {} groups over {} parameters ({})",
            optimizer.groups.len(), params.len(), params.size_readable(),
        );

        Ok(TrainingSetup {
            optimizer,
            loss: LossFunction::CrossEntropy,
            device,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TensorData;

    fn table() -> ParamTable {
        ParamTable::from_named(
            12,
            [
                ("features.0.0.weight", vec![8, 3, 3, 3]),
                ("features.0.1.weight", vec![8]),
                ("features.0.1.bias", vec![8]),
                ("features.3.conv.0.weight", vec![32, 32, 1, 1]),
                ("features.3.lastBN.weight", vec![32]),
                ("features.3.lastBN.bias", vec![32]),
                ("features.11.1.weight", vec![576]),
                ("features.11.1.bias", vec![576]),
                ("classifier.1.weight", vec![10, 1024]),
                ("classifier.1.bias", vec![10]),
            ]
            .into_iter()
            .map(|(name, shape)| {
                let count = shape.iter().product();
                (name.to_owned(), TensorData::new(vec![0.0_f32; count], shape))
            }),
        )
        .unwrap()
    }

    #[test]
    fn init_returns_the_ready_setup() {
        let mut params = table();
        let config = TrainingSetupConfig::new();

        let setup = config.init(&mut params, DevicePlacement::Cuda(0)).unwrap();

        assert_eq!(setup.optimizer.learning_rate, 1e-3);
        assert_eq!(setup.optimizer.groups.len(), 5);
        assert_eq!(setup.loss, LossFunction::CrossEntropy);
        assert_eq!(setup.device, DevicePlacement::Cuda(0));

        // The first layer is frozen and in no group.
        assert!(!params.get("features.0.0.weight").unwrap().is_trainable());
        assert!(setup
            .optimizer
            .member_names()
            .all(|name| name != "features.0.0.weight"));
    }

    #[test]
    fn validate_rejects_bad_learning_rates() {
        let config = TrainingSetupConfig::new().with_learning_rate(0.0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(..))
        ));

        let config = TrainingSetupConfig::new().with_learning_rate(-1e-3);
        assert!(config.validate().is_err());

        let config = TrainingSetupConfig::new().with_learning_rate(f64::NAN);
        assert!(config.validate().is_err());

        let mut params = table();
        assert!(config.init(&mut params, Default::default()).is_err());
    }

    #[test]
    fn validate_rejects_bad_width_multipliers() {
        let config = TrainingSetupConfig::new().with_width_multiplier(0.0);
        assert!(config.validate().is_err());

        let config = TrainingSetupConfig::new().with_width_multiplier(f64::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn model_config_forwards_the_width_multiplier() {
        let config = TrainingSetupConfig::new().with_width_multiplier(0.25);

        let model_config = config.model_config();

        assert_eq!(model_config.width_multiplier, 0.25);
        assert_eq!(model_config.classes_num, 10);
        assert_eq!(model_config.input_size, 32);
    }

    #[test]
    fn defaults() {
        let config = TrainingSetupConfig::new();

        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.width_multiplier, 0.32);
        assert_eq!(config.min_size_quantize, 1000);
        assert!(!config.only_conv);
        assert!(config.validate().is_ok());
    }
}
