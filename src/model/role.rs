//! Structural parameter roles.
//!
//! Roles are assigned once, when the parameter table is built, from the
//! model's serialization names. Everything downstream dispatches on the
//! role instead of re-matching name substrings.

pub use super::*;

/// Name prefix of the feature-extraction stages.
pub const FEATURES_PREFIX: &str = "features.";
/// Name prefix of the classifier head.
pub const CLASSIFIER_PREFIX: &str = "classifier.";
/// Substring marking the trailing batch-norm of a bottleneck block.
pub const NORM_TAIL_MARK: &str = "lastBN";
/// Substring marking fully-connected sublayers.
pub const FC_MARK: &str = "fc";
/// Substring marking convolution sublayers.
pub const CONV_MARK: &str = "conv";

/// The structural role of one named parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamRole {
    /// Stage 0's first convolution weight. It is frozen before training.
    FirstLayerWeight,
    /// Scale of stage 0's normalization sublayer.
    StemNormWeight,
    /// Shift of stage 0's normalization sublayer.
    StemNormBias,
    /// Scale of the last stage's normalization sublayer.
    HeadNormWeight,
    /// Shift of the last stage's normalization sublayer.
    HeadNormBias,
    /// A parameter of an intermediate feature-extraction stage.
    Bottleneck {
        /// Stage index in the feature list.
        stage: usize,
        /// Sublayer kind within the stage.
        param: BottleneckParam,
    },
    /// The classifier projection weight.
    OutputWeight,
    /// The classifier projection bias.
    OutputBias,
    /// Anything the partitioner never selects.
    Untracked,
}

/// Sublayer kind of one bottleneck-stage parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BottleneckParam {
    /// A convolution kernel.
    ConvWeight,
    /// A convolution bias.
    ConvBias,
    /// A fully-connected weight.
    FcWeight,
    /// A fully-connected bias.
    FcBias,
    /// The scale of the block's trailing batch-norm.
    NormTailWeight,
    /// The shift of the block's trailing batch-norm.
    NormTailBias,
    /// Anything else, e.g. running statistics.
    Untracked,
}

impl ParamRole {
    /// Assign the role of a named parameter
    /// in a model with `stage_count` feature stages.
    pub fn assign(
        name: &str,
        stage_count: usize,
    ) -> Self {
        if let Some(rest) = name.strip_prefix(FEATURES_PREFIX) {
            let Some((stage, rest)) = rest.split_once('.') else {
                return Self::Untracked;
            };
            let Ok(stage) = stage.parse::<usize>() else {
                return Self::Untracked;
            };
            return Self::assign_feature(stage, rest, stage_count);
        }

        if name.starts_with(CLASSIFIER_PREFIX) {
            return if name.ends_with(".weight") {
                Self::OutputWeight
            } else if name.ends_with(".bias") {
                Self::OutputBias
            } else {
                Self::Untracked
            };
        }

        Self::Untracked
    }

    /// The stem and head expose their first sublayer (index 0, convolution)
    /// and their normalization sublayer (index 1); everything in between is
    /// a bottleneck stage.
    fn assign_feature(
        stage: usize,
        rest: &str,
        stage_count: usize,
    ) -> Self {
        let head = stage_count.saturating_sub(1);
        match stage {
            0 => match rest {
                "0.weight" => Self::FirstLayerWeight,
                "1.weight" => Self::StemNormWeight,
                "1.bias" => Self::StemNormBias,
                _ => Self::Untracked,
            },
            stage if stage == head => match rest {
                "1.weight" => Self::HeadNormWeight,
                "1.bias" => Self::HeadNormBias,
                _ => Self::Untracked,
            },
            stage if stage < head => Self::Bottleneck {
                stage,
                param: BottleneckParam::assign(rest),
            },
            _ => Self::Untracked,
        }
    }
}

impl BottleneckParam {
    /// Classify a bottleneck sublayer path.
    ///
    /// [`NORM_TAIL_MARK`] takes precedence over [`FC_MARK`],
    /// and [`FC_MARK`] over [`CONV_MARK`], so a path carrying several marks
    /// classifies as the most specific sublayer. A squeeze-excitation weight
    /// under a convolution block is therefore fully-connected,
    /// not a convolution kernel.
    pub fn assign(path: &str) -> Self {
        let kinds = if path.contains(NORM_TAIL_MARK) {
            [Self::NormTailWeight, Self::NormTailBias]
        } else if path.contains(FC_MARK) {
            [Self::FcWeight, Self::FcBias]
        } else if path.contains(CONV_MARK) {
            [Self::ConvWeight, Self::ConvBias]
        } else {
            return Self::Untracked;
        };

        if path.contains("weight") {
            kinds[0]
        } else if path.contains("bias") {
            kinds[1]
        } else {
            Self::Untracked
        }
    }
}
