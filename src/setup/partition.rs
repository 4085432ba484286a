//! Parameter partitioning.
//!
//! Every parameter joins at most one of the five groups. The rules are
//! deliberately non-exhaustive: a bottleneck parameter matching none of
//! them, e.g. a convolution kernel below the size threshold or a bias,
//! receives no optimizer entry at all. Its value then stays fixed for the
//! whole run while its trainability flag is left untouched.

pub use super::*;

use crate::model::{BottleneckParam, ParamEntry, ParamRole};
use std::ops::Range;

/// Whether a bottleneck sublayer kind is eligible for quantization.
///
/// Convolution kernels always are; fully-connected weights only when
/// `only_conv` is off. Biases and norm tails never are.
pub fn is_to_be_quantized(
    param: BottleneckParam,
    only_conv: bool,
) -> bool {
    match param {
        BottleneckParam::ConvWeight => true,
        BottleneckParam::FcWeight => !only_conv,
        _ => false,
    }
}

/// Whether the entry's element count strictly exceeds the minimum.
#[inline]
pub fn exceeds_min_quantize_size(
    entry: &ParamEntry,
    min_size_quantize: usize,
) -> bool {
    entry.element_count() > min_size_quantize
}

/// Whether the entry joins the quantized-weights group.
pub fn selects_for_quantization(
    entry: &ParamEntry,
    stages: &Range<usize>,
    config: &TrainingSetupConfig,
) -> bool {
    matches!(
        entry.role(),
        ParamRole::Bottleneck { stage, param }
            if stages.contains(&stage)
            && is_to_be_quantized(param, config.only_conv)
    ) && exceeds_min_quantize_size(entry, config.min_size_quantize)
}

/// Partition the table into the five ordered groups:
/// output weights (with weight decay), quantized weights, output biases,
/// batch-norm weights, batch-norm biases.
///
/// The batch-norm groups always open with the stem's and the head's
/// normalization parameters, followed by the bottleneck norm tails in
/// model order.
pub fn partition(
    params: &ParamTable,
    config: &TrainingSetupConfig,
) -> Vec<ParamGroup> {
    let stages = params.bottleneck_stages();

    let by_role =
        |role: ParamRole| params.entries().filter(move |entry| entry.role() == role);
    let norm_tails = |kind: BottleneckParam| {
        let stages = stages.to_owned();
        params.entries().filter(move |entry| {
            matches!(
                entry.role(),
                ParamRole::Bottleneck { stage, param }
                    if stages.contains(&stage) && param == kind
            )
        })
    };

    let quantized = params
        .entries()
        .filter(|entry| selects_for_quantization(entry, &stages, config));

    vec![
        ParamGroup::new(
            GroupKind::OutputWeights,
            names(by_role(ParamRole::OutputWeight)),
        )
        .with_weight_decay(OUTPUT_WEIGHT_DECAY),
        ParamGroup::new(GroupKind::QuantizedWeights, names(quantized)),
        ParamGroup::new(
            GroupKind::OutputBiases,
            names(by_role(ParamRole::OutputBias)),
        ),
        ParamGroup::new(
            GroupKind::BatchNormWeights,
            names(
                by_role(ParamRole::StemNormWeight)
                    .chain(by_role(ParamRole::HeadNormWeight))
                    .chain(norm_tails(BottleneckParam::NormTailWeight)),
            ),
        ),
        ParamGroup::new(
            GroupKind::BatchNormBiases,
            names(
                by_role(ParamRole::StemNormBias)
                    .chain(by_role(ParamRole::HeadNormBias))
                    .chain(norm_tails(BottleneckParam::NormTailBias)),
            ),
        ),
    ]
}

fn names<'p>(entries: impl Iterator<Item = &'p ParamEntry>) -> Vec<String> {
    entries.map(|entry| entry.name().to_owned()).collect()
}
