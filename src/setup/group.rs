//! Optimizer parameter groups.

pub use super::*;

/// Identity of one optimizer parameter group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupKind {
    /// Classifier projection weights, trained with weight decay.
    OutputWeights,
    /// Bottleneck weights marked for reduced-precision representation.
    QuantizedWeights,
    /// Classifier projection biases.
    OutputBiases,
    /// Batch-norm scales of the stem, the head, and the bottleneck tails.
    BatchNormWeights,
    /// Batch-norm shifts of the stem, the head, and the bottleneck tails.
    BatchNormBiases,
}

/// One optimizer-visible bucket of parameters with its overrides.
///
/// Members are parameter names: the external optimizer resolves them against
/// the live [`ParamTable`] it updates in place.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamGroup {
    /// Group identity.
    pub kind: GroupKind,
    /// Member parameter names, in model order.
    pub params: Vec<String>,
    /// Per-group weight decay override.
    pub weight_decay: Option<f64>,
}

/// The ordered group list plus the global learning rate,
/// consumed by the external optimizer implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerConfig {
    /// Global learning rate.
    pub learning_rate: f64,
    /// The parameter groups, in build order.
    pub groups: Vec<ParamGroup>,
}

impl ParamGroup {
    /// A group with no overrides.
    pub fn new(
        kind: GroupKind,
        params: Vec<String>,
    ) -> Self {
        Self {
            kind,
            params,
            weight_decay: None,
        }
    }

    /// Override the weight decay.
    pub fn with_weight_decay(
        mut self,
        weight_decay: f64,
    ) -> Self {
        self.weight_decay = Some(weight_decay);
        self
    }

    /// Number of member parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the group has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether the named parameter is a member.
    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.params.iter().any(|param| param == name)
    }
}

impl OptimizerConfig {
    /// Look up one group by kind.
    pub fn group(
        &self,
        kind: GroupKind,
    ) -> Option<&ParamGroup> {
        self.groups.iter().find(|group| group.kind == kind)
    }

    /// Every member parameter name, over all groups.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.params.iter().map(String::as_str))
    }
}
