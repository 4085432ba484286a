//! Checkpoint loading.
//!
//! A checkpoint is the decoded form of one serialized training snapshot:
//! a mapping from parameter name to tensor value, sitting either at the top
//! level or nested one level under the [`NET_FIELD`] field. Keys may carry
//! the [`DISTRIBUTED_PREFIX`] left by multi-device training wrappers.
//!
//! Decoding the snapshot bytes is the job of an external deserializer;
//! this module consumes the decoded mapping and overwrites a model's
//! parameter values in place, all-or-nothing.

pub use crate::{error::Error, model::TensorData};

use crate::model::ParamTable;
use std::collections::HashMap;

/// The field holding the parameter mapping in a nested snapshot.
pub const NET_FIELD: &str = "net";

/// The key prefix left by distributed-training wrappers.
pub const DISTRIBUTED_PREFIX: &str = "module.";

/// One decoded checkpoint field.
#[derive(Clone, Debug)]
pub enum Field {
    /// A parameter value.
    Tensor(TensorData),
    /// A parameter mapping nested under [`NET_FIELD`].
    State(HashMap<String, TensorData>),
}

/// One decoded checkpoint.
#[derive(Clone, Debug, Default)]
pub struct Checkpoint {
    /// Top-level fields of the snapshot.
    pub fields: HashMap<String, Field>,
}

impl Checkpoint {
    /// Wrap a flat parameter mapping.
    pub fn from_state(state: HashMap<String, TensorData>) -> Self {
        Self {
            fields: state
                .into_iter()
                .map(|(name, value)| (name, Field::Tensor(value)))
                .collect(),
        }
    }

    /// Wrap a snapshot whose parameter mapping sits under [`NET_FIELD`].
    pub fn from_snapshot(state: HashMap<String, TensorData>) -> Self {
        Self {
            fields: [(NET_FIELD.to_owned(), Field::State(state))].into(),
        }
    }

    /// The effective parameter mapping, unwrapped and prefix-stripped.
    ///
    /// If the [`NET_FIELD`] field exists, its nested mapping is used;
    /// otherwise every top-level field must be a tensor.
    pub fn state(&self) -> Result<HashMap<&str, &TensorData>, Error> {
        if let Some(field) = self.fields.get(NET_FIELD) {
            let Field::State(state) = field else {
                return Err(Error::InvalidCheckpoint(
                    format!("the {NET_FIELD:?} field"),
                    "a parameter mapping".into(),
                ));
            };
            return Ok(state
                .iter()
                .map(|(name, value)| (Self::strip_prefix(name), value))
                .collect());
        }

        self.fields
            .iter()
            .map(|(name, field)| {
                let Field::Tensor(value) = field else {
                    return Err(Error::InvalidCheckpoint(
                        format!("the {name:?} field"),
                        format!("a tensor in a checkpoint without {NET_FIELD:?}"),
                    ));
                };
                Ok((Self::strip_prefix(name), value))
            })
            .collect()
    }

    /// Remove one leading [`DISTRIBUTED_PREFIX`].
    #[inline]
    pub fn strip_prefix(name: &str) -> &str {
        name.strip_prefix(DISTRIBUTED_PREFIX).unwrap_or(name)
    }

    /// Overwrite the model's parameter values in place.
    ///
    /// Every expected name must be present with a matching shape and element
    /// type. Any violation aborts before the first assignment, so a failed
    /// load never leaves the model partially overwritten. Checkpoint entries
    /// matching no expected name are ignored.
    pub fn load_into(
        &self,
        params: &mut ParamTable,
    ) -> Result<(), Error> {
        let state = self.state()?;

        let mut staged = Vec::with_capacity(params.len());
        for entry in params.entries() {
            let value = *state
                .get(entry.name())
                .ok_or_else(|| Error::MissingParameter(entry.name().to_owned()))?;
            if value.shape != entry.shape() {
                return Err(Error::MismatchedShape {
                    name: entry.name().to_owned(),
                    expected: entry.shape().to_vec(),
                    found: value.shape.to_owned(),
                });
            }
            if value.dtype != entry.dtype() {
                return Err(Error::MismatchedDType {
                    name: entry.name().to_owned(),
                    expected: entry.dtype(),
                    found: value.dtype,
                });
            }
            staged.push(value.to_owned());
        }

        for (entry, value) in params.entries_mut().zip(staged) {
            entry.set_value(value);
        }

        #[cfg(all(debug_assertions, not(test)))]
        log::debug!(
            target: "microbotnet::qat::checkpoint",
            "load_into > {} parameters", params.len(),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ParamTable {
        ParamTable::from_named(
            12,
            [
                (
                    "features.0.0.weight".to_owned(),
                    TensorData::new(vec![0.0_f32; 216], [8, 3, 3, 3]),
                ),
                (
                    "classifier.1.bias".to_owned(),
                    TensorData::new(vec![0.0_f32; 10], [10]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn load_flat_state() {
        let mut params = table();
        let checkpoint = Checkpoint::from_state(
            [
                (
                    "features.0.0.weight".to_owned(),
                    TensorData::new(vec![1.0_f32; 216], [8, 3, 3, 3]),
                ),
                (
                    "classifier.1.bias".to_owned(),
                    TensorData::new(vec![2.0_f32; 10], [10]),
                ),
            ]
            .into(),
        );

        checkpoint.load_into(&mut params).unwrap();

        let value = params.get("classifier.1.bias").unwrap().value();
        assert_eq!(value.to_vec::<f32>().unwrap(), [2.0; 10]);
    }

    #[test]
    fn load_nested_state_with_distributed_prefix() {
        let mut params = table();
        let checkpoint = Checkpoint::from_snapshot(
            [
                (
                    "module.features.0.0.weight".to_owned(),
                    TensorData::new(vec![1.0_f32; 216], [8, 3, 3, 3]),
                ),
                (
                    "module.classifier.1.bias".to_owned(),
                    TensorData::new(vec![2.0_f32; 10], [10]),
                ),
            ]
            .into(),
        );

        checkpoint.load_into(&mut params).unwrap();

        let value = params.get("features.0.0.weight").unwrap().value();
        assert_eq!(value.to_vec::<f32>().unwrap(), [1.0; 216]);
    }

    #[test]
    fn load_ignores_extra_entries() {
        let mut params = table();
        let checkpoint = Checkpoint::from_state(
            [
                (
                    "features.0.0.weight".to_owned(),
                    TensorData::new(vec![1.0_f32; 216], [8, 3, 3, 3]),
                ),
                (
                    "classifier.1.bias".to_owned(),
                    TensorData::new(vec![2.0_f32; 10], [10]),
                ),
                (
                    "classifier.1.scale".to_owned(),
                    TensorData::new(vec![3.0_f32; 10], [10]),
                ),
            ]
            .into(),
        );

        checkpoint.load_into(&mut params).unwrap();

        assert_eq!(params.len(), 2);
    }

    #[test]
    fn load_missing_parameter_mutates_nothing() {
        let mut params = table();
        let checkpoint = Checkpoint::from_state(
            [(
                "features.0.0.weight".to_owned(),
                TensorData::new(vec![1.0_f32; 216], [8, 3, 3, 3]),
            )]
            .into(),
        );

        let result = checkpoint.load_into(&mut params);

        assert!(
            matches!(result, Err(Error::MissingParameter(name)) if name == "classifier.1.bias")
        );

        // All-or-nothing: the present parameter keeps its previous value.
        let value = params.get("features.0.0.weight").unwrap().value();
        assert_eq!(value.to_vec::<f32>().unwrap(), [0.0; 216]);
    }

    #[test]
    fn load_mismatched_shape() {
        let mut params = table();
        let checkpoint = Checkpoint::from_state(
            [
                (
                    "features.0.0.weight".to_owned(),
                    TensorData::new(vec![1.0_f32; 216], [8, 27]),
                ),
                (
                    "classifier.1.bias".to_owned(),
                    TensorData::new(vec![2.0_f32; 10], [10]),
                ),
            ]
            .into(),
        );

        let result = checkpoint.load_into(&mut params);

        assert!(matches!(
            result,
            Err(Error::MismatchedShape { expected, found, .. })
                if expected == [8, 3, 3, 3] && found == [8, 27]
        ));
    }

    #[test]
    fn load_mismatched_dtype() {
        let mut params = table();
        let checkpoint = Checkpoint::from_state(
            [
                (
                    "features.0.0.weight".to_owned(),
                    TensorData::new(vec![1.0_f64; 216], [8, 3, 3, 3]),
                ),
                (
                    "classifier.1.bias".to_owned(),
                    TensorData::new(vec![2.0_f32; 10], [10]),
                ),
            ]
            .into(),
        );

        let result = checkpoint.load_into(&mut params);

        assert!(matches!(result, Err(Error::MismatchedDType { .. })));
    }

    #[test]
    fn state_rejects_net_tensor() {
        let checkpoint = Checkpoint {
            fields: [(
                NET_FIELD.to_owned(),
                Field::Tensor(TensorData::new(vec![0.0_f32; 1], [1])),
            )]
            .into(),
        };

        assert!(matches!(checkpoint.state(), Err(Error::InvalidCheckpoint(..))));
    }

    #[test]
    fn state_rejects_stray_nested_mapping() {
        let checkpoint = Checkpoint {
            fields: [("optimizer".to_owned(), Field::State(Default::default()))].into(),
        };

        assert!(matches!(checkpoint.state(), Err(Error::InvalidCheckpoint(..))));
    }

    #[test]
    fn strip_prefix_is_leading_only() {
        assert_eq!(
            Checkpoint::strip_prefix("module.features.0.0.weight"),
            "features.0.0.weight"
        );
        assert_eq!(
            Checkpoint::strip_prefix("features.module.weight"),
            "features.module.weight"
        );
    }
}
