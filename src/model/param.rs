//! Named parameter table.

pub use super::*;

use humansize::{format_size, BINARY};
use std::{collections::HashSet, ops::Range};

/// One named parameter of a constructed model.
#[derive(Clone, Debug)]
pub struct ParamEntry {
    name: String,
    role: ParamRole,
    value: TensorData,
    is_trainable: bool,
}

/// The enumerable named-parameter view of one model instance.
///
/// Entries keep the model's own order. Each entry carries the structural
/// [`ParamRole`] assigned at construction, so grouping decisions never have
/// to re-derive it from the name.
///
/// The table is the live parameter storage: the checkpoint loader overwrites
/// its values in place, and the external optimizer resolves group member
/// names against it with [`ParamTable::get_mut`].
#[derive(Clone, Debug)]
pub struct ParamTable {
    entries: Vec<ParamEntry>,
    stage_count: usize,
}

impl ParamEntry {
    /// Serialization name, e.g. `features.3.conv.0.weight`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural role assigned at table construction.
    #[inline]
    pub fn role(&self) -> ParamRole {
        self.role
    }

    /// Current parameter value.
    #[inline]
    pub fn value(&self) -> &TensorData {
        &self.value
    }

    /// Whether the parameter receives gradient updates.
    #[inline]
    pub fn is_trainable(&self) -> bool {
        self.is_trainable
    }

    /// Shape of the parameter value.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.value.shape
    }

    /// Element type of the parameter value.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.value.dtype
    }

    /// Element count, the product of all shape dimensions.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.value.shape.iter().product()
    }

    /// Size of the parameter value in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.element_count() * self.value.dtype.size()
    }

    /// Overwrite the parameter value.
    ///
    /// The shape contract is the caller's:
    /// the checkpoint loader validates every value before assigning any.
    #[inline]
    pub fn set_value(
        &mut self,
        value: TensorData,
    ) -> &mut Self {
        self.value = value;
        self
    }

    /// Update the trainability flag.
    #[inline]
    pub fn set_trainable(
        &mut self,
        is_trainable: bool,
    ) -> &mut Self {
        self.is_trainable = is_trainable;
        self
    }
}

impl ParamTable {
    /// Build the table from `(name, value)` pairs in model order.
    ///
    /// `stage_count` is the length of the model's feature stage list
    /// (12 for the reference model). All parameters start trainable.
    pub fn from_named(
        stage_count: usize,
        params: impl IntoIterator<Item = (String, TensorData)>,
    ) -> Result<Self, Error> {
        if stage_count < 3 {
            return Err(Error::InvalidConfiguration(
                "stage_count".into(),
                "at least 3 (a stem, one bottleneck, and a head)".into(),
            ));
        }

        let mut seen = HashSet::new();
        let entries = params
            .into_iter()
            .map(|(name, value)| {
                if !seen.insert(name.to_owned()) {
                    return Err(Error::DuplicateParameter(name));
                }
                let role = ParamRole::assign(&name, stage_count);
                Ok(ParamEntry {
                    name,
                    role,
                    value,
                    is_trainable: true,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            entries,
            stage_count,
        })
    }

    /// Length of the model's feature stage list.
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Stage indices of the intermediate stages, stem and head excluded.
    #[inline]
    pub fn bottleneck_stages(&self) -> Range<usize> {
        1..self.stage_count - 1
    }

    /// Number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the parameters in model order.
    #[inline]
    pub fn entries(&self) -> std::slice::Iter<'_, ParamEntry> {
        self.entries.iter()
    }

    /// Iterate the parameters mutably in model order.
    #[inline]
    pub fn entries_mut(&mut self) -> std::slice::IterMut<'_, ParamEntry> {
        self.entries.iter_mut()
    }

    /// The parameter names the model expects, in model order.
    #[inline]
    pub fn expected_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ParamEntry::name)
    }

    /// Look up one parameter by name.
    pub fn get(
        &self,
        name: &str,
    ) -> Option<&ParamEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Look up one parameter mutably by name.
    pub fn get_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut ParamEntry> {
        self.entries.iter_mut().find(|entry| entry.name == name)
    }

    /// Mark stage 0's first convolution weight as non-trainable.
    ///
    /// It never joins an optimizer group afterwards.
    pub fn freeze_first_layer(&mut self) -> &mut Self {
        for entry in &mut self.entries {
            if entry.role == ParamRole::FirstLayerWeight {
                entry.is_trainable = false;
            }
        }
        self
    }

    /// Size of all parameter values in bytes.
    pub fn size(&self) -> usize {
        self.entries.iter().map(ParamEntry::size).sum()
    }

    /// Readable size of all parameter values.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}
