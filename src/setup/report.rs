//! Quantization selection report.

pub use super::*;

use humansize::{format_size, BINARY};
use std::fmt;

/// One parameter selected for the quantized-weights group.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportEntry {
    /// Parameter name.
    pub name: String,
    /// Parameter shape.
    pub shape: Vec<usize>,
    /// Element count, the product of all shape dimensions.
    pub element_count: usize,
    /// Value size in bytes.
    pub size: usize,
}

/// The parameters a configuration selects for quantization,
/// with their shapes and sizes. Inspection only:
/// building the report has no effect on grouping or training.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuantizationReport {
    /// Selected parameters, in model order.
    pub entries: Vec<ReportEntry>,
}

impl QuantizationReport {
    /// Enumerate the selection the given configuration would quantize.
    pub fn new(
        params: &ParamTable,
        config: &TrainingSetupConfig,
    ) -> Self {
        let stages = params.bottleneck_stages();
        let entries = params
            .entries()
            .filter(|entry| selects_for_quantization(entry, &stages, config))
            .map(|entry| ReportEntry {
                name: entry.name().to_owned(),
                shape: entry.shape().to_vec(),
                element_count: entry.element_count(),
                size: entry.size(),
            })
            .collect();

        Self { entries }
    }

    /// Element count over all selected parameters.
    pub fn element_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.element_count).sum()
    }

    /// Size of all selected parameter values in bytes.
    pub fn size(&self) -> usize {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    /// Readable size of all selected parameter values.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

impl fmt::Display for QuantizationReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{} {:?} ({} elements, {})",
                entry.name,
                entry.shape,
                entry.element_count,
                format_size(entry.size, BINARY.decimal_places(1)),
            )?;
        }
        write!(
            f,
            "total: {} parameters ({} elements, {})",
            self.entries.len(),
            self.element_count(),
            self.size_readable(),
        )
    }
}
