use std::collections::HashMap;

use super::types::{calls_match, Cell, VariantTable};
use crate::{InputLocation, ReorderError};

/// Concordance of one sample column with the reference column.
///
/// Field order gives the derived `Ord` the sort key: `match_total` first,
/// then `leading_run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnMetrics {
    /// Rows whose call equals the reference call.
    pub match_total: usize,
    /// Matching rows from row 0 up to the first mismatch.
    pub leading_run: usize,
}

impl ColumnMetrics {
    /// Single pass over paired cells. Extra cells in the longer slice are ignored.
    pub fn compute(reference: &[Cell], sample: &[Cell]) -> Self {
        let (metrics, _) = reference.iter().zip(sample).fold(
            (Self::default(), true),
            |(mut metrics, leading), (reference_cell, sample_cell)| {
                if calls_match(*reference_cell, *sample_cell) {
                    metrics.match_total += 1;
                    if leading {
                        metrics.leading_run += 1;
                    }
                    (metrics, leading)
                } else {
                    (metrics, false)
                }
            },
        );
        metrics
    }
}

/// Metrics keyed by sample id, kept apart from the table data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsTable {
    by_sample: HashMap<String, ColumnMetrics>,
    order: Vec<String>,
}

impl MetricsTable {
    /// Record metrics for a sample, replacing earlier ones.
    pub fn insert(&mut self, sample: impl Into<String>, metrics: ColumnMetrics) {
        let sample = sample.into();
        if self.by_sample.insert(sample.clone(), metrics).is_none() {
            self.order.push(sample);
        }
    }

    /// Metrics of `sample`.
    pub fn get(&self, sample: &str) -> Option<ColumnMetrics> {
        self.by_sample.get(sample).copied()
    }

    /// Samples with their metrics, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnMetrics)> + '_ {
        self.order
            .iter()
            .map(move |sample| (sample.as_str(), self.by_sample[sample]))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no sample was recorded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Compute metrics for every sample column of a merged table.
///
/// Fails when the table has no reference column or no rows, since there is
/// no reference row to compare against.
pub fn compute_metrics(table: &VariantTable) -> Result<MetricsTable, ReorderError> {
    let reference = table.reference().ok_or_else(|| {
        ReorderError::malformed(InputLocation::default(), "table has no reference column")
    })?;
    if table.row_count() == 0 {
        return Err(ReorderError::malformed(
            InputLocation::default().with_column(reference.id.as_str()),
            "table has no rows; reference row cannot be identified",
        ));
    }

    let mut metrics = MetricsTable::default();
    for sample in table.samples() {
        metrics.insert(
            sample.id.as_str(),
            ColumnMetrics::compute(&reference.cells, &sample.cells),
        );
    }
    Ok(metrics)
}
