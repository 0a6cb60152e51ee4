use std::collections::HashMap;

use super::metrics::MetricsTable;
use super::types::{SampleColumn, VariantTable};
use crate::{InputLocation, ReorderError};

/// Final order of the sample columns (the reference always stays first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Last sample in input order, placed in front of the sorted samples.
    pub pivot: Option<String>,
    /// Remaining samples, ascending by `(match_total, leading_run)`.
    pub sorted: Vec<String>,
}

impl ColumnPlan {
    /// Sample ids in output order: pivot, then sorted samples.
    pub fn sample_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.pivot
            .iter()
            .chain(self.sorted.iter())
            .map(String::as_str)
    }
}

/// Decide the output column order.
///
/// The pivot is chosen by position, not by metrics, and is never part of the
/// sort. The sort is stable, so exact ties keep their input order. Samples
/// without recorded metrics sort as `(0, 0)`.
pub fn plan_columns(table: &VariantTable, metrics: &MetricsTable) -> ColumnPlan {
    let samples = table.samples();
    let Some((pivot, rest)) = samples.split_last() else {
        return ColumnPlan {
            pivot: None,
            sorted: Vec::new(),
        };
    };

    let mut sorted: Vec<&SampleColumn> = rest.iter().collect();
    sorted.sort_by_key(|column| metrics.get(&column.id).unwrap_or_default());

    ColumnPlan {
        pivot: Some(pivot.id.clone()),
        sorted: sorted.into_iter().map(|column| column.id.clone()).collect(),
    }
}

/// Build a new table with columns laid out as `plan` says.
///
/// Row data is copied unchanged; `plan` must name every sample exactly once.
pub fn apply_plan(table: &VariantTable, plan: &ColumnPlan) -> Result<VariantTable, ReorderError> {
    let reference = table.reference().ok_or_else(|| {
        ReorderError::malformed(InputLocation::default(), "table has no reference column")
    })?;

    let mut by_id: HashMap<&str, &SampleColumn> = table
        .samples()
        .iter()
        .map(|column| (column.id.as_str(), column))
        .collect();

    let mut samples = Vec::with_capacity(by_id.len());
    for id in plan.sample_order() {
        let column = by_id.remove(id).ok_or_else(|| {
            ReorderError::malformed(
                InputLocation::default().with_column(id),
                "column plan names an unknown or repeated sample",
            )
        })?;
        samples.push(column.clone());
    }
    if let Some(id) = by_id.keys().next() {
        return Err(ReorderError::malformed(
            InputLocation::default().with_column(*id),
            "column plan leaves out a sample",
        ));
    }

    VariantTable::with_reference(
        table.key(),
        table.positions().to_vec(),
        reference.clone(),
        samples,
    )
}
