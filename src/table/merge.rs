use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use super::types::{Cell, Position, PositionOrder, SampleColumn, VariantTable};
use crate::{InputLocation, ReorderError};

/// Merged table plus bookkeeping about how it was built.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Row-aligned table with the reference as first data column.
    pub table: VariantTable,
    /// Samples dropped because every merged cell was missing.
    pub dropped: Vec<String>,
    /// Positions present in both inputs.
    pub shared_rows: usize,
    /// Table-only positions appended after the ordered rows.
    pub appended_rows: usize,
}

/// Outer-join `raw` onto `order` by position.
///
/// Rows follow `order`, then positions found only in `raw` in their original
/// row order. Ordered positions absent from `raw` get missing cells; table-only
/// positions get a missing reference call. Samples with no call left after the
/// join are dropped.
pub fn merge_onto_order(
    raw: &VariantTable,
    order: &PositionOrder,
    allow_disjoint: bool,
) -> Result<MergeOutcome, ReorderError> {
    if let Some(clash) = raw.columns().iter().find(|c| c.id == order.reference_id()) {
        return Err(ReorderError::malformed(
            InputLocation::default().with_column(clash.id.as_str()),
            "table already has a column named like the reference column",
        ));
    }

    let raw_rows: HashMap<Position, usize> = raw
        .positions()
        .iter()
        .enumerate()
        .map(|(row, position)| (*position, row))
        .collect();
    let ordered: HashSet<Position> = order.positions().collect();

    // (position, row in raw) for every merged row
    let mut rows: Vec<(Position, Option<usize>)> = order
        .positions()
        .map(|position| (position, raw_rows.get(&position).copied()))
        .collect();
    let shared_rows = rows.iter().filter(|(_, raw_row)| raw_row.is_some()).count();
    let ordered_rows = rows.len();
    rows.extend(
        raw.positions()
            .iter()
            .enumerate()
            .filter(|(_, position)| !ordered.contains(*position))
            .map(|(row, position)| (*position, Some(row))),
    );
    let appended_rows = rows.len() - ordered_rows;

    if shared_rows == 0 {
        if !allow_disjoint {
            return Err(ReorderError::SchemaMismatch {
                order_rows: order.len(),
                table_rows: raw.row_count(),
            });
        }
        warn!(
            order_rows = order.len(),
            table_rows = raw.row_count(),
            "position order and table share no position"
        );
    }

    let positions: Vec<Position> = rows.iter().map(|(position, _)| *position).collect();

    let mut reference_cells: Vec<Cell> = order.entries().iter().map(|(_, call)| *call).collect();
    reference_cells.resize(rows.len(), None);
    let reference = SampleColumn::new(order.reference_id(), reference_cells);

    let mut dropped = Vec::new();
    let mut samples = Vec::with_capacity(raw.columns().len());
    for column in raw.columns() {
        let cells: Vec<Cell> = rows
            .iter()
            .map(|(_, raw_row)| raw_row.and_then(|row| column.cells[row]))
            .collect();
        let merged = SampleColumn::new(column.id.as_str(), cells);
        if merged.is_all_missing() {
            dropped.push(merged.id);
        } else {
            samples.push(merged);
        }
    }

    if !dropped.is_empty() {
        info!(columns = ?dropped, "dropped samples without calls");
    }

    let table = VariantTable::with_reference(order.key(), positions, reference, samples)?;
    Ok(MergeOutcome {
        table,
        dropped,
        shared_rows,
        appended_rows,
    })
}
