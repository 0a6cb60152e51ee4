//! Join per-position quality scores onto a finished table.

use std::collections::HashMap;

use tracing::info;

use crate::io::{parse_position, DelimitedTable};
use crate::table::Position;
use crate::ReorderError;

/// Quality scores keyed by position, one or more score columns.
#[derive(Debug, Clone)]
pub struct QualityTable {
    score_columns: Vec<String>,
    scores: HashMap<Position, Vec<String>>,
}

impl QualityTable {
    /// Read scores from a parsed table with a `key` column.
    pub fn from_delimited(table: &DelimitedTable, key: &str) -> Result<Self, ReorderError> {
        let key_idx = key_column(table, key)?;
        let score_columns: Vec<String> = table
            .header
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != key_idx)
            .map(|(_, name)| name.clone())
            .collect();

        let mut scores = HashMap::with_capacity(table.records.len());
        for (row, record) in table.records.iter().enumerate() {
            let position = position_at(table, row, key_idx)?;
            let values = record
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != key_idx)
                .map(|(_, value)| value.clone())
                .collect();
            if scores.insert(position, values).is_some() {
                return Err(ReorderError::malformed(
                    table.location().with_line(line_of(table, row)).with_column(key),
                    format!("duplicate quality row for position {position}"),
                ));
            }
        }

        Ok(Self {
            score_columns,
            scores,
        })
    }

    /// Names of the score columns.
    pub fn score_columns(&self) -> &[String] {
        &self.score_columns
    }

    /// Scores of `position`.
    pub fn get(&self, position: Position) -> Option<&[String]> {
        self.scores.get(&position).map(Vec::as_slice)
    }
}

fn key_column(table: &DelimitedTable, key: &str) -> Result<usize, ReorderError> {
    table.column_index(key).ok_or_else(|| {
        ReorderError::malformed(
            table.location().with_line(1),
            format!("header has no '{key}' key column"),
        )
    })
}

fn line_of(table: &DelimitedTable, row: usize) -> u64 {
    table.lines.get(row).copied().unwrap_or_default()
}

fn position_at(
    table: &DelimitedTable,
    row: usize,
    key_idx: usize,
) -> Result<Position, ReorderError> {
    parse_position(&table.records[row][key_idx]).map_err(|message| {
        ReorderError::malformed(
            table
                .location()
                .with_line(line_of(table, row))
                .with_column(table.header[key_idx].as_str()),
            message,
        )
    })
}

/// Inner-join `quality` onto `table` on `key`.
///
/// Score columns are appended after the table's columns. Rows keep the
/// table's order; rows without scores are dropped.
pub fn merge_quality(
    table: &DelimitedTable,
    key: &str,
    quality: &QualityTable,
) -> Result<DelimitedTable, ReorderError> {
    let key_idx = key_column(table, key)?;
    if let Some(clash) = quality
        .score_columns
        .iter()
        .find(|name| table.column_index(name).is_some())
    {
        return Err(ReorderError::malformed(
            table.location().with_line(1).with_column(clash.as_str()),
            "quality column clashes with a table column",
        ));
    }

    let mut header = table.header.clone();
    header.extend(quality.score_columns.iter().cloned());

    let mut records = Vec::with_capacity(table.records.len());
    for (row, record) in table.records.iter().enumerate() {
        let position = position_at(table, row, key_idx)?;
        if let Some(scores) = quality.get(position) {
            let mut merged = record.clone();
            merged.extend(scores.iter().cloned());
            records.push(merged);
        }
    }

    info!(
        rows = table.records.len(),
        kept = records.len(),
        score_columns = quality.score_columns.len(),
        "merged quality scores"
    );

    let mut merged = DelimitedTable::new(header, records);
    merged.source = table.source.clone();
    Ok(merged)
}
