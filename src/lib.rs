//! # SNP table reordering
//!
//! This library turns a raw SNP table (genomic positions as rows, samples as
//! columns) into an analyst-friendly layout:
//!
//! 1. **Merge**: outer-join the table onto a canonical position order that also
//!    carries the reference call, then drop samples with no calls at all
//! 2. **Metrics**: per sample, count calls matching the reference
//!    (`match_total`) and the length of the initial concordant run
//!    (`leading_run`)
//! 3. **Reorder**: sort samples ascending by `(match_total, leading_run)`,
//!    stably, then move the pivot sample (last in input order) to the front
//!
//! The merged table ("sorted") and the reordered table ("organized") are both
//! returned so they can be written as separate artifacts.
//!
//! ## Usage Example
//!
//! ```ignore
//! use snpsort::{ReorderConfig, TableReorderer};
//!
//! let reorderer = TableReorderer::new(ReorderConfig::default());
//! let output = reorderer.run(&raw_table, &position_order)?;
//! println!("pivot: {:?}", output.pivot);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod annotate; // Position -> coding feature lookup
pub mod io; // Delimited text input/output
pub mod quality; // Quality score join
pub mod table; // Typed tables, merge, metrics and column reordering

pub use table::{
    Call, Cell, ColumnMetrics, ColumnPlan, MergeOutcome, MetricsTable, Position, PositionOrder,
    SampleColumn, VariantTable,
};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

/// Tokens treated as the missing sentinel in addition to the empty cell.
pub const DEFAULT_MISSING_TOKENS: [&str; 3] = ["NaN", "nan", "NA"];

/// Default name of the position key column.
pub const DEFAULT_KEY_COLUMN: &str = "position";

/// Configuration parameters for a reordering run
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    /// Header name of the position key column in every input
    pub key_column: String,

    /// SNP table delimiter; detected from the header line when `None`
    pub delimiter: Option<u8>,

    /// Cell values read as missing, in addition to the empty cell
    pub missing_tokens: Vec<String>,

    /// Tolerate inputs that share no position instead of failing
    pub allow_disjoint: bool,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            delimiter: None,
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            allow_disjoint: false,
        }
    }
}

impl ReorderConfig {
    /// Use a different key column name (e.g. `reference_pos`).
    pub fn with_key_column(mut self, key_column: impl Into<String>) -> Self {
        self.key_column = key_column.into();
        self
    }

    /// Force the SNP table delimiter instead of detecting it.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Replace the set of missing tokens.
    pub fn with_missing_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Downgrade a merge with no shared positions to a warning.
    pub fn with_allow_disjoint(mut self, allow: bool) -> Self {
        self.allow_disjoint = allow;
        self
    }

    /// Whether `value` (already trimmed) is the missing sentinel.
    pub fn is_missing(&self, value: &str) -> bool {
        value.is_empty() || self.missing_tokens.iter().any(|token| token == value)
    }
}

/// Where in the input a problem was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLocation {
    /// File (or other source) name
    pub source: Option<String>,
    /// 1-based line number
    pub line: Option<u64>,
    /// Column header
    pub column: Option<String>,
}

impl InputLocation {
    /// Location inside a named source.
    pub fn in_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Attach a source name unless one is already set.
    pub fn or_source(mut self, source: Option<&str>) -> Self {
        if self.source.is_none() {
            self.source = source.map(str::to_string);
        }
        self
    }

    /// Attach a line number.
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for InputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(source) = &self.source {
            parts.push(source.clone());
        }
        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(column) = &self.column {
            parts.push(format!("column '{column}'"));
        }
        if parts.is_empty() {
            f.write_str("input")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Errors that can occur while reading, reordering or writing tables
#[derive(Error, Debug)]
pub enum ReorderError {
    /// Missing key column, bad position, bad call or empty reference
    #[error("malformed input ({location}): {message}")]
    MalformedInput {
        /// Where the problem was found
        location: InputLocation,
        /// What was wrong
        message: String,
    },

    /// The position order and the table have no position in common
    #[error(
        "schema mismatch: {order_rows} ordered positions and {table_rows} table positions share no position"
    )]
    SchemaMismatch {
        /// Rows in the position order
        order_rows: usize,
        /// Rows in the raw table
        table_rows: usize,
    },

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Delimited text could not be parsed or written
    #[error("delimited text error: {0}")]
    Csv(#[from] csv::Error),
}

impl ReorderError {
    pub(crate) fn malformed(location: InputLocation, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            location,
            message: message.into(),
        }
    }

    /// Name the source of a malformed input unless it is already named.
    pub fn in_source(self, source: Option<&str>) -> Self {
        match self {
            Self::MalformedInput { location, message } => Self::MalformedInput {
                location: location.or_source(source),
                message,
            },
            other => other,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result of a reordering run
#[derive(Debug, Clone)]
pub struct ReorderOutput {
    /// Merged table: canonical row order, columns not yet reordered
    pub sorted: VariantTable,

    /// Final table: columns in pivot + metric order
    pub organized: VariantTable,

    /// Per-sample metrics used as sort keys
    pub metrics: MetricsTable,

    /// Samples dropped because every cell was missing
    pub dropped_columns: Vec<String>,

    /// Sample moved to the front, if any sample survived
    pub pivot: Option<String>,
}

/// Reordering orchestrator
///
/// Stateless across runs: every call to [`TableReorderer::run`] builds fresh
/// tables and metrics from its inputs.
#[derive(Debug, Clone)]
pub struct TableReorderer {
    config: ReorderConfig,
}

impl TableReorderer {
    /// Create new reorderer
    pub fn new(config: ReorderConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &ReorderConfig {
        &self.config
    }

    /// Run merge, metric computation and column reordering
    pub fn run(
        &self,
        raw: &VariantTable,
        order: &PositionOrder,
    ) -> Result<ReorderOutput, ReorderError> {
        let MergeOutcome {
            table: sorted,
            dropped,
            shared_rows,
            appended_rows,
        } = table::merge_onto_order(raw, order, self.config.allow_disjoint)?;

        info!(
            rows = sorted.row_count(),
            shared_rows,
            appended_rows,
            samples = sorted.sample_count(),
            dropped = dropped.len(),
            "merged table onto position order"
        );

        let metrics = table::compute_metrics(&sorted)?;
        for (sample, column_metrics) in metrics.iter() {
            debug!(
                sample,
                match_total = column_metrics.match_total,
                leading_run = column_metrics.leading_run,
                "column metrics"
            );
        }

        let plan = table::plan_columns(&sorted, &metrics);
        let pivot = plan.pivot.clone();
        let organized = table::apply_plan(&sorted, &plan)?;

        info!(pivot = pivot.as_deref().unwrap_or("-"), "reordered sample columns");

        Ok(ReorderOutput {
            sorted,
            organized,
            metrics,
            dropped_columns: dropped,
            pivot,
        })
    }
}
