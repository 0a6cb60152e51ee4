//! Typed SNP tables and the three reordering stages.
//!
//! Stages are kept in separate modules so each can be tested in isolation:
//! merge/clean, metric computation, and sort/reposition.

mod merge;
mod metrics;
mod reorder;
mod types;

pub use merge::{merge_onto_order, MergeOutcome};
pub use metrics::{compute_metrics, ColumnMetrics, MetricsTable};
pub use reorder::{apply_plan, plan_columns, ColumnPlan};
pub use types::{calls_match, Call, Cell, Position, PositionOrder, SampleColumn, VariantTable};
