use std::collections::HashSet;
use std::fmt;

use crate::{InputLocation, ReorderError};

/// Genomic coordinate used as the row key.
pub type Position = u64;

/// Single nucleotide call (IUPAC code or any other printable ASCII symbol).
///
/// Stored verbatim: `a` and `A` are different calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Call(u8);

impl Call {
    /// Wrap a printable, non-space ASCII byte.
    pub fn new(byte: u8) -> Option<Self> {
        byte.is_ascii_graphic().then_some(Self(byte))
    }

    /// Parse a one-character cell.
    pub fn parse(text: &str) -> Option<Self> {
        match text.as_bytes() {
            [byte] => Self::new(*byte),
            _ => None,
        }
    }

    /// Raw byte value.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Call as a character.
    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Table cell: a call, or `None` for the missing sentinel.
pub type Cell = Option<Call>;

/// Exact call equality. Missing never matches, not even another missing cell.
pub fn calls_match(reference: Cell, sample: Cell) -> bool {
    matches!((reference, sample), (Some(r), Some(s)) if r == s)
}

/// One data column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleColumn {
    /// Sample identifier (column header).
    pub id: String,
    /// One cell per table row.
    pub cells: Vec<Cell>,
}

impl SampleColumn {
    /// Construct a column.
    pub fn new(id: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    /// Whether every cell is the missing sentinel.
    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Number of non-missing cells.
    pub fn called(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

/// Positions (rows) by samples (columns) grid of calls.
///
/// Every column holds exactly one cell per position; positions and column
/// ids are unique. When a reference column is designated it is the first
/// data column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTable {
    key: String,
    positions: Vec<Position>,
    columns: Vec<SampleColumn>,
    has_reference: bool,
}

impl VariantTable {
    /// Build a table without a reference column (a raw input table).
    pub fn new(
        key: impl Into<String>,
        positions: Vec<Position>,
        columns: Vec<SampleColumn>,
    ) -> Result<Self, ReorderError> {
        let table = Self {
            key: key.into(),
            positions,
            columns,
            has_reference: false,
        };
        table.validate()?;
        Ok(table)
    }

    /// Build a table whose first data column is the reference.
    pub fn with_reference(
        key: impl Into<String>,
        positions: Vec<Position>,
        reference: SampleColumn,
        samples: Vec<SampleColumn>,
    ) -> Result<Self, ReorderError> {
        let mut columns = Vec::with_capacity(samples.len() + 1);
        columns.push(reference);
        columns.extend(samples);
        let table = Self {
            key: key.into(),
            positions,
            columns,
            has_reference: true,
        };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), ReorderError> {
        let mut seen_positions = HashSet::with_capacity(self.positions.len());
        for position in &self.positions {
            if !seen_positions.insert(*position) {
                return Err(ReorderError::malformed(
                    InputLocation::default().with_column(self.key.as_str()),
                    format!("duplicate position {position}"),
                ));
            }
        }

        let mut seen_ids = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if column.id == self.key || !seen_ids.insert(column.id.as_str()) {
                return Err(ReorderError::malformed(
                    InputLocation::default().with_column(column.id.as_str()),
                    "duplicate column header",
                ));
            }
            if column.cells.len() != self.positions.len() {
                return Err(ReorderError::malformed(
                    InputLocation::default().with_column(column.id.as_str()),
                    format!(
                        "column has {} cells but the table has {} rows",
                        column.cells.len(),
                        self.positions.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Header name of the key column.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Row keys in row order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.positions.len()
    }

    /// All data columns in order, reference first when present.
    pub fn columns(&self) -> &[SampleColumn] {
        &self.columns
    }

    /// Reference column, if designated.
    pub fn reference(&self) -> Option<&SampleColumn> {
        if self.has_reference {
            self.columns.first()
        } else {
            None
        }
    }

    /// Sample columns, excluding the reference.
    pub fn samples(&self) -> &[SampleColumn] {
        let skip = usize::from(self.has_reference);
        &self.columns[skip..]
    }

    /// Number of sample columns, excluding the reference.
    pub fn sample_count(&self) -> usize {
        self.samples().len()
    }

    /// Column by id.
    pub fn column(&self, id: &str) -> Option<&SampleColumn> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Data column ids in order.
    pub fn column_ids(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.id.as_str()).collect()
    }

    /// Cell at (`position`, `id`); `None` when either key is unknown.
    pub fn cell(&self, position: Position, id: &str) -> Option<Cell> {
        let row = self.positions.iter().position(|p| *p == position)?;
        self.column(id).map(|column| column.cells[row])
    }
}

/// Canonical row order with the reference call for each position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionOrder {
    key: String,
    reference_id: String,
    entries: Vec<(Position, Cell)>,
}

impl PositionOrder {
    /// Build an order. Fails when empty or when a position repeats.
    pub fn new(
        key: impl Into<String>,
        reference_id: impl Into<String>,
        entries: Vec<(Position, Cell)>,
    ) -> Result<Self, ReorderError> {
        let key = key.into();
        if entries.is_empty() {
            return Err(ReorderError::malformed(
                InputLocation::default(),
                "position order is empty; no reference row to compare against",
            ));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for (position, _) in &entries {
            if !seen.insert(*position) {
                return Err(ReorderError::malformed(
                    InputLocation::default().with_column(key.as_str()),
                    format!("duplicate position {position} in position order"),
                ));
            }
        }

        Ok(Self {
            key,
            reference_id: reference_id.into(),
            entries,
        })
    }

    /// Header name of the key column.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Header name of the reference column.
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    /// `(position, reference call)` pairs in canonical order.
    pub fn entries(&self) -> &[(Position, Cell)] {
        &self.entries
    }

    /// Positions in canonical order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.entries.iter().map(|(position, _)| *position)
    }

    /// Number of ordered positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed order.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: &str, calls: &str) -> SampleColumn {
        let cells = calls
            .bytes()
            .map(|b| if b == b'.' { None } else { Call::new(b) })
            .collect();
        SampleColumn::new(id, cells)
    }

    #[test]
    fn call_parse_accepts_single_printable() {
        assert_eq!(Call::parse("A").map(Call::as_char), Some('A'));
        assert_eq!(Call::parse("n").map(Call::as_char), Some('n'));
        assert_eq!(Call::parse("-").map(Call::as_char), Some('-'));
        assert!(Call::parse("AC").is_none());
        assert!(Call::parse(" ").is_none());
        assert!(Call::parse("").is_none());
    }

    #[test]
    fn missing_never_matches() {
        let a = Call::new(b'A');
        assert!(calls_match(a, a));
        assert!(!calls_match(None, None));
        assert!(!calls_match(a, None));
        assert!(!calls_match(None, a));
        assert!(!calls_match(a, Call::new(b'a')));
        assert!(!calls_match(Call::new(b'N'), a));
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = VariantTable::new("position", vec![1, 2], vec![column("S1", "A")]).unwrap_err();
        assert!(matches!(err, ReorderError::MalformedInput { .. }));
    }

    #[test]
    fn table_rejects_duplicate_positions_and_ids() {
        assert!(VariantTable::new("position", vec![1, 1], vec![column("S1", "AC")]).is_err());
        assert!(VariantTable::new(
            "position",
            vec![1, 2],
            vec![column("S1", "AC"), column("S1", "AC")]
        )
        .is_err());
        assert!(VariantTable::new("position", vec![1], vec![column("position", "A")]).is_err());
    }

    #[test]
    fn reference_is_first_column() {
        let table = VariantTable::with_reference(
            "position",
            vec![1, 2],
            column("reference_call", "AC"),
            vec![column("S1", "A."), column("S2", "..")],
        )
        .unwrap();
        assert_eq!(table.reference().map(|c| c.id.as_str()), Some("reference_call"));
        assert_eq!(table.sample_count(), 2);
        assert!(table.column("S2").unwrap().is_all_missing());
        assert_eq!(table.column("S1").unwrap().called(), 1);
        assert_eq!(table.cell(2, "reference_call"), Some(Call::new(b'C')));
        assert_eq!(table.cell(3, "S1"), None);
    }

    #[test]
    fn position_order_requires_rows() {
        assert!(PositionOrder::new("position", "reference_call", Vec::new()).is_err());
        assert!(PositionOrder::new(
            "position",
            "reference_call",
            vec![(5, Call::new(b'A')), (5, Call::new(b'C'))]
        )
        .is_err());
    }
}
