//! Delimited text input and output.
//!
//! Inputs may be tab- or comma-delimited (detected from the header line);
//! outputs are always tab-delimited with the key column first. Missing cells
//! are written as empty fields.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use tempfile::{Builder as TempBuilder, NamedTempFile, TempPath};
use tracing::{debug, warn};

use crate::table::{Call, Cell, Position, PositionOrder, SampleColumn, VariantTable};
use crate::{InputLocation, ReorderConfig, ReorderError};

/// Header plus string records, as read from or written to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedTable {
    /// Where the table was read from, for error messages.
    pub source: Option<String>,
    /// Column headers.
    pub header: Vec<String>,
    /// Data records; each has `header.len()` fields.
    pub records: Vec<Vec<String>>,
    /// 1-based input line of each record.
    pub lines: Vec<u64>,
}

impl DelimitedTable {
    /// Build an in-memory table; records are numbered as if read after a header line.
    pub fn new(header: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let lines = (0..records.len() as u64).map(|idx| idx + 2).collect();
        Self {
            source: None,
            header,
            records,
            lines,
        }
    }

    /// Index of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    /// Location of the start of this table.
    pub fn location(&self) -> InputLocation {
        InputLocation::default().or_source(self.source.as_deref())
    }

    fn record_location(&self, record: usize, column: &str) -> InputLocation {
        let location = self.location().with_column(column);
        match self.lines.get(record) {
            Some(line) => location.with_line(*line),
            None => location,
        }
    }
}

/// Tab when the header line holds a tab, comma otherwise.
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Drop blank lines, keeping the 1-based input line of every kept line.
///
/// The csv reader skips blank lines itself but then reports the line where
/// the skipped run began, so records are numbered against this map instead.
fn without_blank_lines(text: &str) -> (String, Vec<u64>) {
    let mut kept = String::with_capacity(text.len());
    let mut lines = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        kept.push_str(line);
        kept.push('\n');
        lines.push(idx as u64 + 1);
    }
    (kept, lines)
}

/// Parse delimited text. Blank lines are skipped and fields are trimmed.
pub fn parse_delimited(
    text: &str,
    delimiter: Option<u8>,
    source: Option<&str>,
) -> Result<DelimitedTable, ReorderError> {
    let (text, input_lines) = without_blank_lines(text);
    let input_line = |line: u64| {
        line.checked_sub(1)
            .and_then(|idx| input_lines.get(idx as usize))
            .copied()
            .unwrap_or(line)
    };

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&text));
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if header.iter().all(String::is_empty) {
        return Err(ReorderError::malformed(
            InputLocation::default().or_source(source).with_line(1),
            "missing header row",
        ));
    }

    let mut records = Vec::new();
    let mut lines = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| input_line(p.line()))
            .unwrap_or_default();
        if record.len() != header.len() {
            return Err(ReorderError::malformed(
                InputLocation::default().or_source(source).with_line(line),
                format!(
                    "record has {} fields but the header has {}",
                    record.len(),
                    header.len()
                ),
            ));
        }
        records.push(record.iter().map(str::to_string).collect());
        lines.push(line);
    }

    debug!(
        source = source.unwrap_or("-"),
        columns = header.len(),
        records = records.len(),
        "parsed delimited table"
    );

    Ok(DelimitedTable {
        source: source.map(str::to_string),
        header,
        records,
        lines,
    })
}

/// Read and parse a delimited file.
pub fn read_delimited(path: &Path, delimiter: Option<u8>) -> Result<DelimitedTable, ReorderError> {
    let text = fs::read_to_string(path).map_err(|e| ReorderError::io(path, e))?;
    let source = path.display().to_string();
    parse_delimited(&text, delimiter, Some(&source))
}

/// Parse a position key.
pub fn parse_position(text: &str) -> Result<Position, String> {
    text.parse::<Position>()
        .map_err(|_| format!("position '{text}' is not a non-negative integer"))
}

/// Parse a call cell; missing tokens become `None`.
pub fn parse_cell(text: &str, config: &ReorderConfig) -> Result<Cell, String> {
    if config.is_missing(text) {
        return Ok(None);
    }
    Call::parse(text)
        .map(Some)
        .ok_or_else(|| format!("'{text}' is not a single-character call"))
}

fn key_index(table: &DelimitedTable, key: &str) -> Result<usize, ReorderError> {
    table.column_index(key).ok_or_else(|| {
        ReorderError::malformed(
            table.location().with_line(1),
            format!("header has no '{key}' key column"),
        )
    })
}

fn positions_of(table: &DelimitedTable, key_idx: usize) -> Result<Vec<Position>, ReorderError> {
    let key = &table.header[key_idx];
    let mut seen: HashMap<Position, usize> = HashMap::with_capacity(table.records.len());
    let mut positions = Vec::with_capacity(table.records.len());
    for (row, record) in table.records.iter().enumerate() {
        let position = parse_position(&record[key_idx])
            .map_err(|message| ReorderError::malformed(table.record_location(row, key), message))?;
        if let Some(first) = seen.insert(position, row) {
            let first_line = table.lines.get(first).copied().unwrap_or_default();
            return Err(ReorderError::malformed(
                table.record_location(row, key),
                format!("position {position} already appears on line {first_line}"),
            ));
        }
        positions.push(position);
    }
    Ok(positions)
}

/// Interpret a raw SNP table: the key column plus one column per sample.
pub fn variant_table(
    table: &DelimitedTable,
    config: &ReorderConfig,
) -> Result<VariantTable, ReorderError> {
    let key_idx = key_index(table, &config.key_column)?;
    let positions = positions_of(table, key_idx)?;

    let mut columns = Vec::with_capacity(table.header.len().saturating_sub(1));
    for (col_idx, id) in table.header.iter().enumerate() {
        if col_idx == key_idx {
            continue;
        }
        let cells = table
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                parse_cell(&record[col_idx], config).map_err(|message| {
                    ReorderError::malformed(table.record_location(row, id), message)
                })
            })
            .collect::<Result<Vec<Cell>, ReorderError>>()?;
        columns.push(SampleColumn::new(id.as_str(), cells));
    }

    VariantTable::new(config.key_column.as_str(), positions, columns)
        .map_err(|e| e.in_source(table.source.as_deref()))
}

/// Interpret a position-order table: key column, then the reference column.
///
/// The reference column's header names the reference. Further columns are
/// ignored.
pub fn position_order(
    table: &DelimitedTable,
    config: &ReorderConfig,
) -> Result<PositionOrder, ReorderError> {
    if table.header.first().map(String::as_str) != Some(config.key_column.as_str()) {
        return Err(ReorderError::malformed(
            table.location().with_line(1),
            format!("first column must be '{}'", config.key_column),
        ));
    }
    let Some(reference_id) = table.header.get(1) else {
        return Err(ReorderError::malformed(
            table.location().with_line(1),
            "second column must hold the reference calls",
        ));
    };
    if table.header.len() > 2 {
        warn!(
            source = table.source.as_deref().unwrap_or("-"),
            ignored = ?&table.header[2..],
            "ignoring extra position order columns"
        );
    }

    let positions = positions_of(table, 0)?;
    let entries = positions
        .into_iter()
        .zip(&table.records)
        .enumerate()
        .map(|(row, (position, record))| {
            parse_cell(&record[1], config)
                .map(|call| (position, call))
                .map_err(|message| {
                    ReorderError::malformed(table.record_location(row, reference_id), message)
                })
        })
        .collect::<Result<Vec<_>, ReorderError>>()?;

    PositionOrder::new(config.key_column.as_str(), reference_id.as_str(), entries)
        .map_err(|e| e.in_source(table.source.as_deref()))
}

/// Flatten a typed table back into text, key column first.
pub fn table_to_delimited(table: &VariantTable) -> DelimitedTable {
    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(table.key().to_string());
    header.extend(table.columns().iter().map(|column| column.id.clone()));

    let records = table
        .positions()
        .iter()
        .enumerate()
        .map(|(row, position)| {
            let mut record = Vec::with_capacity(header.len());
            record.push(position.to_string());
            record.extend(table.columns().iter().map(|column| match column.cells[row] {
                Some(call) => call.to_string(),
                None => String::new(),
            }));
            record
        })
        .collect();

    DelimitedTable::new(header, records)
}

/// Write a table as tab-delimited text.
pub fn write_delimited<W: Write>(writer: W, table: &DelimitedTable) -> Result<(), ReorderError> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    writer.write_record(&table.header)?;
    for record in &table.records {
        writer.write_record(record)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render a table to a string (useful for tests and snapshots).
pub fn render_delimited(table: &DelimitedTable) -> Result<String, ReorderError> {
    let mut buffer = Vec::new();
    write_delimited(&mut buffer, table)?;
    String::from_utf8(buffer).map_err(|_| {
        ReorderError::malformed(table.location(), "rendered table is not valid UTF-8")
    })
}

/// Write every output to a temporary file first, then move them into place.
///
/// Nothing is persisted unless every table was written successfully. When
/// moving a later table into place fails, the tables already moved are
/// removed again and any files they replaced are restored.
pub fn write_all_atomic(outputs: &[(&Path, &DelimitedTable)]) -> Result<(), ReorderError> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, table) in outputs {
        let dir = output_dir(path);
        let mut file = NamedTempFile::new_in(dir).map_err(|e| ReorderError::io(dir, e))?;
        write_delimited(&mut file, table)?;
        staged.push((*path, file));
    }

    let mut persisted: Vec<(&Path, Option<TempPath>)> = Vec::with_capacity(staged.len());
    for (path, file) in staged {
        let backup = match set_aside(path) {
            Ok(backup) => backup,
            Err(e) => {
                roll_back(persisted);
                return Err(e);
            }
        };
        if let Err(e) = file.persist(path) {
            if let Some(backup) = backup {
                restore(path, backup);
            }
            roll_back(persisted);
            return Err(ReorderError::io(path, e.error));
        }
        debug!(path = %path.display(), "wrote table");
        persisted.push((path, backup));
    }
    Ok(())
}

fn output_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Move an existing file at `path` to a temporary name next to it.
fn set_aside(path: &Path) -> Result<Option<TempPath>, ReorderError> {
    if !path.is_file() {
        return Ok(None);
    }
    let dir = output_dir(path);
    let backup = TempBuilder::new()
        .prefix(".snpsort-backup")
        .tempfile_in(dir)
        .map_err(|e| ReorderError::io(dir, e))?
        .into_temp_path();
    fs::rename(path, &backup).map_err(|e| ReorderError::io(path, e))?;
    Ok(Some(backup))
}

fn restore(path: &Path, backup: TempPath) {
    if let Err(error) = fs::rename(&backup, path) {
        let kept = backup
            .keep()
            .map(|kept| kept.display().to_string())
            .unwrap_or_default();
        warn!(path = %path.display(), backup = %kept, %error, "could not restore previous file");
    }
}

fn roll_back(persisted: Vec<(&Path, Option<TempPath>)>) {
    for (path, backup) in persisted.into_iter().rev() {
        match backup {
            Some(backup) => restore(path, backup),
            None => {
                if let Err(error) = fs::remove_file(path) {
                    warn!(path = %path.display(), %error, "could not remove partial output");
                }
            }
        }
    }
}
