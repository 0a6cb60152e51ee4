//! Position to coding-feature lookup.
//!
//! Maps SNP positions onto coding features (CDS records) taken from a
//! tab-delimited feature table with the columns `chromosome`, `start`, `end`,
//! `locus_tag`, `gene` and `product`. Positions outside every feature are
//! left out of the result.

use std::collections::BTreeSet;

use tracing::info;

use crate::io::{parse_position, DelimitedTable};
use crate::table::Position;
use crate::{InputLocation, ReorderError};

/// Columns a feature table must provide.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "chromosome",
    "start",
    "end",
    "locus_tag",
    "gene",
    "product",
];

/// Header of the annotation output.
pub const ANNOTATION_COLUMNS: [&str; 5] =
    ["chromosome", "position", "locus_tag", "gene", "product"];

/// Coding feature with an inclusive coordinate range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Chromosome accession, possibly with a version suffix.
    pub chromosome: String,
    /// First covered position.
    pub start: Position,
    /// Last covered position.
    pub end: Position,
    /// Locus tag.
    pub locus_tag: String,
    /// Gene name, when annotated.
    pub gene: Option<String>,
    /// Product description.
    pub product: String,
}

impl Feature {
    /// Whether `position` lies within the feature.
    pub fn contains(&self, position: Position) -> bool {
        (self.start..=self.end).contains(&position)
    }
}

/// One annotated position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    /// Chromosome accession without version suffix.
    pub chromosome: String,
    /// Annotated position.
    pub position: Position,
    /// Locus tag of the covering feature.
    pub locus_tag: String,
    /// Gene name, `-` when absent.
    pub gene: String,
    /// Product of the covering feature.
    pub product: String,
}

/// Coding features in file order.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    features: Vec<Feature>,
}

impl FeatureIndex {
    /// Build an index from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Load features from a parsed feature table.
    pub fn from_delimited(table: &DelimitedTable) -> Result<Self, ReorderError> {
        let mut indices = [0usize; 6];
        for (slot, name) in indices.iter_mut().zip(FEATURE_COLUMNS) {
            *slot = table.column_index(name).ok_or_else(|| {
                ReorderError::malformed(
                    table.location().with_line(1),
                    format!("feature table has no '{name}' column"),
                )
            })?;
        }
        let [chromosome, start, end, locus_tag, gene, product] = indices;

        let mut features = Vec::with_capacity(table.records.len());
        for (row, record) in table.records.iter().enumerate() {
            let line = table.lines.get(row).copied().unwrap_or_default();
            let coordinate = |idx: usize, name: &str| {
                parse_position(&record[idx]).map_err(|message| {
                    ReorderError::malformed(
                        table.location().with_line(line).with_column(name),
                        message,
                    )
                })
            };
            let feature = Feature {
                chromosome: record[chromosome].clone(),
                start: coordinate(start, "start")?,
                end: coordinate(end, "end")?,
                locus_tag: record[locus_tag].clone(),
                gene: match record[gene].as_str() {
                    "" | "-" => None,
                    name => Some(name.to_string()),
                },
                product: record[product].clone(),
            };
            if feature.start > feature.end {
                return Err(ReorderError::malformed(
                    table.location().with_line(line),
                    format!("feature start {} is after end {}", feature.start, feature.end),
                ));
            }
            features.push(feature);
        }

        Ok(Self::new(features))
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the index holds no feature.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Annotate `positions` feature by feature.
    ///
    /// Records come out in feature order and ascending position within a
    /// feature. A position covered by several features appears once per
    /// feature.
    pub fn annotate(&self, positions: &BTreeSet<Position>) -> Vec<AnnotationRecord> {
        let records: Vec<AnnotationRecord> = self
            .features
            .iter()
            .flat_map(|feature| {
                positions
                    .range(feature.start..=feature.end)
                    .map(move |position| AnnotationRecord {
                        chromosome: strip_version(&feature.chromosome).to_string(),
                        position: *position,
                        locus_tag: feature.locus_tag.clone(),
                        gene: feature.gene.clone().unwrap_or_else(|| "-".to_string()),
                        product: feature.product.clone(),
                    })
            })
            .collect();

        info!(
            positions = positions.len(),
            features = self.features.len(),
            annotated = records.len(),
            "annotated positions"
        );
        records
    }
}

/// `NC_002945.4` -> `NC_002945`.
pub fn strip_version(chromosome: &str) -> &str {
    chromosome.split('.').next().unwrap_or(chromosome)
}

/// Parse a position list: one position per line, either a bare integer or
/// `<chromosome>-<position>[-...]`. Duplicates collapse; blank lines are skipped.
pub fn parse_position_list(
    text: &str,
    source: Option<&str>,
) -> Result<BTreeSet<Position>, ReorderError> {
    let mut positions = BTreeSet::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let field = match line.split('-').nth(1) {
            Some(field) => field,
            None => line,
        };
        let position = parse_position(field.trim()).map_err(|message| {
            ReorderError::malformed(
                InputLocation::default()
                    .or_source(source)
                    .with_line(idx as u64 + 1),
                message,
            )
        })?;
        positions.insert(position);
    }
    Ok(positions)
}

/// Tabulate annotation records under [`ANNOTATION_COLUMNS`].
pub fn records_to_delimited(records: &[AnnotationRecord]) -> DelimitedTable {
    DelimitedTable::new(
        ANNOTATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        records
            .iter()
            .map(|record| {
                vec![
                    record.chromosome.clone(),
                    record.position.to_string(),
                    record.locus_tag.clone(),
                    record.gene.clone(),
                    record.product.clone(),
                ]
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_delimited;

    fn index() -> FeatureIndex {
        FeatureIndex::new(vec![
            Feature {
                chromosome: "NC_002945.4".to_string(),
                start: 100,
                end: 200,
                locus_tag: "Mb0001".to_string(),
                gene: Some("dnaA".to_string()),
                product: "chromosomal replication initiator".to_string(),
            },
            Feature {
                chromosome: "NC_002945.4".to_string(),
                start: 150,
                end: 300,
                locus_tag: "Mb0002".to_string(),
                gene: None,
                product: "hypothetical protein".to_string(),
            },
        ])
    }

    #[test]
    fn annotates_covered_positions_per_feature() {
        let positions: BTreeSet<Position> = [50, 100, 160, 300, 301].into_iter().collect();
        let records = index().annotate(&positions);
        let summary: Vec<(&str, Position, &str)> = records
            .iter()
            .map(|r| (r.locus_tag.as_str(), r.position, r.gene.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Mb0001", 100, "dnaA"),
                ("Mb0001", 160, "dnaA"),
                ("Mb0002", 160, "-"),
                ("Mb0002", 300, "-"),
            ]
        );
        assert!(records.iter().all(|r| r.chromosome == "NC_002945"));

        let features = index().features;
        let first = &features[0];
        assert!(first.contains(100) && first.contains(200));
        assert!(!first.contains(201));
    }

    #[test]
    fn parses_position_lists() {
        let positions =
            parse_position_list("NC_002945.4-160\nNC_002945.4-100\n\n42\nNC_002945.4-160\n", None)
                .unwrap();
        assert_eq!(positions.into_iter().collect::<Vec<_>>(), vec![42, 100, 160]);

        let err = parse_position_list("chr-x\n", Some("pos.txt")).unwrap_err();
        assert!(err.to_string().contains("pos.txt, line 1"));
    }

    #[test]
    fn loads_feature_table() {
        let parsed = parse_delimited(
            "chromosome\tstart\tend\tlocus_tag\tgene\tproduct\nNC_1.1\t10\t20\tL1\t-\tp\n",
            None,
            Some("features.tsv"),
        )
        .unwrap();
        let index = FeatureIndex::from_delimited(&parsed).unwrap();
        assert_eq!(index.len(), 1);
        let records = index.annotate(&[15].into_iter().collect());
        assert_eq!(records[0].gene, "-");
        assert_eq!(records[0].chromosome, "NC_1");
    }

    #[test]
    fn rejects_inverted_or_unparsable_features() {
        let inverted = parse_delimited(
            "chromosome\tstart\tend\tlocus_tag\tgene\tproduct\nNC_1\t30\t20\tL1\tg\tp\n",
            None,
            None,
        )
        .unwrap();
        assert!(FeatureIndex::from_delimited(&inverted).is_err());

        let missing = parse_delimited("chromosome\tstart\nNC_1\t1\n", None, None).unwrap();
        let err = FeatureIndex::from_delimited(&missing).unwrap_err();
        assert!(err.to_string().contains("'end'"));
    }

    #[test]
    fn tabulates_records() {
        let records = index().annotate(&[100].into_iter().collect());
        let table = records_to_delimited(&records);
        assert_eq!(table.header, ANNOTATION_COLUMNS.to_vec());
        assert_eq!(table.records[0][1], "100");
    }
}
