use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snpsort::annotate::{parse_position_list, records_to_delimited, FeatureIndex};
use snpsort::io::{
    position_order, read_delimited, table_to_delimited, variant_table, write_all_atomic,
};
use snpsort::quality::{merge_quality, QualityTable};
use snpsort::{ReorderConfig, TableReorderer, DEFAULT_KEY_COLUMN};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "snpsort", about = "Organize SNP tables by concordance with the reference")]
struct Cli {
    /// Log per-column metrics and other details.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge a SNP table onto a position order and reorder its sample columns.
    Organize {
        /// Raw SNP table (key column plus one column per sample).
        table: PathBuf,
        /// Position order (key column, then reference calls).
        order: PathBuf,
        /// Output for the merged, row-ordered table.
        #[arg(long)]
        sorted: PathBuf,
        /// Output for the column-reordered table.
        #[arg(long)]
        organized: PathBuf,
        /// Header of the position key column.
        #[arg(long, default_value = DEFAULT_KEY_COLUMN)]
        key_column: String,
        /// SNP table delimiter (detected from the header line by default).
        #[arg(long)]
        delimiter: Option<char>,
        /// Position order delimiter (detected from the header line by default).
        #[arg(long)]
        order_delimiter: Option<char>,
        /// Extra cell value read as missing; repeat for several.
        #[arg(long = "missing")]
        missing: Vec<String>,
        /// Continue when the table and the order share no position.
        #[arg(long)]
        allow_disjoint: bool,
    },
    /// Report the coding features covering each position.
    Annotate {
        /// Tab-delimited feature table (chromosome, start, end, locus_tag, gene, product).
        features: PathBuf,
        /// Position list (`<chromosome>-<position>` or bare position per line).
        positions: PathBuf,
        /// Output annotation table.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Append per-position quality scores to a finished table.
    Quality {
        /// Finished table.
        table: PathBuf,
        /// Quality table keyed by position.
        quality: PathBuf,
        /// Output table.
        #[arg(short, long)]
        output: PathBuf,
        /// Header of the position key column.
        #[arg(long, default_value = DEFAULT_KEY_COLUMN)]
        key_column: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Organize {
            table,
            order,
            sorted,
            organized,
            key_column,
            delimiter,
            order_delimiter,
            missing,
            allow_disjoint,
        } => {
            let mut config = ReorderConfig::default()
                .with_key_column(key_column)
                .with_allow_disjoint(allow_disjoint);
            if let Some(delimiter) = delimiter {
                config = config.with_delimiter(delimiter_byte(delimiter)?);
            }
            config.missing_tokens.extend(missing);
            let order_delimiter = order_delimiter.map(delimiter_byte).transpose()?;
            let paths = OrganizePaths {
                table,
                order,
                sorted,
                organized,
            };
            run_organize(&config, order_delimiter, &paths)?
        }
        Commands::Annotate {
            features,
            positions,
            output,
        } => run_annotate(&features, &positions, &output)?,
        Commands::Quality {
            table,
            quality,
            output,
            key_column,
        } => run_quality(&table, &quality, &output, &key_column)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter '{delimiter}' is not a single ASCII character"))
}

struct OrganizePaths {
    table: PathBuf,
    order: PathBuf,
    sorted: PathBuf,
    organized: PathBuf,
}

/// The SNP table is read with `config.delimiter`; the position order with
/// `order_delimiter`, each falling back to detection.
fn run_organize(
    config: &ReorderConfig,
    order_delimiter: Option<u8>,
    paths: &OrganizePaths,
) -> Result<()> {
    let OrganizePaths {
        table: table_path,
        order: order_path,
        sorted: sorted_path,
        organized: organized_path,
    } = paths;
    let raw = read_delimited(table_path, config.delimiter)
        .and_then(|parsed| variant_table(&parsed, config))
        .with_context(|| format!("failed to read SNP table {}", table_path.display()))?;
    let order = read_delimited(order_path, order_delimiter)
        .and_then(|parsed| position_order(&parsed, config))
        .with_context(|| format!("failed to read position order {}", order_path.display()))?;

    let reorderer = TableReorderer::new(config.clone());
    let output = reorderer.run(&raw, &order).with_context(|| {
        format!(
            "failed to organize {} against {}",
            table_path.display(),
            order_path.display()
        )
    })?;

    let sorted = table_to_delimited(&output.sorted);
    let organized = table_to_delimited(&output.organized);
    write_all_atomic(&[
        (sorted_path.as_path(), &sorted),
        (organized_path.as_path(), &organized),
    ])
    .context("failed to write organized tables")?;

    info!(
        sorted = %sorted_path.display(),
        organized = %organized_path.display(),
        "organized SNP table"
    );
    Ok(())
}

fn run_annotate(features_path: &Path, positions_path: &Path, output_path: &Path) -> Result<()> {
    let index = read_delimited(features_path, Some(b'\t'))
        .and_then(|parsed| FeatureIndex::from_delimited(&parsed))
        .with_context(|| format!("failed to read feature table {}", features_path.display()))?;

    let text = fs::read_to_string(positions_path)
        .with_context(|| format!("failed to read position list {}", positions_path.display()))?;
    let source = positions_path.display().to_string();
    let positions = parse_position_list(&text, Some(&source))
        .with_context(|| format!("failed to parse position list {}", positions_path.display()))?;

    let records = index.annotate(&positions);
    write_all_atomic(&[(output_path, &records_to_delimited(&records))])
        .with_context(|| format!("failed to write annotation table {}", output_path.display()))?;
    Ok(())
}

fn run_quality(
    table_path: &Path,
    quality_path: &Path,
    output_path: &Path,
    key_column: &str,
) -> Result<()> {
    let table = read_delimited(table_path, None)
        .with_context(|| format!("failed to read table {}", table_path.display()))?;
    let quality = read_delimited(quality_path, None)
        .and_then(|parsed| QualityTable::from_delimited(&parsed, key_column))
        .with_context(|| format!("failed to read quality table {}", quality_path.display()))?;

    let merged = merge_quality(&table, key_column, &quality)
        .with_context(|| format!("failed to merge quality scores into {}", table_path.display()))?;
    write_all_atomic(&[(output_path, &merged)])
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(())
}
