use crate::models::ensemble::GenomePrediction;
use crate::report::{PredictionRecord, ReportSchema};
use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the report as a tab-separated table with a header row
pub fn write_report(
    path: &Path,
    schema: &ReportSchema,
    records: &[PredictionRecord],
    digits: usize,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", schema.headers().join("\t"))?;
    for record in records {
        writeln!(out, "{}", schema.row(record, digits).join("\t"))?;
    }
    out.flush()?;

    tracing::info!("Wrote {} genomes to {}", records.len(), path.display());
    Ok(())
}

/// The report as a terminal table
pub fn render_table(schema: &ReportSchema, records: &[PredictionRecord], digits: usize) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(schema.headers());

    for record in records {
        table.add_row(schema.row(record, digits));
    }

    table.to_string()
}

/// Dump the scaled feature vectors, one genome per row
pub fn write_feature_vectors(
    path: &Path,
    columns: &[String],
    predictions: &[GenomePrediction],
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);

    write!(out, "Name")?;
    for column in columns {
        write!(out, "\t{}", column)?;
    }
    writeln!(out)?;

    for prediction in predictions {
        write!(out, "{}", prediction.genome_id)?;
        for value in &prediction.scaled_features {
            write!(out, "\t{}", value)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
