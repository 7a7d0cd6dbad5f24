/// Query namespacing and parsing of tabular similarity-search hits
use crate::utils::io::open_maybe_gz;
use crate::BinqcError;
use std::io::BufRead;
use std::path::Path;

/// Prefix a protein id with its genome so hits can be attributed after the
/// search flattens many genomes into one query set.
pub fn namespaced_id(genome_id: &str, protein_id: &str, separator: &str) -> String {
    format!("{}{}{}", genome_id, separator, protein_id)
}

/// Inverse of `namespaced_id`, splitting at the first separator
pub fn split_namespaced_id<'a>(id: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    id.split_once(separator)
}

/// Top hit for one query protein
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationHit {
    pub genome_id: String,
    pub protein_id: String,
    pub reference_hit: String,
    pub ko_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct HitFormat<'a> {
    pub header_separator: &'a str,
    pub annotation_separator: &'a str,
}

/// Parse one tab-separated row: column 0 is the namespaced query id,
/// column 1 the `reference-hit<sep>KO` compound.
pub fn parse_hit_line(line: &str, format: HitFormat<'_>) -> Result<AnnotationHit, String> {
    let mut columns = line.split('\t');
    let query = columns.next().unwrap_or_default();
    let subject = columns
        .next()
        .ok_or_else(|| "missing subject column".to_string())?;

    let (genome_id, protein_id) = split_namespaced_id(query, format.header_separator)
        .ok_or_else(|| format!("query id '{}' carries no genome prefix", query))?;
    let (reference_hit, ko_id) = subject
        .split_once(format.annotation_separator)
        .ok_or_else(|| format!("subject '{}' carries no annotation", subject))?;

    if genome_id.is_empty() || ko_id.trim().is_empty() {
        return Err(format!("incomplete hit row '{}'", line));
    }

    Ok(AnnotationHit {
        genome_id: genome_id.to_string(),
        protein_id: protein_id.to_string(),
        reference_hit: reference_hit.to_string(),
        ko_id: ko_id.trim().to_string(),
    })
}

/// Hits from one result file plus the number of rows that could not be parsed
#[derive(Debug, Default)]
pub struct ParsedHits {
    pub hits: Vec<AnnotationHit>,
    pub malformed: usize,
}

/// Read a result file. Malformed rows are skipped with a warning.
pub fn read_hits(path: &Path, format: HitFormat<'_>) -> Result<ParsedHits, BinqcError> {
    let reader = open_maybe_gz(path)?;
    let mut parsed = ParsedHits::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_hit_line(line, format) {
            Ok(hit) => parsed.hits.push(hit),
            Err(reason) => {
                tracing::warn!(
                    "Skipping malformed hit in {} line {}: {}",
                    path.display(),
                    line_no + 1,
                    reason
                );
                parsed.malformed += 1;
            }
        }
    }

    Ok(parsed)
}
