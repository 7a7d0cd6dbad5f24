/// Batched similarity search and aggregation of its hits into per-genome
/// KO count vectors and derived completeness features.
///
/// Proteins from many genomes are concatenated into one query per chunk with
/// genome-namespaced ids, so the search runs once per chunk rather than once
/// per genome. Aggregation is a pure function of the result files and the
/// expected genome ids: every expected genome gets a row, even with no hits.
use crate::annotation::hits::{namespaced_id, read_hits, HitFormat};
use crate::annotation::kegg::{DerivedFeatures, KeggReference, KoUniverse};
use crate::bio::fasta::write_fasta;
use crate::core::inputs::{read_proteins, GenomeRecord};
use crate::tools::traits::SimilaritySearch;
use crate::BinqcError;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULT_FILE_PREFIX: &str = "DIAMOND_RESULTS";

/// Split items into chunks of `chunk_size`, but only when there are more
/// items than that; a run of exactly `chunk_size` genomes is one chunk.
pub fn plan_chunks<T>(items: &[T], chunk_size: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    let chunk_size = chunk_size.max(1);
    if items.len() > chunk_size {
        items.chunks(chunk_size).collect()
    } else {
        vec![items]
    }
}

/// Result file name for a chunk; a single-chunk run has no suffix
pub fn result_file_name(chunk_index: usize, chunk_count: usize) -> String {
    if chunk_count > 1 {
        format!("{}_{}.tsv", RESULT_FILE_PREFIX, chunk_index + 1)
    } else {
        format!("{}.tsv", RESULT_FILE_PREFIX)
    }
}

/// Result files already present in `dir`, sorted by name
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(RESULT_FILE_PREFIX) && n.ends_with(".tsv"));
        if is_result && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Write the namespaced proteins of `records` to `query_path`; returns how
/// many proteins were written.
pub fn build_query(records: &[GenomeRecord], query_path: &Path, separator: &str) -> Result<usize> {
    let mut query = Vec::new();
    for record in records {
        let proteins = read_proteins(&record.protein_path)
            .with_context(|| format!("Failed to read proteins for {}", record.id))?;
        query.extend(
            proteins
                .iter()
                .map(|p| p.renamed(namespaced_id(&record.id, &p.id, separator))),
        );
    }
    write_fasta(query_path, &query)?;
    Ok(query.len())
}

/// Per-genome KO counts in universe order
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationTable {
    rows: BTreeMap<String, Vec<u32>>,
    pub stats: AggregationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub hits: usize,
    pub malformed: usize,
    /// Hits whose KO is outside the reference universe
    pub outside_universe: usize,
    /// Hits attributed to a genome that was not part of the run
    pub unknown_genome: usize,
}

impl AnnotationTable {
    pub fn ko_counts(&self, genome_id: &str) -> Option<&[u32]> {
        self.rows.get(genome_id).map(Vec::as_slice)
    }

    /// Rows sorted by genome id
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.rows.iter().map(|(id, counts)| (id.as_str(), counts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tally top hits from `result_files` into one zero-initialised row per
/// expected genome. Malformed rows are skipped (and counted), never fatal.
pub fn aggregate(
    result_files: &[PathBuf],
    genome_ids: &[String],
    universe: &KoUniverse,
    format: HitFormat<'_>,
) -> Result<AnnotationTable, BinqcError> {
    let mut rows: BTreeMap<String, Vec<u32>> = genome_ids
        .iter()
        .map(|id| (id.clone(), vec![0; universe.len()]))
        .collect();
    let mut stats = AggregationStats::default();
    let mut unknown: HashMap<String, usize> = HashMap::new();

    for file in result_files {
        let parsed = read_hits(file, format)?;
        stats.malformed += parsed.malformed;

        for hit in parsed.hits {
            stats.hits += 1;
            let Some(position) = universe.position(&hit.ko_id) else {
                stats.outside_universe += 1;
                continue;
            };
            match rows.get_mut(&hit.genome_id) {
                Some(counts) => counts[position] += 1,
                None => {
                    stats.unknown_genome += 1;
                    *unknown.entry(hit.genome_id).or_default() += 1;
                }
            }
        }
    }

    for (genome, count) in &unknown {
        tracing::warn!(
            "Ignoring {} hits for genome '{}' which is not part of this run",
            count,
            genome
        );
    }
    tracing::debug!(
        "Aggregated {} hits ({} outside the KO universe, {} malformed)",
        stats.hits,
        stats.outside_universe,
        stats.malformed
    );

    Ok(AnnotationTable { rows, stats })
}

/// KO counts plus derived completeness features for one genome
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFeatures {
    pub genome_id: String,
    pub ko_counts: Vec<u32>,
    pub derived: DerivedFeatures,
}

pub struct AnnotationAggregator<'a> {
    reference: &'a KeggReference,
    searcher: &'a dyn SimilaritySearch,
    format: HitFormat<'a>,
    chunk_size: usize,
}

impl<'a> AnnotationAggregator<'a> {
    pub fn new(
        reference: &'a KeggReference,
        searcher: &'a dyn SimilaritySearch,
        format: HitFormat<'a>,
        chunk_size: usize,
    ) -> Self {
        Self {
            reference,
            searcher,
            format,
            chunk_size,
        }
    }

    /// Search every chunk and return the result files written to `out_dir`.
    ///
    /// Each chunk gets its own temporary directory for the query and the
    /// tool's scratch space; it is removed when the chunk finishes, whether
    /// the search succeeded or not.
    pub fn run_search(&self, records: &[GenomeRecord], out_dir: &Path) -> Result<Vec<PathBuf>> {
        let chunks = plan_chunks(records, self.chunk_size);
        if chunks.len() > 1 {
            tracing::info!(
                "Annotating {} genomes in {} chunks of up to {}",
                records.len(),
                chunks.len(),
                self.chunk_size
            );
        }

        for (index, chunk) in chunks.iter().enumerate() {
            let output = out_dir.join(result_file_name(index, chunks.len()));
            let scratch = tempfile::Builder::new()
                .prefix("binqc-search-")
                .tempdir()
                .context("Failed to create search scratch directory")?;
            let query = scratch.path().join("query.faa");
            let work_dir = scratch.path().join("tmp");
            fs::create_dir_all(&work_dir)?;

            let proteins = build_query(chunk, &query, self.format.header_separator)?;
            if proteins == 0 {
                tracing::warn!(
                    "Chunk {} has no proteins to annotate; writing an empty result file",
                    index + 1
                );
                fs::write(&output, "")?;
                continue;
            }

            tracing::info!(
                "Running {} on {} proteins from {} genomes",
                self.searcher.name(),
                proteins,
                chunk.len()
            );
            self.searcher
                .search(&query, &output, &work_dir)
                .with_context(|| format!("{} failed on chunk {}", self.searcher.name(), index + 1))?;

            if !output.is_file() {
                return Err(BinqcError::Search(format!(
                    "{} produced no output for chunk {} ({})",
                    self.searcher.name(),
                    index + 1,
                    output.display()
                ))
                .into());
            }
        }

        let files = list_result_files(out_dir)?;
        if files.is_empty() {
            return Err(BinqcError::Search(format!(
                "no search result files found in {}",
                out_dir.display()
            ))
            .into());
        }
        Ok(files)
    }

    /// Search, aggregate and derive features for `records`, sorted by id
    pub fn annotate(&self, records: &[GenomeRecord], out_dir: &Path) -> Result<Vec<AnnotationFeatures>> {
        let files = self.run_search(records, out_dir)?;
        let genome_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let table = aggregate(&files, &genome_ids, self.reference.universe(), self.format)?;
        Ok(self.derive_all(&table))
    }

    /// Derived features for every row of `table`
    pub fn derive_all(&self, table: &AnnotationTable) -> Vec<AnnotationFeatures> {
        let rows: Vec<(&str, &[u32])> = table.rows().collect();
        rows.par_iter()
            .map(|(genome_id, counts)| AnnotationFeatures {
                genome_id: genome_id.to_string(),
                ko_counts: counts.to_vec(),
                derived: self.reference.derive(counts),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FORMAT: HitFormat<'static> = HitFormat {
        header_separator: "Ω",
        annotation_separator: "~",
    };

    fn universe() -> KoUniverse {
        KoUniverse::new(vec!["K1".into(), "K2".into(), "K3".into()]).unwrap()
    }

    #[test]
    fn test_plan_chunks_boundary() {
        let items: Vec<u32> = (0..500).collect();
        assert_eq!(plan_chunks(&items, 500).len(), 1);

        let items: Vec<u32> = (0..501).collect();
        let chunks = plan_chunks(&items, 500);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 1);

        assert!(plan_chunks::<u32>(&[], 500).is_empty());
    }

    #[test]
    fn test_result_file_names() {
        assert_eq!(result_file_name(0, 1), "DIAMOND_RESULTS.tsv");
        assert_eq!(result_file_name(1, 3), "DIAMOND_RESULTS_2.tsv");
    }

    #[test]
    fn test_aggregate_fills_every_genome() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("DIAMOND_RESULTS.tsv");
        fs::write(
            &file,
            "aΩp1\tr~K1\naΩp2\tr~K1\naΩp3\tr~K9\nbΩp1\tr~K3\nzΩp1\tr~K2\nbroken\n",
        )
        .unwrap();

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let table = aggregate(&[file], &ids, &universe(), FORMAT).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.ko_counts("a").unwrap(), &[2, 0, 0]);
        assert_eq!(table.ko_counts("b").unwrap(), &[0, 0, 1]);
        assert_eq!(table.ko_counts("c").unwrap(), &[0, 0, 0]);
        assert_eq!(
            table.stats,
            AggregationStats {
                hits: 5,
                malformed: 1,
                outside_universe: 1,
                unknown_genome: 1,
            }
        );
    }

    #[test]
    fn test_aggregate_all_malformed_keeps_genome() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("DIAMOND_RESULTS.tsv");
        fs::write(&file, "aΩp1\tno_annotation\n").unwrap();

        let table = aggregate(&[file], &["a".to_string()], &universe(), FORMAT).unwrap();
        assert_eq!(table.ko_counts("a").unwrap(), &[0, 0, 0]);
        assert_eq!(table.stats.malformed, 1);
    }

    #[test]
    fn test_list_result_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("DIAMOND_RESULTS_2.tsv"), "").unwrap();
        fs::write(tmp.path().join("DIAMOND_RESULTS_1.tsv"), "").unwrap();
        fs::write(tmp.path().join("other.tsv"), "").unwrap();

        let files = list_result_files(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["DIAMOND_RESULTS_1.tsv", "DIAMOND_RESULTS_2.tsv"]);
    }

    #[test]
    fn test_build_query_namespaces_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let protein_path = tmp.path().join("g1.faa");
        fs::write(&protein_path, ">c_1 # 1 # 300\nMKV*\n>c_2\nLLA\n").unwrap();
        let record = GenomeRecord {
            id: "g1".to_string(),
            protein_path,
            translation_table: Some(11),
        };

        let query = tmp.path().join("query.faa");
        assert_eq!(build_query(&[record], &query, "Ω").unwrap(), 2);
        let written = crate::bio::fasta::parse_fasta(&query).unwrap();
        assert_eq!(written[0].id, "g1Ωc_1");
        assert_eq!(written[1].sequence, b"LLA");
    }
}
