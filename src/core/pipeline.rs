/// Main prediction pipeline
///
/// gene calling -> metadata -> annotation -> feature assembly -> ensemble ->
/// report. Per-genome failures drop that genome with a warning; setup and
/// batch-level failures stop the run.
use crate::annotation::aggregator::AnnotationAggregator;
use crate::annotation::hits::HitFormat;
use crate::annotation::kegg::KeggReference;
use crate::bio::fasta::write_fasta;
use crate::bio::sequence::SequenceType;
use crate::core::assembler::{assemble, FeatureMatrix};
use crate::core::config::Config;
use crate::core::inputs::{
    read_proteins, BinInput, GenomeOutcome, GenomeRecord, SkippedGenome,
};
use crate::core::metadata::{GenomeMetadata, MetadataCalculator};
use crate::models::ensemble::{EnsemblePredictor, GenomePrediction};
use crate::models::{ModelBundle, ReferenceMatrix};
use crate::report::{
    render_table, write_feature_vectors, write_report, PredictionRecord, ReportExtras,
    ReportSchema, RunMode,
};
use crate::tools::traits::{GeneCaller, SimilaritySearch};
use crate::utils::parallel::TaskPool;
use crate::utils::workspace::OutputLayout;
use crate::BinqcError;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PredictorOptions {
    pub mode: RunMode,
    pub threads: usize,
    /// Inputs are protein files; gene calling is skipped
    pub genes_supplied: bool,
    pub debug_cosine: bool,
    pub dump_vectors: bool,
    pub remove_intermediates: bool,
    pub show_progress: bool,
}

impl Default for PredictorOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Auto,
            threads: 1,
            genes_supplied: false,
            debug_cosine: false,
            dump_vectors: false,
            remove_intermediates: false,
            show_progress: true,
        }
    }
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunSummary {
    pub schema: ReportSchema,
    pub records: Vec<PredictionRecord>,
    pub skipped: Vec<SkippedGenome>,
    pub report_path: PathBuf,
    pub digits: usize,
}

impl RunSummary {
    pub fn render_table(&self) -> String {
        render_table(&self.schema, &self.records, self.digits)
    }
}

pub struct Predictor {
    config: Config,
    options: PredictorOptions,
    reference: KeggReference,
    ensemble: EnsemblePredictor,
    searcher: Box<dyn SimilaritySearch>,
    gene_caller: Option<Box<dyn GeneCaller>>,
}

impl Predictor {
    pub fn new(
        config: Config,
        options: PredictorOptions,
        reference: KeggReference,
        ensemble: EnsemblePredictor,
        searcher: Box<dyn SimilaritySearch>,
    ) -> Self {
        Self {
            config,
            options,
            reference,
            ensemble,
            searcher,
            gene_caller: None,
        }
    }

    pub fn with_gene_caller(mut self, gene_caller: Box<dyn GeneCaller>) -> Self {
        self.gene_caller = Some(gene_caller);
        self
    }

    /// Load reference tables and models from the configured directories.
    /// Everything is checked here, before any genome is touched.
    pub fn load_resources(config: &Config) -> Result<(KeggReference, EnsemblePredictor)> {
        let data_dir = config.data_dir();
        let models_dir = config.models_dir();
        tracing::info!("Loading reference data from {}", data_dir.display());

        let reference = KeggReference::load(&data_dir)?;
        let matrix = ReferenceMatrix::load(&data_dir)?;
        let models = ModelBundle::load(&models_dir)?;

        let specific_width = reference.ordering.metadata.len() + reference.ordering.ko_genes.len();
        let ensemble = EnsemblePredictor::new(
            models,
            matrix,
            specific_width,
            config.prediction.aa_ratio_cutoff,
        )?;
        Ok((reference, ensemble))
    }

    fn pool(&self, label: &str) -> TaskPool {
        TaskPool::new(self.options.threads, label).with_progress(self.options.show_progress)
    }

    /// Run the whole pipeline over `bins`, writing into `layout`
    pub fn run(&self, bins: Vec<BinInput>, layout: &OutputLayout) -> Result<RunSummary> {
        let mut skipped = Vec::new();
        let separator = self.config.search.header_separator.as_str();

        let mut accepted = Vec::with_capacity(bins.len());
        for bin in bins {
            match unusable_name_reason(&bin.id, separator) {
                Some(reason) => skipped.push(SkippedGenome::new(bin.id, reason)),
                None => accepted.push(bin),
            }
        }
        let bins = accepted;

        // 1. gene calling
        let (records, translation_tables) = if self.options.genes_supplied {
            tracing::info!("Using user-supplied protein files.");
            (self.stage_supplied_proteins(bins, layout, &mut skipped)?, HashMap::new())
        } else {
            self.call_genes(bins, layout, &mut skipped)?
        };

        // 2. metadata
        let metadata = self.calculate_metadata(&records, &mut skipped)?;
        let with_metadata: std::collections::HashSet<&str> =
            metadata.iter().map(|m| m.genome_id.as_str()).collect();
        let records: Vec<GenomeRecord> = records
            .iter()
            .filter(|r| with_metadata.contains(r.id.as_str()))
            .cloned()
            .collect();
        if records.is_empty() {
            report_skipped(&skipped);
            return Err(anyhow!("No genomes left to process"));
        }

        // 3. annotation
        tracing::info!("Annotating {} genomes with {}", records.len(), self.searcher.name());
        let format = HitFormat {
            header_separator: separator,
            annotation_separator: &self.config.search.annotation_separator,
        };
        let aggregator = AnnotationAggregator::new(
            &self.reference,
            self.searcher.as_ref(),
            format,
            self.config.search.chunk_size,
        );
        let annotations = aggregator.annotate(&records, &layout.search_dir)?;

        // 4. features
        let matrix = assemble(metadata, annotations, &self.reference.ordering)?;
        tracing::debug!("Feature matrix: {} genomes x {} features", matrix.len(), matrix.width());

        // 5. predictions
        tracing::info!("Predicting completeness and contamination.");
        let predictions = self.ensemble.predict(&matrix)?;

        // 6. report
        let summary = self.write_outputs(&matrix, &predictions, &translation_tables, layout, skipped)?;
        report_skipped(&summary.skipped);
        Ok(summary)
    }

    fn call_genes(
        &self,
        bins: Vec<BinInput>,
        layout: &OutputLayout,
        skipped: &mut Vec<SkippedGenome>,
    ) -> Result<(Vec<GenomeRecord>, HashMap<String, u8>)> {
        let caller = self.gene_caller.as_deref().ok_or_else(|| {
            BinqcError::Setup("gene calling requested but no gene caller configured".to_string())
        })?;
        tracing::info!("Calling genes in {} bins with {} threads.", bins.len(), self.options.threads);

        let outcomes = self.pool("Calling genes").run(bins, |bin| {
            let protein_path = layout.protein_file(&bin.id);
            let outcome: GenomeOutcome<(GenomeRecord, u8)> =
                match caller.call_genes(&bin, &protein_path) {
                    Ok(called) if called.protein_count == 0 => Err(SkippedGenome::new(
                        &bin.id,
                        "gene calling produced no proteins",
                    )),
                    Ok(called) => Ok((
                        GenomeRecord {
                            id: bin.id.clone(),
                            protein_path,
                            translation_table: Some(called.translation_table),
                        },
                        called.translation_table,
                    )),
                    Err(e) => Err(SkippedGenome::new(&bin.id, format!("{:#}", e))),
                };
            Ok(outcome)
        })?;

        // (genome, table) pairs come back through the pool's result queue
        let mut records = Vec::new();
        let mut tables = HashMap::new();
        for outcome in outcomes {
            match outcome {
                Ok((record, table)) => {
                    tables.insert(record.id.clone(), table);
                    records.push(record);
                }
                Err(skip) => skipped.push(skip),
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok((records, tables))
    }

    /// Copy user proteins into the protein directory under their genome ids
    fn stage_supplied_proteins(
        &self,
        bins: Vec<BinInput>,
        layout: &OutputLayout,
        skipped: &mut Vec<SkippedGenome>,
    ) -> Result<Vec<GenomeRecord>> {
        let mut records = Vec::with_capacity(bins.len());
        for bin in bins {
            let protein_path = layout.protein_file(&bin.id);
            match read_proteins(&bin.path) {
                Ok(proteins) if proteins.is_empty() => {
                    skipped.push(SkippedGenome::new(&bin.id, "protein file has no sequences"));
                }
                Ok(proteins)
                    if proteins
                        .iter()
                        .all(|p| p.detect_type() == SequenceType::Nucleotide) =>
                {
                    skipped.push(SkippedGenome::new(
                        &bin.id,
                        "file holds nucleotide sequences; drop --genes to call genes first",
                    ));
                }
                Ok(proteins) => {
                    write_fasta(&protein_path, &proteins)?;
                    records.push(GenomeRecord {
                        id: bin.id,
                        protein_path,
                        translation_table: None,
                    });
                }
                Err(e) => skipped.push(SkippedGenome::new(&bin.id, e.to_string())),
            }
        }
        Ok(records)
    }

    fn calculate_metadata(
        &self,
        records: &[GenomeRecord],
        skipped: &mut Vec<SkippedGenome>,
    ) -> Result<Vec<GenomeMetadata>> {
        tracing::info!("Calculating metadata for {} bins.", records.len());
        let outcomes = self
            .pool("Calculating metadata")
            .run(records.to_vec(), |record| {
                let outcome: GenomeOutcome<GenomeMetadata> = MetadataCalculator::from_record(&record)
                    .and_then(|calc| calc.calculate())
                    .map_err(|e| match e {
                        BinqcError::Genome { genome, reason } => SkippedGenome::new(genome, reason),
                        other => SkippedGenome::new(&record.id, other.to_string()),
                    });
                Ok(outcome)
            })?;

        let mut metadata = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(meta) => metadata.push(meta),
                Err(skip) => skipped.push(skip),
            }
        }
        metadata.sort_by(|a, b| a.genome_id.cmp(&b.genome_id));
        Ok(metadata)
    }

    fn write_outputs(
        &self,
        matrix: &FeatureMatrix,
        predictions: &[GenomePrediction],
        translation_tables: &HashMap<String, u8>,
        layout: &OutputLayout,
        skipped: Vec<SkippedGenome>,
    ) -> Result<RunSummary> {
        let schema = ReportSchema::for_mode(
            self.options.mode,
            ReportExtras {
                translation_table: !self.options.genes_supplied,
                cosine_similarity: self.options.debug_cosine,
            },
        );
        let digits = self.config.prediction.round_digits as usize;

        let records: Vec<PredictionRecord> = predictions
            .iter()
            .map(|p| PredictionRecord::from_prediction(p, translation_tables.get(&p.genome_id).copied()))
            .collect();

        let report_path = layout.report_path();
        write_report(&report_path, &schema, &records, digits)?;

        if self.options.dump_vectors {
            write_feature_vectors(&layout.vector_dump_path(), matrix.columns(), predictions)
                .context("Failed to write feature vectors")?;
        }
        if self.options.remove_intermediates {
            layout.remove_intermediates()?;
        }

        Ok(RunSummary {
            schema,
            records,
            skipped,
            report_path,
            digits,
        })
    }
}

/// Names must survive the search tool, which cuts query ids at whitespace
fn unusable_name_reason(id: &str, separator: &str) -> Option<String> {
    if id.contains(separator) {
        Some(format!("genome name contains the reserved separator '{}'", separator))
    } else if id.chars().any(char::is_whitespace) {
        Some("genome name contains whitespace".to_string())
    } else {
        None
    }
}

fn report_skipped(skipped: &[SkippedGenome]) {
    for skip in skipped {
        tracing::warn!("Excluded genome {}", skip);
    }
    if !skipped.is_empty() {
        tracing::warn!("{} genome(s) were excluded from the report", skipped.len());
    }
}
