//! Batch pipeline: parallel per-filing extraction, serial entity resolution,
//! optional persistence.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use soi_core::{
    CanonicalEntity, Diagnostics, Filing, FilingSource, IssueKind, PipelineConfig, RecordSink,
    ResolvedRecord, Result, SoiError, Ticker,
};
use soi_resolve::{
    EntityResolver, IndustryClassifier, KeywordIndustryClassifier, ReviewItem, SimilarityScorer,
    StageCounts,
};

use crate::extract::{ExtractionPath, FilingExtraction, FilingExtractor};
use crate::summary::RunSummary;

/// Outcome of one filing within a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingReport {
    /// Filing BDC.
    pub filer: Ticker,
    /// Accession number.
    pub accession: String,
    /// Reporting period end.
    pub period_end: NaiveDate,
    /// Path that produced the records.
    pub path: ExtractionPath,
    /// Records extracted.
    pub records: usize,
    /// Records classified as Debt or Equity.
    pub classified: usize,
    /// Facts routed to aggregate handling.
    pub aggregate_facts: usize,
    /// Issues raised for this filing.
    pub diagnostics: Diagnostics,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Per-filing reports in processing order.
    pub filings: Vec<FilingReport>,
    /// Resolved records in processing order.
    pub records: Vec<ResolvedRecord>,
    /// Canonical entities in creation order, including any loaded from the
    /// sink.
    pub entities: Vec<CanonicalEntity>,
    /// Fuzzy near misses awaiting review.
    pub review_queue: Vec<ReviewItem>,
    /// Resolver stage counters.
    pub stage_counts: StageCounts,
    /// Every issue of the run, filing issues first.
    pub diagnostics: Diagnostics,
    /// Counts and rates.
    pub summary: RunSummary,
}

/// Extraction and resolution pipeline.
///
/// Filings are extracted in parallel on the blocking pool, then sorted by
/// (ticker, period end, filing date, accession) and resolved one record at a
/// time against a single entity registry. The same input therefore always
/// yields the same entities, ids and canonical names.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use soi::{InMemorySource, Pipeline, PipelineConfig, SqliteSink, Ticker};
///
/// let pipeline = Pipeline::new(PipelineConfig::default())
///     .with_source(Arc::new(source))
///     .with_sink(Arc::new(SqliteSink::new("bdc.db")?));
///
/// let output = pipeline.run_filers(&[Ticker::new("ARCC"), Ticker::new("MAIN")]).await?;
/// println!("{}", output.summary);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    sources: Vec<Arc<dyn FilingSource>>,
    sink: Option<Arc<dyn RecordSink>>,
    industry: Arc<dyn IndustryClassifier>,
    scorer: Option<Arc<dyn SimilarityScorer>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("industry", &self.industry)
            .field("scorer", &self.scorer)
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline with no source and no sink.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
            sink: None,
            industry: Arc::new(KeywordIndustryClassifier::new()),
            scorer: None,
        }
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Register a filing source. Sources are tried in registration order.
    pub fn register_source(&mut self, source: Arc<dyn FilingSource>) {
        debug!(source = source.name(), "Registering filing source");
        self.sources.push(source);
    }

    /// Add a filing source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FilingSource>) -> Self {
        self.register_source(source);
        self
    }

    /// Set the sink that receives entities and records after each run.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the keyword industry classifier.
    #[must_use]
    pub fn with_industry_classifier(mut self, classifier: Arc<dyn IndustryClassifier>) -> Self {
        self.industry = classifier;
        self
    }

    /// Replace the fuzzy similarity scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Fetch the filings of each filer, trying sources in order until one
    /// has filings for it.
    ///
    /// A filer for which every source failed is skipped and reported to
    /// `diagnostics` as [`IssueKind::UnparseableFiling`]; the other filers
    /// are still fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is registered.
    pub async fn fetch(
        &self,
        filers: &[Ticker],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Filing>> {
        if self.sources.is_empty() {
            return Err(SoiError::InvalidParameter(
                "No filing sources registered".to_string(),
            ));
        }

        let mut filings = Vec::new();
        for filer in filers {
            let mut last_error = None;
            let mut found = false;
            for source in &self.sources {
                debug!(source = source.name(), filer = %filer, "Fetching filings");
                match source.fetch_filings(filer).await {
                    Ok(batch) if batch.is_empty() => {}
                    Ok(batch) => {
                        debug!(source = source.name(), filer = %filer, count = batch.len(), "Fetched filings");
                        filings.extend(batch);
                        found = true;
                        break;
                    }
                    Err(e) => {
                        warn!(
                            source = source.name(),
                            error = %e,
                            "Source failed, trying next"
                        );
                        last_error = Some(e);
                    }
                }
            }
            if found {
                continue;
            }
            match last_error {
                Some(e) => {
                    warn!(filer = %filer, error = %e, "All sources failed for filer");
                    diagnostics.push(
                        IssueKind::UnparseableFiling,
                        format!("{filer}: no source could supply filings: {e}"),
                    );
                }
                None => warn!(filer = %filer, "No source has filings for filer"),
            }
        }
        Ok(filings)
    }

    /// Fetch and process the filings of the given filers.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::fetch`] and [`Pipeline::run`].
    pub async fn run_filers(&self, filers: &[Ticker]) -> Result<RunOutput> {
        let mut diagnostics = Diagnostics::new();
        let filings = self.fetch(filers, &mut diagnostics).await?;
        self.process(filings, diagnostics).await
    }

    /// Process a batch of filings.
    ///
    /// A filing that fails to parse, or whose extraction task panics, is
    /// reported in the diagnostics and never aborts the batch. With a sink
    /// attached, the resolver starts from the entities already stored there,
    /// so an entity keeps its id from one run to the next.
    ///
    /// # Errors
    ///
    /// Returns [`SoiError::ResolverInvariant`] on a registry defect and any
    /// error raised by the sink.
    pub async fn run(&self, filings: Vec<Filing>) -> Result<RunOutput> {
        self.process(filings, Diagnostics::new()).await
    }

    #[instrument(skip(self, filings, run_diagnostics), fields(filings = filings.len()))]
    async fn process(
        &self,
        filings: Vec<Filing>,
        mut run_diagnostics: Diagnostics,
    ) -> Result<RunOutput> {
        let mut extractions = self.extract_all(filings, &mut run_diagnostics).await;
        extractions.sort_by(|a, b| extraction_key(a).cmp(&extraction_key(b)));

        let mut resolver = EntityResolver::new(self.config.resolver.clone());
        if let Some(scorer) = &self.scorer {
            resolver = resolver.with_scorer(Arc::clone(scorer));
        }
        if let Some(sink) = &self.sink {
            seed_from_sink(sink.as_ref(), &mut resolver).await?;
        }

        let mut reports = Vec::with_capacity(extractions.len());
        let mut records = Vec::new();
        for extraction in extractions {
            let (report, resolved) = self.resolve_filing(&mut resolver, extraction)?;
            records.extend(resolved);
            reports.push(report);
        }
        resolver.verify()?;

        let entities = resolver.entities().to_vec();
        let review_queue = resolver.review_queue().to_vec();
        let stage_counts = *resolver.stage_counts();

        let mut diagnostics = Diagnostics::new();
        for report in &reports {
            diagnostics.extend(report.diagnostics.clone());
        }
        diagnostics.extend(run_diagnostics);

        if let Some(sink) = &self.sink {
            let stored_entities = sink.put_entities(&entities).await?;
            let stored_records = sink.put_records(&records).await?;
            debug!(
                sink = sink.name(),
                entities = stored_entities,
                records = stored_records,
                "Persisted run"
            );
        }

        let summary = RunSummary::new(&reports, &records, &entities, &stage_counts, &diagnostics);
        info!(
            filings = summary.filings,
            records = summary.records,
            entities = summary.entities,
            classification_rate = summary.classification_rate(),
            "Run complete"
        );

        Ok(RunOutput {
            filings: reports,
            records,
            entities,
            review_queue,
            stage_counts,
            diagnostics,
            summary,
        })
    }

    async fn extract_all(
        &self,
        filings: Vec<Filing>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<FilingExtraction> {
        let extractor = Arc::new(FilingExtractor::new(self.config.extraction.clone()));

        let (accessions, tasks): (Vec<String>, Vec<_>) = filings
            .into_iter()
            .map(|filing| {
                let extractor = Arc::clone(&extractor);
                let accession = filing.metadata.accession.clone();
                let task = tokio::task::spawn_blocking(move || extractor.extract(&filing));
                (accession, task)
            })
            .unzip();

        let mut extractions = Vec::with_capacity(tasks.len());
        for (accession, joined) in accessions.into_iter().zip(join_all(tasks).await) {
            match joined {
                Ok(extraction) => extractions.push(extraction),
                Err(e) => {
                    warn!(accession = %accession, error = %e, "Extraction task failed");
                    diagnostics.push(
                        IssueKind::UnparseableFiling,
                        format!("{accession}: extraction task failed: {e}"),
                    );
                }
            }
        }
        extractions
    }

    fn resolve_filing(
        &self,
        resolver: &mut EntityResolver,
        extraction: FilingExtraction,
    ) -> Result<(FilingReport, Vec<ResolvedRecord>)> {
        let FilingExtraction {
            filer,
            metadata,
            path,
            mut records,
            aggregate_facts,
            mut diagnostics,
        } = extraction;

        let mut resolved = Vec::with_capacity(records.len());
        for record in &mut records {
            if record.industry.is_none()
                && let Some(description) = record.business_description.as_deref()
            {
                record.industry = self.industry.classify(description);
            }

            let raw = record.company_name().to_string();
            let resolution = resolver.resolve(&raw, None)?;
            if resolution.needs_review() {
                diagnostics.push(
                    IssueKind::FuzzyAmbiguous,
                    format!("{}: {raw}", metadata.accession),
                );
            }
            if let Some(industry) = &record.industry {
                resolver.assign_industry(resolution.entity, industry.clone());
            }

            let entity = resolver.entity(resolution.entity).ok_or_else(|| {
                SoiError::ResolverInvariant(format!("unknown entity {}", resolution.entity))
            })?;
            resolved.push(ResolvedRecord::from_record(
                &filer.ticker,
                &metadata.accession,
                metadata.period_end,
                record,
                entity,
                resolution.method,
                resolution.confidence,
            ));
        }

        let classified = records
            .iter()
            .filter(|r| r.asset_class.is_classified())
            .count();
        debug!(
            filer = %filer.ticker,
            accession = %metadata.accession,
            records = resolved.len(),
            "Filing resolved"
        );

        let report = FilingReport {
            filer: filer.ticker,
            accession: metadata.accession,
            period_end: metadata.period_end,
            path,
            records: records.len(),
            classified,
            aggregate_facts,
            diagnostics,
        };
        Ok((report, resolved))
    }
}

/// Loads the entities stored in a sink into an empty resolver.
///
/// Stored ids must run 1, 2, 3, ... so every entity keeps the id it was
/// stored under.
async fn seed_from_sink(sink: &dyn RecordSink, resolver: &mut EntityResolver) -> Result<()> {
    let stored = sink.get_entities().await?;
    for entity in stored {
        let expected = entity.id;
        let id = resolver.seed(entity)?;
        if id != expected {
            return Err(SoiError::ResolverInvariant(format!(
                "stored entity {expected} would be seeded as {id}"
            )));
        }
    }
    debug!(sink = sink.name(), entities = resolver.len(), "Seeded resolver");
    Ok(())
}

fn extraction_key(e: &FilingExtraction) -> (&str, NaiveDate, NaiveDate, &str) {
    (
        e.filer.ticker.as_str(),
        e.metadata.period_end,
        e.metadata.filing_date,
        e.metadata.accession.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use soi_core::{
        AssetClass, Dimension, FilerId, FilingFacts, FilingMetadata, FormType, InMemorySource,
        Period, ReportingContext, ResolutionMethod, TaggedFact,
    };
    use soi_sink::InMemorySink;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn dimensional(ticker: &str, accession: &str, positions: &[(&str, f64)]) -> Filing {
        let mut facts = FilingFacts::new();
        for (i, (identifier, fair_value)) in positions.iter().enumerate() {
            let ctx = format!("c{i}");
            facts.contexts.push(
                ReportingContext::new(ctx.clone(), Period::Instant(date()))
                    .with_dimension(Dimension::typed("InvestmentIdentifierAxis", *identifier)),
            );
            facts
                .facts
                .push(TaggedFact::new("InvestmentOwnedAtFairValue", *fair_value, ctx));
        }
        Filing::new(
            FilerId::new(ticker, "0000000001"),
            FilingMetadata::new(FormType::TenK, date(), date(), accession),
        )
        .with_facts(facts)
    }

    fn batch() -> Vec<Filing> {
        vec![
            dimensional(
                "MAIN",
                "m-1",
                &[
                    ("ABC Holdings LLC, First lien loan", 10.0),
                    ("Zenith Dental, Common stock", 3.0),
                ],
            ),
            dimensional(
                "ARCC",
                "a-1",
                &[
                    ("ABC Holdings, LLC, Senior secured loan", 20.0),
                    ("Acme Corp, Subordinated notes", 5.0),
                ],
            ),
            Filing::new(
                FilerId::new("HTGC", "0000000002"),
                FilingMetadata::new(FormType::TenQ, date(), date(), "h-1"),
            ),
        ]
    }

    #[tokio::test]
    async fn test_run_resolves_across_filers() {
        let output = Pipeline::default().run(batch()).await.unwrap();

        // ARCC sorts first, so its spelling becomes canonical.
        let order: Vec<_> = output.filings.iter().map(|f| f.filer.as_str()).collect();
        assert_eq!(order, ["ARCC", "HTGC", "MAIN"]);
        assert_eq!(output.entities[0].canonical_name, "ABC Holdings, LLC");

        assert_eq!(output.records.len(), 4);
        let main_abc = &output.records[2];
        assert_eq!(main_abc.filer.as_str(), "MAIN");
        assert_eq!(main_abc.entity, output.entities[0].id);
        assert_eq!(main_abc.method, ResolutionMethod::Normalized);
        assert_eq!(main_abc.asset_class, AssetClass::Debt);

        assert_eq!(output.entities.len(), 3);
        assert_eq!(output.filings[1].path, ExtractionPath::Unparsed);
        assert_eq!(output.diagnostics.count(IssueKind::UnparseableFiling), 1);
        assert_eq!(output.summary.records, 4);
    }

    #[tokio::test]
    async fn test_run_is_deterministic() {
        let mut reversed = batch();
        reversed.reverse();

        let a = Pipeline::default().run(batch()).await.unwrap();
        let b = Pipeline::default().run(reversed).await.unwrap();
        assert_eq!(a.entities, b.entities);
        assert_eq!(a.records, b.records);
    }

    #[tokio::test]
    async fn test_run_filers_from_source_into_sink() {
        let mut source = InMemorySource::new();
        for filing in batch() {
            source.insert(filing);
        }
        let sink = Arc::new(InMemorySink::new());
        let pipeline = Pipeline::default()
            .with_source(Arc::new(source))
            .with_sink(sink.clone());

        let output = pipeline
            .run_filers(&[Ticker::new("MAIN"), Ticker::new("UNKNOWN")])
            .await
            .unwrap();
        assert_eq!(output.records.len(), 2);

        let stored = sink
            .get_records(&Ticker::new("MAIN"), date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(sink.entities().await.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_requires_a_source() {
        let mut diagnostics = Diagnostics::new();
        let err = Pipeline::default()
            .fetch(&[Ticker::new("ARCC")], &mut diagnostics)
            .await
            .unwrap_err();
        assert!(matches!(err, SoiError::InvalidParameter(_)));
    }

    #[derive(Debug)]
    struct Unreachable(&'static str);

    #[async_trait::async_trait]
    impl FilingSource for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn fetch_filings(&self, filer: &Ticker) -> Result<Vec<Filing>> {
            if filer.as_str() == self.0 {
                Err(SoiError::Source(format!("{filer}: connection refused")))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_failed_filer_does_not_abort_run() {
        let mut source = InMemorySource::new();
        for filing in batch() {
            source.insert(filing);
        }
        let pipeline = Pipeline::default()
            .with_source(Arc::new(Unreachable("FSK")))
            .with_source(Arc::new(source));

        let output = pipeline
            .run_filers(&[Ticker::new("FSK"), Ticker::new("MAIN")])
            .await
            .unwrap();
        assert_eq!(output.filings.len(), 1);
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.diagnostics.count(IssueKind::UnparseableFiling), 1);
        assert_eq!(output.summary.filings, 1);
    }

    #[tokio::test]
    async fn test_fallback_source_covers_failed_filer() {
        let mut source = InMemorySource::new();
        for filing in batch() {
            source.insert(filing);
        }
        let pipeline = Pipeline::default()
            .with_source(Arc::new(Unreachable("MAIN")))
            .with_source(Arc::new(source));

        let mut diagnostics = Diagnostics::new();
        let filings = pipeline
            .fetch(&[Ticker::new("MAIN")], &mut diagnostics)
            .await
            .unwrap();
        assert_eq!(filings.len(), 1);
        assert_eq!(diagnostics.count(IssueKind::UnparseableFiling), 0);
    }

    fn id_of(output: &RunOutput, name: &str) -> soi_core::EntityId {
        output
            .records
            .iter()
            .find(|r| r.raw_name == name)
            .map(|r| r.entity)
            .unwrap()
    }

    #[tokio::test]
    async fn test_ids_stable_across_runs_into_one_sink() {
        let sink = Arc::new(InMemorySink::new());
        let pipeline = Pipeline::default().with_sink(sink.clone());

        let first = pipeline
            .run(vec![dimensional(
                "ARCC",
                "a-1",
                &[("Acme Corp, First lien loan", 5.0), ("Zenith Dental, Common stock", 2.0)],
            )])
            .await
            .unwrap();
        assert_eq!(id_of(&first, "Acme Corp"), soi_core::EntityId(1));
        assert_eq!(id_of(&first, "Zenith Dental"), soi_core::EntityId(2));

        let second = pipeline
            .run(vec![dimensional(
                "MAIN",
                "m-1",
                &[("Beta Widgets, First lien loan", 4.0), ("Acme Corp, Common stock", 1.0)],
            )])
            .await
            .unwrap();
        assert_eq!(id_of(&second, "Beta Widgets"), soi_core::EntityId(3));
        assert_eq!(id_of(&second, "Acme Corp"), soi_core::EntityId(1));
        assert_eq!(second.entities.len(), 3);

        let stored = sink.get_entities().await.unwrap();
        let names: Vec<_> = stored.iter().map(|e| e.canonical_name.as_str()).collect();
        assert_eq!(names, ["Acme Corp", "Zenith Dental", "Beta Widgets"]);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_ids_stable_across_runs_into_sqlite() {
        let sink = Arc::new(soi_sink::SqliteSink::in_memory().unwrap());
        let pipeline = Pipeline::default().with_sink(sink.clone());

        pipeline
            .run(vec![dimensional("ARCC", "a-1", &[("Acme Corp, First lien loan", 5.0)])])
            .await
            .unwrap();
        let second = pipeline
            .run(vec![dimensional(
                "MAIN",
                "m-1",
                &[("Beta Widgets, First lien loan", 4.0), ("Acme Corp, Common stock", 1.0)],
            )])
            .await
            .unwrap();
        assert_eq!(id_of(&second, "Acme Corp"), soi_core::EntityId(1));
        assert_eq!(id_of(&second, "Beta Widgets"), soi_core::EntityId(2));
        assert_eq!(sink.get_entities().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_review_band_is_reported() {
        #[derive(Debug)]
        struct Near;
        impl SimilarityScorer for Near {
            fn score(&self, _a: &str, _b: &str) -> f64 {
                85.0
            }
        }

        let output = Pipeline::default()
            .with_scorer(Arc::new(Near))
            .run(batch())
            .await
            .unwrap();
        // Every name after the first lands in the review band.
        assert_eq!(output.review_queue.len(), 2);
        assert_eq!(output.diagnostics.count(IssueKind::FuzzyAmbiguous), 2);
        assert!(output.entities.iter().skip(1).all(|e| e.needs_review));
    }
}
